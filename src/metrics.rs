use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for observability
///
/// Counters for monitoring channel health. Use `snapshot()` for a
/// point-in-time view of all values, or the individual getters.
#[derive(Debug, Default)]
pub struct Metrics {
    connections_total: AtomicU64,
    reconnect_attempts_total: AtomicU64,
    messages_received_total: AtomicU64,
    messages_sent_total: AtomicU64,
    malformed_frames_total: AtomicU64,
    dropped_sends_total: AtomicU64,
    errors_total: AtomicU64,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Getters ==========

    /// Get total successful connections
    pub fn connections(&self) -> u64 {
        self.connections_total.load(Ordering::Relaxed)
    }

    /// Get total reconnection attempts scheduled
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts_total.load(Ordering::Relaxed)
    }

    /// Get total messages received
    pub fn messages_received(&self) -> u64 {
        self.messages_received_total.load(Ordering::Relaxed)
    }

    /// Get total messages sent
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent_total.load(Ordering::Relaxed)
    }

    /// Get total inbound frames dropped as malformed
    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames_total.load(Ordering::Relaxed)
    }

    /// Get total outbound messages dropped while not connected
    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends_total.load(Ordering::Relaxed)
    }

    /// Get total transport errors
    pub fn errors(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    // ========== Recording methods (called internally) ==========

    pub(crate) fn record_connection(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect_attempt(&self) {
        self.reconnect_attempts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_received(&self) {
        self.messages_received_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_sent(&self) {
        self.messages_sent_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed_frame(&self) {
        self.malformed_frames_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_send(&self) {
        self.dropped_sends_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all metrics for export
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Acquire),
            reconnect_attempts_total: self.reconnect_attempts_total.load(Ordering::Acquire),
            messages_received_total: self.messages_received_total.load(Ordering::Acquire),
            messages_sent_total: self.messages_sent_total.load(Ordering::Acquire),
            malformed_frames_total: self.malformed_frames_total.load(Ordering::Acquire),
            dropped_sends_total: self.dropped_sends_total.load(Ordering::Acquire),
            errors_total: self.errors_total.load(Ordering::Acquire),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub reconnect_attempts_total: u64,
    pub messages_received_total: u64,
    pub messages_sent_total: u64,
    pub malformed_frames_total: u64,
    pub dropped_sends_total: u64,
    pub errors_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = Metrics::new();

        metrics.record_connection();
        metrics.record_connection();
        metrics.record_reconnect_attempt();
        metrics.record_message_received();
        metrics.record_malformed_frame();

        assert_eq!(metrics.connections(), 2);
        assert_eq!(metrics.reconnect_attempts(), 1);
        assert_eq!(metrics.messages_received(), 1);
        assert_eq!(metrics.malformed_frames(), 1);
        assert_eq!(metrics.messages_sent(), 0);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = Metrics::new();

        metrics.record_connection();
        metrics.record_message_sent();
        metrics.record_dropped_send();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_total, 1);
        assert_eq!(snapshot.messages_sent_total, 1);
        assert_eq!(snapshot.dropped_sends_total, 1);
        assert_eq!(snapshot.errors_total, 0);
    }
}
