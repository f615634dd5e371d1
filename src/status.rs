use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Connectivity status of the event channel.
///
/// `Error` is transient: a transport error is always folded into the
/// close path, so an `Error` transition is followed by `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// An open attempt is in flight
    Connecting,
    /// The socket is open and authenticated frames may flow
    Connected,
    /// No socket is open
    Disconnected,
    /// The transport reported an error on the current socket
    Error,
}

impl Status {
    /// The lowercase wire representation exposed to collaborators
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Disconnected => "disconnected",
            Status::Error => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier returned by `on_status_change`; pass it back to
/// `remove_status_listener` to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(pub(crate) u64);

type BoxedListener = Arc<dyn Fn(Status) + Send + Sync>;

/// Registry of status listeners.
///
/// Listeners are invoked synchronously on every transition, in no
/// particular order. Registration does not replay the current status; a
/// listener only sees future transitions.
#[derive(Default)]
pub(crate) struct StatusListeners {
    listeners: RwLock<HashMap<u64, BoxedListener>>,
    next_id: AtomicU64,
}

impl StatusListeners {
    pub fn register<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Status) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().insert(id, Arc::new(listener));
        ListenerId(id)
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(&id.0).is_some()
    }

    /// Invoke all listeners with the new status.
    ///
    /// The set is snapshotted before invocation so a listener may
    /// unregister itself (or others) from inside the callback.
    pub fn notify(&self, status: Status) {
        let snapshot: Vec<BoxedListener> = self.listeners.read().values().cloned().collect();
        for listener in snapshot {
            listener(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(Status::Connecting.as_str(), "connecting");
        assert_eq!(Status::Connected.as_str(), "connected");
        assert_eq!(Status::Disconnected.as_str(), "disconnected");
        assert_eq!(Status::Error.as_str(), "error");
        assert_eq!(Status::Connected.to_string(), "connected");
    }

    #[test]
    fn test_listener_receives_transitions() {
        let listeners = StatusListeners::default();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        listeners.register(move |status| {
            assert_eq!(status, Status::Connected);
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        listeners.notify(Status::Connected);
        listeners.notify(Status::Connected);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let listeners = StatusListeners::default();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        let id = listeners.register(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));

        listeners.notify(Status::Disconnected);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_can_unregister_inside_callback() {
        let listeners = Arc::new(StatusListeners::default());
        let seen = Arc::new(AtomicUsize::new(0));

        let id_slot: Arc<RwLock<Option<ListenerId>>> = Arc::new(RwLock::new(None));
        let listeners_clone = listeners.clone();
        let id_slot_clone = id_slot.clone();
        let seen_clone = seen.clone();
        let id = listeners.register(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_slot_clone.read() {
                listeners_clone.remove(id);
            }
        });
        *id_slot.write() = Some(id);

        listeners.notify(Status::Connecting);
        listeners.notify(Status::Connected);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
