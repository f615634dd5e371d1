use crate::config::ChannelConfig;
use crate::connection::{Connection, ConnectionCommand};
use crate::frame::Frame;
use crate::metrics::Metrics;
use crate::registry::{HandlerId, HandlerRegistry};
use crate::status::{ListenerId, Status, StatusListeners};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default command channel buffer size
const DEFAULT_CHANNEL_SIZE: usize = 16;

/// State shared between the manager and its connection task
pub(crate) struct ChannelShared {
    status: RwLock<Status>,
    listeners: StatusListeners,
    pub(crate) registry: HandlerRegistry,
    pub(crate) metrics: Arc<Metrics>,
}

impl ChannelShared {
    fn new() -> Self {
        Self {
            status: RwLock::new(Status::Disconnected),
            listeners: StatusListeners::default(),
            registry: HandlerRegistry::default(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub(crate) fn status(&self) -> Status {
        *self.status.read()
    }

    /// Record a transition and notify listeners. No-op transitions (same
    /// status) are swallowed, so listeners only ever see changes.
    pub(crate) fn set_status(&self, next: Status) {
        {
            let mut current = self.status.write();
            if *current == next {
                return;
            }
            *current = next;
        }
        debug!("Channel status -> {}", next);
        self.listeners.notify(next);
    }
}

/// The currently-owned socket task
struct ActiveConnection {
    command_tx: mpsc::Sender<ConnectionCommand>,
    handle: JoinHandle<()>,
    live: Arc<AtomicBool>,
}

/// Maintains a single logical live connection to a per-key event stream,
/// delivering inbound typed frames to registered handlers and recovering
/// transparently from drops.
///
/// Construct one instance at application startup and pass it by reference
/// to whatever layer needs it; the manager exclusively owns the socket,
/// while handlers and status listeners may be registered from anywhere,
/// before or after connecting.
///
/// # Thread Safety
///
/// `ChannelManager` is `Send + Sync`; all methods can be called from
/// multiple tasks concurrently.
pub struct ChannelManager {
    config: ChannelConfig,
    shared: Arc<ChannelShared>,
    active: Mutex<Option<ActiveConnection>>,
}

impl ChannelManager {
    /// Create a new channel manager. No socket is opened until `connect`.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            shared: Arc::new(ChannelShared::new()),
            active: Mutex::new(None),
        }
    }

    /// Get the metrics for this manager
    pub fn metrics(&self) -> Arc<Metrics> {
        self.shared.metrics.clone()
    }

    /// Get the last known status. `disconnected` before any `connect`.
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// Open the event stream for a subscription key.
    ///
    /// Any previously owned socket is closed before being replaced. Status
    /// moves to `connecting` immediately; the call returns without waiting
    /// for the open event - observe connectivity via `on_status_change`.
    ///
    /// If a credential is supplied, an authentication frame is the first
    /// frame sent after the socket opens.
    pub async fn connect(&self, key: &str, credential: Option<&str>) {
        self.close_active().await;
        self.shared.set_status(Status::Connecting);

        let (command_tx, command_rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
        let live = Arc::new(AtomicBool::new(true));

        let connection = Connection::new(
            key,
            credential,
            self.config.base_url.clone(),
            self.config.backoff.clone(),
            self.shared.clone(),
            command_rx,
            live.clone(),
        );
        let handle = tokio::spawn(connection.run());

        *self.active.lock() = Some(ActiveConnection {
            command_tx,
            handle,
            live,
        });
    }

    /// Close the channel and stop any pending reconnect. Idempotent.
    pub async fn disconnect(&self) {
        if self.close_active().await {
            self.shared.set_status(Status::Disconnected);
        }
    }

    /// Tear down the current connection task, if any.
    /// Returns `true` if there was one.
    async fn close_active(&self) -> bool {
        let Some(old) = self.active.lock().take() else {
            return false;
        };

        // Mark dead first so the outgoing task stops publishing status,
        // then ask it to close its socket (this also cancels a pending
        // backoff timer). If the task is already gone, reap the handle.
        old.live.store(false, Ordering::SeqCst);
        if old.command_tx.send(ConnectionCommand::Close).await.is_err() {
            old.handle.abort();
        }
        true
    }

    /// Register a typed handler for a frame type.
    ///
    /// The handler is invoked once per inbound frame of exactly that type,
    /// with the frame's payload deserialized into `T`. Multiple handlers
    /// may share a type; invocation order is unspecified.
    pub fn subscribe<T, F>(&self, kind: &str, handler: F) -> HandlerId
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(kind, handler)
    }

    /// Remove a previously registered handler.
    /// Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: &HandlerId) -> bool {
        self.shared.registry.unsubscribe(handle)
    }

    /// Register a listener invoked synchronously on every status
    /// transition. The current status is not replayed; the listener only
    /// sees future transitions. The returned id is the disposer - pass it
    /// to `remove_status_listener`.
    pub fn on_status_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Status) + Send + Sync + 'static,
    {
        self.shared.listeners.register(listener)
    }

    /// Unregister a status listener.
    /// Returns `false` if it was already gone.
    pub fn remove_status_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    /// Serialize and transmit a frame if the channel is currently open.
    ///
    /// Fire-and-forget: while not connected the frame is logged and
    /// dropped, and the caller receives no failure signal. This is a
    /// documented limitation, not queueing-with-retry.
    pub fn send(&self, frame: &Frame) {
        if self.shared.status() != Status::Connected {
            self.shared.metrics.record_dropped_send();
            warn!(
                "Dropping outbound '{}' frame: channel is {}",
                frame.kind,
                self.shared.status()
            );
            return;
        }

        let text = match frame.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!("Dropping outbound '{}' frame: {}", frame.kind, e);
                return;
            }
        };

        let guard = self.active.lock();
        match guard.as_ref() {
            Some(conn) => {
                if conn.command_tx.try_send(ConnectionCommand::Send(text)).is_err() {
                    self.shared.metrics.record_dropped_send();
                    warn!("Dropping outbound '{}' frame: command queue full", frame.kind);
                }
            }
            None => {
                self.shared.metrics.record_dropped_send();
                warn!("Dropping outbound '{}' frame: no connection", frame.kind);
            }
        }
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        // Abort the connection task to prevent it outliving the manager
        if let Some(conn) = self.active.lock().take() {
            conn.live.store(false, Ordering::SeqCst);
            conn.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn test_manager() -> ChannelManager {
        let config = ChannelConfig::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .expect("valid config");
        ChannelManager::new(config)
    }

    #[test]
    fn test_status_is_disconnected_before_connect() {
        let manager = test_manager();
        assert_eq!(manager.status(), Status::Disconnected);
    }

    #[tokio::test]
    async fn test_send_while_disconnected_drops_without_panicking() {
        let manager = test_manager();
        manager.send(&Frame::new("comment", json!({"id": 1})));

        assert_eq!(manager.metrics().dropped_sends(), 1);
        assert_eq!(manager.metrics().messages_sent(), 0);
        assert_eq!(manager.status(), Status::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let manager = test_manager();
        manager.disconnect().await;
        manager.disconnect().await;
        assert_eq!(manager.status(), Status::Disconnected);
    }

    #[test]
    fn test_listener_not_replayed_on_registration() {
        let manager = test_manager();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        manager.on_status_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        manager.shared.set_status(Status::Connecting);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Same status again is not a transition
        manager.shared.set_status(Status::Connecting);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removed_listener_sees_nothing() {
        let manager = test_manager();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let id = manager.on_status_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(manager.remove_status_listener(id));
        assert!(!manager.remove_status_listener(id));

        manager.shared.set_status(Status::Connecting);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribe_routes_through_shared_registry() {
        let manager = test_manager();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let handle = manager.subscribe("comment", move |_: serde_json::Value| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        manager
            .shared
            .registry
            .dispatch(&Frame::new("comment", json!({"id": 7})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(manager.unsubscribe(&handle));
        manager
            .shared
            .registry
            .dispatch(&Frame::new("comment", json!({"id": 8})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
