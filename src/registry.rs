use crate::frame::Frame;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Identifier for a registered handler; pass it back to `unsubscribe`
/// to stop delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerId {
    pub(crate) kind: String,
    pub(crate) id: u64,
}

impl HandlerId {
    /// The frame type this handler was registered for
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

type BoxedHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Mapping from frame type to a set of handlers.
///
/// Types match exactly (no wildcards). A type with no handlers is not an
/// error; frames of that type are silently dropped. Handler iteration
/// order within a set is unspecified.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: RwLock<HashMap<String, HashMap<u64, BoxedHandler>>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    /// Register a typed handler for a frame type.
    ///
    /// The payload is deserialized into `T` per delivery; a payload that
    /// does not match the expected shape is logged and dropped for this
    /// handler only.
    pub fn subscribe<T, F>(&self, kind: &str, handler: F) -> HandlerId
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind_owned = kind.to_string();

        let boxed: BoxedHandler = {
            let kind = kind_owned.clone();
            Arc::new(move |payload: &Value| match serde_json::from_value::<T>(payload.clone()) {
                Ok(typed) => handler(typed),
                Err(e) => warn!(
                    "[{}] payload did not match handler's expected shape: {}",
                    kind, e
                ),
            })
        };

        self.handlers
            .write()
            .entry(kind_owned.clone())
            .or_default()
            .insert(id, boxed);

        HandlerId {
            kind: kind_owned,
            id,
        }
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: &HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(set) = handlers.get_mut(&handle.kind) else {
            return false;
        };
        let removed = set.remove(&handle.id).is_some();
        if set.is_empty() {
            handlers.remove(&handle.kind);
        }
        removed
    }

    /// Deliver a frame to every handler registered for its type.
    ///
    /// Returns the number of handlers invoked. The set is snapshotted
    /// before invocation so handlers may subscribe/unsubscribe from inside
    /// the callback.
    pub fn dispatch(&self, frame: &Frame) -> usize {
        let snapshot: Vec<BoxedHandler> = {
            let handlers = self.handlers.read();
            match handlers.get(&frame.kind) {
                Some(set) => set.values().cloned().collect(),
                None => return 0,
            }
        };

        for handler in &snapshot {
            handler(&frame.payload);
        }
        snapshot.len()
    }
}
