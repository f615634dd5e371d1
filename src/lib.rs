//! # ws-event-channel
//!
//! A reliable event channel over a single WebSocket connection, with typed
//! frame dispatch, auto-reconnection, and status propagation.
//!
//! ## Features
//!
//! - **Auto-reconnection** with exponential backoff and a hard attempt ceiling
//! - **Typed dispatch** - inbound frames are validated at the boundary and
//!   routed to handlers by their `type` discriminator
//! - **Status stream** - synchronous listeners observe every
//!   connecting/connected/disconnected/error transition
//! - **Post-open authentication** via a credential frame
//! - **Metrics** for observability
//!
//! ## Example
//!
//! ```ignore
//! use ws_event_channel::{ChannelConfig, ChannelManager};
//!
//! #[derive(serde::Deserialize)]
//! struct CommentEvent { id: u64, body: String }
//!
//! let config = ChannelConfig::builder()
//!     .base_url("https://dashboard.example.com")
//!     .build()?;
//!
//! // One manager instance serves the whole application; construct it at
//! // startup and pass it by reference to whatever layer needs it.
//! let manager = ChannelManager::new(config);
//!
//! manager.subscribe("comment", |event: CommentEvent| {
//!     println!("comment #{}: {}", event.id, event.body);
//! });
//! manager.on_status_change(|status| println!("channel is {status}"));
//!
//! manager.connect("42", Some("bearer-token")).await;
//! ```

mod config;
mod connection;
mod error;
mod frame;
mod manager;
mod metrics;
mod registry;
mod status;

pub use config::{BackoffConfig, ChannelConfig, ChannelConfigBuilder, ConfigError};
pub use error::Error;
pub use frame::{Frame, FrameError};
pub use manager::ChannelManager;
pub use metrics::{Metrics, MetricsSnapshot};
pub use registry::HandlerId;
pub use status::{ListenerId, Status};

/// Result type for ws-event-channel operations
pub type Result<T> = std::result::Result<T, Error>;
