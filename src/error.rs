use crate::frame::FrameError;
use thiserror::Error;

/// Errors that can occur in ws-event-channel.
///
/// None of these surface through the `ChannelManager` API during normal
/// operation; connection failures degrade to a status change plus a log
/// line. They exist for internal propagation and logging.
#[derive(Error, Debug)]
pub enum Error {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The configured base address cannot be turned into a stream endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Frame envelope error
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}
