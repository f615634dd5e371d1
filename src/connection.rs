use crate::config::{endpoint_url, BackoffConfig};
use crate::frame::Frame;
use crate::manager::ChannelShared;
use crate::status::Status;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Commands that can be sent to a connection task
#[derive(Debug)]
pub(crate) enum ConnectionCommand {
    /// Send serialized frame text
    Send(String),
    /// Gracefully close the connection and stop reconnecting
    Close,
}

/// Type alias for WebSocket stream
type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// How a connected session ended
enum SessionEnd {
    /// Close command received; stop the task
    Stopped,
    /// Server- or network-initiated close; reconnect
    Dropped,
    /// Transport error; surface `error` status, then reconnect
    Failed,
}

/// Owns one socket for one subscription key, reconnecting on failure.
///
/// All socket events and reconnect timers run on this single task, so
/// frames are parsed and dispatched sequentially in network order.
pub(crate) struct Connection {
    key: String,
    credential: Option<String>,
    base_url: Url,
    backoff: BackoffConfig,
    shared: Arc<ChannelShared>,
    command_rx: mpsc::Receiver<ConnectionCommand>,
    /// Cleared by the manager when this socket is replaced or explicitly
    /// disconnected; a dead connection stops publishing status.
    live: Arc<AtomicBool>,
}

impl Connection {
    pub(crate) fn new(
        key: &str,
        credential: Option<&str>,
        base_url: Url,
        backoff: BackoffConfig,
        shared: Arc<ChannelShared>,
        command_rx: mpsc::Receiver<ConnectionCommand>,
        live: Arc<AtomicBool>,
    ) -> Self {
        Self {
            key: key.to_string(),
            credential: credential.map(str::to_string),
            base_url,
            backoff,
            shared,
            command_rx,
            live,
        }
    }

    /// Run the connection loop (reconnects on failure)
    pub(crate) async fn run(mut self) {
        let url = match endpoint_url(&self.base_url, &self.key) {
            Ok(url) => url,
            Err(e) => {
                error!("[PROJECT-{}] Cannot build endpoint address: {}", self.key, e);
                self.set_status(Status::Disconnected);
                return;
            }
        };

        let mut attempt = 0u32;
        let mut is_first_connect = true;

        loop {
            if !is_first_connect {
                attempt += 1;
                if attempt > self.backoff.max_attempts {
                    error!(
                        "[PROJECT-{}] Max reconnection attempts ({}) reached; channel stays down until connect() is called again",
                        self.key, self.backoff.max_attempts
                    );
                    return;
                }

                let delay = self.backoff.delay_for_attempt(attempt - 1);
                self.shared.metrics.record_reconnect_attempt();
                debug!(
                    "[PROJECT-{}] Reconnecting in {:?} (attempt {})",
                    self.key, delay, attempt
                );

                if !self.wait_for_backoff(delay).await {
                    debug!("[PROJECT-{}] Pending reconnect cancelled", self.key);
                    return;
                }

                self.set_status(Status::Connecting);
            }
            is_first_connect = false;

            let ws = match connect_async(url.as_str()).await {
                Ok((ws, _response)) => ws,
                Err(e) => {
                    self.shared.metrics.record_error();
                    warn!("[PROJECT-{}] Connection attempt failed: {}", self.key, e);
                    self.set_status(Status::Error);
                    self.set_status(Status::Disconnected);
                    continue;
                }
            };

            // Successful open: counters back to their floor
            attempt = 0;
            self.shared.metrics.record_connection();
            info!("[PROJECT-{}] Connected to {}", self.key, url);
            self.set_status(Status::Connected);

            let (mut write, mut read) = ws.split();

            if !self.send_credential(&mut write).await {
                self.set_status(Status::Error);
                self.set_status(Status::Disconnected);
                continue;
            }

            match self.drive(&mut write, &mut read).await {
                SessionEnd::Stopped => {
                    info!("[PROJECT-{}] Connection closed gracefully", self.key);
                    self.set_status(Status::Disconnected);
                    return;
                }
                SessionEnd::Dropped => {
                    self.set_status(Status::Disconnected);
                }
                SessionEnd::Failed => {
                    self.set_status(Status::Error);
                    self.set_status(Status::Disconnected);
                }
            }
        }
    }

    /// Sleep through the backoff window, aborting early on a close command.
    /// Returns `false` if the task should stop.
    async fn wait_for_backoff(&mut self, delay: tokio::time::Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                cmd = self.command_rx.recv() => match cmd {
                    Some(ConnectionCommand::Send(_)) => {
                        self.shared.metrics.record_dropped_send();
                        warn!("[PROJECT-{}] Dropping outbound frame while reconnecting", self.key);
                    }
                    Some(ConnectionCommand::Close) | None => return false,
                },
            }
        }
    }

    /// Send the authentication frame if a credential was supplied.
    /// Returns `false` on a transport failure.
    async fn send_credential(&self, write: &mut SplitSink<WsStream, Message>) -> bool {
        let Some(token) = &self.credential else {
            return true;
        };

        match Frame::authentication(token).to_text() {
            Ok(text) => {
                if let Err(e) = write.send(Message::Text(text)).await {
                    self.shared.metrics.record_error();
                    warn!("[PROJECT-{}] Failed to send authentication frame: {}", self.key, e);
                    return false;
                }
                self.shared.metrics.record_message_sent();
                debug!("[PROJECT-{}] Authentication frame sent", self.key);
                true
            }
            Err(e) => {
                // Unreachable for a well-formed token, but never panic here
                error!("[PROJECT-{}] Cannot serialize authentication frame: {}", self.key, e);
                true
            }
        }
    }

    /// Process socket events and commands until the session ends
    async fn drive(
        &mut self,
        write: &mut SplitSink<WsStream, Message>,
        read: &mut SplitStream<WsStream>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.shared.metrics.record_message_received();
                            self.dispatch(&text);
                        }
                        Some(Ok(Message::Binary(data))) => {
                            self.shared.metrics.record_malformed_frame();
                            warn!(
                                "[PROJECT-{}] Dropping unexpected binary frame ({} bytes)",
                                self.key,
                                data.len()
                            );
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                return SessionEnd::Failed;
                            }
                        }
                        Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                        Some(Ok(Message::Close(_))) => {
                            info!("[PROJECT-{}] Received close frame", self.key);
                            return SessionEnd::Dropped;
                        }
                        Some(Err(e)) => {
                            self.shared.metrics.record_error();
                            warn!("[PROJECT-{}] WebSocket error: {}", self.key, e);
                            return SessionEnd::Failed;
                        }
                        None => {
                            info!("[PROJECT-{}] WebSocket stream ended", self.key);
                            return SessionEnd::Dropped;
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ConnectionCommand::Send(text)) => {
                            if let Err(e) = write.send(Message::Text(text)).await {
                                self.shared.metrics.record_error();
                                warn!("[PROJECT-{}] Failed to send message: {}", self.key, e);
                                return SessionEnd::Failed;
                            }
                            self.shared.metrics.record_message_sent();
                        }
                        Some(ConnectionCommand::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            return SessionEnd::Stopped;
                        }
                    }
                }
            }
        }
    }

    /// Parse an inbound envelope and route it to registered handlers
    fn dispatch(&self, text: &str) {
        match Frame::parse(text) {
            Ok(frame) => {
                let delivered = self.shared.registry.dispatch(&frame);
                if delivered == 0 {
                    trace!(
                        "[PROJECT-{}] No handlers for frame type '{}'",
                        self.key,
                        frame.kind
                    );
                }
            }
            Err(e) => {
                self.shared.metrics.record_malformed_frame();
                warn!("[PROJECT-{}] Dropping malformed frame: {}", self.key, e);
            }
        }
    }

    /// Publish a status transition, unless this socket has been replaced
    fn set_status(&self, status: Status) {
        if self.live.load(Ordering::SeqCst) {
            self.shared.set_status(status);
        }
    }
}
