//! Example: Subscribing to a project dashboard's event stream
//!
//! Connects to a local dashboard server, prints comment and task events
//! as they arrive, and mirrors channel status transitions to the log.
//!
//! Run with: cargo run --example dashboard

use serde::Deserialize;
use std::time::Duration;
use tracing::{info, Level};
use ws_event_channel::{ChannelConfig, ChannelManager, Frame};

#[derive(Debug, Deserialize)]
struct CommentEvent {
    id: u64,
    author: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct TaskEvent {
    id: u64,
    title: String,
    done: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let config = ChannelConfig::builder()
        .base_url("http://127.0.0.1:8080")
        .build()?;
    let manager = ChannelManager::new(config);

    manager.on_status_change(|status| {
        info!("Channel status: {}", status);
    });

    manager.subscribe("comment", |event: CommentEvent| {
        info!("comment #{} from {}: {}", event.id, event.author, event.body);
    });
    manager.subscribe("task", |event: TaskEvent| {
        let mark = if event.done { "x" } else { " " };
        info!("task #{} [{}] {}", event.id, mark, event.title);
    });

    // Project 42, authenticating with a demo token
    manager.connect("42", Some("demo-token")).await;

    // Give the channel a moment to open, then post a comment back
    tokio::time::sleep(Duration::from_secs(2)).await;
    manager.send(&Frame::new(
        "comment",
        serde_json::json!({"body": "hello from the event channel"}),
    ));

    tokio::time::sleep(Duration::from_secs(30)).await;

    let snapshot = manager.metrics().snapshot();
    info!(
        "Received {} messages over {} connections",
        snapshot.messages_received_total, snapshot.connections_total
    );

    manager.disconnect().await;
    Ok(())
}
