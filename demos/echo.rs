//! Example: keeping a resilient connection to a public echo server.
//!
//! The client connects, sends a JSON payload, and prints every observable
//! state transition. Kill the network to watch the backoff/reconnect cycle.
//!
//! Run with: cargo run --example echo

use std::time::Duration;
use tracing::{info, Level};
use ws_relink::{Client, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let config = ClientConfig::builder()
        .url("wss://echo.websocket.org")
        .heartbeat_interval(Duration::from_secs(15))
        .initial_backoff(Duration::from_millis(500))
        .max_backoff(Duration::from_secs(5))
        .build()?;

    let client = Client::connect(config);
    let mut status = client.status_stream();

    status.wait_for(|s| s.is_open).await?;
    info!("connected");

    client.send_json(&serde_json::json!({ "hello": "world" }));

    for _ in 0..10 {
        status.changed().await?;
        let snapshot = status.borrow().clone();
        info!(
            open = snapshot.is_open,
            message = ?snapshot.last_message,
            error = ?snapshot.last_error,
            "status update"
        );
    }

    let metrics = client.metrics().snapshot();
    info!(
        connections = metrics.connections_total,
        received = metrics.messages_received_total,
        probes = metrics.probes_sent_total,
        "shutting down"
    );

    client.close();
    Ok(())
}
