//! # ws-relink
//!
//! A resilient client-side WebSocket connection manager with auto-reconnection
//! and heartbeats.
//!
//! ## Features
//!
//! - **Auto-reconnection** with exponential backoff, clamped to a maximum delay
//!   and reset on every successful open
//! - **Heartbeat probes** (`{"type":"ping","t":<millis>}`) at a configurable
//!   interval while connected
//! - **Observable state** - open flag, last decoded message, last error -
//!   published after every committed transition
//! - **Non-blocking send/close** that never fault the caller
//! - **Pluggable transport** for driving the manager without a network
//! - **Metrics** for observability, including pending-timer gauges
//!
//! ## Example
//!
//! ```ignore
//! use ws_relink::{Client, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .url("wss://example.com/feed")
//!     .heartbeat_interval(std::time::Duration::from_secs(15))
//!     .build()?;
//!
//! let client = Client::connect(config);
//!
//! let mut status = client.status_stream();
//! status.wait_for(|s| s.is_open).await?;
//! client.send_json(&serde_json::json!({ "op": "subscribe" }));
//! ```

mod client;
mod config;
mod connection;
mod error;
mod metrics;
mod transport;

pub use client::Client;
pub use config::{BackoffConfig, ClientConfig, ClientConfigBuilder, ConfigError};
pub use connection::{Inbound, Phase, Status};
pub use error::Error;
pub use metrics::{Metrics, MetricsSnapshot};
pub use transport::{Connector, TransportLink, WsConnector, WsLink};
