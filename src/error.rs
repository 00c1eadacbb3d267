use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the connection manager.
///
/// Every variant is retryable: the manager reacts to all of them by
/// scheduling a reconnect, never by giving up. The most recent transport
/// error is published through [`Status`](crate::Status) so consumers can
/// display it, but nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    /// WebSocket protocol or I/O error from the underlying stream
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection attempt did not complete within the configured timeout
    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Failure reported by a custom transport implementation
    #[error("transport failure: {0}")]
    Transport(String),
}
