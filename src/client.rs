use crate::config::ClientConfig;
use crate::connection::{Command, ConnectionTask, Status};
use crate::metrics::Metrics;
use crate::transport::{Connector, WsConnector};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::trace;

/// Handle to a resilient WebSocket connection.
///
/// Construction starts the connection: a background task owns the link, the
/// heartbeat timer, and the reconnect loop, and keeps retrying with
/// exponential backoff until [`close`](Client::close) is called or the last
/// handle is dropped. Restarting after teardown means constructing a new
/// client, the same as switching endpoints.
///
/// All methods are synchronous and non-blocking; observable state is read
/// through [`status`](Client::status) or awaited through
/// [`status_stream`](Client::status_stream).
#[derive(Debug, Clone)]
pub struct Client {
    command_tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<Status>,
    metrics: Arc<Metrics>,
}

impl Client {
    /// Connect to `config.url` over WebSocket.
    ///
    /// Must be called within a tokio runtime.
    pub fn connect(config: ClientConfig) -> Self {
        let connector = WsConnector::new(config.connect_timeout);
        Self::connect_with(config, connector)
    }

    /// Connect using a custom [`Connector`].
    ///
    /// Lets tests and embedders drive the manager over a non-network
    /// transport. Must be called within a tokio runtime.
    pub fn connect_with<C: Connector>(config: ClientConfig, connector: C) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(Status::default());
        let metrics = Arc::new(Metrics::new());

        let task = ConnectionTask::new(
            connector,
            config,
            Arc::clone(&metrics),
            command_rx,
            status_tx,
        );
        tokio::spawn(task.run());

        Self {
            command_tx,
            status_rx,
            metrics,
        }
    }

    /// Whether the link is currently open
    pub fn is_open(&self) -> bool {
        self.status_rx.borrow().is_open
    }

    /// Snapshot of the current observable state
    pub fn status(&self) -> Status {
        self.status_rx.borrow().clone()
    }

    /// Receiver that observes every committed state transition.
    ///
    /// Useful with `wait_for` to await a particular phase or message.
    pub fn status_stream(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Get the metrics for this client
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Transmit a pre-serialized text payload.
    ///
    /// Returns `false` without transmitting anything when the link is not
    /// open; messages are never queued across reconnects.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        if !self.is_open() {
            trace!("send while disconnected, dropping payload");
            return false;
        }
        self.command_tx.send(Command::Send(text.into())).is_ok()
    }

    /// Serialize `payload` as JSON and transmit it as one text frame.
    ///
    /// Returns `false` when the link is not open or serialization fails;
    /// the failure reason is not reported through any side channel.
    pub fn send_json<T: Serialize>(&self, payload: &T) -> bool {
        if !self.is_open() {
            trace!("send while disconnected, dropping payload");
            return false;
        }
        let Ok(text) = serde_json::to_string(payload) else {
            return false;
        };
        self.command_tx.send(Command::Send(text)).is_ok()
    }

    /// Tear the connection down.
    ///
    /// Idempotent and safe to call from any state: cancels any pending
    /// reconnect, stops the heartbeat, closes the link, and moves the
    /// manager to its terminal phase. Dropping the last handle has the
    /// same effect.
    pub fn close(&self) {
        // After termination the channel is gone; the failed send is the no-op.
        let _ = self.command_tx.send(Command::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Phase;
    use crate::error::Error;
    use crate::transport::TransportLink;
    use std::time::Duration;

    /// Connector that refuses every attempt
    struct Refuser;

    struct NeverLink;

    impl TransportLink for NeverLink {
        async fn recv(&mut self) -> Option<Result<String, Error>> {
            None
        }

        async fn send(&mut self, _text: String) -> Result<(), Error> {
            Ok(())
        }

        async fn close(&mut self) {}
    }

    impl Connector for Refuser {
        type Link = NeverLink;

        async fn connect(&mut self, _url: &str) -> Result<NeverLink, Error> {
            Err(Error::Transport("refused".to_string()))
        }
    }

    /// Connector whose link accepts writes and never delivers anything
    struct AcceptingConnector;

    struct IdleLink;

    impl TransportLink for IdleLink {
        async fn recv(&mut self) -> Option<Result<String, Error>> {
            std::future::pending().await
        }

        async fn send(&mut self, _text: String) -> Result<(), Error> {
            Ok(())
        }

        async fn close(&mut self) {}
    }

    impl Connector for AcceptingConnector {
        type Link = IdleLink;

        async fn connect(&mut self, _url: &str) -> Result<IdleLink, Error> {
            Ok(IdleLink)
        }
    }

    /// Payload whose `Serialize` impl always errors
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            use serde::ser::Error as _;
            Err(S::Error::custom("refuses to serialize"))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .url("ws://localhost:9")
            .initial_backoff(Duration::from_millis(500))
            .max_backoff(Duration::from_millis(5_000))
            .build()
            .expect("valid config")
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_disconnected_returns_false() {
        let client = Client::connect_with(config(), Refuser);
        let mut status = client.status_stream();
        status.wait_for(|s| s.phase == Phase::Retrying).await.unwrap();

        assert!(!client.send_text("hello"));
        assert!(!client.send_json(&serde_json::json!({"op": "noop"})));
        assert_eq!(client.metrics().messages_sent(), 0);

        client.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_json_serialization_failure_returns_false() {
        let client = Client::connect_with(config(), AcceptingConnector);
        let mut status = client.status_stream();
        status.wait_for(|s| s.is_open).await.unwrap();

        assert!(!client.send_json(&Unserializable));
        tokio::task::yield_now().await;
        assert_eq!(client.metrics().messages_sent(), 0);

        client.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_status_is_closed_and_empty() {
        let client = Client::connect_with(config(), Refuser);
        let status = client.status();

        assert!(!status.is_open);
        assert!(status.last_message.is_none());

        client.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_establishment_failure_surfaces_last_error() {
        let client = Client::connect_with(config(), Refuser);
        let mut status = client.status_stream();

        status.wait_for(|s| s.last_error.is_some()).await.unwrap();
        assert!(matches!(
            status.borrow().last_error.as_deref(),
            Some(Error::Transport(_))
        ));
        assert!(!status.borrow().is_open);

        client.close();
    }
}
