use crate::error::Error;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::trace;

/// Opens a fresh transport link for each connection attempt.
///
/// The default implementation is [`WsConnector`]; tests and embedders can
/// supply their own to drive the manager without a network.
pub trait Connector: Send + 'static {
    /// The link type produced on a successful connect
    type Link: TransportLink;

    /// Attempt to establish a link to `url`.
    ///
    /// Called once per connection attempt. Any error puts the manager on
    /// the retry path; no error is treated as permanent.
    fn connect(&mut self, url: &str) -> impl Future<Output = Result<Self::Link, Error>> + Send;
}

/// A live duplex text-frame link.
pub trait TransportLink: Send + 'static {
    /// Receive the next inbound text frame.
    ///
    /// `None` means the remote closed the link cleanly; `Some(Err(_))` is a
    /// transport failure. Both put the manager on the retry path.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, Error>>> + Send;

    /// Transmit a text frame
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), Error>> + Send;

    /// Request link shutdown (best effort)
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    /// Create a connector with the given establishment timeout
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for WsConnector {
    type Link = WsLink;

    async fn connect(&mut self, url: &str) -> Result<WsLink, Error> {
        match timeout(self.connect_timeout, connect_async(url)).await {
            Ok(Ok((stream, _response))) => Ok(WsLink { stream }),
            Ok(Err(e)) => Err(Error::WebSocket(e)),
            Err(_) => Err(Error::ConnectTimeout(self.connect_timeout)),
        }
    }
}

/// A live WebSocket connection.
///
/// Only text frames are surfaced; protocol ping/pong is answered by the
/// underlying stream and binary frames are skipped.
#[derive(Debug)]
pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TransportLink for WsLink {
    async fn recv(&mut self) -> Option<Result<String, Error>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    trace!(?frame, "received close frame");
                    return None;
                }
                Ok(other) => {
                    trace!(kind = ?other, "skipping non-text frame");
                }
                Err(e) => return Some(Err(Error::WebSocket(e))),
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), Error> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(Error::WebSocket)
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
