use crate::config::ClientConfig;
use crate::error::Error;
use crate::metrics::Metrics;
use crate::transport::{Connector, TransportLink};
use std::future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Commands sent from the client handle to the connection task
#[derive(Debug)]
pub(crate) enum Command {
    /// Transmit a pre-serialized text frame
    Send(String),
    /// Tear the manager down
    Close,
}

/// Lifecycle phase of the connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Constructed, no attempt made yet
    #[default]
    Idle,
    /// A connection attempt is in flight
    Connecting,
    /// The link is established
    Open,
    /// Disconnected, a reconnect is scheduled
    Retrying,
    /// Torn down; no further transitions occur
    Terminated,
}

/// An inbound frame, decoded as JSON when possible.
///
/// Frames that fail to parse are surfaced verbatim instead of being dropped
/// or reported as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Frame parsed as structured data
    Json(serde_json::Value),
    /// Frame that was not valid JSON, passed through as-is
    Text(String),
}

impl Inbound {
    fn decode(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Inbound::Json(value),
            Err(_) => Inbound::Text(text),
        }
    }
}

/// Observable connection state.
///
/// Published through a watch channel after every committed transition;
/// consumers never observe intermediate states.
#[derive(Debug, Clone, Default)]
pub struct Status {
    /// Current lifecycle phase
    pub phase: Phase,
    /// Whether the link is currently open
    pub is_open: bool,
    /// Most recent inbound frame, including echoed probes
    pub last_message: Option<Inbound>,
    /// Most recent transport-level error; cleared on every successful open
    pub last_error: Option<Arc<Error>>,
}

/// Outcome of driving an open link
enum LinkExit {
    /// Teardown was requested; do not reconnect
    Stopped,
    /// The link dropped; reconnect after backoff
    Dropped(Option<Error>),
}

/// The connection task: owns the link, both timers, and the backoff counter.
///
/// All state transitions happen on this single task; the handle communicates
/// through the command channel and observes through the watch channel.
pub(crate) struct ConnectionTask<C: Connector> {
    connector: C,
    config: ClientConfig,
    metrics: Arc<Metrics>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<Status>,
}

impl<C: Connector> ConnectionTask<C> {
    pub(crate) fn new(
        connector: C,
        config: ClientConfig,
        metrics: Arc<Metrics>,
        command_rx: mpsc::UnboundedReceiver<Command>,
        status_tx: watch::Sender<Status>,
    ) -> Self {
        Self {
            connector,
            config,
            metrics,
            command_rx,
            status_tx,
        }
    }

    /// Run the reconnect loop until teardown.
    ///
    /// The loop structure guarantees at most one attempt, one open link, and
    /// one pending reconnect sleep at any time. Every disconnect is treated
    /// as retryable; only an explicit close (or the handle being dropped)
    /// ends the loop.
    pub(crate) async fn run(mut self) {
        info!(url = %self.config.url, "starting connection manager");
        let mut attempt = 0u32;

        loop {
            self.status_tx.send_modify(|s| s.phase = Phase::Connecting);

            match self.connector.connect(&self.config.url).await {
                Ok(link) => {
                    attempt = 0;
                    self.metrics.record_connection();
                    info!(url = %self.config.url, "connected");
                    self.status_tx.send_modify(|s| {
                        s.phase = Phase::Open;
                        s.is_open = true;
                        s.last_error = None;
                    });

                    // The phase flip and the open flag commit in one watch
                    // update so no reader sees a half-applied transition.
                    match self.drive_open(link).await {
                        LinkExit::Stopped => break,
                        LinkExit::Dropped(error) => {
                            self.status_tx.send_modify(|s| {
                                s.phase = Phase::Retrying;
                                s.is_open = false;
                                if let Some(e) = error {
                                    s.last_error = Some(Arc::new(e));
                                }
                            });
                        }
                    }
                }
                Err(error) => {
                    warn!(%error, "connection attempt failed");
                    self.metrics.record_error();
                    self.status_tx.send_modify(|s| {
                        s.phase = Phase::Retrying;
                        s.last_error = Some(Arc::new(error));
                    });
                }
            }

            let delay = self.config.backoff.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            self.metrics.record_reconnection();
            debug!(?delay, attempt, "scheduling reconnect");

            if self.wait_for_retry(delay).await {
                break;
            }
        }

        self.status_tx.send_modify(|s| {
            s.phase = Phase::Terminated;
            s.is_open = false;
        });
        info!("connection manager terminated");
    }

    /// Drive an open link until it drops or teardown is requested
    async fn drive_open(&mut self, mut link: C::Link) -> LinkExit {
        let metrics = Arc::clone(&self.metrics);
        let status_tx = self.status_tx.clone();
        let command_rx = &mut self.command_rx;

        let mut heartbeat = heartbeat_timer(self.config.heartbeat_interval);
        let _heartbeat_active = if heartbeat.is_some() {
            Some(metrics.heartbeat_active())
        } else {
            None
        };

        loop {
            tokio::select! {
                frame = link.recv() => match frame {
                    Some(Ok(text)) => {
                        metrics.record_message_received();
                        trace!(bytes = text.len(), "inbound frame");
                        let inbound = Inbound::decode(text);
                        status_tx.send_modify(|s| s.last_message = Some(inbound));
                    }
                    Some(Err(error)) => {
                        warn!(%error, "transport error");
                        metrics.record_error();
                        link.close().await;
                        return LinkExit::Dropped(Some(error));
                    }
                    None => {
                        info!("remote closed the connection");
                        return LinkExit::Dropped(None);
                    }
                },

                cmd = command_rx.recv() => match cmd {
                    Some(Command::Send(text)) => match link.send(text).await {
                        Ok(()) => metrics.record_message_sent(),
                        // The link's own close/error event drives the
                        // state transition, not a failed write.
                        Err(error) => debug!(%error, "outbound send failed"),
                    },
                    Some(Command::Close) | None => {
                        link.close().await;
                        return LinkExit::Stopped;
                    }
                },

                () = next_probe(&mut heartbeat) => {
                    let probe = serde_json::json!({
                        "type": "ping",
                        "t": unix_millis(),
                    })
                    .to_string();
                    match link.send(probe).await {
                        Ok(()) => {
                            metrics.record_probe();
                            trace!("heartbeat probe sent");
                        }
                        // Best effort; a dead link reports through recv.
                        Err(error) => debug!(%error, "heartbeat probe failed"),
                    }
                }
            }
        }
    }

    /// Sleep out the backoff delay.
    ///
    /// Returns `true` if teardown was requested while waiting. Outbound
    /// messages arriving in this window are dropped.
    async fn wait_for_retry(&mut self, delay: Duration) -> bool {
        let metrics = Arc::clone(&self.metrics);
        let _pending = metrics.reconnect_pending();

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return false,
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Send(_)) => {
                        trace!("dropping outbound message while disconnected");
                    }
                    Some(Command::Close) | None => return true,
                }
            }
        }
    }
}

/// Build the heartbeat interval, or `None` when disabled.
///
/// The first tick fires one full period after open, not immediately.
fn heartbeat_timer(period: Duration) -> Option<Interval> {
    if period == Duration::ZERO {
        return None;
    }
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(timer)
}

async fn next_probe(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(timer) => {
            timer.tick().await;
        }
        None => future::pending().await,
    }
}

/// Current time in millis since the Unix epoch
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
