use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for observability
///
/// Counters track lifetime totals; the two gauges track currently pending
/// timers and let callers (and tests) verify the invariant that at most one
/// reconnect sleep and at most one heartbeat interval exist at any time,
/// and that both are zero after teardown.
///
/// # Example
/// ```ignore
/// let metrics = client.metrics();
/// println!("Connections: {}", metrics.connections());
/// let snapshot = metrics.snapshot();
/// ```
#[derive(Debug, Default)]
pub struct Metrics {
    connections_total: AtomicU64,
    reconnections_total: AtomicU64,
    messages_received_total: AtomicU64,
    messages_sent_total: AtomicU64,
    probes_sent_total: AtomicU64,
    errors_total: AtomicU64,

    pending_reconnects: AtomicU64,
    active_heartbeats: AtomicU64,
}

/// Point-in-time view of all metrics
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    /// Total connections established
    pub connections_total: u64,
    /// Total reconnect attempts scheduled
    pub reconnections_total: u64,
    /// Total inbound frames delivered
    pub messages_received_total: u64,
    /// Total outbound frames transmitted
    pub messages_sent_total: u64,
    /// Total heartbeat probes sent
    pub probes_sent_total: u64,
    /// Total transport-level errors observed
    pub errors_total: u64,
    /// Reconnect sleeps currently pending (0 or 1)
    pub pending_reconnects: u64,
    /// Heartbeat intervals currently running (0 or 1)
    pub active_heartbeats: u64,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total connections established
    pub fn connections(&self) -> u64 {
        self.connections_total.load(Ordering::Relaxed)
    }

    /// Get total reconnect attempts scheduled
    pub fn reconnections(&self) -> u64 {
        self.reconnections_total.load(Ordering::Relaxed)
    }

    /// Get total inbound frames delivered
    pub fn messages_received(&self) -> u64 {
        self.messages_received_total.load(Ordering::Relaxed)
    }

    /// Get total outbound frames transmitted
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent_total.load(Ordering::Relaxed)
    }

    /// Get total heartbeat probes sent
    pub fn probes_sent(&self) -> u64 {
        self.probes_sent_total.load(Ordering::Relaxed)
    }

    /// Get total transport-level errors observed
    pub fn errors(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    /// Get the number of reconnect sleeps currently pending
    pub fn pending_reconnects(&self) -> u64 {
        self.pending_reconnects.load(Ordering::Relaxed)
    }

    /// Get the number of heartbeat intervals currently running
    pub fn active_heartbeats(&self) -> u64 {
        self.active_heartbeats.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections(),
            reconnections_total: self.reconnections(),
            messages_received_total: self.messages_received(),
            messages_sent_total: self.messages_sent(),
            probes_sent_total: self.probes_sent(),
            errors_total: self.errors(),
            pending_reconnects: self.pending_reconnects(),
            active_heartbeats: self.active_heartbeats(),
        }
    }

    pub(crate) fn record_connection(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnection(&self) {
        self.reconnections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_received(&self) {
        self.messages_received_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_sent(&self) {
        self.messages_sent_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_probe(&self) {
        self.probes_sent_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark a reconnect sleep as pending until the returned guard drops
    pub(crate) fn reconnect_pending(&self) -> GaugeGuard<'_> {
        GaugeGuard::raise(&self.pending_reconnects)
    }

    /// Mark a heartbeat interval as active until the returned guard drops
    pub(crate) fn heartbeat_active(&self) -> GaugeGuard<'_> {
        GaugeGuard::raise(&self.active_heartbeats)
    }
}

/// Decrements its gauge on drop.
/// Ensures the gauge falls back to zero on every exit path, including panics.
#[derive(Debug)]
pub(crate) struct GaugeGuard<'a> {
    gauge: &'a AtomicU64,
}

impl<'a> GaugeGuard<'a> {
    fn raise(gauge: &'a AtomicU64) -> Self {
        gauge.fetch_add(1, Ordering::Relaxed);
        Self { gauge }
    }
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_connection();
        metrics.record_connection();
        metrics.record_message_received();
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_total, 2);
        assert_eq!(snapshot.messages_received_total, 1);
        assert_eq!(snapshot.errors_total, 1);
        assert_eq!(snapshot.messages_sent_total, 0);
    }

    #[test]
    fn test_gauge_guard_raises_and_lowers() {
        let metrics = Metrics::new();
        assert_eq!(metrics.pending_reconnects(), 0);

        {
            let _guard = metrics.reconnect_pending();
            assert_eq!(metrics.pending_reconnects(), 1);
        }

        assert_eq!(metrics.pending_reconnects(), 0);
    }

    #[test]
    fn test_gauges_are_independent() {
        let metrics = Metrics::new();
        let _reconnect = metrics.reconnect_pending();
        let _heartbeat = metrics.heartbeat_active();

        assert_eq!(metrics.pending_reconnects(), 1);
        assert_eq!(metrics.active_heartbeats(), 1);
    }
}
