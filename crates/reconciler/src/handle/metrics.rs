use metrics::Counter;
use metrics_derive::Metrics;

/// The metrics for the [`super::BridgeHistoryHandle`].
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_history_handle")]
pub(crate) struct HandleMetrics {
    /// Failed to send command to the bridge history service from handle counter.
    pub(crate) handle_send_command_failed: Counter,
}
