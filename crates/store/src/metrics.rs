use metrics::{Counter, Gauge};
use metrics_derive::Metrics;

/// The metrics for the [`super::BridgeStore`].
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_history_store")]
pub(crate) struct StoreMetrics {
    /// The count of log entries appended.
    pub(crate) appends: Counter,
    /// The count of log entries evicted.
    pub(crate) evictions: Counter,
    /// The total count of log entries across wallets.
    pub(crate) entries: Gauge,
}
