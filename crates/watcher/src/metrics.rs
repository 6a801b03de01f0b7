use metrics::Counter;
use metrics_derive::Metrics;

/// The metrics for the [`super::ChainWatcher`].
#[derive(Metrics)]
#[metrics(scope = "bridge_history_watcher")]
pub struct WatcherMetrics {
    /// A counter on the block height refreshes.
    pub height_refreshes: Counter,
    /// A counter on the finalized batch refreshes.
    pub finality_refreshes: Counter,
    /// A counter on the failed refreshes.
    pub refresh_failures: Counter,
}
