use metrics::Counter;
use metrics_derive::Metrics;

/// The metrics for the history fetcher.
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_history_providers")]
pub(crate) struct HistoryFetcherMetrics {
    /// The count of records returned by the backend.
    pub(crate) fetched_records: Counter,
    /// The count of hash chunks that failed.
    pub(crate) failed_chunks: Counter,
}
