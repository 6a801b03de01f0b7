use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`super::Database`].
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_history_db")]
pub(crate) struct DatabaseMetrics {
    /// The count of snapshot writes.
    pub(crate) snapshot_writes: Counter,
    /// Time (ms) to write a snapshot.
    #[metric(describe = "Time to write a snapshot (ms)")]
    pub(crate) snapshot_write_duration: Histogram,
}
