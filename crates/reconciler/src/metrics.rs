use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`crate::BridgeHistory`] passes.
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_history_reconciler")]
pub(crate) struct ReconcilerMetrics {
    /// The count of completed passes.
    pub(crate) passes: Counter,
    /// The count of passes skipped because another pass was in flight.
    pub(crate) skipped_passes: Counter,
    /// The count of entries promoted to the backend position.
    pub(crate) promotions: Counter,
    /// The count of entries demoted to the abnormal position.
    pub(crate) demotions: Counter,
    /// The count of optimistic transactions assumed failed after the unconfirmed timeout.
    pub(crate) timeouts: Counter,
    /// The count of logged hashes no source resolved.
    pub(crate) unresolved_hashes: Counter,
    /// The count of failed snapshot writes.
    pub(crate) persist_failures: Counter,
    /// Time (ms) of a pass.
    #[metric(describe = "Time of a reconciliation pass (ms)")]
    pub(crate) pass_duration: Histogram,
}

/// The metrics for the claim state machines.
#[derive(Metrics, Clone)]
#[metrics(scope = "bridge_history_claim")]
pub(crate) struct ClaimMetrics {
    /// The count of submitted claims.
    pub(crate) submitted: Counter,
    /// The count of successful claims.
    pub(crate) succeeded: Counter,
    /// The count of failed claims.
    pub(crate) failed: Counter,
    /// The count of claims found already finalized.
    pub(crate) already_finalized: Counter,
    /// The count of replaced claims.
    pub(crate) replaced: Counter,
}
