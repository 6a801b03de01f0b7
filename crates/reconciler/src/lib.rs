//! The reconciliation engine of the bridge history tracker.
//!
//! A [`BridgeHistory`] merges the transactions a wallet submitted, the transactions detected as
//! failed and the records of the history backend into a per-wallet ordered log, derives their
//! statuses, estimated times and claim states, and persists the result in a durable store.

pub mod claim;
pub use claim::{batch::BatchClaimState, direct::DirectClaimState, ClaimResult, ClaimState};

mod config;
pub use config::{
    ClaimVariant, ReconcilerConfig, DEFAULT_CLAIM_POLL_INTERVAL, DEFAULT_HISTORY_INTERVAL,
    DEFAULT_UNCONFIRMED_TIMEOUT, DEFAULT_WITHDRAWAL_STATUS_INTERVAL, MANUAL_CLAIM_THRESHOLD,
};

mod engine;
pub use engine::{BridgeHistory, SyncOutcome};

mod error;
pub use error::{ClaimError, ReconcileError};

mod guard;

mod handle;
pub use handle::{BridgeHistoryCommand, BridgeHistoryHandle};

pub mod merge;

mod metrics;

mod page;
pub use page::{EtaView, HistoryEntry, HistoryPage};

mod retry;
pub use retry::WriteRetry;

mod service;
pub use service::{BridgeHistoryService, WatchedPage};
