//! The crate exposes the external collaborators consumed by the bridge history tracker: block
//! height and finality oracles, the backend history fetcher and the claim clients.

pub use claim::{
    ClaimClient, ClaimOutcome, DirectFinalizationClaimClient, MessengerClaimClient,
    SubmittedClaim, DEFAULT_REPLACEMENT_SCAN_DEPTH,
};
mod claim;

pub use error::ProviderError;
mod error;

pub use finality::{
    FinalityOracle, L2FinalizedStatusOracle, RollupFinalityOracle, WithdrawalStatusOracle,
};
mod finality;

pub use heights::{AlloyBlockHeightOracle, BlockHeightOracle};
mod heights;

pub use history::{
    clip_amount, BridgeRecord, ChunkFailure, FetchOutcome, HistoryFetcher, HttpHistoryFetcher,
    WalletHistory, DEFAULT_CHUNK_SIZE,
};
mod history;

mod metrics;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;
