use crate::claim::ClaimState;

use alloy_primitives::TxHash;
use bridge_history_providers::ProviderError;
use bridge_history_store::StoreError;

/// An error occurring in the reconciliation engine.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The store could not be loaded or persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The service stopped before answering.
    #[error("bridge history service stopped")]
    ServiceStopped,
}

/// An error occurring while claiming a withdrawal.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// No claim client is configured.
    #[error("claims are disabled, no claim client configured")]
    ClaimsDisabled,
    /// The claim client is connected to another chain than the active network's L1.
    #[error("wrong network: expected chain id {expected}, connected to {actual}")]
    WrongNetwork {
        /// The L1 chain id of the active network.
        expected: u64,
        /// The chain id the claim client is connected to.
        actual: u64,
    },
    /// The hash is not a withdrawal known to the backend.
    #[error("unknown withdrawal {0}")]
    UnknownWithdrawal(TxHash),
    /// The withdrawal is not in a claimable state.
    #[error("withdrawal {hash} is not claimable, current state is {state}")]
    NotClaimable {
        /// The withdrawal hash.
        hash: TxHash,
        /// The current claim state.
        state: ClaimState,
    },
    /// The network was switched while the claim was in progress.
    #[error("network switched during claim of {0}")]
    NetworkSwitched(TxHash),
    /// An error with the claim client.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The claim could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The service stopped before answering.
    #[error("bridge history service stopped")]
    ServiceStopped,
}
