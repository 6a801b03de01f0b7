//! The claim state machine of a direct-finalization bridge.

use alloy_primitives::U256;
use bridge_history_primitives::{BridgeTransaction, ClaimRecord, ClaimRecordStatus};
use serde::Serialize;

/// The claim state of a withdrawal finalized directly on the bridge.
///
/// `Pending -> Claimable -> Claimed -> Success`, plus `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum DirectClaimState {
    /// The withdrawal is not verified yet, or awaits automatic finalization.
    #[display("pending")]
    Pending,
    /// The withdrawal is verified and must be finalized manually.
    #[display("claimable")]
    Claimable,
    /// The withdrawal was finalized by this client.
    #[display("claimed")]
    Claimed,
    /// The finalization was indexed by the backend.
    #[display("success")]
    Success,
    /// The withdrawal or its finalization failed.
    #[display("failed")]
    Failed,
}

/// Returns true if the withdrawal is not swept automatically and must be finalized manually.
///
/// Only native-asset withdrawals below `threshold` require a manual claim.
pub fn requires_manual_claim(tx: &BridgeTransaction, threshold: U256) -> bool {
    !tx.origin_is_l1 && tx.token.is_native() && tx.amount < threshold
}

impl DirectClaimState {
    /// Derives the claim state of a withdrawal from its merged record, the claim record created
    /// by this client and its verified status on L2.
    pub fn derive(
        tx: &BridgeTransaction,
        record: Option<&ClaimRecord>,
        verified: bool,
        manual_claim_threshold: U256,
    ) -> Self {
        if tx.is_assumed_failed() ||
            record.is_some_and(|r| matches!(r.status, ClaimRecordStatus::Failed(_)))
        {
            return Self::Failed
        }
        if tx.counterpart_hash.is_some() {
            return Self::Success
        }
        if record.is_some() {
            return Self::Claimed
        }
        if verified && requires_manual_claim(tx, manual_claim_threshold) {
            return Self::Claimable
        }
        Self::Pending
    }
}
