//! The claim state machine of a batch-proof bridge.

use bridge_history_primitives::{BridgeTransaction, ClaimRecord, ClaimRecordStatus};
use serde::Serialize;

/// The claim state of a withdrawal relayed with a batch proof.
///
/// `NotReady -> Claimable -> Claiming -> {Claimed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchClaimState {
    /// The withdrawal's batch is not finalized yet.
    #[display("NOT_READY")]
    NotReady,
    /// The withdrawal's batch is finalized, the claim can be submitted.
    #[display("CLAIMABLE")]
    Claimable,
    /// A claim was submitted and awaits its outcome.
    #[display("CLAIMING")]
    Claiming,
    /// The withdrawal was claimed.
    #[display("CLAIMED")]
    Claimed,
    /// The withdrawal or its claim failed.
    #[display("FAILED")]
    Failed,
}

impl BatchClaimState {
    /// Derives the claim state of a withdrawal from its merged record, the claim record created
    /// by this client and the last finalized batch index.
    pub fn derive(
        tx: &BridgeTransaction,
        record: Option<&ClaimRecord>,
        last_finalized_batch: Option<u64>,
    ) -> Self {
        if tx.is_assumed_failed() ||
            record.is_some_and(|r| matches!(r.status, ClaimRecordStatus::Failed(_)))
        {
            return Self::Failed
        }
        if tx.counterpart_hash.is_some() || record.is_some_and(ClaimRecord::is_claimed) {
            return Self::Claimed
        }
        if record.is_some_and(ClaimRecord::is_in_flight) {
            return Self::Claiming
        }

        let batch_index = tx.claim_info.as_ref().and_then(|info| info.batch_index);
        match (batch_index, last_finalized_batch) {
            (Some(batch_index), Some(finalized)) if batch_index <= finalized => Self::Claimable,
            _ => Self::NotReady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, TxHash, U256};
    use bridge_history_primitives::{ClaimInfo, FailureReason, TokenInfo, TxDirection};

    fn withdrawal(batch_index: Option<u64>) -> BridgeTransaction {
        let mut tx = BridgeTransaction::submitted(
            TxHash::with_last_byte(1),
            TxDirection::Withdraw,
            U256::from(1),
            TokenInfo::native(),
            0,
        );
        tx.origin_block_number = Some(10);
        tx.claim_info = Some(ClaimInfo {
            from: Address::with_last_byte(1),
            to: Address::with_last_byte(2),
            value: U256::from(1),
            nonce: U256::ZERO,
            message: Bytes::new(),
            batch_index,
            merkle_proof: Bytes::new(),
            finalize_params: None,
            claimable: false,
        });
        tx
    }

    #[test]
    fn test_eligibility_follows_finalized_batch() {
        let tx = withdrawal(Some(5));
        assert_eq!(BatchClaimState::derive(&tx, None, Some(5)), BatchClaimState::Claimable);
        assert_eq!(BatchClaimState::derive(&tx, None, Some(4)), BatchClaimState::NotReady);
        assert_eq!(BatchClaimState::derive(&tx, None, None), BatchClaimState::NotReady);
        assert_eq!(
            BatchClaimState::derive(&withdrawal(None), None, Some(100)),
            BatchClaimState::NotReady
        );
    }

    #[test]
    fn test_claim_record_drives_state() {
        let tx = withdrawal(Some(5));
        let mut record = ClaimRecord::claiming(tx.hash, 0);
        assert_eq!(BatchClaimState::derive(&tx, Some(&record), Some(5)), BatchClaimState::Claiming);

        record.status = ClaimRecordStatus::Claimed;
        assert_eq!(BatchClaimState::derive(&tx, Some(&record), Some(5)), BatchClaimState::Claimed);

        record.status = ClaimRecordStatus::Failed(FailureReason::Reverted);
        assert_eq!(BatchClaimState::derive(&tx, Some(&record), Some(5)), BatchClaimState::Failed);
    }

    #[test]
    fn test_assumed_status_short_circuits() {
        let mut tx = withdrawal(Some(5));
        tx.fail(FailureReason::Unconfirmed);
        assert_eq!(BatchClaimState::derive(&tx, None, Some(5)), BatchClaimState::Failed);
    }

    #[test]
    fn test_counterpart_means_claimed() {
        let mut tx = withdrawal(Some(5));
        tx.counterpart_hash = Some(TxHash::with_last_byte(2));
        assert_eq!(BatchClaimState::derive(&tx, None, Some(1)), BatchClaimState::Claimed);
    }
}
