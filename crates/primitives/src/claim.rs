use crate::FailureReason;
use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use serde::{Deserialize, Serialize};

/// The proof material required to submit the destination leg of a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInfo {
    /// The message sender on L2.
    pub from: Address,
    /// The message target on L1.
    pub to: Address,
    /// The message value.
    pub value: U256,
    /// The message nonce.
    pub nonce: U256,
    /// The message calldata.
    pub message: Bytes,
    /// The index of the batch containing the withdrawal, once committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_index: Option<u64>,
    /// The withdrawal merkle proof against the batch withdraw root.
    #[serde(default)]
    pub merkle_proof: Bytes,
    /// The parameters of a direct finalization, for bridges finalizing per withdrawal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalize_params: Option<FinalizeParams>,
    /// Whether the indexer reports the withdrawal as claimable.
    #[serde(default)]
    pub claimable: bool,
}

/// The parameters used by `finalizeWithdrawal` on a direct-finalization bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeParams {
    /// The L2 batch number of the withdrawal.
    pub l2_batch_number: u64,
    /// The index of the L2 to L1 message inside the batch.
    pub l2_message_index: u64,
    /// The position of the transaction inside the batch.
    pub l2_tx_number_in_batch: u16,
    /// The merkle proof of the message.
    pub merkle_proof: Vec<B256>,
}

/// The local status of a claim submitted by this client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRecordStatus {
    /// The claim has been submitted and awaits its receipt.
    Claiming,
    /// The claim was confirmed on the destination chain.
    Claimed,
    /// The claim failed.
    Failed(FailureReason),
}

/// A claim created by this client. Retained after success so a reload never resubmits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// The origin leg hash of the claimed withdrawal.
    pub hash: TxHash,
    /// The hash of the claim transaction, once submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_hash: Option<TxHash>,
    /// The claim status.
    pub status: ClaimRecordStatus,
    /// When the claim was submitted, in unix milliseconds.
    pub submitted_at: u64,
}

impl ClaimRecord {
    /// Returns a new in-flight [`ClaimRecord`].
    pub const fn claiming(hash: TxHash, submitted_at: u64) -> Self {
        Self { hash, claim_hash: None, status: ClaimRecordStatus::Claiming, submitted_at }
    }

    /// Returns true if the claim was confirmed.
    pub const fn is_claimed(&self) -> bool {
        matches!(self.status, ClaimRecordStatus::Claimed)
    }

    /// Returns true if the claim is awaiting its outcome.
    pub const fn is_in_flight(&self) -> bool {
        matches!(self.status, ClaimRecordStatus::Claiming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_record_json() {
        let mut record = ClaimRecord::claiming(TxHash::with_last_byte(7), 42);
        record.status = ClaimRecordStatus::Failed(FailureReason::Reverted);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"]["failed"], "reverted");

        let decoded: ClaimRecord = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, record);
    }
}
