use crate::{AssumedStatus, BridgeTransaction, FailureReason};
use serde::{Deserialize, Serialize};

/// The base status of a transfer, derived from its merged record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// The origin leg has been submitted but not observed in a block.
    Pending,
    /// The origin leg is included, the destination leg has not been observed.
    OriginConfirmed,
    /// Both legs have been observed.
    Completed,
    /// The transfer failed.
    Failed(FailureReason),
}

impl TxStatus {
    /// Derives the status of the provided transaction.
    pub fn derive(tx: &BridgeTransaction) -> Self {
        if let Some(assumed) = tx.assumed_status {
            let reason = tx.failure_reason.unwrap_or(match assumed {
                AssumedStatus::Cancelled => FailureReason::Cancelled,
                AssumedStatus::Failed => FailureReason::Reverted,
            });
            return Self::Failed(reason)
        }
        if tx.counterpart_hash.is_some() {
            return Self::Completed
        }
        if tx.origin_block_number.is_some() {
            return Self::OriginConfirmed
        }
        Self::Pending
    }

    /// Returns true if the status is terminal.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}
