use crate::claim::ClaimState;

use bridge_history_primitives::{
    BridgeTransaction, OrderedIndexEntry, TxDirection, TxPosition, TxStatus,
};
use serde::Serialize;

/// A rendered page of a wallet's history.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    /// The entries of the page, newest first.
    pub transactions: Vec<HistoryEntry>,
    /// The count of entries logged for the wallet, or the count of transfers the backend last
    /// reported for it when larger.
    pub total: u64,
}

impl HistoryPage {
    /// Returns the entry of the provided hash.
    pub fn get(&self, hash: &alloy_primitives::TxHash) -> Option<&HistoryEntry> {
        self.transactions.iter().find(|entry| &entry.transaction.hash == hash)
    }
}

/// A merged transaction with its derived states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// The merged transaction record.
    pub transaction: BridgeTransaction,
    /// The insertion timestamp of the log entry.
    pub timestamp: u64,
    /// The source of the record.
    pub position: TxPosition,
    /// The transfer direction.
    pub direction: TxDirection,
    /// The base status of the transfer.
    pub status: TxStatus,
    /// The estimated completion times of the transfer.
    pub eta: EtaView,
    /// The claim state, for withdrawals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<ClaimState>,
}

impl HistoryEntry {
    pub(crate) fn new(
        entry: OrderedIndexEntry,
        transaction: BridgeTransaction,
        eta: EtaView,
        claim: Option<ClaimState>,
    ) -> Self {
        Self {
            status: TxStatus::derive(&transaction),
            timestamp: entry.timestamp,
            position: entry.position,
            direction: entry.direction,
            eta,
            claim,
            transaction,
        }
    }
}

/// The estimated completion times of a transfer in unix milliseconds. `Some(0)` means the
/// estimate is not trustworthy yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EtaView {
    /// The origin leg estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    /// The destination leg estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
    /// The claim estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<u64>,
}
