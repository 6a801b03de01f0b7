use crate::ClaimInfo;
use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// The direction of a bridge transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxDirection {
    /// L1 to L2.
    #[display("DEPOSIT")]
    Deposit,
    /// L2 to L1.
    #[display("WITHDRAW")]
    Withdraw,
}

impl TxDirection {
    /// Returns the direction for a transfer originating on the given chain.
    pub const fn from_origin(origin_is_l1: bool) -> Self {
        if origin_is_l1 {
            Self::Deposit
        } else {
            Self::Withdraw
        }
    }
}

/// The source a log entry currently resolves from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxPosition {
    /// Optimistically recorded on submission, not yet indexed.
    #[display("FRONTEND")]
    Frontend,
    /// Locally detected failure.
    #[display("ABNORMAL")]
    Abnormal,
    /// Confirmed by the indexer.
    #[display("BACKEND")]
    Backend,
}

/// A terminal status assumed by the client when the chain provides no further signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssumedStatus {
    /// The transaction failed.
    Failed,
    /// The transaction was cancelled by a replacement reusing its nonce.
    Cancelled,
}

/// Why a transaction was assumed failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The chain executed the transaction and it reverted.
    #[display("transaction reverted")]
    Reverted,
    /// The nonce was consumed by an unrelated transaction.
    #[display("transaction cancelled")]
    Cancelled,
    /// No confirmation was observed within the unconfirmed timeout.
    #[display("transaction not confirmed in time")]
    Unconfirmed,
}

/// The token transferred by a bridge transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The token address on the origin chain, [`Address::ZERO`] for the native asset.
    pub address: Address,
    /// The token symbol.
    pub symbol: String,
    /// The token decimals.
    pub decimals: u8,
}

impl TokenInfo {
    /// Returns the native asset token info.
    pub fn native() -> Self {
        Self { address: Address::ZERO, symbol: "ETH".to_owned(), decimals: 18 }
    }

    /// Returns true if the token is the native asset.
    pub fn is_native(&self) -> bool {
        self.address.is_zero()
    }
}

/// A bridge transfer as tracked by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTransaction {
    /// The hash of the origin leg. Unique per network.
    pub hash: TxHash,
    /// The hash of the destination leg, set once it has been observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterpart_hash: Option<TxHash>,
    /// Whether the origin leg was submitted on L1.
    pub origin_is_l1: bool,
    /// The transferred amount in the token's smallest unit.
    pub amount: U256,
    /// The transferred token.
    pub token: TokenInfo,
    /// The block the origin leg was included in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_block_number: Option<u64>,
    /// The block the destination leg was included in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterpart_block_number: Option<u64>,
    /// When the transfer was initiated, in unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_at: Option<u64>,
    /// When the transfer was finalized, in unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<u64>,
    /// The proof material for the destination leg of a withdrawal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_info: Option<ClaimInfo>,
    /// A client-side terminal override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumed_status: Option<AssumedStatus>,
    /// The reason behind the assumed status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    /// A human readable error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BridgeTransaction {
    /// Returns a freshly submitted transaction with only the origin leg known.
    pub fn submitted(
        hash: TxHash,
        direction: TxDirection,
        amount: U256,
        token: TokenInfo,
        initiated_at: u64,
    ) -> Self {
        Self {
            hash,
            counterpart_hash: None,
            origin_is_l1: direction == TxDirection::Deposit,
            amount,
            token,
            origin_block_number: None,
            counterpart_block_number: None,
            initiated_at: Some(initiated_at),
            finalized_at: None,
            claim_info: None,
            assumed_status: None,
            failure_reason: None,
            error_message: None,
        }
    }

    /// Returns the direction of the transfer.
    pub const fn direction(&self) -> TxDirection {
        TxDirection::from_origin(self.origin_is_l1)
    }

    /// Stamps the transaction with a terminal failure.
    pub fn fail(&mut self, reason: FailureReason) {
        self.assumed_status = Some(match reason {
            FailureReason::Cancelled => AssumedStatus::Cancelled,
            FailureReason::Reverted | FailureReason::Unconfirmed => AssumedStatus::Failed,
        });
        self.failure_reason = Some(reason);
        self.error_message = Some(reason.to_string());
    }

    /// Returns true if the client has assumed a terminal failure for the transaction.
    pub const fn is_assumed_failed(&self) -> bool {
        self.assumed_status.is_some()
    }
}

/// An entry of a wallet's ordered log. Pagination follows `timestamp` descending.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedIndexEntry {
    /// The origin leg hash.
    pub hash: TxHash,
    /// The ordering timestamp, in unix milliseconds.
    pub timestamp: u64,
    /// The source the entry resolves from.
    pub position: TxPosition,
    /// The transfer direction.
    pub direction: TxDirection,
}

impl OrderedIndexEntry {
    /// Returns a new [`OrderedIndexEntry`].
    pub const fn new(
        hash: TxHash,
        timestamp: u64,
        position: TxPosition,
        direction: TxDirection,
    ) -> Self {
        Self { hash, timestamp, position, direction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_serializes_uppercase() {
        let entry = OrderedIndexEntry::new(
            TxHash::with_last_byte(1),
            10,
            TxPosition::Frontend,
            TxDirection::Deposit,
        );
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["position"], "FRONTEND");
        assert_eq!(json["direction"], "DEPOSIT");
    }

    #[test]
    fn test_fail_maps_cancelled() {
        let mut tx = BridgeTransaction::submitted(
            TxHash::with_last_byte(1),
            TxDirection::Withdraw,
            U256::from(1),
            TokenInfo::native(),
            0,
        );
        tx.fail(FailureReason::Cancelled);
        assert_eq!(tx.assumed_status, Some(AssumedStatus::Cancelled));

        tx.fail(FailureReason::Unconfirmed);
        assert_eq!(tx.assumed_status, Some(AssumedStatus::Failed));
        assert_eq!(tx.failure_reason, Some(FailureReason::Unconfirmed));
    }
}
