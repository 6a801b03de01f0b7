//! The persisted layout of a [`crate::BridgeStore`] and its migrations.

use crate::StoreError;

use alloy_primitives::{Address, TxHash, U256};
use bridge_history_primitives::{
    AssumedStatus, BridgeTransaction, ClaimRecord, EtaKey, FailureReason, OrderedIndexEntry,
    TokenInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The current schema version of the persisted state.
pub const SCHEMA_VERSION: u64 = 2;

/// The version assigned to unversioned snapshots.
const LEGACY_VERSION: u64 = 1;

/// The ordered log of one wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletLog {
    /// The wallet.
    pub wallet: Address,
    /// The log entries, newest first.
    pub entries: Vec<OrderedIndexEntry>,
}

/// The persisted state of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// The schema version.
    pub version: u64,
    /// The per-wallet ordered logs.
    #[serde(default)]
    pub ordered_index: Vec<WalletLog>,
    /// The optimistic transactions, not yet indexed by the backend.
    #[serde(default)]
    pub frontend_transactions: Vec<BridgeTransaction>,
    /// The locally detected failures.
    #[serde(default)]
    pub abnormal_transactions: Vec<BridgeTransaction>,
    /// The estimated times, keyed by scoped key.
    #[serde(default)]
    pub estimated_time_map: BTreeMap<String, u64>,
    /// The claims created by this client.
    #[serde(default)]
    pub claim_records: Vec<ClaimRecord>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            ordered_index: Vec::new(),
            frontend_transactions: Vec::new(),
            abnormal_transactions: Vec::new(),
            estimated_time_map: BTreeMap::new(),
            claim_records: Vec::new(),
        }
    }
}

/// Upgrades a persisted payload of any supported version to the current [`PersistedState`].
///
/// Payloads without a `version` field are the legacy unversioned layout.
pub fn migrate(value: Value) -> Result<PersistedState, StoreError> {
    let version = value.get("version").and_then(Value::as_u64).unwrap_or(LEGACY_VERSION);
    if version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion { found: version, supported: SCHEMA_VERSION })
    }
    if version == SCHEMA_VERSION {
        return Ok(serde_json::from_value(value)?)
    }

    tracing::info!(target: "bridge_history::store", from = version, to = SCHEMA_VERSION, "migrating persisted state");
    let legacy: LegacyState = serde_json::from_value(value)?;
    Ok(legacy.into())
}

/// The legacy unversioned layout.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyState {
    #[serde(default, rename = "orderedTxDB")]
    ordered_tx_db: BTreeMap<String, Vec<OrderedIndexEntry>>,
    #[serde(default)]
    front_transactions: Vec<LegacyTransaction>,
    #[serde(default)]
    abnormal_transactions: Vec<LegacyTransaction>,
    #[serde(default)]
    estimated_time_map: BTreeMap<String, u64>,
}

/// A transaction in the legacy layout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTransaction {
    hash: TxHash,
    #[serde(default)]
    to_hash: Option<TxHash>,
    is_l1: bool,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    decimals: Option<u8>,
    #[serde(default)]
    token_address: Option<Address>,
    #[serde(default)]
    from_block_number: Option<u64>,
    #[serde(default)]
    to_block_number: Option<u64>,
    #[serde(default)]
    initiated_at: Option<u64>,
    #[serde(default)]
    finalised_at: Option<u64>,
    #[serde(default)]
    assumed_status: Option<AssumedStatus>,
    #[serde(default)]
    err_msg: Option<String>,
}

impl From<LegacyTransaction> for BridgeTransaction {
    fn from(legacy: LegacyTransaction) -> Self {
        let token = match legacy.token_address {
            Some(address) if !address.is_zero() => TokenInfo {
                address,
                symbol: legacy.symbol.unwrap_or_default(),
                decimals: legacy.decimals.unwrap_or(18),
            },
            _ => TokenInfo::native(),
        };
        let failure_reason = legacy.assumed_status.map(|status| match status {
            AssumedStatus::Cancelled => FailureReason::Cancelled,
            AssumedStatus::Failed => FailureReason::Reverted,
        });

        Self {
            hash: legacy.hash,
            counterpart_hash: legacy.to_hash,
            origin_is_l1: legacy.is_l1,
            amount: U256::from_str_radix(legacy.amount.trim(), 10).unwrap_or_default(),
            token,
            origin_block_number: legacy.from_block_number,
            counterpart_block_number: legacy.to_block_number,
            initiated_at: legacy.initiated_at,
            finalized_at: legacy.finalised_at,
            claim_info: None,
            assumed_status: legacy.assumed_status,
            failure_reason,
            error_message: legacy.err_msg,
        }
    }
}

/// Converts a legacy `scope_hash` key into a `scope:hash` key.
fn migrate_eta_key(key: &str) -> Option<String> {
    let (scope, hash) = key.split_once('_')?;
    let key: EtaKey = format!("{scope}:{hash}").parse().ok()?;
    Some(key.to_string())
}

impl From<LegacyState> for PersistedState {
    fn from(legacy: LegacyState) -> Self {
        let ordered_index = legacy
            .ordered_tx_db
            .into_iter()
            .filter_map(|(wallet, entries)| match wallet.parse::<Address>() {
                Ok(wallet) => Some(WalletLog { wallet, entries }),
                Err(_) => {
                    tracing::warn!(target: "bridge_history::store", %wallet, "dropping legacy log of invalid wallet");
                    None
                }
            })
            .collect();
        let estimated_time_map = legacy
            .estimated_time_map
            .into_iter()
            .filter_map(|(key, eta)| migrate_eta_key(&key).map(|key| (key, eta)))
            .collect();

        Self {
            version: SCHEMA_VERSION,
            ordered_index,
            frontend_transactions: legacy.front_transactions.into_iter().map(Into::into).collect(),
            abnormal_transactions: legacy
                .abnormal_transactions
                .into_iter()
                .map(Into::into)
                .collect(),
            estimated_time_map,
            claim_records: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_history_primitives::{TxDirection, TxPosition};
    use serde_json::json;

    fn hash(byte: u8) -> TxHash {
        TxHash::with_last_byte(byte)
    }

    #[test]
    fn test_migrate_legacy_state() {
        let wallet = Address::with_last_byte(0xaa);
        let legacy = json!({
            "orderedTxDB": {
                wallet.to_string(): [
                    { "hash": hash(1), "timestamp": 20, "position": "FRONTEND", "direction": "DEPOSIT" },
                    { "hash": hash(2), "timestamp": 10, "position": "ABNORMAL", "direction": "WITHDRAW" }
                ],
                "not-a-wallet": []
            },
            "frontTransactions": [
                { "hash": hash(1), "isL1": true, "amount": "1000", "initiatedAt": 20 }
            ],
            "abnormalTransactions": [
                { "hash": hash(2), "isL1": false, "amount": "5", "assumedStatus": "FAILED", "errMsg": "reverted" }
            ],
            "estimatedTimeMap": {
                format!("from_{}", hash(1)): 1234,
                "garbage": 1
            }
        });

        let state = migrate(legacy).unwrap();

        assert_eq!(state.version, SCHEMA_VERSION);
        assert_eq!(state.ordered_index.len(), 1);
        assert_eq!(state.ordered_index[0].wallet, wallet);
        assert_eq!(
            state.ordered_index[0].entries[1],
            OrderedIndexEntry::new(hash(2), 10, TxPosition::Abnormal, TxDirection::Withdraw)
        );
        assert_eq!(state.frontend_transactions[0].amount, U256::from(1000));
        assert!(state.frontend_transactions[0].origin_is_l1);
        assert!(state.frontend_transactions[0].token.is_native());
        assert_eq!(state.abnormal_transactions[0].assumed_status, Some(AssumedStatus::Failed));
        assert_eq!(state.abnormal_transactions[0].failure_reason, Some(FailureReason::Reverted));
        assert_eq!(
            state.estimated_time_map,
            BTreeMap::from([(EtaKey::From(hash(1)).to_string(), 1234)])
        );
    }

    #[test]
    fn test_migrate_current_state_is_identity() {
        let state = PersistedState {
            estimated_time_map: BTreeMap::from([(EtaKey::Claim(hash(3)).to_string(), 99)]),
            ..Default::default()
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(migrate(value).unwrap(), state);
    }

    #[test]
    fn test_migrate_rejects_newer_version() {
        let err = migrate(json!({ "version": SCHEMA_VERSION + 1 })).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 3, supported: 2 }));
    }
}
