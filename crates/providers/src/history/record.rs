//! Wire types of the history backend.

use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use bridge_history_primitives::{BridgeTransaction, ClaimInfo, FinalizeParams, TokenInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The message type of a deposit.
const MESSAGE_TYPE_DEPOSIT: u8 = 1;

/// The token type of the native asset.
const TOKEN_TYPE_NATIVE: u8 = 1;

/// A backend response envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse<T> {
    /// The error code, zero on success.
    pub(crate) errcode: i64,
    /// The error message.
    #[serde(default)]
    pub(crate) errmsg: String,
    /// The payload.
    pub(crate) data: Option<T>,
}

/// A page of backend records.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResultPage {
    /// The records.
    #[serde(default)]
    pub(crate) results: Vec<BridgeRecord>,
    /// The total count of records for the query.
    #[serde(default)]
    pub(crate) total: u64,
}

/// The request body of a by-hashes query.
#[derive(Debug, Serialize)]
pub(crate) struct HashesRequest<'a> {
    pub(crate) txs: &'a [TxHash],
}

/// The destination leg as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartTx {
    /// The destination leg hash. The backend reports an unrelayed leg with an empty or zero
    /// hash, both read as `None`.
    #[serde(default, deserialize_with = "deserialize_leg_hash")]
    pub hash: Option<TxHash>,
    /// The destination leg block number.
    #[serde(default)]
    pub block_number: u64,
}

fn deserialize_leg_hash<'de, D>(deserializer: D) -> Result<Option<TxHash>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else { return Ok(None) };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None)
    }
    let hash = raw.parse::<TxHash>().map_err(serde::de::Error::custom)?;
    Ok((!hash.is_zero()).then_some(hash))
}

/// The withdrawal proof as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordProof {
    /// The batch containing the withdrawal.
    pub batch_index: u64,
    /// The merkle proof.
    #[serde(default)]
    pub merkle_proof: Bytes,
}

/// The claim material as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordClaimInfo {
    /// The message sender.
    pub from: Address,
    /// The message target.
    pub to: Address,
    /// The message value.
    pub value: U256,
    /// The message nonce.
    pub nonce: U256,
    /// The message calldata.
    #[serde(default)]
    pub message: Bytes,
    /// The withdrawal proof, once the batch is committed.
    #[serde(default)]
    pub proof: Option<RecordProof>,
    /// Whether the backend considers the withdrawal claimable.
    #[serde(default)]
    pub claimable: bool,
}

/// The direct finalization parameters as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFinalizeParams {
    /// The L2 batch number.
    pub l2_batch_number: u64,
    /// The L2 message index.
    pub l2_message_index: u64,
    /// The L2 transaction number in the batch.
    pub l2_tx_number_in_batch: u16,
    /// The message merkle proof.
    #[serde(default)]
    pub merkle_proof: Vec<B256>,
}

/// An authoritative bridge record returned by the history backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRecord {
    /// The origin leg hash.
    pub hash: TxHash,
    /// The message type, `1` for deposits and `2` for withdrawals.
    pub message_type: u8,
    /// The token type, `1` for the native asset.
    pub token_type: u8,
    /// The transferred amounts as decimal strings.
    #[serde(default)]
    pub token_amounts: Vec<String>,
    /// The token address on L1.
    #[serde(default)]
    pub l1_token_address: Address,
    /// The token address on L2.
    #[serde(default)]
    pub l2_token_address: Address,
    /// The origin leg block number.
    pub block_number: u64,
    /// The origin leg block timestamp, in seconds.
    #[serde(default)]
    pub block_timestamp: u64,
    /// The destination leg, once observed.
    #[serde(default)]
    pub counterpart_chain_tx: Option<CounterpartTx>,
    /// The destination leg block timestamp, in seconds.
    #[serde(default)]
    pub counterpart_block_timestamp: Option<u64>,
    /// The claim material of a withdrawal.
    #[serde(default)]
    pub claim_info: Option<RecordClaimInfo>,
    /// The direct finalization parameters of a withdrawal.
    #[serde(default)]
    pub finalize_params: Option<RecordFinalizeParams>,
}

/// Clips the indexer's decimal amount string to an integer amount in the smallest unit.
///
/// The indexer may append fractional precision noise to integer amounts. Anything after the
/// decimal point is dropped, unparsable amounts yield zero.
pub fn clip_amount(raw: &str) -> U256 {
    let integer = raw.trim().split('.').next().unwrap_or_default();
    if integer.is_empty() {
        return U256::ZERO
    }
    U256::from_str_radix(integer, 10).unwrap_or_default()
}

impl BridgeRecord {
    /// Returns true if the record is a deposit.
    pub const fn is_deposit(&self) -> bool {
        self.message_type == MESSAGE_TYPE_DEPOSIT
    }

    /// Converts the record into a [`BridgeTransaction`], resolving the token from `tokens` when
    /// it is not the native asset.
    pub fn into_transaction(self, tokens: &HashMap<Address, TokenInfo>) -> BridgeTransaction {
        let origin_is_l1 = self.is_deposit();
        let token = if self.token_type == TOKEN_TYPE_NATIVE {
            TokenInfo::native()
        } else {
            let address = if origin_is_l1 { self.l1_token_address } else { self.l2_token_address };
            tokens.get(&address).cloned().unwrap_or_else(|| TokenInfo {
                address,
                symbol: "UNKNOWN".to_owned(),
                decimals: 18,
            })
        };
        let amount = self.token_amounts.first().map(|a| clip_amount(a)).unwrap_or_default();

        let finalize_params = self.finalize_params.map(|params| FinalizeParams {
            l2_batch_number: params.l2_batch_number,
            l2_message_index: params.l2_message_index,
            l2_tx_number_in_batch: params.l2_tx_number_in_batch,
            merkle_proof: params.merkle_proof,
        });
        let claim_info = self.claim_info.map(|info| ClaimInfo {
            from: info.from,
            to: info.to,
            value: info.value,
            nonce: info.nonce,
            message: info.message,
            batch_index: info.proof.as_ref().map(|proof| proof.batch_index),
            merkle_proof: info.proof.map(|proof| proof.merkle_proof).unwrap_or_default(),
            finalize_params,
            claimable: info.claimable,
        });

        BridgeTransaction {
            hash: self.hash,
            counterpart_hash: self.counterpart_chain_tx.as_ref().and_then(|tx| tx.hash),
            origin_is_l1,
            amount,
            token,
            origin_block_number: Some(self.block_number),
            counterpart_block_number: self
                .counterpart_chain_tx
                .as_ref()
                .map(|tx| tx.block_number)
                .filter(|number| *number > 0),
            initiated_at: Some(self.block_timestamp.saturating_mul(1000)),
            finalized_at: self.counterpart_block_timestamp.map(|ts| ts.saturating_mul(1000)),
            claim_info,
            assumed_status: None,
            failure_reason: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_amount() {
        assert_eq!(clip_amount("1000000000000000000"), U256::from(10).pow(U256::from(18)));
        assert_eq!(clip_amount("1000000000000000000.000000001"), U256::from(10).pow(U256::from(18)));
        assert_eq!(clip_amount(" 42 "), U256::from(42));
        assert_eq!(clip_amount(""), U256::ZERO);
        assert_eq!(clip_amount("garbage"), U256::ZERO);
    }

    #[test]
    fn test_record_into_withdrawal() {
        let json = serde_json::json!({
            "hash": TxHash::with_last_byte(1),
            "message_type": 2,
            "token_type": 1,
            "token_amounts": ["20000000000000000.0000001"],
            "block_number": 120,
            "block_timestamp": 1_700_000_000u64,
            "claim_info": {
                "from": Address::with_last_byte(1),
                "to": Address::with_last_byte(2),
                "value": "0x1",
                "nonce": "0x2",
                "message": "0x",
                "proof": { "batch_index": 5, "merkle_proof": "0x01" },
                "claimable": true
            }
        });
        let record: BridgeRecord = serde_json::from_value(json).unwrap();
        let tx = record.into_transaction(&HashMap::new());

        assert!(!tx.origin_is_l1);
        assert_eq!(tx.amount, U256::from(20_000_000_000_000_000u64));
        assert_eq!(tx.origin_block_number, Some(120));
        assert_eq!(tx.initiated_at, Some(1_700_000_000_000));
        assert!(tx.token.is_native());
        let claim = tx.claim_info.unwrap();
        assert_eq!(claim.batch_index, Some(5));
        assert!(claim.claimable);
        assert!(tx.counterpart_hash.is_none());
    }

    #[test]
    fn test_record_resolves_known_token() {
        let token = TokenInfo { address: Address::with_last_byte(9), symbol: "USDC".into(), decimals: 6 };
        let record = BridgeRecord {
            hash: TxHash::with_last_byte(2),
            message_type: 1,
            token_type: 2,
            token_amounts: vec!["5000000".into()],
            l1_token_address: token.address,
            l2_token_address: Address::ZERO,
            block_number: 10,
            block_timestamp: 1,
            counterpart_chain_tx: Some(CounterpartTx {
                hash: Some(TxHash::with_last_byte(3)),
                block_number: 99,
            }),
            counterpart_block_timestamp: Some(2),
            claim_info: None,
            finalize_params: None,
        };
        let tx = record.into_transaction(&HashMap::from([(token.address, token.clone())]));

        assert!(tx.origin_is_l1);
        assert_eq!(tx.token, token);
        assert_eq!(tx.counterpart_hash, Some(TxHash::with_last_byte(3)));
        assert_eq!(tx.counterpart_block_number, Some(99));
        assert_eq!(tx.finalized_at, Some(2000));
    }

    #[test]
    fn test_unrelayed_counterpart_is_not_observed() {
        for hash in [serde_json::json!(""), serde_json::json!(TxHash::ZERO), serde_json::Value::Null] {
            let json = serde_json::json!({
                "hash": TxHash::with_last_byte(4),
                "message_type": 1,
                "token_type": 1,
                "token_amounts": ["1"],
                "block_number": 10,
                "counterpart_chain_tx": { "hash": hash, "block_number": 0 }
            });
            let record: BridgeRecord = serde_json::from_value(json).unwrap();
            let tx = record.into_transaction(&HashMap::new());

            assert!(tx.counterpart_hash.is_none());
            assert!(tx.counterpart_block_number.is_none());
        }

        let json = serde_json::json!({ "hash": "0x1234", "block_number": 1 });
        assert!(serde_json::from_value::<CounterpartTx>(json).is_err());
    }
}
