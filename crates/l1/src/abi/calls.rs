use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use bridge_history_primitives::{ClaimInfo, FinalizeParams};

sol! {
    /// The proof of an L2 to L1 message against a finalized batch.
    #[derive(Debug)]
    struct L2MessageProof {
        uint256 batchIndex;
        bytes merkleProof;
    }

    /// Returns the index of the last finalized batch on the rollup contract.
    #[derive(Debug)]
    function lastFinalizedBatchIndex() external view returns (uint256);

    /// Relays an L2 to L1 message with its withdrawal proof on the L1 messenger.
    #[derive(Debug)]
    function relayMessageWithProof(
        address from,
        address to,
        uint256 value,
        uint256 nonce,
        bytes memory message,
        L2MessageProof memory proof
    ) external;

    /// Finalizes a single withdrawal on a direct-finalization bridge.
    #[derive(Debug)]
    function finalizeWithdrawal(
        uint256 l2BatchNumber,
        uint256 l2MessageIndex,
        uint16 l2TxNumberInBatch,
        bytes calldata message,
        bytes32[] calldata merkleProof
    ) external;

    /// Returns whether the withdrawal has already been finalized.
    #[derive(Debug)]
    function isWithdrawalFinalized(uint256 l2BatchNumber, uint256 l2MessageIndex)
        external
        view
        returns (bool);
}

/// Returns the calldata for `lastFinalizedBatchIndex()`.
pub fn last_finalized_batch_index_calldata() -> Bytes {
    lastFinalizedBatchIndexCall {}.abi_encode().into()
}

/// Decodes the return data of `lastFinalizedBatchIndex()`, saturating to [`u64::MAX`].
pub fn decode_last_finalized_batch_index(data: &[u8]) -> Result<u64, alloy_sol_types::Error> {
    let index: U256 = lastFinalizedBatchIndexCall::abi_decode_returns(data)?;
    Ok(index.saturating_to())
}

/// Returns the `relayMessageWithProof` calldata for the claim, or [`None`] if the withdrawal is
/// not part of a batch yet.
pub fn relay_message_with_proof_calldata(claim: &ClaimInfo) -> Option<Bytes> {
    let batch_index = claim.batch_index?;
    let call = relayMessageWithProofCall {
        from: claim.from,
        to: claim.to,
        value: claim.value,
        nonce: claim.nonce,
        message: claim.message.clone(),
        proof: L2MessageProof {
            batchIndex: U256::from(batch_index),
            merkleProof: claim.merkle_proof.clone(),
        },
    };
    Some(call.abi_encode().into())
}

/// Returns the `finalizeWithdrawal` calldata for the claim, or [`None`] if the claim carries no
/// finalization parameters.
pub fn finalize_withdrawal_calldata(claim: &ClaimInfo) -> Option<Bytes> {
    let params = claim.finalize_params.as_ref()?;
    let call = finalizeWithdrawalCall {
        l2BatchNumber: U256::from(params.l2_batch_number),
        l2MessageIndex: U256::from(params.l2_message_index),
        l2TxNumberInBatch: params.l2_tx_number_in_batch,
        message: claim.message.clone(),
        merkleProof: params.merkle_proof.clone(),
    };
    Some(call.abi_encode().into())
}

/// Returns the `isWithdrawalFinalized` calldata for the parameters.
pub fn is_withdrawal_finalized_calldata(params: &FinalizeParams) -> Bytes {
    isWithdrawalFinalizedCall {
        l2BatchNumber: U256::from(params.l2_batch_number),
        l2MessageIndex: U256::from(params.l2_message_index),
    }
    .abi_encode()
    .into()
}

/// Decodes the return data of `isWithdrawalFinalized`.
pub fn decode_is_withdrawal_finalized(data: &[u8]) -> Result<bool, alloy_sol_types::Error> {
    isWithdrawalFinalizedCall::abi_decode_returns(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};
    use alloy_sol_types::SolValue;

    fn claim() -> ClaimInfo {
        ClaimInfo {
            from: Address::with_last_byte(1),
            to: Address::with_last_byte(2),
            value: U256::from(100),
            nonce: U256::from(7),
            message: Bytes::from_static(&[0xde, 0xad]),
            batch_index: None,
            merkle_proof: Bytes::from_static(&[0x01; 32]),
            finalize_params: None,
            claimable: false,
        }
    }

    #[test]
    fn test_relay_calldata_requires_batch_index() {
        let mut claim = claim();
        assert!(relay_message_with_proof_calldata(&claim).is_none());

        claim.batch_index = Some(5);
        let calldata = relay_message_with_proof_calldata(&claim).unwrap();
        assert_eq!(&calldata[..4], relayMessageWithProofCall::SELECTOR.as_slice());

        let decoded = relayMessageWithProofCall::abi_decode(&calldata).unwrap();
        assert_eq!(decoded.proof.batchIndex, U256::from(5));
        assert_eq!(decoded.nonce, U256::from(7));
    }

    #[test]
    fn test_finalize_withdrawal_calldata() {
        let mut claim = claim();
        assert!(finalize_withdrawal_calldata(&claim).is_none());

        claim.finalize_params = Some(FinalizeParams {
            l2_batch_number: 11,
            l2_message_index: 3,
            l2_tx_number_in_batch: 2,
            merkle_proof: vec![B256::with_last_byte(9)],
        });
        let calldata = finalize_withdrawal_calldata(&claim).unwrap();
        let decoded = finalizeWithdrawalCall::abi_decode(&calldata).unwrap();
        assert_eq!(decoded.l2BatchNumber, U256::from(11));
        assert_eq!(decoded.merkleProof, vec![B256::with_last_byte(9)]);
    }

    #[test]
    fn test_decode_last_finalized_batch_index() {
        let data = U256::from(42).abi_encode();
        assert_eq!(decode_last_finalized_batch_index(&data).unwrap(), 42);
    }

    #[test]
    fn test_decode_is_withdrawal_finalized() {
        let data = true.abi_encode();
        assert!(decode_is_withdrawal_finalized(&data).unwrap());
    }
}
