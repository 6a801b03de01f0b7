use crate::ProviderError;

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, TransactionRequest};
use bridge_history_l1::abi::calls::{
    decode_last_finalized_batch_index, last_finalized_batch_index_calldata,
};

/// Exposes the index of the last batch proven final on L1.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait FinalityOracle: Send + Sync {
    /// Returns the last finalized batch index.
    async fn last_finalized_batch_index(&self) -> Result<u64, ProviderError>;
}

/// Exposes whether a withdrawal has been verified on L2.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait WithdrawalStatusOracle: Send + Sync {
    /// Returns the provided hash along with its verified status.
    async fn withdrawal_status(&self, hash: TxHash) -> Result<(TxHash, bool), ProviderError>;
}

/// A [`FinalityOracle`] reading `lastFinalizedBatchIndex()` from the rollup contract.
#[derive(Debug, Clone)]
pub struct RollupFinalityOracle<P> {
    provider: P,
    rollup: Address,
}

impl<P> RollupFinalityOracle<P> {
    /// Returns a new [`RollupFinalityOracle`] for the rollup contract at `rollup`.
    pub const fn new(provider: P, rollup: Address) -> Self {
        Self { provider, rollup }
    }
}

#[async_trait::async_trait]
impl<P: Provider + Send + Sync> FinalityOracle for RollupFinalityOracle<P> {
    async fn last_finalized_batch_index(&self) -> Result<u64, ProviderError> {
        let request = TransactionRequest::default()
            .with_to(self.rollup)
            .with_input(last_finalized_batch_index_calldata());
        let output = self.provider.call(request).await?;
        Ok(decode_last_finalized_batch_index(&output)?)
    }
}

/// A [`WithdrawalStatusOracle`] considering a withdrawal verified once its L2 block is finalized.
#[derive(Debug, Clone)]
pub struct L2FinalizedStatusOracle<P> {
    provider: P,
}

impl<P> L2FinalizedStatusOracle<P> {
    /// Returns a new [`L2FinalizedStatusOracle`].
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl<P: Provider + Send + Sync> WithdrawalStatusOracle for L2FinalizedStatusOracle<P> {
    async fn withdrawal_status(&self, hash: TxHash) -> Result<(TxHash, bool), ProviderError> {
        let Some(receipt) = self.provider.get_transaction_receipt(hash).await? else {
            return Ok((hash, false))
        };
        let Some(block_number) = receipt.block_number else { return Ok((hash, false)) };

        let finalized = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Finalized)
            .await?
            .map(|block| block.header.number)
            .unwrap_or_default();

        tracing::trace!(target: "bridge_history::providers", ?hash, block_number, finalized, "withdrawal status");
        Ok((hash, block_number <= finalized))
    }
}
