use crate::ProviderError;

use alloy_provider::Provider;
use bridge_history_primitives::ChainHeights;

/// Exposes the current block numbers of both chains.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait BlockHeightOracle: Send + Sync {
    /// Returns the latest L1 and L2 block numbers.
    async fn block_numbers(&self) -> Result<ChainHeights, ProviderError>;
}

/// A [`BlockHeightOracle`] querying an L1 and an L2 provider.
#[derive(Debug, Clone)]
pub struct AlloyBlockHeightOracle<L1P, L2P> {
    l1_provider: L1P,
    l2_provider: L2P,
}

impl<L1P, L2P> AlloyBlockHeightOracle<L1P, L2P> {
    /// Returns a new [`AlloyBlockHeightOracle`].
    pub const fn new(l1_provider: L1P, l2_provider: L2P) -> Self {
        Self { l1_provider, l2_provider }
    }
}

#[async_trait::async_trait]
impl<L1P, L2P> BlockHeightOracle for AlloyBlockHeightOracle<L1P, L2P>
where
    L1P: Provider + Send + Sync,
    L2P: Provider + Send + Sync,
{
    async fn block_numbers(&self) -> Result<ChainHeights, ProviderError> {
        let (l1, l2) =
            tokio::try_join!(self.l1_provider.get_block_number(), self.l2_provider.get_block_number())?;
        Ok(ChainHeights::new(l1, l2))
    }
}
