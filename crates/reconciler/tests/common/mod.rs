//! Shared setup of the reconciler integration tests.

#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, TxHash, U256};
use bridge_history_db::{test_utils::setup_test_db, Database};
use bridge_history_primitives::{
    BridgeTransaction, ChainHeights, ClaimInfo, TokenInfo, TxDirection,
};
use bridge_history_providers::test_utils::MockHistoryFetcher;
use bridge_history_reconciler::{BridgeHistory, ReconcilerConfig};
use bridge_history_watcher::ChainView;
use std::sync::Arc;
use tokio::sync::watch;

/// The reference time of the tests, in unix milliseconds.
pub const NOW: u64 = 1_700_000_000_000;

/// The engine under test.
pub type Engine = BridgeHistory<Arc<MockHistoryFetcher>, Arc<Database>>;

/// An engine wired to in-memory collaborators.
pub struct Harness {
    pub engine: Arc<Engine>,
    pub fetcher: Arc<MockHistoryFetcher>,
    pub database: Arc<Database>,
    pub heights: watch::Sender<Option<ChainHeights>>,
    pub finalized_batch: watch::Sender<Option<u64>>,
}

impl Harness {
    pub async fn new(config: ReconcilerConfig) -> eyre::Result<Self> {
        Self::build(config, Arc::new(MockHistoryFetcher::default()), |engine| engine).await
    }

    /// Builds the harness, applying `configure` to the engine before it is shared.
    pub async fn build(
        config: ReconcilerConfig,
        fetcher: Arc<MockHistoryFetcher>,
        configure: impl FnOnce(Engine) -> Engine,
    ) -> eyre::Result<Self> {
        let database = Arc::new(setup_test_db().await);
        let (heights, heights_rx) = watch::channel(Some(ChainHeights::new(100, 1_000)));
        let (finalized_batch, finalized_rx) = watch::channel(None);
        let chain = ChainView { heights: heights_rx, finalized_batch: finalized_rx };
        let engine = BridgeHistory::new(fetcher.clone(), database.clone(), chain, config).await?;
        Ok(Self { engine: Arc::new(configure(engine)), fetcher, database, heights, finalized_batch })
    }

    /// Returns a new engine reading the same database, as after a restart.
    pub async fn reload(&self, config: ReconcilerConfig) -> eyre::Result<Engine> {
        let chain = ChainView {
            heights: self.heights.subscribe(),
            finalized_batch: self.finalized_batch.subscribe(),
        };
        Ok(BridgeHistory::new(self.fetcher.clone(), self.database.clone(), chain, config).await?)
    }
}

pub fn wallet() -> Address {
    Address::with_last_byte(0x11)
}

pub fn hash(byte: u8) -> TxHash {
    TxHash::with_last_byte(byte)
}

/// A deposit as recorded on submission.
pub fn submitted_deposit(byte: u8, initiated_at: u64) -> BridgeTransaction {
    BridgeTransaction::submitted(
        hash(byte),
        TxDirection::Deposit,
        U256::from(1_000_000_000_000_000_000u128),
        TokenInfo::native(),
        initiated_at,
    )
}

/// A withdrawal as recorded on submission.
pub fn submitted_withdrawal(byte: u8, amount: U256, initiated_at: u64) -> BridgeTransaction {
    BridgeTransaction::submitted(hash(byte), TxDirection::Withdraw, amount, TokenInfo::native(), initiated_at)
}

/// A withdrawal as indexed by the backend, included in the provided batch.
pub fn indexed_withdrawal(byte: u8, amount: U256, batch_index: Option<u64>) -> BridgeTransaction {
    let mut tx = submitted_withdrawal(byte, amount, NOW);
    tx.origin_block_number = Some(900);
    tx.claim_info = Some(ClaimInfo {
        from: Address::with_last_byte(0xf0),
        to: Address::with_last_byte(0xf1),
        value: amount,
        nonce: U256::from(byte),
        message: Bytes::new(),
        batch_index,
        merkle_proof: Bytes::from_static(&[0u8; 32]),
        finalize_params: None,
        claimable: batch_index.is_some(),
    });
    tx
}

/// A deposit as indexed by the backend.
pub fn indexed_deposit(byte: u8, origin_block: u64) -> BridgeTransaction {
    let mut tx = submitted_deposit(byte, NOW);
    tx.origin_block_number = Some(origin_block);
    tx
}
