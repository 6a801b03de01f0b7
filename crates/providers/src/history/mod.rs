//! The backend history fetcher.

use crate::ProviderError;

use alloy_primitives::{Address, TxHash};
use bridge_history_primitives::BridgeTransaction;

pub use http::HttpHistoryFetcher;
mod http;

pub use record::{clip_amount, BridgeRecord};
mod record;

/// The default count of hashes sent per backend request.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Fetches authoritative bridge records from the history backend.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait HistoryFetcher: Send + Sync {
    /// Fetches the records for the provided hashes. Hashes unknown to the backend are absent
    /// from the returned records. A failing chunk does not discard the records of the other
    /// chunks.
    async fn fetch_by_hashes(&self, hashes: &[TxHash]) -> FetchOutcome;

    /// Fetches a page of the wallet's records, ordered newest first. Pages are 1-based.
    async fn fetch_by_wallet(
        &self,
        address: Address,
        page: u64,
        page_size: u64,
    ) -> Result<WalletHistory, ProviderError>;
}

/// A chunk of hashes for which the backend request failed.
#[derive(Debug)]
pub struct ChunkFailure {
    /// The hashes of the chunk.
    pub hashes: Vec<TxHash>,
    /// The error.
    pub error: ProviderError,
}

/// The outcome of a by-hashes fetch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// The records returned by the successful chunks.
    pub records: Vec<BridgeTransaction>,
    /// The chunks which failed.
    pub failed_chunks: Vec<ChunkFailure>,
}

impl FetchOutcome {
    /// Returns true if every chunk succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty()
    }

    /// Returns an iterator over the hashes whose chunk failed.
    pub fn failed_hashes(&self) -> impl Iterator<Item = &TxHash> {
        self.failed_chunks.iter().flat_map(|chunk| chunk.hashes.iter())
    }
}

/// A page of a wallet's backend records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletHistory {
    /// The records of the page.
    pub records: Vec<BridgeTransaction>,
    /// The total count of records for the wallet.
    pub total: u64,
}
