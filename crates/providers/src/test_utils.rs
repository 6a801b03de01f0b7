//! Test utils for providers.

use crate::{
    BlockHeightOracle, ChunkFailure, ClaimClient, ClaimOutcome, FetchOutcome, FinalityOracle,
    HistoryFetcher, ProviderError, SubmittedClaim, WalletHistory, WithdrawalStatusOracle,
    DEFAULT_CHUNK_SIZE,
};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    time::Duration,
};

use alloy_primitives::{Address, Bytes, TxHash, B256};
use bridge_history_primitives::{BridgeTransaction, ChainHeights, ClaimInfo};
use parking_lot::Mutex;

/// A [`HistoryFetcher`] serving records from memory.
#[derive(Debug)]
pub struct MockHistoryFetcher {
    /// The records known to the backend.
    records: Mutex<HashMap<TxHash, BridgeTransaction>>,
    /// The wallet each record is indexed under, if any.
    owners: Mutex<HashMap<TxHash, Address>>,
    /// Hashes whose chunk fails.
    failing: Mutex<HashSet<TxHash>>,
    /// The chunk size.
    chunk_size: usize,
    /// An optional delay applied to every fetch.
    delay: Mutex<Option<Duration>>,
    /// The count of by-hashes fetches.
    fetches: AtomicUsize,
}

impl Default for MockHistoryFetcher {
    fn default() -> Self {
        Self {
            records: Default::default(),
            owners: Default::default(),
            failing: Default::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            delay: Default::default(),
            fetches: Default::default(),
        }
    }
}

impl MockHistoryFetcher {
    /// Returns a new [`MockHistoryFetcher`] with the provided chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), ..Default::default() }
    }

    /// Indexes the record in the backend.
    pub fn insert(&self, tx: BridgeTransaction) {
        self.records.lock().insert(tx.hash, tx);
    }

    /// Indexes the record in the backend under `wallet`, listing it in the wallet history.
    pub fn insert_for(&self, wallet: Address, tx: BridgeTransaction) {
        self.owners.lock().insert(tx.hash, wallet);
        self.insert(tx);
    }

    /// Removes the record from the backend.
    pub fn remove(&self, hash: &TxHash) {
        self.records.lock().remove(hash);
        self.owners.lock().remove(hash);
    }

    /// Makes any chunk containing `hash` fail.
    pub fn fail_chunk_with(&self, hash: TxHash) {
        self.failing.lock().insert(hash);
    }

    /// Clears the failing hashes.
    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    /// Delays every fetch by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Returns the count of by-hashes fetches.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HistoryFetcher for MockHistoryFetcher {
    async fn fetch_by_hashes(&self, hashes: &[TxHash]) -> FetchOutcome {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let records = self.records.lock();
        let failing = self.failing.lock();
        let mut outcome = FetchOutcome::default();
        for chunk in hashes.chunks(self.chunk_size) {
            if chunk.iter().any(|hash| failing.contains(hash)) {
                outcome.failed_chunks.push(ChunkFailure {
                    hashes: chunk.to_vec(),
                    error: ProviderError::Other("mock chunk failure"),
                });
                continue
            }
            outcome.records.extend(chunk.iter().filter_map(|hash| records.get(hash).cloned()));
        }
        outcome
    }

    async fn fetch_by_wallet(
        &self,
        address: Address,
        page: u64,
        page_size: u64,
    ) -> Result<WalletHistory, ProviderError> {
        let owners = self.owners.lock();
        let mut records: Vec<_> = self
            .records
            .lock()
            .values()
            .filter(|tx| owners.get(&tx.hash) == Some(&address))
            .cloned()
            .collect();
        drop(owners);
        records.sort_by_key(|tx| std::cmp::Reverse(tx.initiated_at));
        let total = records.len() as u64;
        let skip = page.saturating_sub(1).saturating_mul(page_size) as usize;
        let records = records.into_iter().skip(skip).take(page_size as usize).collect();
        Ok(WalletHistory { records, total })
    }
}

/// A [`BlockHeightOracle`] returning settable heights.
#[derive(Debug, Default)]
pub struct MockBlockHeightOracle {
    heights: Mutex<ChainHeights>,
    failing: AtomicBool,
}

impl MockBlockHeightOracle {
    /// Returns a new [`MockBlockHeightOracle`] at the provided heights.
    pub fn new(l1: u64, l2: u64) -> Self {
        Self { heights: Mutex::new(ChainHeights::new(l1, l2)), failing: AtomicBool::new(false) }
    }

    /// Sets the heights.
    pub fn set(&self, l1: u64, l2: u64) {
        *self.heights.lock() = ChainHeights::new(l1, l2);
    }

    /// Makes the oracle fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BlockHeightOracle for MockBlockHeightOracle {
    async fn block_numbers(&self) -> Result<ChainHeights, ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Other("mock height failure"))
        }
        Ok(*self.heights.lock())
    }
}

/// A [`FinalityOracle`] returning a settable batch index.
#[derive(Debug, Default)]
pub struct MockFinalityOracle {
    index: AtomicU64,
}

impl MockFinalityOracle {
    /// Returns a new [`MockFinalityOracle`] at the provided index.
    pub const fn new(index: u64) -> Self {
        Self { index: AtomicU64::new(index) }
    }

    /// Sets the last finalized batch index.
    pub fn set(&self, index: u64) {
        self.index.store(index, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl FinalityOracle for MockFinalityOracle {
    async fn last_finalized_batch_index(&self) -> Result<u64, ProviderError> {
        Ok(self.index.load(Ordering::SeqCst))
    }
}

/// A [`WithdrawalStatusOracle`] serving verified hashes from memory.
#[derive(Debug, Default)]
pub struct MockWithdrawalStatusOracle {
    verified: Mutex<HashSet<TxHash>>,
    failing: Mutex<HashSet<TxHash>>,
}

impl MockWithdrawalStatusOracle {
    /// Marks the withdrawal as verified.
    pub fn verify(&self, hash: TxHash) {
        self.verified.lock().insert(hash);
    }

    /// Makes the status query of `hash` fail.
    pub fn fail(&self, hash: TxHash) {
        self.failing.lock().insert(hash);
    }
}

#[async_trait::async_trait]
impl WithdrawalStatusOracle for MockWithdrawalStatusOracle {
    async fn withdrawal_status(&self, hash: TxHash) -> Result<(TxHash, bool), ProviderError> {
        if self.failing.lock().contains(&hash) {
            return Err(ProviderError::Other("mock status failure"))
        }
        Ok((hash, self.verified.lock().contains(&hash)))
    }
}

/// A [`ClaimClient`] replaying scripted outcomes.
#[derive(Debug)]
pub struct MockClaimClient {
    chain_id: AtomicU64,
    outcomes: Mutex<VecDeque<ClaimOutcome>>,
    submissions: Mutex<Vec<TxHash>>,
    finalized: AtomicBool,
    reject_submissions: AtomicBool,
    nonce: AtomicU64,
}

impl MockClaimClient {
    /// Returns a new [`MockClaimClient`] on the provided chain.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: AtomicU64::new(chain_id),
            outcomes: Default::default(),
            submissions: Default::default(),
            finalized: AtomicBool::new(false),
            reject_submissions: AtomicBool::new(false),
            nonce: AtomicU64::new(0),
        }
    }

    /// Queues outcomes returned by successive outcome queries. [`ClaimOutcome::Pending`] is
    /// returned once the queue is empty.
    pub fn push_outcomes(&self, outcomes: impl IntoIterator<Item = ClaimOutcome>) {
        self.outcomes.lock().extend(outcomes);
    }

    /// Sets the value returned by [`ClaimClient::is_withdrawal_finalized`].
    pub fn set_finalized(&self, finalized: bool) {
        self.finalized.store(finalized, Ordering::SeqCst);
    }

    /// Makes submissions fail.
    pub fn reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }

    /// Returns the origin hashes of the submitted claims.
    pub fn submissions(&self) -> Vec<TxHash> {
        self.submissions.lock().clone()
    }

    /// Returns the hash of the claim transaction for the n-th submission.
    pub fn claim_hash(nonce: u64) -> TxHash {
        B256::left_padding_from(&(0xc1a1_0000 + nonce).to_be_bytes())
    }
}

#[async_trait::async_trait]
impl ClaimClient for MockClaimClient {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn submit_claim(
        &self,
        hash: TxHash,
        _claim: &ClaimInfo,
    ) -> Result<SubmittedClaim, ProviderError> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(ProviderError::Other("mock submission rejected"))
        }
        self.submissions.lock().push(hash);
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(SubmittedClaim {
            hash: Self::claim_hash(nonce),
            sender: Address::with_last_byte(0xcc),
            nonce,
            to: Address::with_last_byte(0xdd),
            input: Bytes::new(),
        })
    }

    async fn claim_outcome(&self, _claim: &SubmittedClaim) -> Result<ClaimOutcome, ProviderError> {
        Ok(self.outcomes.lock().pop_front().unwrap_or(ClaimOutcome::Pending))
    }

    async fn is_withdrawal_finalized(&self, _claim: &ClaimInfo) -> Result<bool, ProviderError> {
        Ok(self.finalized.load(Ordering::SeqCst))
    }
}
