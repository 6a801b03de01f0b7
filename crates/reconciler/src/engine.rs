//! The reconciliation engine.

use crate::{
    claim::ClaimState,
    guard::PassGuard,
    merge::{merge, SourcedTransaction},
    metrics::{ClaimMetrics, ReconcilerMetrics},
    page::{EtaView, HistoryEntry, HistoryPage},
    retry::WriteRetry,
    ReconcileError, ReconcilerConfig,
};

use alloy_primitives::{Address, TxHash};
use bridge_history_primitives::{
    estimate, unix_millis, BridgeTransaction, ChainHeights, EtaConfig, EtaKey, FailureReason,
    Network, OrderedIndexEntry, TxDirection, TxPosition,
};
use bridge_history_providers::{
    ClaimClient, FetchOutcome, HistoryFetcher, WalletHistory, WithdrawalStatusOracle,
};
use bridge_history_store::{BridgeStore, SnapshotStorage, StoreError};
use bridge_history_watcher::ChainView;
use futures::future::join_all;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};

/// The outcome of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass completed and rendered the page.
    Completed(HistoryPage),
    /// Another pass was in flight, nothing was done.
    Skipped,
}

impl SyncOutcome {
    /// Returns the rendered page, if the pass completed.
    pub fn into_page(self) -> Option<HistoryPage> {
        match self {
            Self::Completed(page) => Some(page),
            Self::Skipped => None,
        }
    }
}

/// The mutable state of the engine.
#[derive(Debug)]
pub(crate) struct EngineState {
    /// The durable store of the active network.
    pub(crate) store: BridgeStore,
    /// The records last returned by the history backend.
    pub(crate) backend: HashMap<TxHash, BridgeTransaction>,
    /// The withdrawals verified on L2, for direct-finalization claims.
    pub(crate) verified: HashSet<TxHash>,
    /// The count of transfers the backend last reported for each wallet.
    pub(crate) wallet_totals: HashMap<Address, u64>,
}

impl EngineState {
    fn new(store: BridgeStore) -> Self {
        Self {
            store,
            backend: HashMap::new(),
            verified: HashSet::new(),
            wallet_totals: HashMap::new(),
        }
    }
}

/// Tracks the bridge transfers of wallets by reconciling the optimistic, abnormal and backend
/// records in a durable store.
pub struct BridgeHistory<F, S> {
    /// The history backend.
    pub(crate) fetcher: F,
    /// The snapshot storage.
    pub(crate) storage: S,
    /// The engine configuration.
    pub(crate) config: ReconcilerConfig,
    /// The latest chain observations.
    pub(crate) chain: ChainView,
    /// The claim client, claims are disabled without one.
    pub(crate) claim_client: Option<Arc<dyn ClaimClient>>,
    /// The withdrawal status oracle of direct-finalization bridges.
    pub(crate) status_oracle: Option<Arc<dyn WithdrawalStatusOracle>>,
    /// The engine state.
    pub(crate) state: Mutex<EngineState>,
    /// Prevents overlapping passes.
    guard: PassGuard,
    /// Orders snapshot writes.
    persist_lock: tokio::sync::Mutex<()>,
    /// The retry strategy of snapshot writes.
    retry: WriteRetry,
    /// The pass metrics.
    metrics: ReconcilerMetrics,
    /// The claim metrics.
    pub(crate) claim_metrics: ClaimMetrics,
}

impl<F, S> core::fmt::Debug for BridgeHistory<F, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BridgeHistory")
            .field("config", &self.config)
            .field("claims_enabled", &self.claim_client.is_some())
            .field("syncing", &self.guard.is_held())
            .finish_non_exhaustive()
    }
}

impl<F: HistoryFetcher, S: SnapshotStorage> BridgeHistory<F, S> {
    /// Returns a new [`BridgeHistory`], loading the store of the configured network.
    pub async fn new(
        fetcher: F,
        storage: S,
        chain: ChainView,
        config: ReconcilerConfig,
    ) -> Result<Self, ReconcileError> {
        let store = storage.load(config.network).await?;
        tracing::info!(
            target: "bridge_history::reconciler",
            network = %config.network,
            entries = store.total_entries(),
            "loaded bridge history store"
        );

        Ok(Self {
            fetcher,
            storage,
            config,
            chain,
            claim_client: None,
            status_oracle: None,
            state: Mutex::new(EngineState::new(store)),
            guard: PassGuard::default(),
            persist_lock: tokio::sync::Mutex::new(()),
            retry: WriteRetry::default(),
            metrics: ReconcilerMetrics::default(),
            claim_metrics: ClaimMetrics::default(),
        })
    }

    /// Enables claims through the provided client.
    pub fn with_claim_client(mut self, client: Arc<dyn ClaimClient>) -> Self {
        self.claim_client = Some(client);
        self
    }

    /// Sets the withdrawal status oracle used by direct-finalization claims.
    pub fn with_withdrawal_status_oracle(mut self, oracle: Arc<dyn WithdrawalStatusOracle>) -> Self {
        self.status_oracle = Some(oracle);
        self
    }

    /// Sets the retry strategy of snapshot writes.
    pub fn with_retry(mut self, retry: WriteRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the engine configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Returns the active network.
    pub fn network(&self) -> Network {
        self.state.lock().store.network()
    }

    /// Returns true if a pass is in flight.
    pub fn is_syncing(&self) -> bool {
        self.guard.is_held()
    }

    /// Returns the log entry of the hash and the wallet it belongs to.
    pub fn locate(&self, hash: &TxHash) -> Option<(Address, OrderedIndexEntry)> {
        self.state.lock().store.locate(hash)
    }

    /// Returns the stored estimated time of the key.
    pub fn eta(&self, key: &EtaKey) -> Option<u64> {
        self.state.lock().store.eta(key)
    }

    /// Returns the count of log entries across all wallets.
    pub fn total_entries(&self) -> usize {
        self.state.lock().store.total_entries()
    }

    /// Runs a pass over the page of the wallet at the current time.
    pub async fn sync_page(
        &self,
        wallet: Address,
        page: u64,
        page_size: u64,
    ) -> Result<SyncOutcome, ReconcileError> {
        self.sync_page_at(wallet, page, page_size, unix_millis()).await
    }

    /// Runs a pass over the page of the wallet, using `now` in unix milliseconds as the current
    /// time.
    ///
    /// The pass lists the page of the wallet history indexed by the backend, refreshes the
    /// backend records of the logged page and of every optimistic transaction, logs the indexed
    /// hashes the wallet does not hold yet, promotes the indexed hashes, times out stale optimistic transactions, demotes the failed
    /// ones and renders the page. A pass started while another is in flight is skipped.
    pub async fn sync_page_at(
        &self,
        wallet: Address,
        page: u64,
        page_size: u64,
        now: u64,
    ) -> Result<SyncOutcome, ReconcileError> {
        let Some(_permit) = self.guard.try_acquire() else {
            self.metrics.skipped_passes.increment(1);
            tracing::debug!(target: "bridge_history::reconciler", %wallet, page, "pass in flight, skipping");
            return Ok(SyncOutcome::Skipped)
        };
        let started = Instant::now();
        let network = self.state.lock().store.network();

        let history = match self.fetcher.fetch_by_wallet(wallet, page, page_size).await {
            Ok(history) => Some(history),
            Err(err) => {
                tracing::warn!(target: "bridge_history::reconciler", %wallet, page, %err, "wallet history fetch failed, keeping cached records");
                None
            }
        };
        let listed: HashSet<TxHash> = history
            .iter()
            .flat_map(|history| history.records.iter().map(|tx| tx.hash))
            .collect();

        let targets = {
            let state = self.state.lock();
            let (entries, _) = state.store.page(&wallet, page, page_size);
            let mut targets: Vec<TxHash> = entries.iter().map(|entry| entry.hash).collect();
            targets.extend(state.store.frontend_transactions().iter().map(|tx| tx.hash));
            let mut seen = HashSet::new();
            targets.retain(|hash| !listed.contains(hash) && seen.insert(*hash));
            targets
        };

        let outcome = if targets.is_empty() {
            FetchOutcome::default()
        } else {
            self.fetcher.fetch_by_hashes(&targets).await
        };
        if !outcome.is_complete() {
            tracing::debug!(
                target: "bridge_history::reconciler",
                failed = outcome.failed_hashes().count(),
                "history fetch incomplete, keeping cached records"
            );
        }

        let rendered = {
            let mut state = self.state.lock();
            if state.store.network() != network {
                tracing::debug!(target: "bridge_history::reconciler", %network, "network switched during pass, discarding");
                return Ok(SyncOutcome::Skipped)
            }
            if let Some(history) = history {
                self.apply_wallet_history(&mut state, wallet, history, now);
            }
            self.apply_backend(&mut state, outcome.records);
            self.apply_timeouts(&mut state, now);
            self.apply_demotions(&mut state);
            self.render(&mut state, wallet, page, page_size, now)
        };

        // a failed write leaves the store dirty for the next pass
        let _ = self.persist().await;

        self.metrics.passes.increment(1);
        self.metrics.pass_duration.record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(SyncOutcome::Completed(rendered))
    }

    /// Renders the page of the wallet from the cached records, without querying the backend.
    pub fn list_page(&self, wallet: Address, page: u64, page_size: u64) -> HistoryPage {
        self.list_page_at(wallet, page, page_size, unix_millis())
    }

    /// Renders the page of the wallet from the cached records, using `now` in unix milliseconds
    /// as the current time.
    pub fn list_page_at(&self, wallet: Address, page: u64, page_size: u64, now: u64) -> HistoryPage {
        let mut state = self.state.lock();
        self.render(&mut state, wallet, page, page_size, now)
    }

    /// Records a transaction the wallet just submitted.
    ///
    /// The transaction is tracked optimistically until the backend indexes it. A hash already
    /// indexed by the backend is logged at the backend position instead.
    pub async fn mark_submitted(
        &self,
        wallet: Address,
        mut tx: BridgeTransaction,
    ) -> Result<(), ReconcileError> {
        let initiated_at = *tx.initiated_at.get_or_insert_with(unix_millis);
        {
            let mut state = self.state.lock();
            let hash = tx.hash;
            let direction = tx.direction();
            let position = if state.backend.contains_key(&hash) {
                TxPosition::Backend
            } else {
                state.store.upsert_frontend(tx);
                TxPosition::Frontend
            };
            let evicted = state
                .store
                .append(wallet, OrderedIndexEntry::new(hash, initiated_at, position, direction));
            for entry in &evicted {
                state.backend.remove(&entry.hash);
                state.verified.remove(&entry.hash);
            }
            tracing::debug!(target: "bridge_history::reconciler", %wallet, %hash, %position, evicted = evicted.len(), "transaction submitted");
        }
        self.persist().await?;
        Ok(())
    }

    /// Records a transaction of the wallet detected as failed before the backend indexed it.
    pub async fn mark_abnormal(
        &self,
        wallet: Address,
        mut tx: BridgeTransaction,
        reason: FailureReason,
    ) -> Result<(), ReconcileError> {
        tx.fail(reason);
        {
            let mut state = self.state.lock();
            let hash = tx.hash;
            let direction = tx.direction();
            let timestamp = tx.initiated_at.unwrap_or_else(unix_millis);
            state.store.take_frontend(&hash);
            state.store.upsert_abnormal(tx);
            if !state.store.mark_position(&wallet, &hash, TxPosition::Abnormal, direction) {
                state.store.append(
                    wallet,
                    OrderedIndexEntry::new(hash, timestamp, TxPosition::Abnormal, direction),
                );
            }
            self.metrics.demotions.increment(1);
            tracing::info!(target: "bridge_history::reconciler", %wallet, %hash, %reason, "transaction marked abnormal");
        }
        self.persist().await?;
        Ok(())
    }

    /// Switches the engine to another network.
    ///
    /// The store of the previous network is persisted, the store of `network` is loaded and the
    /// backend and verification caches are dropped.
    pub async fn switch_network(&self, network: Network) -> Result<(), ReconcileError> {
        let _lock = self.persist_lock.lock().await;
        if self.network() == network {
            return Ok(())
        }

        let store = self.storage.load(network).await?;
        let mut previous = {
            let mut state = self.state.lock();
            let previous = core::mem::replace(&mut *state, EngineState::new(store));
            previous.store
        };
        if previous.is_dirty() {
            self.storage.save(previous.snapshot()?).await?;
        }

        tracing::info!(target: "bridge_history::reconciler", from = %previous.network(), to = %network, "switched network");
        Ok(())
    }

    /// Queries the verification status of the backend withdrawals that have no counterpart yet,
    /// returning the count of newly verified withdrawals.
    pub async fn refresh_withdrawal_status(&self) -> usize {
        let Some(oracle) = &self.status_oracle else { return 0 };

        let pending: Vec<TxHash> = {
            let state = self.state.lock();
            state
                .backend
                .values()
                .filter(|tx| {
                    !tx.origin_is_l1 &&
                        tx.counterpart_hash.is_none() &&
                        !state.verified.contains(&tx.hash)
                })
                .map(|tx| tx.hash)
                .collect()
        };
        if pending.is_empty() {
            return 0
        }

        let results = join_all(pending.iter().map(|hash| oracle.withdrawal_status(*hash))).await;

        let mut state = self.state.lock();
        let mut verified = 0;
        for result in results {
            match result {
                Ok((hash, true)) => {
                    if state.verified.insert(hash) {
                        verified += 1;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(target: "bridge_history::reconciler", %err, "withdrawal status query failed");
                }
            }
        }
        verified
    }

    /// Writes a snapshot of the store if it changed since the last write.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _lock = self.persist_lock.lock().await;
        let (network, snapshot) = {
            let mut state = self.state.lock();
            if !state.store.is_dirty() {
                return Ok(())
            }
            (state.store.network(), state.store.snapshot()?)
        };

        if let Err(err) =
            self.retry.run(network.storage_key(), || self.storage.save(snapshot.clone())).await
        {
            self.metrics.persist_failures.increment(1);
            tracing::error!(target: "bridge_history::reconciler", %err, "failed to persist bridge history store");
            self.state.lock().store.mark_dirty();
            return Err(err)
        }
        Ok(())
    }

    /// Caches the backend records and promotes their hashes out of the optimistic and abnormal
    /// lists.
    fn apply_backend(&self, state: &mut EngineState, records: Vec<BridgeTransaction>) {
        for record in records {
            let hash = record.hash;
            let was_frontend = state.store.take_frontend(&hash).is_some();
            let was_abnormal = state.store.take_abnormal(&hash).is_some();

            if let Some((wallet, entry)) = state.store.locate(&hash) {
                if was_frontend || was_abnormal || entry.position == TxPosition::Frontend {
                    state.store.mark_position(&wallet, &hash, TxPosition::Backend, record.direction());
                    self.metrics.promotions.increment(1);
                    tracing::info!(target: "bridge_history::reconciler", %wallet, %hash, "transaction indexed by backend");
                }
            }
            state.backend.insert(hash, record);
        }
    }

    /// Logs the hashes of the wallet history the store does not hold yet at the backend
    /// position, then caches the records.
    fn apply_wallet_history(
        &self,
        state: &mut EngineState,
        wallet: Address,
        history: WalletHistory,
        now: u64,
    ) {
        state.wallet_totals.insert(wallet, history.total);
        for record in &history.records {
            let hash = record.hash;
            if state.store.locate(&hash).is_some() {
                continue
            }
            let timestamp = record.initiated_at.unwrap_or(now);
            let entry = OrderedIndexEntry::new(hash, timestamp, TxPosition::Backend, record.direction());
            for evicted in state.store.append(wallet, entry) {
                state.backend.remove(&evicted.hash);
                state.verified.remove(&evicted.hash);
            }
            tracing::debug!(target: "bridge_history::reconciler", %wallet, %hash, "indexed transaction logged from wallet history");
        }
        self.apply_backend(state, history.records);
    }

    /// Assumes failed the optimistic transactions older than the unconfirmed timeout.
    fn apply_timeouts(&self, state: &mut EngineState, now: u64) {
        let timeout = u64::try_from(self.config.unconfirmed_timeout.as_millis()).unwrap_or(u64::MAX);
        let expired: Vec<TxHash> = state
            .store
            .frontend_transactions()
            .iter()
            .filter(|tx| {
                !tx.is_assumed_failed() &&
                    tx.initiated_at.is_some_and(|at| now.saturating_sub(at) > timeout)
            })
            .map(|tx| tx.hash)
            .collect();

        for hash in expired {
            if let Some(tx) = state.store.frontend_mut(&hash) {
                tx.fail(FailureReason::Unconfirmed);
                self.metrics.timeouts.increment(1);
                tracing::info!(target: "bridge_history::reconciler", %hash, "optimistic transaction timed out");
            }
        }
    }

    /// Moves the optimistic transactions assumed failed to the abnormal list.
    fn apply_demotions(&self, state: &mut EngineState) {
        let failed: Vec<TxHash> = state
            .store
            .frontend_transactions()
            .iter()
            .filter(|tx| tx.is_assumed_failed())
            .map(|tx| tx.hash)
            .collect();

        for hash in failed {
            let Some(tx) = state.store.take_frontend(&hash) else { continue };
            let direction = tx.direction();
            state.store.upsert_abnormal(tx);
            if let Some((wallet, _)) = state.store.locate(&hash) {
                state.store.mark_position(&wallet, &hash, TxPosition::Abnormal, direction);
            }
            self.metrics.demotions.increment(1);
            tracing::info!(target: "bridge_history::reconciler", %hash, "optimistic transaction demoted to abnormal");
        }
    }

    /// Merges the sources of the page, refreshes their estimated times and derives their
    /// states.
    fn render(
        &self,
        state: &mut EngineState,
        wallet: Address,
        page: u64,
        page_size: u64,
        now: u64,
    ) -> HistoryPage {
        let (entries, logged) = state.store.page(&wallet, page, page_size);
        let total = logged.max(state.wallet_totals.get(&wallet).copied().unwrap_or_default());
        let hashes: HashSet<TxHash> = entries.iter().map(|entry| entry.hash).collect();

        let backend = hashes
            .iter()
            .filter_map(|hash| state.backend.get(hash).cloned().map(SourcedTransaction::Backend));
        let abnormal = state
            .store
            .abnormal_transactions()
            .iter()
            .filter(|tx| hashes.contains(&tx.hash))
            .cloned()
            .map(SourcedTransaction::Abnormal);
        let frontend = state
            .store
            .frontend_transactions()
            .iter()
            .filter(|tx| hashes.contains(&tx.hash))
            .cloned()
            .map(SourcedTransaction::Frontend);
        let merged = merge(&entries, backend.chain(abnormal).chain(frontend));

        if !merged.unresolved.is_empty() {
            self.metrics.unresolved_hashes.increment(merged.unresolved.len() as u64);
            tracing::debug!(target: "bridge_history::reconciler", %wallet, unresolved = ?merged.unresolved, "logged hashes without a record");
        }

        let heights = self.chain.heights();
        let last_finalized_batch = self.chain.last_finalized_batch();
        let mut transactions = Vec::with_capacity(merged.transactions.len());
        for (entry, source) in merged.transactions {
            let tx = source.into_transaction();
            if let Some(heights) = heights {
                refresh_etas(&mut state.store, &tx, heights, &self.config.eta, now);
            }
            let hash = tx.hash;
            let eta = EtaView {
                from: state.store.eta(&EtaKey::From(hash)),
                to: state.store.eta(&EtaKey::To(hash)),
                claim: state.store.eta(&EtaKey::Claim(hash)),
            };
            let claim = (!tx.origin_is_l1)
                .then(|| self.claim_state_of(state, &tx, last_finalized_batch));
            transactions.push(HistoryEntry::new(entry, tx, eta, claim));
        }

        HistoryPage { transactions, total }
    }

    /// Derives the claim state of the withdrawal under the configured claim variant.
    pub(crate) fn claim_state_of(
        &self,
        state: &EngineState,
        tx: &BridgeTransaction,
        last_finalized_batch: Option<u64>,
    ) -> ClaimState {
        ClaimState::derive(
            self.config.claim_variant,
            tx,
            state.store.claim_record(&tx.hash),
            last_finalized_batch,
            state.verified.contains(&tx.hash),
            self.config.manual_claim_threshold,
        )
    }
}

/// Refreshes the origin and destination estimates of the transfer.
///
/// A stored estimate is kept while it is non-zero and in the future. Estimates whose target
/// block is reached are dropped, as is the destination estimate of a deposit with a
/// counterpart.
fn refresh_etas(
    store: &mut BridgeStore,
    tx: &BridgeTransaction,
    heights: ChainHeights,
    config: &EtaConfig,
    now: u64,
) {
    let Some(origin_block) = tx.origin_block_number else { return };
    let hash = tx.hash;

    match tx.direction() {
        TxDirection::Deposit => {
            let target = origin_block.saturating_add(config.deposit_confirmations);
            let eta = estimate(now, heights.l1, target, config.l1_block_interval_ms);
            update_eta(store, EtaKey::From(hash), eta, now);
            if tx.counterpart_hash.is_some() {
                store.clear_eta(&EtaKey::To(hash));
            } else {
                update_eta(store, EtaKey::To(hash), eta, now);
            }
        }
        TxDirection::Withdraw => {
            let target = origin_block.saturating_add(config.withdraw_confirmations);
            let eta = estimate(now, heights.l2, target, config.l2_block_interval_ms);
            update_eta(store, EtaKey::From(hash), eta, now);
        }
    }
}

fn update_eta(store: &mut BridgeStore, key: EtaKey, eta: Option<u64>, now: u64) {
    match eta {
        None => {
            store.clear_eta(&key);
        }
        Some(eta) => {
            if store.eta(&key).is_some_and(|existing| existing != 0 && existing > now) {
                return
            }
            store.set_eta(key, eta);
        }
    }
}
