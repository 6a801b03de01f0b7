use crate::{metrics::StoreMetrics, PersistedState, StoreError, WalletLog, SCHEMA_VERSION};

use alloy_primitives::{Address, TxHash};
use bridge_history_db::Snapshot;
use bridge_history_primitives::{
    unix_millis, BridgeTransaction, ClaimRecord, EtaKey, Network, OrderedIndexEntry, TxDirection,
    TxPosition,
};
use std::collections::BTreeMap;

/// The maximum count of log entries across all wallets of a network.
pub const MAX_LIMIT: usize = 1000;

/// The count of entries evicted from the most populated wallet when the cap is reached.
pub const EVICTION_BATCH_SIZE: usize = 3;

/// The state of one network.
///
/// Every mutation is a synchronous read-modify-write on the owned state. Callers share the store
/// behind a lock and never hold it across an await point.
#[derive(Debug)]
pub struct BridgeStore {
    network: Network,
    /// The per-wallet logs, newest first.
    ordered_index: BTreeMap<Address, Vec<OrderedIndexEntry>>,
    frontend: Vec<BridgeTransaction>,
    abnormal: Vec<BridgeTransaction>,
    estimated_times: BTreeMap<EtaKey, u64>,
    claim_records: BTreeMap<TxHash, ClaimRecord>,
    /// Set when the state changed since the last snapshot.
    dirty: bool,
    metrics: StoreMetrics,
}

impl BridgeStore {
    /// Returns an empty store for the network.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ordered_index: BTreeMap::new(),
            frontend: Vec::new(),
            abnormal: Vec::new(),
            estimated_times: BTreeMap::new(),
            claim_records: BTreeMap::new(),
            dirty: false,
            metrics: StoreMetrics::default(),
        }
    }

    /// Restores a store from its persisted state. Invalid estimated time keys are dropped.
    pub fn from_persisted(network: Network, state: PersistedState) -> Self {
        let mut store = Self::new(network);
        for WalletLog { wallet, mut entries } in state.ordered_index {
            entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            store.ordered_index.insert(wallet, entries);
        }
        store.frontend = state.frontend_transactions;
        store.abnormal = state.abnormal_transactions;
        store.estimated_times = state
            .estimated_time_map
            .into_iter()
            .filter_map(|(key, eta)| match key.parse::<EtaKey>() {
                Ok(key) => Some((key, eta)),
                Err(err) => {
                    tracing::warn!(target: "bridge_history::store", %err, "dropping estimated time");
                    None
                }
            })
            .collect();
        store.claim_records =
            state.claim_records.into_iter().map(|record| (record.hash, record)).collect();
        store.metrics.entries.set(store.total_entries() as f64);
        store
    }

    /// Returns the persisted state of the store.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            version: SCHEMA_VERSION,
            ordered_index: self
                .ordered_index
                .iter()
                .map(|(wallet, entries)| WalletLog { wallet: *wallet, entries: entries.clone() })
                .collect(),
            frontend_transactions: self.frontend.clone(),
            abnormal_transactions: self.abnormal.clone(),
            estimated_time_map: self
                .estimated_times
                .iter()
                .map(|(key, eta)| (key.to_string(), *eta))
                .collect(),
            claim_records: self.claim_records.values().cloned().collect(),
        }
    }

    /// Serializes the store into a [`Snapshot`] under the network's storage key and clears the
    /// dirty flag.
    pub fn snapshot(&mut self) -> Result<Snapshot, StoreError> {
        let payload = serde_json::to_string(&self.to_persisted())?;
        self.dirty = false;
        Ok(Snapshot {
            key: self.network.storage_key().to_owned(),
            version: SCHEMA_VERSION as u32,
            payload,
            updated_at: unix_millis(),
        })
    }

    /// The network of the store.
    pub const fn network(&self) -> Network {
        self.network
    }

    /// Returns true if the store changed since the last snapshot.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flags the store as changed, for instance after a failed snapshot write.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns the count of log entries across all wallets.
    pub fn total_entries(&self) -> usize {
        self.ordered_index.values().map(Vec::len).sum()
    }

    /// Returns the wallet's log, newest first.
    pub fn wallet_entries(&self, wallet: &Address) -> &[OrderedIndexEntry] {
        self.ordered_index.get(wallet).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the 1-based page of the wallet's log along with the log length. Page `0` is
    /// treated as the first page.
    pub fn page(
        &self,
        wallet: &Address,
        page: u64,
        page_size: u64,
    ) -> (Vec<OrderedIndexEntry>, u64) {
        let entries = self.wallet_entries(wallet);
        let skip = page.max(1).saturating_sub(1).saturating_mul(page_size);
        let page = entries
            .iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .copied()
            .collect();
        (page, entries.len() as u64)
    }

    /// Returns the wallet and log entry of the hash.
    pub fn locate(&self, hash: &TxHash) -> Option<(Address, OrderedIndexEntry)> {
        self.ordered_index.iter().find_map(|(wallet, entries)| {
            entries.iter().find(|entry| entry.hash == *hash).map(|entry| (*wallet, *entry))
        })
    }

    /// Appends the entry to the wallet's log, keeping the log ordered by timestamp descending.
    ///
    /// Hashes are unique across the wallets of a network: an entry whose hash is already logged
    /// replaces the existing entry, moving it to `wallet` if it was logged for another wallet.
    /// If the insertion would exceed [`MAX_LIMIT`], the oldest [`EVICTION_BATCH_SIZE`] entries
    /// of the most populated wallet are evicted first. Returns the evicted entries.
    pub fn append(&mut self, wallet: Address, entry: OrderedIndexEntry) -> Vec<OrderedIndexEntry> {
        self.dirty = true;
        if let Some((owner, _)) = self.locate(&entry.hash) {
            self.remove(&owner, &entry.hash);
            if owner != wallet {
                tracing::debug!(target: "bridge_history::store", from = %owner, to = %wallet, hash = ?entry.hash, "moved log entry to another wallet");
            }
            insert_ordered(self.ordered_index.entry(wallet).or_default(), entry);
            self.metrics.entries.set(self.total_entries() as f64);
            return Vec::new()
        }

        let evicted =
            if self.total_entries() >= MAX_LIMIT { self.evict() } else { Vec::new() };

        insert_ordered(self.ordered_index.entry(wallet).or_default(), entry);
        self.metrics.appends.increment(1);
        self.metrics.entries.set(self.total_entries() as f64);
        tracing::trace!(target: "bridge_history::store", %wallet, hash = ?entry.hash, position = %entry.position, "appended log entry");

        evicted
    }

    /// Evicts the oldest entries of the most populated wallet. Ties resolve to the lowest
    /// wallet address.
    fn evict(&mut self) -> Vec<OrderedIndexEntry> {
        let Some(wallet) = self
            .ordered_index
            .iter()
            .max_by(|(a_wallet, a), (b_wallet, b)| a.len().cmp(&b.len()).then(b_wallet.cmp(a_wallet)))
            .map(|(wallet, _)| *wallet)
        else {
            return Vec::new()
        };
        let Some(entries) = self.ordered_index.get_mut(&wallet) else { return Vec::new() };

        let keep = entries.len().saturating_sub(EVICTION_BATCH_SIZE);
        let evicted = entries.split_off(keep);
        if entries.is_empty() {
            self.ordered_index.remove(&wallet);
        }
        for entry in &evicted {
            self.purge(&entry.hash);
        }

        self.metrics.evictions.increment(evicted.len() as u64);
        tracing::info!(target: "bridge_history::store", %wallet, count = evicted.len(), "evicted oldest log entries");
        evicted
    }

    /// Drops every record of the hash outside of the ordered index.
    fn purge(&mut self, hash: &TxHash) {
        self.abnormal.retain(|tx| tx.hash != *hash);
        self.frontend.retain(|tx| tx.hash != *hash);
        self.estimated_times.retain(|key, _| key.hash() != *hash);
        self.claim_records.remove(hash);
    }

    /// Updates the position and direction of the wallet's entry for the hash. Returns false if
    /// the hash is not logged for the wallet.
    pub fn mark_position(
        &mut self,
        wallet: &Address,
        hash: &TxHash,
        position: TxPosition,
        direction: TxDirection,
    ) -> bool {
        let Some(entry) = self
            .ordered_index
            .get_mut(wallet)
            .and_then(|entries| entries.iter_mut().find(|entry| entry.hash == *hash))
        else {
            return false
        };
        if entry.position != position || entry.direction != direction {
            tracing::trace!(target: "bridge_history::store", %wallet, ?hash, from = %entry.position, to = %position, "marked log entry");
            entry.position = position;
            entry.direction = direction;
            self.dirty = true;
        }
        true
    }

    /// Removes the wallet's entry for the hash.
    pub fn remove(&mut self, wallet: &Address, hash: &TxHash) -> Option<OrderedIndexEntry> {
        let entries = self.ordered_index.get_mut(wallet)?;
        let index = entries.iter().position(|entry| entry.hash == *hash)?;
        let entry = entries.remove(index);
        if entries.is_empty() {
            self.ordered_index.remove(wallet);
        }
        self.dirty = true;
        self.metrics.entries.set(self.total_entries() as f64);
        Some(entry)
    }

    /// Returns the optimistic transactions.
    pub fn frontend_transactions(&self) -> &[BridgeTransaction] {
        &self.frontend
    }

    /// Returns the optimistic transaction for the hash.
    pub fn frontend(&self, hash: &TxHash) -> Option<&BridgeTransaction> {
        self.frontend.iter().find(|tx| tx.hash == *hash)
    }

    /// Returns a mutable reference to the optimistic transaction for the hash.
    pub fn frontend_mut(&mut self, hash: &TxHash) -> Option<&mut BridgeTransaction> {
        let tx = self.frontend.iter_mut().find(|tx| tx.hash == *hash)?;
        self.dirty = true;
        Some(tx)
    }

    /// Inserts or replaces the optimistic transaction.
    pub fn upsert_frontend(&mut self, tx: BridgeTransaction) {
        upsert(&mut self.frontend, tx);
        self.dirty = true;
    }

    /// Removes and returns the optimistic transaction for the hash.
    pub fn take_frontend(&mut self, hash: &TxHash) -> Option<BridgeTransaction> {
        let tx = take(&mut self.frontend, hash)?;
        self.dirty = true;
        Some(tx)
    }

    /// Returns the abnormal transactions.
    pub fn abnormal_transactions(&self) -> &[BridgeTransaction] {
        &self.abnormal
    }

    /// Returns the abnormal transaction for the hash.
    pub fn abnormal(&self, hash: &TxHash) -> Option<&BridgeTransaction> {
        self.abnormal.iter().find(|tx| tx.hash == *hash)
    }

    /// Inserts or replaces the abnormal transaction.
    pub fn upsert_abnormal(&mut self, tx: BridgeTransaction) {
        upsert(&mut self.abnormal, tx);
        self.dirty = true;
    }

    /// Removes and returns the abnormal transaction for the hash.
    pub fn take_abnormal(&mut self, hash: &TxHash) -> Option<BridgeTransaction> {
        let tx = take(&mut self.abnormal, hash)?;
        self.dirty = true;
        Some(tx)
    }

    /// Returns the estimated time for the key.
    pub fn eta(&self, key: &EtaKey) -> Option<u64> {
        self.estimated_times.get(key).copied()
    }

    /// Returns the estimated time map.
    pub const fn estimated_times(&self) -> &BTreeMap<EtaKey, u64> {
        &self.estimated_times
    }

    /// Sets the estimated time for the key.
    pub fn set_eta(&mut self, key: EtaKey, eta: u64) {
        if self.estimated_times.insert(key, eta) != Some(eta) {
            self.dirty = true;
        }
    }

    /// Clears the estimated time for the key.
    pub fn clear_eta(&mut self, key: &EtaKey) -> Option<u64> {
        let eta = self.estimated_times.remove(key)?;
        self.dirty = true;
        Some(eta)
    }

    /// Returns the claim record of the withdrawal.
    pub fn claim_record(&self, hash: &TxHash) -> Option<&ClaimRecord> {
        self.claim_records.get(hash)
    }

    /// Returns the claim records.
    pub fn claim_records(&self) -> impl Iterator<Item = &ClaimRecord> {
        self.claim_records.values()
    }

    /// Removes the claim record of the withdrawal.
    pub fn remove_claim_record(&mut self, hash: &TxHash) -> Option<ClaimRecord> {
        let record = self.claim_records.remove(hash)?;
        self.dirty = true;
        Some(record)
    }

    /// Inserts or replaces the claim record.
    pub fn upsert_claim_record(&mut self, record: ClaimRecord) {
        if self.claim_records.get(&record.hash) != Some(&record) {
            self.claim_records.insert(record.hash, record);
            self.dirty = true;
        }
    }
}

/// Inserts the entry after every entry with a greater or equal timestamp.
fn insert_ordered(entries: &mut Vec<OrderedIndexEntry>, entry: OrderedIndexEntry) {
    let index = entries.partition_point(|e| e.timestamp >= entry.timestamp);
    entries.insert(index, entry);
}

fn upsert(list: &mut Vec<BridgeTransaction>, tx: BridgeTransaction) {
    match list.iter_mut().find(|existing| existing.hash == tx.hash) {
        Some(existing) => *existing = tx,
        None => list.push(tx),
    }
}

fn take(list: &mut Vec<BridgeTransaction>, hash: &TxHash) -> Option<BridgeTransaction> {
    let index = list.iter().position(|tx| tx.hash == *hash)?;
    Some(list.remove(index))
}
