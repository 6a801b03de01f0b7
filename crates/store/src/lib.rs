//! The durable store of the bridge history tracker.
//!
//! A [`BridgeStore`] holds the state of one network: the capped per-wallet ordered logs, the
//! optimistic and abnormal transaction lists, the estimated-time map and the claim records. It
//! is persisted as a versioned JSON [`PersistedState`] through a [`SnapshotStorage`].

pub use error::StoreError;
mod error;

mod metrics;

pub use schema::{migrate, PersistedState, WalletLog, SCHEMA_VERSION};
mod schema;

pub use storage::SnapshotStorage;
mod storage;

pub use store::{BridgeStore, EVICTION_BATCH_SIZE, MAX_LIMIT};
mod store;
