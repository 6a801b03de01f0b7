//! Primitive types for the bridge history tracker.

pub use block::ChainHeights;
mod block;

pub use claim::{ClaimInfo, ClaimRecord, ClaimRecordStatus, FinalizeParams};
mod claim;

pub use eta::{estimate, EtaConfig, EtaKey, EtaKeyParseError, ETA_VALIDITY_BOUND_MS};
mod eta;

pub use network::{Network, NetworkParseError};
mod network;

pub use status::TxStatus;
mod status;

pub use time::unix_millis;
mod time;

pub use transaction::{
    AssumedStatus, BridgeTransaction, FailureReason, OrderedIndexEntry, TokenInfo, TxDirection,
    TxPosition,
};
mod transaction;
