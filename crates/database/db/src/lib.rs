//! A library responsible for persisting the bridge history snapshots.

mod connection;
pub use connection::DatabaseConnectionProvider;

mod db;
pub use db::Database;

mod error;
pub use error::DatabaseError;

mod metrics;

mod models;
pub use models::*;

mod operations;
pub use operations::{DatabaseOperations, Snapshot};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use sea_orm::DbErr;
