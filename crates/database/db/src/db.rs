use super::DatabaseConnectionProvider;
use crate::{error::DatabaseError, metrics::DatabaseMetrics};

use sea_orm::{Database as SeaOrmDatabase, DatabaseConnection};

/// The [`Database`] struct is responsible for interacting with the database.
///
/// The [`Database`] type wraps a [`sea_orm::DatabaseConnection`]. We implement
/// [`DatabaseConnectionProvider`] for [`Database`] such that it can be used to perform the
/// operations defined in [`crate::DatabaseOperations`].
#[derive(Debug)]
pub struct Database {
    /// The underlying database connection.
    connection: DatabaseConnection,
    /// The database metrics.
    pub(crate) metrics: DatabaseMetrics,
}

impl Database {
    /// Creates a new [`Database`] instance associated with the provided database URL.
    pub async fn new(database_url: &str) -> Result<Self, DatabaseError> {
        tracing::info!(target: "bridge_history::db", database_url, "connecting to database");
        let connection = SeaOrmDatabase::connect(database_url).await?;
        Ok(connection.into())
    }
}

impl DatabaseConnectionProvider for Database {
    type Connection = DatabaseConnection;

    fn get_connection(&self) -> &Self::Connection {
        &self.connection
    }
}

impl From<DatabaseConnection> for Database {
    fn from(connection: DatabaseConnection) -> Self {
        Self { connection, metrics: DatabaseMetrics::default() }
    }
}

#[cfg(test)]
mod test {
    use crate::{operations::DatabaseOperations, test_utils::setup_test_db, Snapshot};

    fn snapshot(key: &str, version: u32, payload: &str) -> Snapshot {
        Snapshot { key: key.to_owned(), version, payload: payload.to_owned(), updated_at: 42 }
    }

    #[tokio::test]
    async fn test_database_round_trip_snapshot() {
        // Set up the test database.
        let db = setup_test_db().await;

        // Nothing is stored yet.
        assert!(db.get_snapshot("bridge-history/mainnet").await.unwrap().is_none());

        // Round trip the snapshot through the database.
        let expected = snapshot("bridge-history/mainnet", 2, r#"{"version":2}"#);
        db.upsert_snapshot(expected.clone()).await.unwrap();
        let stored = db.get_snapshot("bridge-history/mainnet").await.unwrap().unwrap();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn test_database_upsert_overwrites() {
        // Set up the test database.
        let db = setup_test_db().await;

        db.upsert_snapshot(snapshot("bridge-history/testnet", 1, "{}")).await.unwrap();
        db.upsert_snapshot(snapshot("bridge-history/testnet", 2, r#"{"a":1}"#)).await.unwrap();

        let stored = db.get_snapshot("bridge-history/testnet").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.payload, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_database_snapshots_partitioned_by_key() {
        // Set up the test database.
        let db = setup_test_db().await;

        db.upsert_snapshot(snapshot("bridge-history/mainnet", 2, "mainnet")).await.unwrap();
        db.upsert_snapshot(snapshot("bridge-history/testnet", 2, "testnet")).await.unwrap();
        db.delete_snapshot("bridge-history/testnet").await.unwrap();

        assert!(db.get_snapshot("bridge-history/testnet").await.unwrap().is_none());
        let mainnet = db.get_snapshot("bridge-history/mainnet").await.unwrap().unwrap();
        assert_eq!(mainnet.payload, "mainnet");
    }
}
