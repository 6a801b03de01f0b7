use super::{models, DatabaseError};
use crate::{Database, DatabaseConnectionProvider};

use sea_orm::{sea_query::OnConflict, ConnectionTrait, EntityTrait};
use std::time::Instant;

/// A persisted payload stored under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The storage key.
    pub key: String,
    /// The schema version of the payload.
    pub version: u32,
    /// The serialized payload.
    pub payload: String,
    /// The unix timestamp (ms) of the write.
    pub updated_at: u64,
}

/// The [`DatabaseOperations`] trait provides methods for interacting with the database.
#[async_trait::async_trait]
pub trait DatabaseOperations: DatabaseConnectionProvider + Sync {
    /// Get the [`Snapshot`] stored under `key`.
    async fn get_snapshot(&self, key: &str) -> Result<Option<Snapshot>, DatabaseError> {
        Ok(models::snapshot::Entity::find_by_id(key.to_owned())
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Insert or replace the [`Snapshot`] stored under its key.
    async fn upsert_snapshot(&self, snapshot: Snapshot) -> Result<(), DatabaseError> {
        write_snapshot(self.get_connection(), snapshot).await
    }

    /// Delete the [`Snapshot`] stored under `key`.
    async fn delete_snapshot(&self, key: &str) -> Result<(), DatabaseError> {
        tracing::trace!(target: "bridge_history::db", key, "Deleting snapshot.");
        models::snapshot::Entity::delete_by_id(key.to_owned()).exec(self.get_connection()).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DatabaseOperations for Database {
    async fn upsert_snapshot(&self, snapshot: Snapshot) -> Result<(), DatabaseError> {
        let start = Instant::now();
        write_snapshot(self.get_connection(), snapshot).await?;

        self.metrics.snapshot_writes.increment(1);
        self.metrics.snapshot_write_duration.record(start.elapsed().as_secs_f64() * 1000.0);
        Ok(())
    }
}

async fn write_snapshot<C: ConnectionTrait + Sync>(
    connection: &C,
    snapshot: Snapshot,
) -> Result<(), DatabaseError> {
    tracing::trace!(target: "bridge_history::db", key = snapshot.key, version = snapshot.version, bytes = snapshot.payload.len(), "Upserting snapshot.");
    let model: models::snapshot::ActiveModel = snapshot.into();
    models::snapshot::Entity::insert(model)
        .on_conflict(
            OnConflict::column(models::snapshot::Column::Key)
                .update_columns([
                    models::snapshot::Column::Version,
                    models::snapshot::Column::Payload,
                    models::snapshot::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(connection)
        .await?;
    Ok(())
}
