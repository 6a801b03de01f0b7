use crate::Snapshot;
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents the persisted state of one network.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "snapshot")]
pub struct Model {
    /// The storage key of the network.
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// The schema version of the payload.
    pub version: i32,
    /// The JSON payload.
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    /// The unix timestamp (ms) of the last write.
    pub updated_at: i64,
}

/// The relation for the snapshot model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the snapshot model.
impl ActiveModelBehavior for ActiveModel {}

impl From<Snapshot> for ActiveModel {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            key: ActiveValue::Set(snapshot.key),
            version: ActiveValue::Set(snapshot.version as i32),
            payload: ActiveValue::Set(snapshot.payload),
            updated_at: ActiveValue::Set(snapshot.updated_at as i64),
        }
    }
}

impl From<Model> for Snapshot {
    fn from(value: Model) -> Self {
        Self {
            key: value.key,
            version: value.version.max(0) as u32,
            payload: value.payload,
            updated_at: value.updated_at.max(0) as u64,
        }
    }
}
