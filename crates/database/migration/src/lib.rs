//! The schema migrations of the bridge history database.

pub use sea_orm_migration::prelude::*;

mod m20251017_000001_create_snapshot_table;

/// The migrator of the bridge history database.
#[derive(Debug)]
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20251017_000001_create_snapshot_table::Migration)]
    }
}
