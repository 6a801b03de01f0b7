use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub(crate) struct Migration;

#[allow(elided_lifetimes_in_paths)]
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Snapshot::Table)
                    .if_not_exists()
                    .col(string(Snapshot::Key).primary_key())
                    .col(integer(Snapshot::Version))
                    .col(text(Snapshot::Payload))
                    .col(big_integer(Snapshot::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Snapshot::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Snapshot {
    Table,
    Key,
    Version,
    Payload,
    UpdatedAt,
}
