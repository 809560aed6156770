use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Draw audit trail. `spin_id` is the client idempotency key.
        manager
            .create_table(
                Table::create()
                    .table(SpinRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SpinRecords::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(SpinRecords::UserId).string().not_null())
                    .col(ColumnDef::new(SpinRecords::Username).string().not_null())
                    .col(ColumnDef::new(SpinRecords::PrizeName).string().not_null())
                    .col(ColumnDef::new(SpinRecords::Status).string().not_null())
                    .col(ColumnDef::new(SpinRecords::Detail).text().not_null().default(""))
                    .col(ColumnDef::new(SpinRecords::SpinId).string().not_null().unique_key())
                    .col(ColumnDef::new(SpinRecords::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_spin_records_created_at")
                    .table(SpinRecords::Table)
                    .col(SpinRecords::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_spin_records_user_id")
                    .table(SpinRecords::Table)
                    .col(SpinRecords::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SpinRecords::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SpinRecords {
    Table,
    Id,
    UserId,
    Username,
    PrizeName,
    Status,
    Detail,
    SpinId,
    CreatedAt,
}
