use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users synced from the delegated-login provider.
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::ExternalId).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string())
                    .col(ColumnDef::new(Users::AvatarTemplate).string())
                    .col(ColumnDef::new(Users::TrustLevel).integer().not_null().default(0))
                    .col(ColumnDef::new(Users::Active).boolean().not_null().default(true))
                    .col(ColumnDef::new(Users::Silenced).boolean().not_null().default(false))
                    .col(ColumnDef::new(Users::Attempts).integer().not_null().default(0))
                    .col(ColumnDef::new(Users::InviteStatus).integer().not_null().default(0))
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_invite_status")
                    .table(Users::Table)
                    .col(Users::InviteStatus)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Delivery targets.
        manager
            .create_table(
                Table::create()
                    .table(TeamAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TeamAccounts::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(TeamAccounts::Name).string().not_null())
                    .col(ColumnDef::new(TeamAccounts::AccountId).string().not_null())
                    .col(ColumnDef::new(TeamAccounts::AuthToken).text().not_null())
                    .col(ColumnDef::new(TeamAccounts::MaxSeats).integer().not_null().default(50))
                    .col(ColumnDef::new(TeamAccounts::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(TeamAccounts::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Invite codes. The unique index on `code` is what makes issuance collision-safe.
        manager
            .create_table(
                Table::create()
                    .table(InviteCodes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(InviteCodes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(InviteCodes::Code).string().not_null().unique_key())
                    .col(ColumnDef::new(InviteCodes::Used).boolean().not_null().default(false))
                    .col(ColumnDef::new(InviteCodes::UsedEmail).string())
                    .col(ColumnDef::new(InviteCodes::UsedAt).big_integer())
                    .col(ColumnDef::new(InviteCodes::UserId).string())
                    .col(ColumnDef::new(InviteCodes::TeamAccountId).string())
                    .col(ColumnDef::new(InviteCodes::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invite_codes_user_id")
                            .from(InviteCodes::Table, InviteCodes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invite_codes_team_account_id")
                            .from(InviteCodes::Table, InviteCodes::TeamAccountId)
                            .to(TeamAccounts::Table, TeamAccounts::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invite_codes_user_id")
                    .table(InviteCodes::Table)
                    .col(InviteCodes::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Shared counters (quota).
        manager
            .create_table(
                Table::create()
                    .table(Counters::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Counters::Name).string().not_null().primary_key())
                    .col(ColumnDef::new(Counters::Value).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Counters::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Key/value settings (prize table).
        manager
            .create_table(
                Table::create()
                    .table(AppSettings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppSettings::Key).string().not_null().primary_key())
                    .col(ColumnDef::new(AppSettings::Value).text().not_null())
                    .col(ColumnDef::new(AppSettings::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Deferred quota change (singleton row).
        manager
            .create_table(
                Table::create()
                    .table(QuotaSchedules::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(QuotaSchedules::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(QuotaSchedules::Target).big_integer().not_null())
                    .col(ColumnDef::new(QuotaSchedules::ApplyAt).big_integer().not_null())
                    .col(ColumnDef::new(QuotaSchedules::Author).string().not_null())
                    .col(ColumnDef::new(QuotaSchedules::Message).text().not_null())
                    .col(ColumnDef::new(QuotaSchedules::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // The quota row must exist up front so issuance always has a row to lock.
        let seed = Query::insert()
            .into_table(Counters::Table)
            .columns([Counters::Name, Counters::Value, Counters::UpdatedAt])
            .values_panic(["quota".into(), 0i64.into(), 0i64.into()])
            .on_conflict(OnConflict::column(Counters::Name).do_nothing().to_owned())
            .to_owned();
        let db = manager.get_connection();
        db.execute(db.get_database_backend().build(&seed)).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotaSchedules::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppSettings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Counters::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InviteCodes::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TeamAccounts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    ExternalId,
    Username,
    DisplayName,
    AvatarTemplate,
    TrustLevel,
    Active,
    Silenced,
    Attempts,
    InviteStatus,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TeamAccounts {
    Table,
    Id,
    Name,
    AccountId,
    AuthToken,
    MaxSeats,
    Enabled,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InviteCodes {
    Table,
    Id,
    Code,
    Used,
    UsedEmail,
    UsedAt,
    UserId,
    TeamAccountId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Counters {
    Table,
    Name,
    Value,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AppSettings {
    Table,
    Key,
    Value,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum QuotaSchedules {
    Table,
    Id,
    Target,
    ApplyAt,
    Author,
    Message,
    CreatedAt,
}
