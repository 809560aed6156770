use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit row for one draw. Written as an upsert keyed by `spin_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "spin_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,
    pub username: String,
    pub prize_name: String,

    /// `win`, `retry` or `lose`.
    pub status: String,

    pub detail: String,

    /// Client idempotency key.
    #[sea_orm(unique)]
    pub spin_id: String,

    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
