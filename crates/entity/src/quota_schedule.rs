use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pending deferred quota change. At most one row exists (`id = 1`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quota_schedules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    /// Quota value to set once `apply_at` has passed.
    pub target: i64,

    /// Unix timestamp (seconds).
    pub apply_at: i64,

    pub author: String,
    pub message: String,

    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
