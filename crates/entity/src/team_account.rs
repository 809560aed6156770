use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Target account that invites are delivered into.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    /// Account identifier on the delivery side.
    pub account_id: String,

    #[serde(skip_serializing)]
    pub auth_token: String,

    pub max_seats: i32,
    pub enabled: bool,

    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
