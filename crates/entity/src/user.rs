use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a user stands in the invite lifecycle.
///
/// Transitions only move forward (`None -> Pending -> Completed`) outside of
/// explicit admin overrides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    #[sea_orm(num_value = 0)]
    None,
    /// Holds an invite code that has not been redeemed yet.
    #[sea_orm(num_value = 1)]
    Pending,
    #[sea_orm(num_value = 2)]
    Completed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Stable identifier from the delegated-login provider.
    #[sea_orm(unique)]
    pub external_id: String,

    pub username: String,
    pub display_name: Option<String>,
    pub avatar_template: Option<String>,
    pub trust_level: i32,
    pub active: bool,
    pub silenced: bool,

    /// Remaining draws. Never negative.
    pub attempts: i32,

    pub invite_status: InviteStatus,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds).
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invite_code::Entity")]
    InviteCode,
}

impl Related<super::invite_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InviteCode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
