use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Redeemable invite code.
///
/// `used = true` always pairs with a non-empty `used_email`. Once `user_id`
/// is set it is never reassigned.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invite_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub code: String,

    pub used: bool,
    pub used_email: Option<String>,

    /// Unix timestamp (seconds).
    pub used_at: Option<i64>,

    /// Owner. Set at issuance for drawn codes, later for admin-issued ones.
    pub user_id: Option<String>,

    pub team_account_id: Option<String>,

    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::team_account::Entity",
        from = "Column::TeamAccountId",
        to = "super::team_account::Column::Id"
    )]
    TeamAccount,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::team_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
