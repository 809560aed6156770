use std::collections::HashMap;

use entity::user::{self, InviteStatus};
use entity::invite_code;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use super::{page_bounds, Page, Store};
use crate::error::InviteError;
use crate::util::{now_ts, uuid_v4};

/// Profile handed over by the delegated-login provider.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IdentityProfile {
    pub external_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_template: Option<String>,
    pub trust_level: i32,
    pub active: bool,
    pub silenced: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserWithInvite {
    #[serde(flatten)]
    pub user: user::Model,
    pub invite_code: Option<String>,
    pub invite_used: Option<bool>,
    pub invite_email: Option<String>,
}

impl Store {
    /// Create or refresh a user from the identity provider.
    ///
    /// Attempts and invite status are only set on first insert.
    pub async fn sync_user(&self, profile: &IdentityProfile) -> Result<user::Model, InviteError> {
        let external_id = profile.external_id.trim();
        if external_id.is_empty() {
            return Err(InviteError::InvalidInput("external id is required".to_string()));
        }

        let now = now_ts();
        let row = user::ActiveModel {
            id: Set(uuid_v4()),
            external_id: Set(external_id.to_string()),
            username: Set(profile.username.trim().to_string()),
            display_name: Set(profile.display_name.clone()),
            avatar_template: Set(profile.avatar_template.clone()),
            trust_level: Set(profile.trust_level),
            active: Set(profile.active),
            silenced: Set(profile.silenced),
            attempts: Set(self.initial_attempts),
            invite_status: Set(InviteStatus::None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user::Entity::insert(row)
            .on_conflict(
                OnConflict::column(user::Column::ExternalId)
                    .update_columns([
                        user::Column::Username,
                        user::Column::DisplayName,
                        user::Column::AvatarTemplate,
                        user::Column::TrustLevel,
                        user::Column::Active,
                        user::Column::Silenced,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        user::Entity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await?
            .ok_or(InviteError::UserNotFound)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<user::Model, InviteError> {
        user::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(InviteError::UserNotFound)
    }

    /// Take one attempt, only if at least one is left.
    pub async fn consume_attempt(&self, user_id: &str) -> Result<(), InviteError> {
        let res = user::Entity::update_many()
            .col_expr(user::Column::Attempts, Expr::col(user::Column::Attempts).sub(1))
            .col_expr(user::Column::UpdatedAt, Expr::value(now_ts()))
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::Attempts.gt(0))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            self.get_user(user_id).await?;
            return Err(InviteError::NoAttemptsLeft);
        }
        Ok(())
    }

    /// Credit attempts back to a user.
    pub async fn add_attempts(&self, user_id: &str, delta: i32) -> Result<(), InviteError> {
        if delta < 0 {
            return Err(InviteError::InvalidInput("attempt credit must not be negative".to_string()));
        }

        let res = user::Entity::update_many()
            .col_expr(user::Column::Attempts, Expr::col(user::Column::Attempts).add(delta))
            .col_expr(user::Column::UpdatedAt, Expr::value(now_ts()))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(InviteError::UserNotFound);
        }
        Ok(())
    }

    /// Admin override of a user's attempts and/or invite status.
    pub async fn set_user_state(
        &self,
        user_id: &str,
        attempts: Option<i32>,
        invite_status: Option<InviteStatus>,
    ) -> Result<user::Model, InviteError> {
        if attempts.is_some_and(|a| a < 0) {
            return Err(InviteError::InvalidInput("attempts must not be negative".to_string()));
        }

        let mut update = user::Entity::update_many()
            .col_expr(user::Column::UpdatedAt, Expr::value(now_ts()))
            .filter(user::Column::Id.eq(user_id));
        if let Some(attempts) = attempts {
            update = update.col_expr(user::Column::Attempts, Expr::value(attempts));
        }
        if let Some(status) = invite_status {
            update = update.col_expr(user::Column::InviteStatus, Expr::value(status));
        }

        let res = update.exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(InviteError::UserNotFound);
        }
        self.get_user(user_id).await
    }

    /// Give every user without an invite exactly `attempts` draws.
    pub async fn reset_attempts_for_unwon(&self, attempts: i32) -> Result<u64, InviteError> {
        if attempts < 0 {
            return Err(InviteError::InvalidInput("attempts must not be negative".to_string()));
        }

        let res = user::Entity::update_many()
            .col_expr(user::Column::Attempts, Expr::value(attempts))
            .col_expr(user::Column::UpdatedAt, Expr::value(now_ts()))
            .filter(user::Column::InviteStatus.eq(InviteStatus::None))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Users newest first, each with their latest invite code.
    pub async fn list_users(&self, limit: u64, offset: u64) -> Result<Page<UserWithInvite>, InviteError> {
        let (limit, offset) = page_bounds(limit, offset);
        let total = user::Entity::find().count(&self.db).await?;
        let users = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        let mut latest: HashMap<String, invite_code::Model> = HashMap::new();
        if !users.is_empty() {
            let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
            let invites = invite_code::Entity::find()
                .filter(invite_code::Column::UserId.is_in(ids))
                .order_by_desc(invite_code::Column::CreatedAt)
                .all(&self.db)
                .await?;
            for invite in invites {
                if let Some(owner) = invite.user_id.clone() {
                    latest.entry(owner).or_insert(invite);
                }
            }
        }

        let items = users
            .into_iter()
            .map(|user| {
                let invite = latest.remove(&user.id);
                UserWithInvite {
                    invite_code: invite.as_ref().map(|i| i.code.clone()),
                    invite_used: invite.as_ref().map(|i| i.used),
                    invite_email: invite.and_then(|i| i.used_email),
                    user,
                }
            })
            .collect();

        Ok(Page { items, total })
    }
}
