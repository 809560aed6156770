use std::future::Future;

use entity::user::{self, InviteStatus};
use entity::{counter, invite_code};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, TransactionTrait,
};
use serde::Serialize;

use super::{lock_user, page_bounds, Page, Store, QUOTA_COUNTER};
use crate::delivery::DeliveryError;
use crate::error::InviteError;
use crate::util::{normalize_email, now_ts, uuid_v4};

/// How a caller identifies the invite code being redeemed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InviteRef {
    Id(String),
    Code(String),
}

impl InviteRef {
    fn select(&self) -> Select<invite_code::Entity> {
        match self {
            Self::Id(id) => invite_code::Entity::find_by_id(id.clone()),
            Self::Code(code) => invite_code::Entity::find().filter(invite_code::Column::Code.eq(code.trim())),
        }
    }
}

/// Result of a successful win: the bound code and the quota left after it.
#[derive(Clone, Debug, Serialize)]
pub struct IssuedInvite {
    pub invite: invite_code::Model,
    pub quota_remaining: i64,
}

async fn lock_invite<C: ConnectionTrait>(conn: &C, target: &InviteRef) -> Result<invite_code::Model, InviteError> {
    target
        .select()
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(InviteError::InviteNotFound)
}

async fn insert_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    user_id: Option<&str>,
    team_account_id: Option<&str>,
) -> Result<invite_code::Model, InviteError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(InviteError::InvalidInput("invite code must not be empty".to_string()));
    }

    let model = invite_code::Model {
        id: uuid_v4(),
        code: code.to_string(),
        used: false,
        used_email: None,
        used_at: None,
        user_id: user_id.map(str::to_string),
        team_account_id: team_account_id.map(str::to_string),
        created_at: now_ts(),
    };

    let row = invite_code::ActiveModel {
        id: Set(model.id.clone()),
        code: Set(model.code.clone()),
        used: Set(model.used),
        used_email: Set(None),
        used_at: Set(None),
        user_id: Set(model.user_id.clone()),
        team_account_id: Set(model.team_account_id.clone()),
        created_at: Set(model.created_at),
    };

    invite_code::Entity::insert(row)
        .exec_without_returning(conn)
        .await
        .map_err(InviteError::from_code_insert)?;

    Ok(model)
}

/// Move a user between invite states, only if they are still in `from`.
async fn transition_user<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    from: InviteStatus,
    to: InviteStatus,
) -> Result<(), InviteError> {
    let res = user::Entity::update_many()
        .col_expr(user::Column::InviteStatus, Expr::value(to))
        .col_expr(user::Column::UpdatedAt, Expr::value(now_ts()))
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::InviteStatus.eq(from))
        .exec(conn)
        .await?;

    if res.rows_affected == 0 {
        let actual = user::Entity::find_by_id(user_id.to_string())
            .one(conn)
            .await?
            .ok_or(InviteError::UserNotFound)?
            .invite_status;
        return Err(InviteError::UserStateViolation {
            user_id: user_id.to_string(),
            actual,
        });
    }
    Ok(())
}

impl Store {
    /// Debit the quota, bind `code` to the winner and mark them pending.
    ///
    /// Either all three changes commit or none do. A duplicate `code`
    /// surfaces as [`InviteError::CodeCollision`].
    pub async fn issue_invite_on_win(&self, user_id: &str, code: &str) -> Result<IssuedInvite, InviteError> {
        let txn = self.db.begin().await?;

        let user = lock_user(&txn, user_id).await?;
        let quota = counter::Entity::find_by_id(QUOTA_COUNTER.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?;
        if !quota.is_some_and(|q| q.value > 0) {
            return Err(InviteError::QuotaEmpty);
        }
        if user.invite_status != InviteStatus::None {
            return Err(InviteError::UserStateViolation {
                user_id: user.id,
                actual: user.invite_status,
            });
        }

        let debited = counter::Entity::update_many()
            .col_expr(counter::Column::Value, Expr::col(counter::Column::Value).sub(1))
            .col_expr(counter::Column::UpdatedAt, Expr::value(now_ts()))
            .filter(counter::Column::Name.eq(QUOTA_COUNTER))
            .filter(counter::Column::Value.gt(0))
            .exec(&txn)
            .await?;
        if debited.rows_affected == 0 {
            return Err(InviteError::QuotaEmpty);
        }

        transition_user(&txn, user_id, InviteStatus::None, InviteStatus::Pending).await?;
        let invite = insert_code(&txn, code, Some(user_id), None).await?;

        let quota_remaining = counter::Entity::find_by_id(QUOTA_COUNTER.to_string())
            .one(&txn)
            .await?
            .map_or(0, |q| q.value);

        txn.commit().await?;
        Ok(IssuedInvite { invite, quota_remaining })
    }

    /// Bind an unowned code to a user who has no invite yet.
    pub async fn assign_code_to_user(&self, code_id: &str, user_id: &str) -> Result<invite_code::Model, InviteError> {
        let txn = self.db.begin().await?;

        let invite = lock_invite(&txn, &InviteRef::Id(code_id.to_string())).await?;
        if invite.used {
            return Err(InviteError::AlreadyClaimed);
        }
        if invite.user_id.is_some() {
            return Err(InviteError::AlreadyAssigned);
        }
        lock_user(&txn, user_id).await?;

        let bound = invite_code::Entity::update_many()
            .col_expr(invite_code::Column::UserId, Expr::value(user_id))
            .filter(invite_code::Column::Id.eq(code_id))
            .filter(invite_code::Column::UserId.is_null())
            .exec(&txn)
            .await?;
        if bound.rows_affected == 0 {
            return Err(InviteError::AlreadyAssigned);
        }
        transition_user(&txn, user_id, InviteStatus::None, InviteStatus::Pending).await?;

        txn.commit().await?;
        Ok(invite_code::Model {
            user_id: Some(user_id.to_string()),
            ..invite
        })
    }

    /// Redeem a code for `user_id`, delivering it to `email` inside the transaction.
    ///
    /// The code row stays locked while `deliver` runs, so concurrent
    /// redemptions of the same code serialize and the loser sees
    /// [`InviteError::AlreadyClaimed`]. A delivery failure or timeout rolls
    /// everything back.
    pub async fn complete_redemption<F, Fut>(
        &self,
        target: &InviteRef,
        user_id: &str,
        email: &str,
        deliver: F,
    ) -> Result<invite_code::Model, InviteError>
    where
        F: FnOnce(invite_code::Model, String) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        let email = normalize_email(email).ok_or_else(|| InviteError::InvalidInput("invalid email".to_string()))?;

        let txn = self.db.begin().await?;

        let invite = lock_invite(&txn, target).await?;
        if invite.used {
            return Err(InviteError::AlreadyClaimed);
        }
        if invite.user_id.as_deref().is_some_and(|owner| owner != user_id) {
            return Err(InviteError::AlreadyAssigned);
        }
        let user = lock_user(&txn, user_id).await?;
        if user.invite_status == InviteStatus::Completed {
            return Err(InviteError::AlreadyCompleted);
        }

        match tokio::time::timeout(self.delivery_timeout, deliver(invite.clone(), email.clone())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(invite_id = %invite.id, status = ?e.status, "invite delivery failed");
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(invite_id = %invite.id, "invite delivery timed out");
                return Err(DeliveryError::timed_out(self.delivery_timeout).into());
            }
        }

        let now = now_ts();
        let mut row: invite_code::ActiveModel = invite.into();
        row.used = Set(true);
        row.used_email = Set(Some(email));
        row.used_at = Set(Some(now));
        row.user_id = Set(Some(user_id.to_string()));
        let redeemed = row.update(&txn).await?;

        user::Entity::update_many()
            .col_expr(user::Column::InviteStatus, Expr::value(InviteStatus::Completed))
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        tracing::info!(invite_id = %redeemed.id, user_id, "invite redeemed");
        Ok(redeemed)
    }

    /// Insert a code with no owner, optionally tied to a team account.
    pub async fn create_invite_code(
        &self,
        code: &str,
        team_account_id: Option<&str>,
    ) -> Result<invite_code::Model, InviteError> {
        insert_code(&self.db, code, None, team_account_id).await
    }

    /// Admin edit of a code's redemption state.
    ///
    /// Marking a code used requires an email; the owner, if any, follows
    /// to `Completed`, or back to `Pending` when the code is reopened.
    pub async fn update_invite_code(
        &self,
        code_id: &str,
        used: bool,
        email: Option<&str>,
    ) -> Result<invite_code::Model, InviteError> {
        let email = match (used, email) {
            (true, Some(raw)) => {
                Some(normalize_email(raw).ok_or_else(|| InviteError::InvalidInput("invalid email".to_string()))?)
            }
            (true, None) => return Err(InviteError::InvalidInput("email is required for a used code".to_string())),
            (false, _) => None,
        };

        let txn = self.db.begin().await?;
        let invite = lock_invite(&txn, &InviteRef::Id(code_id.to_string())).await?;
        let owner = invite.user_id.clone();
        if let Some(owner) = owner.as_deref() {
            lock_user(&txn, owner).await?;
        }

        let now = now_ts();
        let mut row: invite_code::ActiveModel = invite.into();
        row.used = Set(used);
        row.used_at = Set(used.then_some(now));
        row.used_email = Set(email);
        let updated = row.update(&txn).await?;

        if let Some(owner) = owner {
            let status = if used { InviteStatus::Completed } else { InviteStatus::Pending };
            user::Entity::update_many()
                .col_expr(user::Column::InviteStatus, Expr::value(status))
                .col_expr(user::Column::UpdatedAt, Expr::value(now))
                .filter(user::Column::Id.eq(owner))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete_invite_code(&self, code_id: &str) -> Result<(), InviteError> {
        let res = invite_code::Entity::delete_by_id(code_id.to_string()).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(InviteError::InviteNotFound);
        }
        Ok(())
    }

    pub async fn list_invite_codes(&self, limit: u64, offset: u64) -> Result<Page<invite_code::Model>, InviteError> {
        let (limit, offset) = page_bounds(limit, offset);
        let total = invite_code::Entity::find().count(&self.db).await?;
        let items = invite_code::Entity::find()
            .order_by_desc(invite_code::Column::CreatedAt)
            .order_by_desc(invite_code::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;
        Ok(Page { items, total })
    }

    pub async fn get_invite_by_code(&self, code: &str) -> Result<invite_code::Model, InviteError> {
        InviteRef::Code(code.to_string())
            .select()
            .one(&self.db)
            .await?
            .ok_or(InviteError::InviteNotFound)
    }

    pub async fn latest_invite_for_user(&self, user_id: &str) -> Result<Option<invite_code::Model>, InviteError> {
        Ok(invite_code::Entity::find()
            .filter(invite_code::Column::UserId.eq(user_id))
            .order_by_desc(invite_code::Column::CreatedAt)
            .order_by_desc(invite_code::Column::Id)
            .one(&self.db)
            .await?)
    }
}
