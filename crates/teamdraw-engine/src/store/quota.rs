use entity::{counter, quota_schedule};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait};
use serde::Deserialize;

use super::{Store, QUOTA_COUNTER};
use crate::error::InviteError;
use crate::util::now_ts;

/// Only one deferred change can be pending at a time.
const SCHEDULE_ID: i32 = 1;

#[derive(Clone, Debug, Deserialize)]
pub struct NewQuotaSchedule {
    pub target: i64,
    /// Unix timestamp (seconds).
    pub apply_at: i64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub message: String,
}

impl Store {
    /// Remaining winnable invites. A missing counter reads as zero.
    pub async fn get_quota(&self) -> Result<i64, InviteError> {
        Ok(counter::Entity::find_by_id(QUOTA_COUNTER.to_string())
            .one(&self.db)
            .await?
            .map_or(0, |row| row.value))
    }

    /// Overwrite the quota counter.
    pub async fn update_quota(&self, value: i64) -> Result<(), InviteError> {
        if value < 0 {
            return Err(InviteError::InvalidInput("quota must not be negative".to_string()));
        }

        let row = counter::ActiveModel {
            name: Set(QUOTA_COUNTER.to_string()),
            value: Set(value),
            updated_at: Set(now_ts()),
        };
        counter::Entity::insert(row)
            .on_conflict(
                OnConflict::column(counter::Column::Name)
                    .update_columns([counter::Column::Value, counter::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        tracing::info!(quota = value, "quota updated");
        Ok(())
    }

    /// Replace the pending quota change.
    pub async fn save_quota_schedule(&self, req: &NewQuotaSchedule) -> Result<quota_schedule::Model, InviteError> {
        if req.target < 0 {
            return Err(InviteError::InvalidInput("quota must not be negative".to_string()));
        }

        let model = quota_schedule::Model {
            id: SCHEDULE_ID,
            target: req.target,
            apply_at: req.apply_at,
            author: req.author.trim().to_string(),
            message: req.message.trim().to_string(),
            created_at: now_ts(),
        };
        let row = quota_schedule::ActiveModel {
            id: Set(model.id),
            target: Set(model.target),
            apply_at: Set(model.apply_at),
            author: Set(model.author.clone()),
            message: Set(model.message.clone()),
            created_at: Set(model.created_at),
        };
        quota_schedule::Entity::insert(row)
            .on_conflict(
                OnConflict::column(quota_schedule::Column::Id)
                    .update_columns([
                        quota_schedule::Column::Target,
                        quota_schedule::Column::ApplyAt,
                        quota_schedule::Column::Author,
                        quota_schedule::Column::Message,
                        quota_schedule::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(model)
    }

    pub async fn load_quota_schedule(&self) -> Result<Option<quota_schedule::Model>, InviteError> {
        Ok(quota_schedule::Entity::find_by_id(SCHEDULE_ID).one(&self.db).await?)
    }

    pub async fn clear_quota_schedule(&self) -> Result<(), InviteError> {
        quota_schedule::Entity::delete_by_id(SCHEDULE_ID).exec(&self.db).await?;
        Ok(())
    }
}
