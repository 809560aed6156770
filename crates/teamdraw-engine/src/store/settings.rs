use async_trait::async_trait;
use entity::app_setting;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait};

use super::Store;
use crate::cache::PrizeTableSource;
use crate::error::{InviteError, LoadError};
use crate::prize::{default_prize_table, validate_prize_table, PrizeConfigItem};
use crate::util::now_ts;

const PRIZE_CONFIG_KEY: &str = "prize_config";

impl Store {
    async fn read_prize_config(&self) -> Result<Vec<PrizeConfigItem>, sea_orm::DbErr> {
        let Some(row) = app_setting::Entity::find_by_id(PRIZE_CONFIG_KEY.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(default_prize_table());
        };

        match serde_json::from_str::<Vec<PrizeConfigItem>>(&row.value) {
            Ok(items) if !items.is_empty() => Ok(items),
            Ok(_) => Ok(default_prize_table()),
            Err(e) => {
                tracing::warn!(error = %e, "stored prize table is unreadable, using defaults");
                Ok(default_prize_table())
            }
        }
    }

    /// The persisted prize table, or the built-in default when none is stored.
    pub async fn load_prize_config(&self) -> Result<Vec<PrizeConfigItem>, InviteError> {
        Ok(self.read_prize_config().await?)
    }

    /// Validate and persist a new prize table.
    pub async fn update_prize_config(&self, items: &[PrizeConfigItem]) -> Result<(), InviteError> {
        validate_prize_table(items).map_err(InviteError::InvalidInput)?;
        let value = serde_json::to_string(items).map_err(|e| InviteError::InvalidInput(e.to_string()))?;

        let row = app_setting::ActiveModel {
            key: Set(PRIZE_CONFIG_KEY.to_string()),
            value: Set(value),
            updated_at: Set(now_ts()),
        };
        app_setting::Entity::insert(row)
            .on_conflict(
                OnConflict::column(app_setting::Column::Key)
                    .update_columns([app_setting::Column::Value, app_setting::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PrizeTableSource for Store {
    async fn load_prize_table(&self) -> Result<Vec<PrizeConfigItem>, LoadError> {
        Ok(self.read_prize_config().await?)
    }
}
