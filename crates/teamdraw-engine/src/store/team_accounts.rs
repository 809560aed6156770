use entity::team_account;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;

use super::Store;
use crate::error::InviteError;
use crate::util::{now_ts, uuid_v4};

#[derive(Clone, Debug, Deserialize)]
pub struct TeamAccountInput {
    pub name: String,
    pub account_id: String,
    pub auth_token: String,
    #[serde(default)]
    pub max_seats: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl TeamAccountInput {
    fn validate(&self) -> Result<(), InviteError> {
        if self.name.trim().is_empty() || self.account_id.trim().is_empty() || self.auth_token.trim().is_empty() {
            return Err(InviteError::InvalidInput(
                "team account needs a name, account id and token".to_string(),
            ));
        }
        if self.max_seats < 0 {
            return Err(InviteError::InvalidInput("max seats must not be negative".to_string()));
        }
        Ok(())
    }
}

fn unknown_account(id: &str) -> InviteError {
    InviteError::InvalidInput(format!("unknown team account {id}"))
}

impl Store {
    pub async fn create_team_account(&self, input: &TeamAccountInput) -> Result<team_account::Model, InviteError> {
        input.validate()?;
        let row = team_account::ActiveModel {
            id: Set(uuid_v4()),
            name: Set(input.name.trim().to_string()),
            account_id: Set(input.account_id.trim().to_string()),
            auth_token: Set(input.auth_token.trim().to_string()),
            max_seats: Set(input.max_seats),
            enabled: Set(input.enabled),
            created_at: Set(now_ts()),
        };
        Ok(row.insert(&self.db).await?)
    }

    pub async fn get_team_account(&self, id: &str) -> Result<team_account::Model, InviteError> {
        team_account::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| unknown_account(id))
    }

    pub async fn list_team_accounts(&self) -> Result<Vec<team_account::Model>, InviteError> {
        Ok(team_account::Entity::find()
            .order_by_asc(team_account::Column::CreatedAt)
            .order_by_asc(team_account::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Enabled accounts in creation order, the candidates for delivery.
    pub async fn list_enabled_team_accounts(&self) -> Result<Vec<team_account::Model>, InviteError> {
        Ok(team_account::Entity::find()
            .filter(team_account::Column::Enabled.eq(true))
            .order_by_asc(team_account::Column::CreatedAt)
            .order_by_asc(team_account::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_team_account(
        &self,
        id: &str,
        input: &TeamAccountInput,
    ) -> Result<team_account::Model, InviteError> {
        input.validate()?;
        let mut row: team_account::ActiveModel = self.get_team_account(id).await?.into();
        row.name = Set(input.name.trim().to_string());
        row.account_id = Set(input.account_id.trim().to_string());
        row.auth_token = Set(input.auth_token.trim().to_string());
        row.max_seats = Set(input.max_seats);
        row.enabled = Set(input.enabled);
        Ok(row.update(&self.db).await?)
    }

    pub async fn delete_team_account(&self, id: &str) -> Result<(), InviteError> {
        let res = team_account::Entity::delete_by_id(id.to_string()).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(unknown_account(id));
        }
        Ok(())
    }
}
