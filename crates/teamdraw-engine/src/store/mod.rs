//! Transactional access to users, the shared quota, and invite codes.
//!
//! Every mutating operation on these three pieces of shared state runs in a
//! single database transaction. Rows are locked in one global order:
//! invite code, then user, then quota counter.

use std::time::Duration;

use entity::user;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, QuerySelect};
use serde::Serialize;

use crate::error::InviteError;

mod invites;
mod quota;
mod settings;
mod spins;
mod team_accounts;
mod users;

pub use invites::{InviteRef, IssuedInvite};
pub use quota::NewQuotaSchedule;
pub use spins::{HourlySummary, NewSpinRecord, SpinOverview, SpinStats};
pub use team_accounts::TeamAccountInput;
pub use users::{IdentityProfile, UserWithInvite};

/// Counter row holding the remaining winnable invites.
pub const QUOTA_COUNTER: &str = "quota";

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 200;

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Clone)]
pub struct Store {
    db: DatabaseConnection,
    initial_attempts: i32,
    delivery_timeout: Duration,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            initial_attempts: 1,
            delivery_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_initial_attempts(mut self, attempts: i32) -> Self {
        self.initial_attempts = attempts.max(0);
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Read a user row and hold it exclusively until the transaction ends.
async fn lock_user<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<user::Model, InviteError> {
    user::Entity::find_by_id(user_id.to_string())
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(InviteError::UserNotFound)
}

fn page_bounds(limit: u64, offset: u64) -> (u64, u64) {
    let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit.min(MAX_PAGE_SIZE) };
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::page_bounds;

    #[test]
    fn page_limits() {
        assert_eq!(page_bounds(0, 5), (20, 5));
        assert_eq!(page_bounds(50, 0), (50, 0));
        assert_eq!(page_bounds(10_000, 0), (200, 0));
    }
}
