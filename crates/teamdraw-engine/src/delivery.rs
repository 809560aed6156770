use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use entity::team_account;
use thiserror::Error;

/// Outcome of a failed delivery call.
///
/// `status` is the remote HTTP-like status when the remote answered, `None`
/// when the call never reached it (not configured, transport error, timeout).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invite delivery failed (status={status:?}): {detail}")]
pub struct DeliveryError {
    pub status: Option<u16>,
    pub detail: String,
    /// Set only when no usable account or sender exists; never by a sender.
    not_configured: bool,
}

impl DeliveryError {
    pub fn new(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            not_configured: false,
        }
    }

    pub fn not_configured() -> Self {
        Self {
            not_configured: true,
            ..Self::new(None, "invite delivery not configured")
        }
    }

    pub fn timed_out(after: std::time::Duration) -> Self {
        Self::new(None, format!("invite delivery timed out after {after:?}"))
    }

    pub fn is_not_configured(&self) -> bool {
        self.not_configured
    }

    /// Credential problems on one account that another account may not have.
    pub fn is_retryable_auth(&self) -> bool {
        if matches!(self.status, Some(401) | Some(403)) {
            return true;
        }
        let body = self.detail.to_lowercase();
        if body.contains("cf_chl") || body.contains("challenge-platform") {
            return true;
        }
        body.contains("unauthorized") && body.contains("access token")
    }
}

/// Credentials of the account an invite is delivered into.
#[derive(Clone, PartialEq, Eq)]
pub struct DeliveryAccount {
    /// Row id in `team_accounts`.
    pub id: String,
    pub account_id: String,
    pub auth_token: String,
}

impl fmt::Debug for DeliveryAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryAccount")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl From<&team_account::Model> for DeliveryAccount {
    fn from(m: &team_account::Model) -> Self {
        Self {
            id: m.id.clone(),
            account_id: m.account_id.trim().to_string(),
            auth_token: m.auth_token.trim().to_string(),
        }
    }
}

impl DeliveryAccount {
    pub fn is_usable(&self) -> bool {
        !self.account_id.is_empty() && !self.auth_token.is_empty()
    }
}

/// The outbound invite call. Implementations must not retry on their own.
#[async_trait]
pub trait InviteSender: Send + Sync {
    async fn send(&self, account: &DeliveryAccount, email: &str) -> Result<(), DeliveryError>;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// Only the first account.
    #[default]
    Primary,
    /// Rotate the starting account on every call.
    RoundRobin,
    /// Every account, in order.
    Failover,
}

impl FromStr for DispatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "primary" => Ok(Self::Primary),
            "round_robin" => Ok(Self::RoundRobin),
            "failover" => Ok(Self::Failover),
            other => Err(format!("unknown invite strategy {other:?}")),
        }
    }
}

/// Spreads deliveries over several accounts, moving on when an account's
/// credentials are rejected.
pub struct InviteDispatcher {
    sender: Arc<dyn InviteSender>,
    strategy: DispatchStrategy,
    active_account_id: Option<String>,
    rr: AtomicU64,
}

impl InviteDispatcher {
    pub fn new(sender: Arc<dyn InviteSender>, strategy: DispatchStrategy, active_account_id: Option<String>) -> Self {
        Self {
            sender,
            strategy,
            active_account_id: active_account_id.filter(|s| !s.trim().is_empty()),
            rr: AtomicU64::new(0),
        }
    }

    /// Order candidate accounts for one delivery.
    pub fn plan(&self, accounts: Vec<DeliveryAccount>) -> Vec<DeliveryAccount> {
        let mut accounts: Vec<DeliveryAccount> = accounts.into_iter().filter(DeliveryAccount::is_usable).collect();

        if let Some(active) = self.active_account_id.as_deref() {
            if let Some(pos) = accounts.iter().position(|a| a.account_id == active || a.id == active) {
                let preferred = accounts.remove(pos);
                accounts.insert(0, preferred);
            }
        }

        if accounts.len() <= 1 {
            return accounts;
        }

        match self.strategy {
            DispatchStrategy::Primary => {
                accounts.truncate(1);
                accounts
            }
            DispatchStrategy::Failover => accounts,
            DispatchStrategy::RoundRobin => {
                let start = (self.rr.fetch_add(1, Ordering::Relaxed) % accounts.len() as u64) as usize;
                accounts.rotate_left(start);
                accounts
            }
        }
    }

    /// Try each planned account until one succeeds or a non-auth failure stops the run.
    pub async fn dispatch(&self, plan: &[DeliveryAccount], email: &str) -> Result<(), DeliveryError> {
        let mut last_err = None;
        for account in plan {
            match self.sender.send(account, email).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable_auth() => {
                    tracing::warn!(account = %account.account_id, status = ?e.status, "invite account rejected, trying next");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(DeliveryError::not_configured))
    }
}
