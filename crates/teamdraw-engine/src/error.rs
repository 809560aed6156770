use entity::user::InviteStatus;
use sea_orm::DbErr;
use thiserror::Error;

use crate::code::CodeError;
use crate::delivery::DeliveryError;

/// Coarse classification used by callers to decide how to react.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A scarce counter ran out (attempts or quota). Expected and frequent.
    Exhaustion,
    /// Someone else already holds or consumed the resource.
    Conflict,
    NotFound,
    /// A state-machine precondition failed. Should not happen in correct operation.
    Invariant,
    /// The outbound delivery call failed or timed out.
    Delivery,
    /// Caller supplied an unusable value.
    Invalid,
    /// Transport or database failure. The only kind worth retrying.
    Storage,
}

/// Failures raised by the transactional invite store.
#[derive(Debug, Error)]
pub enum InviteError {
    #[error("no attempts left")]
    NoAttemptsLeft,
    #[error("quota exhausted")]
    QuotaEmpty,
    #[error("invite already claimed")]
    AlreadyClaimed,
    #[error("invite already assigned")]
    AlreadyAssigned,
    /// The user has already redeemed an invite.
    #[error("invite already completed")]
    AlreadyCompleted,
    #[error("invite not found")]
    InviteNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("user {user_id} has invite status {actual:?}")]
    UserStateViolation { user_id: String, actual: InviteStatus },
    /// The candidate code already exists; retry with a fresh one.
    #[error("invite code collision")]
    CodeCollision,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("storage failure: {0}")]
    Storage(#[from] DbErr),
}

impl InviteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAttemptsLeft | Self::QuotaEmpty => ErrorKind::Exhaustion,
            Self::AlreadyClaimed | Self::AlreadyAssigned | Self::AlreadyCompleted | Self::CodeCollision => {
                ErrorKind::Conflict
            }
            Self::InviteNotFound | Self::UserNotFound => ErrorKind::NotFound,
            Self::UserStateViolation { .. } => ErrorKind::Invariant,
            Self::InvalidInput(_) => ErrorKind::Invalid,
            Self::Delivery(_) => ErrorKind::Delivery,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    /// Stable error code for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoAttemptsLeft => "no_attempts_left",
            Self::QuotaEmpty => "quota_empty",
            Self::AlreadyClaimed => "already_claimed",
            Self::AlreadyAssigned => "already_assigned",
            Self::AlreadyCompleted => "already_completed",
            Self::InviteNotFound => "invite_not_found",
            Self::UserNotFound => "user_not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Delivery(e) if e.is_not_configured() => "delivery_not_configured",
            Self::Delivery(_) => "delivery_failed",
            Self::UserStateViolation { .. } | Self::CodeCollision | Self::Storage(_) => "internal_error",
        }
    }

    /// Message that is safe to show to an end user.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Invariant | ErrorKind::Storage => "Internal server error".to_string(),
            ErrorKind::Delivery => "Invite delivery failed, try again later".to_string(),
            _ => self.to_string(),
        }
    }

    /// Map a failed invite-code insert, treating a unique violation as a collision.
    pub(crate) fn from_code_insert(e: DbErr) -> Self {
        match e.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => Self::CodeCollision,
            _ => Self::Storage(e),
        }
    }
}

/// Failures of the prize table loader.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read prize table: {0}")]
    Storage(#[from] DbErr),
    #[error("prize table is invalid: {0}")]
    Invalid(String),
}

/// Failures of a single draw.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error(transparent)]
    Store(#[from] InviteError),
    #[error("prize table unavailable: {0}")]
    ConfigUnavailable(#[source] LoadError),
    #[error("user already holds an invite")]
    AlreadyWon,
    #[error(transparent)]
    CodeGeneration(#[from] CodeError),
    #[error("no unique invite code after {0} attempts")]
    CodeSpaceExhausted(u32),
}

impl DrawError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::AlreadyWon => ErrorKind::Conflict,
            Self::ConfigUnavailable(_) | Self::CodeGeneration(_) | Self::CodeSpaceExhausted(_) => ErrorKind::Storage,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.code(),
            Self::AlreadyWon => "already_won",
            Self::ConfigUnavailable(_) => "config_unavailable",
            Self::CodeGeneration(_) | Self::CodeSpaceExhausted(_) => "internal_error",
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            Self::Store(e) => e.public_message(),
            Self::AlreadyWon => self.to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// True when the underlying store reported the given kind of exhaustion.
    pub fn is_quota_empty(&self) -> bool {
        matches!(self, Self::Store(InviteError::QuotaEmpty))
    }
}
