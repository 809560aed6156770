use std::sync::Arc;

use entity::invite_code;
use entity::user::{self, InviteStatus};
use serde::Serialize;

use crate::cache::PrizeTableCache;
use crate::code::CodeGenerator;
use crate::error::{DrawError, InviteError, LoadError};
use crate::prize::{pick_prize, PrizeConfigItem, PrizeKind};
use crate::store::{IssuedInvite, NewSpinRecord, Store};
use crate::util::uuid_v4;

/// Source of the uniform sample in `[0, 1)` that decides a draw.
pub trait SampleSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Thread-local RNG backed sampler. Fair, not secret.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformSampler;

impl SampleSource for UniformSampler {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SpinOutcome {
    pub spin_id: String,
    pub prize: PrizeConfigItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite: Option<invite_code::Model>,
    pub quota: i64,
}

impl SpinOutcome {
    pub fn kind(&self) -> PrizeKind {
        self.prize.kind
    }
}

/// Run `attempt` with fresh codes until it stops colliding or `max_attempts` is spent.
pub(crate) async fn retry_on_collision<T, F, Fut>(
    codes: &CodeGenerator,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, DrawError>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<T, InviteError>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        let code = codes.generate()?;
        match attempt(code).await {
            Err(InviteError::CodeCollision) => {
                tracing::debug!(attempt = n, "invite code collided, regenerating");
            }
            other => return Ok(other?),
        }
    }
    Err(DrawError::CodeSpaceExhausted(max_attempts))
}

pub struct DrawEngine {
    store: Store,
    prizes: Arc<PrizeTableCache>,
    sampler: Arc<dyn SampleSource>,
    codes: CodeGenerator,
    code_max_attempts: u32,
}

impl DrawEngine {
    pub fn new(store: Store, prizes: Arc<PrizeTableCache>) -> Self {
        Self {
            store,
            prizes,
            sampler: Arc::new(UniformSampler),
            codes: CodeGenerator::default(),
            code_max_attempts: 5,
        }
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn SampleSource>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_code_generator(mut self, codes: CodeGenerator) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_code_max_attempts(mut self, attempts: u32) -> Self {
        self.code_max_attempts = attempts.max(1);
        self
    }

    /// Draw once for `user`.
    ///
    /// One attempt is consumed up front. A retry outcome credits it back, and
    /// so does a win that finds the quota empty or loses a race with another
    /// winning spin of the same user. `spin_id` only keys the audit
    /// row: replaying it repeats every other side effect.
    pub async fn spin(&self, user: &user::Model, spin_id: Option<&str>) -> Result<SpinOutcome, DrawError> {
        if user.invite_status != InviteStatus::None {
            return Err(DrawError::AlreadyWon);
        }
        let spin_id = spin_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(uuid_v4, str::to_string);

        self.store.consume_attempt(&user.id).await?;

        let table = self.prizes.get().await.map_err(DrawError::ConfigUnavailable)?;
        let prize = pick_prize(&table, self.sampler.sample())
            .cloned()
            .ok_or_else(|| DrawError::ConfigUnavailable(LoadError::Invalid("prize table is empty".to_string())))?;

        let (invite, quota) = match prize.kind {
            PrizeKind::Win => {
                let issued = self.issue(&user.id).await?;
                (Some(issued.invite), issued.quota_remaining)
            }
            PrizeKind::Retry => {
                self.store.add_attempts(&user.id, 1).await?;
                (None, self.store.get_quota().await?)
            }
            PrizeKind::Lose => (None, self.store.get_quota().await?),
        };

        let record = NewSpinRecord {
            spin_id: spin_id.clone(),
            user_id: user.id.clone(),
            username: user.username.clone(),
            prize_name: prize.name.clone(),
            status: prize.kind,
            detail: String::new(),
        };
        if let Err(e) = self.store.record_spin(&record).await {
            tracing::warn!(error = %e, spin_id = %spin_id, user_id = %user.id, "failed to record spin");
        }

        Ok(SpinOutcome {
            spin_id,
            prize,
            invite,
            quota,
        })
    }

    async fn issue(&self, user_id: &str) -> Result<IssuedInvite, DrawError> {
        let result = retry_on_collision(&self.codes, self.code_max_attempts, |code| async move {
            self.store.issue_invite_on_win(user_id, &code).await
        })
        .await;

        match result {
            Err(err) if err.is_quota_empty() => {
                self.refund(user_id, "quota empty").await;
                Err(err)
            }
            // A concurrent spin by the same user won first.
            Err(DrawError::Store(InviteError::UserStateViolation { .. })) => {
                self.refund(user_id, "already won").await;
                Err(DrawError::AlreadyWon)
            }
            other => other,
        }
    }

    async fn refund(&self, user_id: &str, reason: &'static str) {
        if let Err(err) = self.store.add_attempts(user_id, 1).await {
            tracing::warn!(error = %err, user_id, reason, "failed to refund attempt");
        }
    }
}
