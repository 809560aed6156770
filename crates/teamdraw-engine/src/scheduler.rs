use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::error::InviteError;
use crate::store::Store;
use crate::util::now_ts;

/// What a single scheduler pass observed or did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pending schedule.
    Idle,
    /// A schedule is pending but not due yet.
    Armed { apply_at: i64 },
    /// The schedule was due and its target is now the quota.
    Applied { target: i64 },
}

/// Applies the pending quota schedule once its time has come.
///
/// Applying is an unconditional set, so a pass that applies but fails to
/// clear is repaired by the next pass writing the same value again.
#[derive(Clone)]
pub struct QuotaScheduler {
    store: Store,
    period: Duration,
}

impl QuotaScheduler {
    pub fn new(store: Store, period: Duration) -> Self {
        Self { store, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn tick(&self) -> Result<TickOutcome, InviteError> {
        self.tick_at(now_ts()).await
    }

    /// One pass evaluated at `now` (unix seconds).
    pub async fn tick_at(&self, now: i64) -> Result<TickOutcome, InviteError> {
        let Some(schedule) = self.store.load_quota_schedule().await? else {
            return Ok(TickOutcome::Idle);
        };
        if now < schedule.apply_at {
            return Ok(TickOutcome::Armed {
                apply_at: schedule.apply_at,
            });
        }

        self.store.update_quota(schedule.target).await?;
        if let Err(e) = self.store.clear_quota_schedule().await {
            tracing::warn!(error = %e, quota = schedule.target, "quota applied but schedule not cleared");
        }
        tracing::info!(
            quota = schedule.target,
            author = %schedule.author,
            message = %schedule.message,
            "quota schedule applied"
        );
        Ok(TickOutcome::Applied {
            target: schedule.target,
        })
    }

    /// Run passes on a fixed period until the returned handle is shut down.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            let mut ticker = time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.tick().await {
                            tracing::error!(error = %err, "quota schedule pass failed");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("quota scheduler stopped");
        });
        SchedulerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for an in-flight pass to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            tracing::warn!(error = %err, "quota scheduler task ended abnormally");
        }
    }
}
