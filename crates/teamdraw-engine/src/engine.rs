use std::sync::Arc;

use entity::{invite_code, quota_schedule};
use sea_orm::{DatabaseConnection, DbErr};

use crate::cache::PrizeTableCache;
use crate::code::CodeGenerator;
use crate::config::Config;
use crate::db::{db_connect, migrate};
use crate::delivery::{DeliveryAccount, DeliveryError, InviteDispatcher, InviteSender};
use crate::draw::{retry_on_collision, DrawEngine, SampleSource, SpinOutcome};
use crate::error::{DrawError, InviteError};
use crate::prize::PrizeConfigItem;
use crate::scheduler::{QuotaScheduler, SchedulerHandle};
use crate::store::{InviteRef, NewQuotaSchedule, Store};

/// Everything a request handler needs, wired from one [`Config`].
pub struct Engine {
    config: Config,
    store: Store,
    prizes: Arc<PrizeTableCache>,
    draw: DrawEngine,
    codes: CodeGenerator,
    dispatcher: Option<InviteDispatcher>,
}

impl Engine {
    /// Connect, migrate and wire the engine.
    pub async fn bootstrap(config: Config) -> Result<Self, DbErr> {
        let db = db_connect(&config).await?;
        migrate(&db).await?;
        Ok(Self::new(config, db))
    }

    pub fn new(config: Config, db: DatabaseConnection) -> Self {
        let store = Store::new(db)
            .with_initial_attempts(config.initial_attempts)
            .with_delivery_timeout(config.delivery_timeout);
        let prizes = Arc::new(PrizeTableCache::new(Arc::new(store.clone()), config.prize_cache_ttl));
        let codes = CodeGenerator::default();
        let draw = DrawEngine::new(store.clone(), Arc::clone(&prizes))
            .with_code_generator(codes)
            .with_code_max_attempts(config.code_max_attempts);

        Self {
            config,
            store,
            prizes,
            draw,
            codes,
            dispatcher: None,
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn InviteSender>) -> Self {
        self.dispatcher = Some(InviteDispatcher::new(
            sender,
            self.config.invite_strategy,
            self.config.invite_active_account_id.clone(),
        ));
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn SampleSource>) -> Self {
        self.draw = self.draw.with_sampler(sampler);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn prizes(&self) -> &PrizeTableCache {
        &self.prizes
    }

    pub async fn spin(&self, user_id: &str, spin_id: Option<&str>) -> Result<SpinOutcome, DrawError> {
        let user = self.store.get_user(user_id).await?;
        self.draw.spin(&user, spin_id).await
    }

    /// Redeem the user's own invite, delivering it to `email`.
    ///
    /// A user who already holds an invite can only redeem that one; `code`
    /// is used only by users without any invite. Delivery goes to the team
    /// account bound to the code, else to `team_account_id`, else to every
    /// enabled account in dispatcher order.
    pub async fn redeem(
        &self,
        user_id: &str,
        code: Option<&str>,
        team_account_id: Option<&str>,
        email: &str,
    ) -> Result<invite_code::Model, InviteError> {
        let code = code.map(str::trim).filter(|c| !c.is_empty());
        let invite = match self.store.latest_invite_for_user(user_id).await? {
            Some(own) if own.used => return Err(InviteError::AlreadyCompleted),
            Some(own) if code.is_some_and(|c| c != own.code) => return Err(InviteError::AlreadyAssigned),
            Some(own) => own,
            None => {
                let code = code.ok_or(InviteError::InviteNotFound)?;
                let invite = self.store.get_invite_by_code(code).await?;
                if invite.used {
                    return Err(InviteError::AlreadyClaimed);
                }
                invite
            }
        };

        let dispatcher = self.dispatcher.as_ref().ok_or_else(DeliveryError::not_configured)?;

        // Accounts are resolved up front: the redemption transaction holds
        // its connection until delivery returns.
        let target = invite
            .team_account_id
            .as_deref()
            .or(team_account_id.map(str::trim).filter(|id| !id.is_empty()));
        let accounts: Vec<DeliveryAccount> = match target {
            Some(id) => vec![self.delivery_account(id).await?],
            None => self
                .store
                .list_enabled_team_accounts()
                .await?
                .iter()
                .map(DeliveryAccount::from)
                .collect(),
        };
        let plan = dispatcher.plan(accounts);
        if plan.is_empty() {
            return Err(DeliveryError::not_configured().into());
        }

        self.store
            .complete_redemption(&InviteRef::Id(invite.id), user_id, email, |_, email| async move {
                dispatcher.dispatch(&plan, &email).await
            })
            .await
    }

    /// A specific team account, only if it may receive invites.
    async fn delivery_account(&self, id: &str) -> Result<DeliveryAccount, InviteError> {
        let account = self.store.get_team_account(id).await?;
        if !account.enabled {
            return Err(InviteError::InvalidInput(format!("team account {id} is disabled")));
        }
        let account = DeliveryAccount::from(&account);
        if !account.is_usable() {
            return Err(DeliveryError::not_configured().into());
        }
        Ok(account)
    }

    /// Persist a new prize table and drop the cached one.
    pub async fn update_prize_config(&self, items: &[PrizeConfigItem]) -> Result<(), InviteError> {
        self.store.update_prize_config(items).await?;
        self.prizes.invalidate().await;
        Ok(())
    }

    pub async fn schedule_quota(&self, req: &NewQuotaSchedule) -> Result<quota_schedule::Model, InviteError> {
        let schedule = self.store.save_quota_schedule(req).await?;
        tracing::info!(quota = schedule.target, apply_at = schedule.apply_at, "quota change scheduled");
        Ok(schedule)
    }

    /// Issue `count` unbound codes, each retried on collision.
    pub async fn create_invite_codes(
        &self,
        count: u32,
        team_account_id: Option<&str>,
    ) -> Result<Vec<invite_code::Model>, DrawError> {
        if let Some(id) = team_account_id {
            self.store.get_team_account(id).await?;
        }

        let count = count.max(1);
        let mut created = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let invite = retry_on_collision(&self.codes, self.config.code_max_attempts, |code| async move {
                self.store.create_invite_code(&code, team_account_id).await
            })
            .await?;
            created.push(invite);
        }
        tracing::info!(count = created.len(), "invite codes created");
        Ok(created)
    }

    pub fn scheduler(&self) -> QuotaScheduler {
        QuotaScheduler::new(self.store.clone(), self.config.quota_scheduler_tick)
    }

    pub fn spawn_scheduler(&self) -> SchedulerHandle {
        self.scheduler().spawn()
    }
}
