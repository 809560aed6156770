#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use entity::user;
use teamdraw_engine::db::{db_connect, migrate};
use teamdraw_engine::delivery::{DeliveryAccount, DeliveryError, InviteSender};
use teamdraw_engine::draw::SampleSource;
use teamdraw_engine::store::IdentityProfile;
use teamdraw_engine::{Config, Engine};

pub fn config() -> Config {
    Config::new("sqlite::memory:")
}

pub async fn engine() -> Engine {
    engine_with(config()).await
}

pub async fn engine_with(config: Config) -> Engine {
    let db = db_connect(&config).await.unwrap();
    migrate(&db).await.unwrap();
    Engine::new(config, db)
}

/// Always returns the same sample.
pub struct FixedSampler(pub f64);

impl SampleSource for FixedSampler {
    fn sample(&self) -> f64 {
        self.0
    }
}

pub fn fixed(sample: f64) -> Arc<dyn SampleSource> {
    Arc::new(FixedSampler(sample))
}

pub async fn user(engine: &Engine, name: &str) -> user::Model {
    engine
        .store()
        .sync_user(&IdentityProfile {
            external_id: format!("ext-{name}"),
            username: name.to_string(),
            active: true,
            ..Default::default()
        })
        .await
        .unwrap()
}

pub async fn attempts(engine: &Engine, user_id: &str) -> i32 {
    engine.store().get_user(user_id).await.unwrap().attempts
}

/// Records every delivery and answers with a fixed result.
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
    fail_with: Option<DeliveryError>,
}

impl RecordingSender {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    pub fn failing(err: DeliveryError) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(err),
        })
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InviteSender for RecordingSender {
    async fn send(&self, account: &DeliveryAccount, email: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((account.account_id.clone(), email.to_string()));
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
