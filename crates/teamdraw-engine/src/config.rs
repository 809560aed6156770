use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::delivery::DispatchStrategy;
use crate::env::{env_string, parse_duration};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings for the engine, read from the process environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    /// How long a loaded prize table is served before it is re-read.
    pub prize_cache_ttl: Duration,
    pub quota_scheduler_tick: Duration,
    /// Hard limit on a single delivery call made inside a redemption.
    pub delivery_timeout: Duration,
    /// Fresh codes tried before issuance gives up on collisions.
    pub code_max_attempts: u32,
    /// Attempts granted to a user on first sync.
    pub initial_attempts: i32,
    pub invite_strategy: DispatchStrategy,
    pub invite_active_account_id: Option<String>,
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            database_max_connections: 10,
            prize_cache_ttl: Duration::from_secs(30),
            quota_scheduler_tick: Duration::from_secs(5),
            delivery_timeout: Duration::from_secs(15),
            code_max_attempts: 5,
            initial_attempts: 1,
            invite_strategy: DispatchStrategy::Primary,
            invite_active_account_id: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env_string("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let mut cfg = Self::new(database_url);

        if let Some(v) = parsed::<u32>("DATABASE_MAX_CONNECTIONS")? {
            cfg.database_max_connections = v.max(1);
        }
        if let Some(v) = duration("PRIZE_CACHE_TTL")? {
            cfg.prize_cache_ttl = v;
        }
        if let Some(v) = duration("QUOTA_SCHEDULER_TICK")? {
            cfg.quota_scheduler_tick = v;
        }
        if let Some(v) = duration("DELIVERY_TIMEOUT")? {
            cfg.delivery_timeout = v;
        }
        if let Some(v) = parsed::<u32>("CODE_MAX_ATTEMPTS")? {
            cfg.code_max_attempts = v.max(1);
        }
        if let Some(v) = parsed::<i32>("INITIAL_ATTEMPTS")? {
            if v < 0 {
                return Err(ConfigError::Invalid {
                    key: "INITIAL_ATTEMPTS",
                    value: v.to_string(),
                });
            }
            cfg.initial_attempts = v;
        }
        if let Some(v) = parsed::<DispatchStrategy>("INVITE_STRATEGY")? {
            cfg.invite_strategy = v;
        }
        cfg.invite_active_account_id = env_string("INVITE_ACTIVE_ACCOUNT_ID");

        Ok(cfg)
    }
}

fn parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    let Some(raw) = env_string(key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

fn duration(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = env_string(key) else {
        return Ok(None);
    };
    match parse_duration(&raw) {
        Some(d) if !d.is_zero() => Ok(Some(d)),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}
