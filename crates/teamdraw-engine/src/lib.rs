//! Gated-lottery engine: attempt-limited draws against a weighted prize
//! table, a shared invite quota, and transactional invite redemption.

pub mod cache;
pub mod code;
pub mod config;
pub mod db;
pub mod delivery;
pub mod draw;
pub mod engine;
pub mod env;
pub mod error;
pub mod picker;
pub mod prize;
pub mod scheduler;
pub mod store;
pub mod util;

pub use config::Config;
pub use engine::Engine;
pub use error::{DrawError, ErrorKind, InviteError};
