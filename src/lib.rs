//! Method Cache - method-result caching for slow services
//!
//! Wraps expensive operations so repeated calls with the same arguments are
//! served from a cache, with per-key locking so concurrent misses run the
//! operation only once.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod interception;
pub mod models;
pub mod services;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
