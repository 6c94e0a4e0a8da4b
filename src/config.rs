//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{find_local_cache_dir, CacheEntryOptions};
use crate::error::CacheError;

// == Backend Kind ==
/// Storage medium for cached values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            other => Err(CacheError::Configuration(format!(
                "Unknown cache backend '{}', expected 'memory' or 'file'",
                other
            ))),
        }
    }
}

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where cached values are stored
    pub backend: BackendKind,
    /// Base directory of the file backend
    pub cache_dir: Option<PathBuf>,
    /// Relative expiration for entries stored without options
    pub default_expiration: Duration,
    /// How long an unused key keeps its lock token
    pub lock_idle: Duration,
    /// HTTP server port
    pub server_port: u16,
    /// Background purge task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `file` (default: memory)
    /// - `CACHE_DIR` - File backend directory (default: discovered per user)
    /// - `DEFAULT_EXPIRATION_SECS` - Default relative expiration (default: 7200)
    /// - `LOCK_IDLE_SECS` - Lock token idle eviction (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 60)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            default_expiration: env::var("DEFAULT_EXPIRATION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_expiration),
            lock_idle: env::var("LOCK_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_idle),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Options applied to entries stored without any.
    pub fn default_policy(&self) -> CacheEntryOptions {
        CacheEntryOptions::relative(self.default_expiration)
    }

    /// Configured cache directory, or the discovered per-user one.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(find_local_cache_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            cache_dir: None,
            default_expiration: Duration::from_secs(2 * 60 * 60),
            lock_idle: Duration::from_secs(5 * 60),
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}
