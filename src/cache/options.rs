//! Cache Entry Options Module
//!
//! Describes when a cache entry stops being valid.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Entry Options ==
/// Expiration settings attached to a cache entry.
///
/// An entry may carry an absolute instant, a duration relative to its
/// last update, or both (the earlier one wins). Sliding expiration is
/// representable so that it can be rejected, it is never honored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryOptions {
    /// Fixed point in time after which the entry is expired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Lifetime measured from the entry's last update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_expiration: Option<Duration>,
    /// Unsupported; present only to fail fast when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sliding_expiration: Option<Duration>,
}

impl CacheEntryOptions {
    // == Constructors ==
    /// Options with nothing set; the default policy applies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that expire `duration` after the entry was last written.
    pub fn relative(duration: Duration) -> Self {
        Self {
            relative_expiration: Some(duration),
            ..Self::default()
        }
    }

    /// Options that expire at a fixed instant.
    pub fn absolute(at: DateTime<Utc>) -> Self {
        Self {
            absolute_expiration: Some(at),
            ..Self::default()
        }
    }

    // == Builders ==
    pub fn with_relative(mut self, duration: Duration) -> Self {
        self.relative_expiration = Some(duration);
        self
    }

    pub fn with_absolute(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    pub fn with_sliding(mut self, duration: Duration) -> Self {
        self.sliding_expiration = Some(duration);
        self
    }

    // == Is Empty ==
    /// True when neither absolute nor relative expiration is set.
    pub fn is_empty(&self) -> bool {
        self.absolute_expiration.is_none() && self.relative_expiration.is_none()
    }
}
