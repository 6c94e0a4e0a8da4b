//! Cache Entry Module
//!
//! Defines the structure for individual cache entries held by in-process backends.

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntryOptions, ExpirationEvaluator};
use crate::error::Result;

// == Cache Entry ==
/// A stored (value, last-updated, options) triple.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The serialized value
    pub value: String,
    /// When the value was last written
    pub updated_at: DateTime<Utc>,
    /// Expiration options supplied on write, None = default policy
    pub options: Option<CacheEntryOptions>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: String, options: Option<CacheEntryOptions>) -> Self {
        Self::updated_at(value, options, Utc::now())
    }

    /// Creates a new entry with an explicit update time.
    pub fn updated_at(
        value: String,
        options: Option<CacheEntryOptions>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value,
            updated_at,
            options,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale according to `evaluator`.
    pub fn is_expired(&self, evaluator: &ExpirationEvaluator) -> Result<bool> {
        evaluator.is_expired(self.options.as_ref(), self.updated_at)
    }
}
