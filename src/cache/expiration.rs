//! Expiration Module
//!
//! Decides whether a stored entry is stale given its options and the time
//! it was last updated.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::cache::CacheEntryOptions;
use crate::error::{CacheError, Result};

/// Relative expiration used when nothing else is configured.
pub const DEFAULT_RELATIVE_EXPIRATION: Duration = Duration::from_secs(2 * 60 * 60);

// == Default Policy ==
/// Supplies the options used for entries stored without any expiration.
pub trait DefaultCachePolicy: Send + Sync {
    fn default_options(&self) -> CacheEntryOptions;
}

/// Two hour relative expiration.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardCodedDefaultPolicy;

impl DefaultCachePolicy for HardCodedDefaultPolicy {
    fn default_options(&self) -> CacheEntryOptions {
        CacheEntryOptions::relative(DEFAULT_RELATIVE_EXPIRATION)
    }
}

/// A fixed set of options can act as its own default policy.
impl DefaultCachePolicy for CacheEntryOptions {
    fn default_options(&self) -> CacheEntryOptions {
        self.clone()
    }
}

// == Expiration Evaluator ==
/// Evaluates entry staleness against a process-wide default policy.
#[derive(Clone)]
pub struct ExpirationEvaluator {
    default_policy: Arc<dyn DefaultCachePolicy>,
}

impl ExpirationEvaluator {
    // == Constructor ==
    pub fn new(default_policy: impl DefaultCachePolicy + 'static) -> Self {
        Self {
            default_policy: Arc::new(default_policy),
        }
    }

    // == Is Expired ==
    /// Checks expiration against the current wall clock.
    pub fn is_expired(
        &self,
        options: Option<&CacheEntryOptions>,
        updated: DateTime<Utc>,
    ) -> Result<bool> {
        self.is_expired_at(options, updated, Utc::now())
    }

    /// Checks expiration as of `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches the
    /// computed expiration instant.
    pub fn is_expired_at(
        &self,
        options: Option<&CacheEntryOptions>,
        updated: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let expiration = self.expiration_at(options, updated, now)?;
        Ok(now >= expiration)
    }

    // == Expiration Instant ==
    /// Computes the instant at which an entry updated at `updated` expires.
    ///
    /// Starts from "tomorrow" as an upper bound, replaces it with the
    /// absolute expiration when set, then keeps the earlier of that and
    /// the relative expiration.
    pub fn expiration_at(
        &self,
        options: Option<&CacheEntryOptions>,
        updated: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        if updated > now {
            return Err(CacheError::InvalidTimestamp { updated, now });
        }

        let options = match options {
            Some(options) if !options.is_empty() || options.sliding_expiration.is_some() => {
                options.clone()
            }
            _ => {
                trace!(
                    "Falling back to default cache policy for item last updated at {}",
                    updated
                );
                self.default_policy.default_options()
            }
        };

        if options.sliding_expiration.is_some() {
            return Err(CacheError::Configuration(
                "Sliding expiration cache policy is not implemented".to_string(),
            ));
        }

        let mut expiration = now + chrono::Duration::days(1);
        if let Some(absolute) = options.absolute_expiration {
            expiration = absolute;
        }
        if let Some(relative) = options.relative_expiration {
            let relative_expiration = chrono::Duration::from_std(relative)
                .ok()
                .and_then(|delta| updated.checked_add_signed(delta));
            if let Some(relative_expiration) = relative_expiration {
                if relative_expiration < expiration {
                    expiration = relative_expiration;
                }
            }
        }
        Ok(expiration)
    }
}

impl Default for ExpirationEvaluator {
    fn default() -> Self {
        Self::new(HardCodedDefaultPolicy)
    }
}

impl std::fmt::Debug for ExpirationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationEvaluator")
            .field("default_options", &self.default_policy.default_options())
            .finish()
    }
}
