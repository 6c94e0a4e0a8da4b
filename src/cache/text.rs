//! Text Cache Module
//!
//! The contract every storage backend implements.

use std::sync::Arc;

use crate::cache::CacheEntryOptions;
use crate::error::{CacheError, Result};

// == Text Cache ==
/// Cache for storing plain text values under string keys.
pub trait TextCache: Send + Sync {
    /// Returns true if an entry is present and not expired.
    /// An expired entry is evicted as a side effect.
    fn contains(&self, key: &str) -> Result<bool>;

    /// Returns the stored text if present and not expired.
    fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` with `options`, resetting the entry's last-updated time.
    fn set_string(&self, key: &str, value: &str, options: &CacheEntryOptions) -> Result<()>;

    /// Implementation-specific locator for diagnostics.
    ///
    /// The location may be hypothetical; nothing has to exist there.
    fn location(&self, key: &str) -> String;

    /// Evicts the entry if present. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;

    /// Stores `value` without expiration options; the default policy applies.
    fn set_string_default(&self, key: &str, value: &str) -> Result<()> {
        self.set_string(key, value, &CacheEntryOptions::new())
    }
}

impl<C: TextCache + ?Sized> TextCache for Arc<C> {
    fn contains(&self, key: &str) -> Result<bool> {
        (**self).contains(key)
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        (**self).get_string(key)
    }

    fn set_string(&self, key: &str, value: &str, options: &CacheEntryOptions) -> Result<()> {
        (**self).set_string(key, value, options)
    }

    fn location(&self, key: &str) -> String {
        (**self).location(key)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Rejects option sets the backends cannot honor.
pub(crate) fn ensure_supported(options: &CacheEntryOptions) -> Result<()> {
    if options.sliding_expiration.is_some() {
        return Err(CacheError::Configuration(
            "Sliding expiration is not supported by text cache backends".to_string(),
        ));
    }
    Ok(())
}
