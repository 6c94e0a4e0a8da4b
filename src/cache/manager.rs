//! Cache Manager Module
//!
//! Bulk inspection and maintenance of a backend's entries.

use std::sync::Arc;

use regex::Regex;

use crate::cache::MAX_PATTERN_LENGTH;
use crate::error::{CacheError, Result};

// == Cache Manager ==
/// Administrative operations over all entries of one backend.
///
/// Counting and matching may be O(N). Entries can be added or removed
/// concurrently, so results are a snapshot at best.
pub trait CacheManager: Send + Sync {
    /// Number of entries currently stored (expired or not).
    fn entry_count(&self) -> Result<usize>;

    /// Number of entries whose key matches a `*`/`?` wildcard expression.
    fn count_matching(&self, pattern: &str) -> Result<usize>;

    /// Removes every entry matching the wildcard expression.
    ///
    /// Returns the number of entries removed.
    fn delete_matching(&self, pattern: &str) -> Result<usize>;

    /// Keys as the backend knows them.
    fn keys(&self) -> Result<Vec<String>>;

    /// Evicts all expired entries, returning how many were removed.
    fn purge_expired(&self) -> Result<usize>;
}

/// A cache that can hand out a manager for its own entries.
pub trait ManagedCache {
    fn manager(&self) -> Arc<dyn CacheManager>;
}

// == Key Pattern ==
/// Wildcard expression anchored at both ends.
///
/// `*` matches zero or more characters, `?` matches exactly one.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(CacheError::InvalidPattern(
                "Pattern cannot be empty".to_string(),
            ));
        }
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(CacheError::InvalidPattern(format!(
                "Pattern exceeds maximum length of {} bytes",
                MAX_PATTERN_LENGTH
            )));
        }

        let expression = regex::escape(pattern)
            .replace(r"\*", ".*")
            .replace(r"\?", ".");
        let regex = Regex::new(&format!("^{}$", expression))
            .map_err(|err| CacheError::InvalidPattern(err.to_string()))?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}
