//! Memory Cache Module
//!
//! In-process text cache: a HashMap of entries evaluated for expiration on access.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::text::ensure_supported;
use crate::cache::{
    CacheEntry, CacheEntryOptions, CacheManager, ExpirationEvaluator, KeyPattern, ManagedCache,
    TextCache,
};
use crate::error::Result;

#[derive(Debug)]
struct Shared {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Staleness rules
    evaluator: ExpirationEvaluator,
}

// == Memory Text Cache ==
/// Thread-safe in-memory text cache.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryTextCache {
    shared: Arc<Shared>,
}

impl MemoryTextCache {
    // == Constructor ==
    pub fn new(evaluator: ExpirationEvaluator) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: RwLock::new(HashMap::new()),
                evaluator,
            }),
        }
    }

    // == Insert Entry ==
    /// Stores a fully formed entry, keeping its timestamp as given.
    pub fn insert_entry(&self, key: impl Into<String>, entry: CacheEntry) {
        self.shared.entries.write().insert(key.into(), entry);
    }

    // == Length ==
    /// Returns the current number of entries, including ones not yet evicted.
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    /// Looks up a live entry, evicting it when expired.
    fn live_value(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.shared.entries.write();
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };

        if entry.is_expired(&self.shared.evaluator)? {
            entries.remove(key);
            debug!("Evicted expired entry '{}'", key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }
}

impl Default for MemoryTextCache {
    fn default() -> Self {
        Self::new(ExpirationEvaluator::default())
    }
}

impl TextCache for MemoryTextCache {
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.live_value(key)?.is_some())
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.live_value(key)
    }

    fn set_string(&self, key: &str, value: &str, options: &CacheEntryOptions) -> Result<()> {
        ensure_supported(options)?;
        let entry = CacheEntry::new(value.to_string(), Some(options.clone()));
        self.shared.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        key.to_string()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.shared.entries.write().remove(key);
        Ok(())
    }
}

impl ManagedCache for MemoryTextCache {
    fn manager(&self) -> Arc<dyn CacheManager> {
        Arc::new(MemoryCacheManager {
            shared: Arc::clone(&self.shared),
        })
    }
}

// == Memory Cache Manager ==
struct MemoryCacheManager {
    shared: Arc<Shared>,
}

impl CacheManager for MemoryCacheManager {
    fn entry_count(&self) -> Result<usize> {
        Ok(self.shared.entries.read().len())
    }

    fn count_matching(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::new(pattern)?;
        let entries = self.shared.entries.read();
        Ok(entries.keys().filter(|key| pattern.is_match(key)).count())
    }

    fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::new(pattern)?;
        let mut entries = self.shared.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        Ok(before - entries.len())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.shared.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.shared.entries.write();
        let mut expired_keys = Vec::new();
        for (key, entry) in entries.iter() {
            match entry.is_expired(&self.shared.evaluator) {
                Ok(true) => expired_keys.push(key.clone()),
                Ok(false) => {}
                Err(err) => warn!("Skipping entry '{}' during purge: {}", key, err),
            }
        }

        for key in &expired_keys {
            entries.remove(key);
        }
        Ok(expired_keys.len())
    }
}
