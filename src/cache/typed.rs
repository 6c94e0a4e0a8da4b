//! Typed Cache Module
//!
//! Strongly typed values on top of a text backend, serialized as JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheEntryOptions, TextCache};
use crate::error::{CacheError, Result};

// == Typed Cache ==
/// Cache for storing strongly typed values.
pub trait TypedCache: Send + Sync {
    /// Returns true if an entry is present and not expired.
    fn contains(&self, key: &str) -> Result<bool>;

    /// Returns the cached value if present and not expired.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    /// Stores `value` with `options`.
    ///
    /// The type's default value is reserved to mean "absent" and is rejected.
    fn set<T: Serialize + Default + PartialEq>(
        &self,
        key: &str,
        value: &T,
        options: &CacheEntryOptions,
    ) -> Result<()>;

    /// Implementation-specific locator for diagnostics.
    fn location(&self, key: &str) -> String;

    /// Evicts the entry if present.
    fn remove(&self, key: &str) -> Result<()>;

    /// Stores `value` without expiration options.
    fn set_default<T: Serialize + Default + PartialEq>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, value, &CacheEntryOptions::new())
    }
}

/// Fails when `value` is its type's default.
pub(crate) fn prohibit_default_value<T: Default + PartialEq>(key: &str, value: &T) -> Result<()> {
    if *value == T::default() {
        return Err(CacheError::DefaultValue(key.to_string()));
    }
    Ok(())
}

// == JSON Typed Cache ==
/// Wraps a [`TextCache`] and moves values in and out of it as JSON.
#[derive(Debug, Clone)]
pub struct JsonTypedCache<C> {
    text_cache: C,
}

impl<C: TextCache> JsonTypedCache<C> {
    pub fn new(text_cache: C) -> Self {
        Self { text_cache }
    }

    pub fn text_cache(&self) -> &C {
        &self.text_cache
    }
}

impl<C: TextCache> TypedCache for JsonTypedCache<C> {
    fn contains(&self, key: &str) -> Result<bool> {
        self.text_cache.contains(key)
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.text_cache.get_string(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize + Default + PartialEq>(
        &self,
        key: &str,
        value: &T,
        options: &CacheEntryOptions,
    ) -> Result<()> {
        prohibit_default_value(key, value)?;
        let json = serde_json::to_string(value)?;
        if json == "null" {
            return Err(CacheError::DefaultValue(key.to_string()));
        }
        self.text_cache.set_string(key, &json, options)
    }

    fn location(&self, key: &str) -> String {
        self.text_cache.location(key)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.text_cache.remove(key)
    }
}
