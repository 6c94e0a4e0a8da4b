//! Caching Interceptor Module
//!
//! Wraps calls to an expensive operation: serves cached results, and on a
//! miss lets exactly one concurrent caller per key run the operation and
//! store its result.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache::{CacheEntryOptions, CacheStats, TypedCache};
use crate::error::{CacheError, Result};
use crate::interception::{
    CacheLockProvider, Invocation, KeyGenerator, MethodCacheKeyGenerator,
    MethodCacheOptionsLookup, MethodDescriptor, ReturnShape,
};

// == Caching Interceptor ==
/// Caching decorator logic for operations returning `T`.
///
/// One interceptor serves one result type. Cheap to clone; clones share the
/// backend, lock table and statistics.
pub struct CachingInterceptor<T, C> {
    key_generator: MethodCacheKeyGenerator,
    options_lookup: Arc<MethodCacheOptionsLookup>,
    cache: Arc<C>,
    locks: CacheLockProvider,
    stats: Arc<CacheStats>,
    _result: PhantomData<fn() -> T>,
}

impl<T, C> Clone for CachingInterceptor<T, C> {
    fn clone(&self) -> Self {
        Self {
            key_generator: self.key_generator,
            options_lookup: Arc::clone(&self.options_lookup),
            cache: Arc::clone(&self.cache),
            locks: self.locks.clone(),
            stats: Arc::clone(&self.stats),
            _result: PhantomData,
        }
    }
}

impl<T, C> std::fmt::Debug for CachingInterceptor<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingInterceptor")
            .field("result", &std::any::type_name::<T>())
            .field("locks", &self.locks)
            .finish()
    }
}

impl<T, C> CachingInterceptor<T, C>
where
    T: Serialize + DeserializeOwned + Default + PartialEq + Clone + Send + 'static,
    C: TypedCache + 'static,
{
    // == Constructor ==
    /// Interceptor using the standard key format and fresh statistics.
    ///
    /// Pass the same `locks` to every interceptor sharing a backend.
    pub fn new(
        cache: Arc<C>,
        options_lookup: Arc<MethodCacheOptionsLookup>,
        locks: CacheLockProvider,
    ) -> Self {
        Self {
            key_generator: MethodCacheKeyGenerator,
            options_lookup,
            cache,
            locks,
            stats: Arc::new(CacheStats::new()),
            _result: PhantomData,
        }
    }

    /// Reports into `stats` instead of this interceptor's own counters.
    pub fn with_stats(mut self, stats: Arc<CacheStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    // == Intercept ==
    /// Serves a synchronous call from cache, or runs `proceed` under the
    /// key's lock and caches its success.
    ///
    /// Errors from `proceed` are returned unchanged and never cached.
    /// Blocks the calling thread while another caller holds the key's lock.
    /// Inside an async runtime prefer [`CachingInterceptor::intercept_async`],
    /// which waits without tying up a thread.
    pub fn intercept<E, F>(&self, invocation: &Invocation<'_>, proceed: F) -> std::result::Result<T, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        self.check_return(invocation.method, ReturnShape::Value)?;
        let key = self
            .key_generator
            .cache_key(invocation.method, &invocation.arguments)?;

        if let Some(value) = read_cached::<T, C>(&self.cache, &key)? {
            self.stats.record_hit();
            return Ok(value);
        }
        self.stats.record_miss();

        let token = self.locks.lock_token(&key);
        let _guard = token.lock_blocking();

        if let Some(value) = read_cached::<T, C>(&self.cache, &key)? {
            self.stats.record_second_check_hit();
            return Ok(value);
        }

        self.stats.record_invocation();
        match proceed() {
            Ok(value) => {
                let options = self.options_lookup.cache_entry_options(invocation);
                write_cached::<T, C>(&self.cache, &key, &value, &options);
                Ok(value)
            }
            Err(err) => {
                self.record_fault(&key);
                Err(err)
            }
        }
    }

    // == Intercept Async ==
    /// Asynchronous counterpart of [`CachingInterceptor::intercept`].
    ///
    /// The key's lock is awaited rather than blocked on, and is held until
    /// the underlying future has resolved and its result has been stored.
    /// Backend reads and writes run on the blocking pool.
    pub async fn intercept_async<E, F, Fut>(
        &self,
        invocation: &Invocation<'_>,
        proceed: F,
    ) -> std::result::Result<T, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.check_return(invocation.method, ReturnShape::Future)?;
        let key = self
            .key_generator
            .cache_key(invocation.method, &invocation.arguments)?;

        if let Some(value) = self.read_cached_off_runtime(&key).await? {
            self.stats.record_hit();
            return Ok(value);
        }
        self.stats.record_miss();

        let token = self.locks.lock_token(&key);
        let _guard = token.lock().await;

        if let Some(value) = self.read_cached_off_runtime(&key).await? {
            self.stats.record_second_check_hit();
            return Ok(value);
        }

        self.stats.record_invocation();
        match proceed().await {
            Ok(value) => {
                let options = self.options_lookup.cache_entry_options(invocation);
                Ok(self.write_cached_off_runtime(&key, value, options).await)
            }
            Err(err) => {
                self.record_fault(&key);
                Err(err)
            }
        }
    }

    // == Intercept Unit ==
    /// Calls without a result are never cached: no key, no lock.
    pub fn intercept_unit<R, F>(&self, invocation: &Invocation<'_>, proceed: F) -> R
    where
        F: FnOnce() -> R,
    {
        debug!(method = %invocation.method, "Passing through call without a cacheable result");
        proceed()
    }

    fn check_return(&self, method: &MethodDescriptor, expected: ReturnShape) -> Result<()> {
        let returns = method.returns;
        if returns.shape() != expected {
            return Err(CacheError::Configuration(format!(
                "{} returns {:?} but was intercepted as {:?}",
                method,
                returns.shape(),
                expected
            )));
        }
        if !returns.unwraps_to::<T>() {
            return Err(CacheError::Configuration(format!(
                "{} returns {} but is registered for caching {}",
                method,
                returns.type_name(),
                std::any::type_name::<T>()
            )));
        }
        Ok(())
    }

    async fn read_cached_off_runtime(&self, key: &str) -> Result<Option<T>> {
        let cache = Arc::clone(&self.cache);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || read_cached::<T, C>(&cache, &key))
            .await
            .map_err(|err| CacheError::Internal(err.to_string()))?
    }

    /// Stores a copy of `value` from the blocking pool and hands `value` back.
    async fn write_cached_off_runtime(&self, key: &str, value: T, options: CacheEntryOptions) -> T {
        let cache = Arc::clone(&self.cache);
        let stored_key = key.to_string();
        let stored = value.clone();
        let write = tokio::task::spawn_blocking(move || {
            write_cached::<T, C>(&cache, &stored_key, &stored, &options)
        });
        if let Err(err) = write.await {
            warn!(key = %key, error = %err, "Failed to cache result");
        }
        value
    }

    fn record_fault(&self, key: &str) {
        self.stats.record_fault();
        debug!(key = %key, "Underlying call failed, nothing cached");
    }
}

/// Live cached value for `key`, or None on a miss.
///
/// A value that vanished between the presence check and the read counts
/// as a miss. A default value or an unreadable entry is corruption.
fn read_cached<T, C>(cache: &C, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned + Default + PartialEq,
    C: TypedCache,
{
    if !cache.contains(key)? {
        return Ok(None);
    }

    let value = match cache.get::<T>(key) {
        Ok(value) => value,
        Err(err) => return Err(corruption(cache, key, err.to_string())),
    };

    match value {
        Some(value) if value == T::default() => Err(corruption(
            cache,
            key,
            "cached value is the type's default value".to_string(),
        )),
        other => Ok(other),
    }
}

fn corruption<C: TypedCache>(cache: &C, key: &str, reason: String) -> CacheError {
    CacheError::Corruption {
        key: key.to_string(),
        location: cache.location(key),
        reason,
    }
}

/// Caches a success. Storage failures are logged, never returned, so the
/// caller always sees the underlying operation's own outcome.
fn write_cached<T, C>(cache: &C, key: &str, value: &T, options: &CacheEntryOptions)
where
    T: Serialize + Default + PartialEq,
    C: TypedCache,
{
    match cache.set(key, value, options) {
        Ok(()) => debug!(key = %key, "Cached result"),
        Err(err @ CacheError::Configuration(_)) => {
            error!(key = %key, error = %err, "Failed to cache result")
        }
        Err(err) => warn!(key = %key, error = %err, "Failed to cache result"),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{JsonTypedCache, MemoryTextCache, TextCache};
    use crate::interception::{ReturnType, ToKeyArg};
    use std::cell::Cell;

    type MemoryInterceptor = CachingInterceptor<i32, JsonTypedCache<MemoryTextCache>>;

    fn interceptor() -> MemoryInterceptor {
        CachingInterceptor::new(
            Arc::new(JsonTypedCache::new(MemoryTextCache::default())),
            Arc::new(MethodCacheOptionsLookup::new()),
            CacheLockProvider::new(),
        )
    }

    fn answer() -> MethodDescriptor {
        MethodDescriptor::new("Oracle", "answer", &["question"], ReturnType::value::<i32>())
    }

    #[test]
    fn test_miss_then_hit() {
        let interceptor = interceptor();
        let method = answer();
        let calls = Cell::new(0);
        let call = || {
            interceptor.intercept(&Invocation::new(&method, vec!["life".to_key_arg()]), || {
                calls.set(calls.get() + 1);
                Ok::<_, CacheError>(42)
            })
        };

        assert_eq!(call().unwrap(), 42);
        assert_eq!(call().unwrap(), 42);
        assert_eq!(calls.get(), 1);

        let stats = interceptor.stats().snapshot();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.invocations, 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let interceptor = interceptor();
        let method = answer();
        let invocation = Invocation::new(&method, vec!["life".to_key_arg()]);

        let first: std::result::Result<i32, CacheError> = interceptor
            .intercept(&invocation, || Err(CacheError::NotFound("oracle".to_string())));
        assert!(matches!(first, Err(CacheError::NotFound(_))));

        let second: std::result::Result<i32, CacheError> = interceptor.intercept(&invocation, || Ok(7));
        assert_eq!(second.unwrap(), 7);
        assert_eq!(interceptor.stats().snapshot().faults, 1);
    }

    #[test]
    fn test_default_entry_is_corruption() {
        let interceptor = interceptor();
        let method = answer();
        let invocation = Invocation::new(&method, vec!["life".to_key_arg()]);
        interceptor
            .cache()
            .text_cache()
            .set_string_default("Oracle.answer('life')", "0")
            .unwrap();

        let result: std::result::Result<i32, CacheError> = interceptor.intercept(&invocation, || Ok(42));

        match result {
            Err(CacheError::Corruption { key, location, .. }) => {
                assert_eq!(key, "Oracle.answer('life')");
                assert_eq!(location, "Oracle.answer('life')");
            }
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_entry_is_corruption() {
        let interceptor = interceptor();
        let method = answer();
        let invocation = Invocation::new(&method, vec!["life".to_key_arg()]);
        interceptor
            .cache()
            .text_cache()
            .set_string_default("Oracle.answer('life')", "not json")
            .unwrap();

        let result: std::result::Result<i32, CacheError> = interceptor.intercept(&invocation, || Ok(42));
        assert!(matches!(result, Err(CacheError::Corruption { .. })));
    }

    #[test]
    fn test_return_type_mismatch() {
        let interceptor = interceptor();
        let method = MethodDescriptor::new("Oracle", "name", &[], ReturnType::value::<String>());

        let result: std::result::Result<i32, CacheError> =
            interceptor.intercept(&Invocation::new(&method, vec![]), || Ok(1));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_return_shape_mismatch() {
        let interceptor = interceptor();
        let method = MethodDescriptor::new("Oracle", "answer", &[], ReturnType::future::<i32>());

        let result: std::result::Result<i32, CacheError> =
            interceptor.intercept(&Invocation::new(&method, vec![]), || Ok(1));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_default_result_is_returned_but_not_cached() {
        let interceptor = interceptor();
        let method = answer();
        let invocation = Invocation::new(&method, vec!["nothing".to_key_arg()]);

        let result: std::result::Result<i32, CacheError> = interceptor.intercept(&invocation, || Ok(0));

        assert_eq!(result.unwrap(), 0);
        assert!(!interceptor.cache().contains("Oracle.answer('nothing')").unwrap());
    }

    #[test]
    fn test_unit_passthrough() {
        let interceptor = interceptor();
        let method = MethodDescriptor::new("Oracle", "reset", &[], ReturnType::unit());
        let calls = Cell::new(0);

        for _ in 0..3 {
            interceptor.intercept_unit(&Invocation::new(&method, vec![]), || {
                calls.set(calls.get() + 1)
            });
        }

        assert_eq!(calls.get(), 3);
        assert_eq!(interceptor.stats().snapshot(), Default::default());
    }

    #[tokio::test]
    async fn test_async_miss_then_hit() {
        let interceptor = interceptor();
        let method = MethodDescriptor::new("Oracle", "answer", &["question"], ReturnType::future::<i32>());
        let invocation = Invocation::new(&method, vec!["life".to_key_arg()]);

        let first: std::result::Result<i32, CacheError> =
            interceptor.intercept_async(&invocation, || async { Ok(42) }).await;
        let second: std::result::Result<i32, CacheError> =
            interceptor.intercept_async(&invocation, || async { Ok(7) }).await;

        assert_eq!(first.unwrap(), 42);
        assert_eq!(second.unwrap(), 42);
    }
}
