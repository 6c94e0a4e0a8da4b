//! Cache Lock Module
//!
//! Hands out one mutual-exclusion token per cache key so concurrent misses
//! on the same key run the underlying operation only once.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use moka::sync::Cache;
use parking_lot::Mutex as SyncMutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// How long an unused key keeps its lock token
pub const DEFAULT_LOCK_IDLE: Duration = Duration::from_secs(5 * 60);

/// Every token somebody still references, by key.
type LiveTokens = SyncMutex<HashMap<String, Weak<LockToken>>>;

// == Lock Token ==
/// Per-key lock handle.
#[derive(Debug)]
pub struct LockToken {
    key: String,
    mutex: Arc<Mutex<()>>,
    live: Weak<LiveTokens>,
}

impl LockToken {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Blocks the current thread until the lock is held.
    ///
    /// Safe to call from inside an async runtime: a multi-threaded runtime
    /// hands the worker's other tasks off while waiting, a current-thread
    /// runtime waits on a helper thread.
    pub fn lock_blocking(&self) -> LockGuard {
        let guard = match Arc::clone(&self.mutex).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => wait_blocking(Arc::clone(&self.mutex)),
        };
        trace!(key = %self.key, "Acquired cache lock");
        LockGuard {
            key: self.key.clone(),
            _guard: guard,
        }
    }

    /// Waits until the lock is held without blocking the executor.
    pub async fn lock(&self) -> LockGuard {
        let guard = Arc::clone(&self.mutex).lock_owned().await;
        trace!(key = %self.key, "Acquired cache lock");
        LockGuard {
            key: self.key.clone(),
            _guard: guard,
        }
    }
}

impl Drop for LockToken {
    fn drop(&mut self) {
        let Some(live) = self.live.upgrade() else {
            return;
        };
        let mut live = live.lock();
        // A newer token may already have taken this key's slot
        if live
            .get(&self.key)
            .is_some_and(|token| token.strong_count() == 0)
        {
            live.remove(&self.key);
        }
    }
}

fn wait_blocking(mutex: Arc<Mutex<()>>) -> OwnedMutexGuard<()> {
    match Handle::try_current() {
        Err(_) => mutex.blocking_lock_owned(),
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| mutex.blocking_lock_owned())
        }
        Ok(_) => match thread::spawn(move || mutex.blocking_lock_owned()).join() {
            Ok(guard) => guard,
            Err(panic) => std::panic::resume_unwind(panic),
        },
    }
}

// == Lock Guard ==
/// Holds a key's lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        trace!(key = %self.key, "Released cache lock");
    }
}

// == Cache Lock Provider ==
/// Thread-safe table of lock tokens keyed by cache key.
///
/// Tokens idle for longer than the configured window are dropped from the
/// table. A token that is still held or waited on stays reachable, so
/// later callers for its key keep getting it until everyone lets go.
#[derive(Clone)]
pub struct CacheLockProvider {
    locks: Cache<String, Arc<LockToken>>,
    live: Arc<LiveTokens>,
}

impl CacheLockProvider {
    // == Constructor ==
    pub fn new() -> Self {
        Self::with_idle(DEFAULT_LOCK_IDLE)
    }

    /// Provider whose tokens are evicted after `idle` without use.
    pub fn with_idle(idle: Duration) -> Self {
        Self {
            locks: Cache::builder().time_to_idle(idle).build(),
            live: Arc::new(SyncMutex::new(HashMap::new())),
        }
    }

    // == Lock Token ==
    /// Returns the token for `key`, creating it on first use.
    ///
    /// Concurrent callers for the same key observe the same token.
    pub fn lock_token(&self, key: &str) -> Arc<LockToken> {
        self.locks.get_with_by_ref(key, || self.live_or_new(key))
    }

    /// Revives a token evicted while still in use, or makes a fresh one.
    fn live_or_new(&self, key: &str) -> Arc<LockToken> {
        let mut live = self.live.lock();
        if let Some(token) = live.get(key).and_then(Weak::upgrade) {
            trace!(key = %key, "Reusing lock token still in use");
            return token;
        }

        let token = Arc::new(LockToken {
            key: key.to_string(),
            mutex: Arc::new(Mutex::new(())),
            live: Arc::downgrade(&self.live),
        });
        live.insert(key.to_string(), Arc::downgrade(&token));
        token
    }
}

impl Default for CacheLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheLockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLockProvider")
            .field("tokens", &self.locks.entry_count())
            .field("live", &self.live.lock().len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_key_same_token() {
        let provider = CacheLockProvider::new();
        let a = provider.lock_token("Svc.get(1)");
        let b = provider.lock_token("Svc.get(1)");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.key(), "Svc.get(1)");
    }

    #[test]
    fn test_distinct_keys_distinct_tokens() {
        let provider = CacheLockProvider::new();
        let a = provider.lock_token("Svc.get(1)");
        let b = provider.lock_token("Svc.get(2)");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_parallel_callers_share_token() {
        let provider = CacheLockProvider::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let provider = provider.clone();
                thread::spawn(move || provider.lock_token("shared"))
            })
            .collect();

        let tokens: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for token in &tokens[1..] {
            assert!(Arc::ptr_eq(&tokens[0], token));
        }
    }

    #[test]
    fn test_idle_token_is_replaced() {
        let provider = CacheLockProvider::with_idle(Duration::from_secs(1));
        let first = Arc::downgrade(&provider.lock_token("k"));

        thread::sleep(Duration::from_millis(1500));
        provider.locks.run_pending_tasks();

        assert!(first.upgrade().is_none());
        assert!(provider.live.lock().is_empty());
        let second = provider.lock_token("k");
        assert_eq!(second.key(), "k");
    }

    #[test]
    fn test_token_in_use_survives_idle_window() {
        let provider = CacheLockProvider::with_idle(Duration::from_secs(1));
        let holder = provider.lock_token("k");
        let guard = holder.lock_blocking();

        thread::sleep(Duration::from_millis(1500));
        provider.locks.run_pending_tasks();

        let late = provider.lock_token("k");
        assert!(Arc::ptr_eq(&holder, &late));
        assert!(late.mutex.try_lock().is_err());
        drop(guard);
    }

    #[test]
    fn test_blocking_lock_excludes() {
        let provider = CacheLockProvider::new();
        let token = provider.lock_token("k");
        let guard = token.lock_blocking();

        let contender = Arc::clone(&token);
        let handle = thread::spawn(move || {
            let _guard = contender.lock_blocking();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        drop(guard);
        handle.join().unwrap();
    }

    #[test]
    fn test_async_lock_released_on_drop() {
        let token = CacheLockProvider::new().lock_token("k");
        tokio_test::block_on(async {
            {
                let _guard = token.lock().await;
            }
            let _again = token.lock().await;
        });
    }

    #[tokio::test]
    async fn test_blocking_lock_inside_current_thread_runtime() {
        let token = CacheLockProvider::new().lock_token("k");

        // Uncontended
        drop(token.lock_blocking());

        let guard = token.lock_blocking();
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            drop(guard);
        });
        let _again = token.lock_blocking();
        releaser.join().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_lock_inside_multi_thread_runtime() {
        let token = CacheLockProvider::new().lock_token("k");
        let guard = token.lock_blocking();

        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(guard);
        });
        let _again = token.lock_blocking();
        releaser.await.unwrap();
    }
}
