//! Interception Module
//!
//! Method descriptors, cache key generation, per-key locking, options lookup
//! and the caching interceptor that ties them together.

mod descriptor;
mod interceptor;
mod key;
mod lock;
mod lookup;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use descriptor::{Invocation, MethodDescriptor, ReturnShape, ReturnType};
pub use interceptor::CachingInterceptor;
pub use key::{KeyArg, KeyGenerator, MethodCacheKeyGenerator, Progress, ToKeyArg};
pub use lock::{CacheLockProvider, LockGuard, LockToken, DEFAULT_LOCK_IDLE};
pub use lookup::{ArgPattern, MethodCacheOptionsLookup, MethodInvocationMatcher};
