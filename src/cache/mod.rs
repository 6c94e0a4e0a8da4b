//! Cache Module
//!
//! Text-based cache backends, the typed JSON view over them, expiration
//! evaluation and cache management.

mod entry;
mod expiration;
mod file;
mod manager;
mod memory;
mod options;
mod stats;
mod text;
mod typed;


// Re-export public types
pub use entry::CacheEntry;
pub use expiration::{
    DefaultCachePolicy, ExpirationEvaluator, HardCodedDefaultPolicy, DEFAULT_RELATIVE_EXPIRATION,
};
pub use file::{find_local_cache_dir, LocalFileCache};
pub use manager::{CacheManager, KeyPattern, ManagedCache};
pub use memory::MemoryTextCache;
pub use options::CacheEntryOptions;
pub use stats::{CacheStats, StatsSnapshot};
pub use text::TextCache;
pub use typed::{JsonTypedCache, TypedCache};

// == Public Constants ==
/// Maximum accepted length of a key pattern in bytes
pub const MAX_PATTERN_LENGTH: usize = 1024;
