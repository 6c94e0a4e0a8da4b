//! Expiration Purge Task
//!
//! Background task that periodically evicts expired cache entries, so the
//! backends do not keep stale values that nobody asks for again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheManager;

/// Spawns a background task that periodically purges expired entries.
///
/// The purge runs on the blocking pool since backends may touch the file
/// system. A failed purge is logged and retried on the next tick.
///
/// Returns a JoinHandle that can be used to abort the task during
/// graceful shutdown.
///
/// # Example
/// ```ignore
/// let manager = MemoryTextCache::default().manager();
/// let cleanup_handle = spawn_cleanup_task(manager, 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    manager: Arc<dyn CacheManager>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiration purge task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let manager = Arc::clone(&manager);
            match tokio::task::spawn_blocking(move || manager.purge_expired()).await {
                Ok(Ok(0)) => debug!("Expiration purge: no expired entries found"),
                Ok(Ok(removed)) => info!("Expiration purge: removed {} expired entries", removed),
                Ok(Err(err)) => warn!(error = %err, "Expiration purge failed"),
                Err(err) => warn!(error = %err, "Expiration purge task panicked"),
            }
        }
    })
}
