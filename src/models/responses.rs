//! Response DTOs for the cache management API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;

/// Response body for the entry listing (GET /entries)
#[derive(Debug, Clone, Serialize)]
pub struct EntriesResponse {
    /// The pattern that was matched
    pub pattern: String,
    /// Number of matching entries
    pub count: usize,
    /// Matching keys, where the backend can enumerate them
    pub keys: Vec<String>,
}

/// Response body for the bulk delete (DELETE /entries)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteEntriesResponse {
    pub pattern: String,
    /// Number of entries removed
    pub deleted: usize,
}

/// Response body for the location lookup (GET /entries/:key/location)
#[derive(Debug, Clone, Serialize)]
pub struct LocationResponse {
    pub key: String,
    /// Where the backend keeps, or would keep, the entry
    pub location: String,
}

/// Response body for single entry removal (DELETE /entries/:key)
#[derive(Debug, Clone, Serialize)]
pub struct RemoveResponse {
    /// Success message
    pub message: String,
    /// The key that was removed
    pub key: String,
}

impl RemoveResponse {
    /// Creates a new RemoveResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' removed", key),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Calls served straight from cache
    pub hits: u64,
    /// Calls that had to take the key's lock
    pub misses: u64,
    /// Misses served from cache after waiting for the lock
    pub second_check_hits: u64,
    /// Calls through to the underlying operation
    pub invocations: u64,
    /// Underlying calls that failed
    pub faults: u64,
    /// Current number of entries in the backend
    pub total_entries: usize,
    /// Share of calls answered from cache
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from interceptor statistics
    pub fn new(stats: StatsSnapshot, total_entries: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            second_check_hits: stats.second_check_hits,
            invocations: stats.invocations,
            faults: stats.faults,
            total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
