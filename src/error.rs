//! Error types for the method cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the caching layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The caching layer was wired up incorrectly (fail fast)
    #[error("Invalid cache configuration: {0}")]
    Configuration(String),

    /// A cache hit could not be turned back into a value
    #[error("Corrupt cache entry for key '{key}' at location '{location}': {reason}")]
    Corruption {
        key: String,
        location: String,
        reason: String,
    },

    /// Default values are reserved to mean "absent"
    #[error("Default values are not permitted in cache. Key: {0}")]
    DefaultValue(String),

    /// Entry claims to have been written after "now"
    #[error("Last update {updated} must not be later than {now}")]
    InvalidTimestamp {
        updated: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// File system failure that survived the retry policy
    #[error("Storage error at '{}': {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Value could not be encoded to or decoded from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Wildcard expression could not be compiled
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),

    /// Key not found (management API only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Malformed request (management API only)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A blocking cache operation did not complete
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    // == Storage Helper ==
    /// Wraps an I/O error with the path it occurred on.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Storage {
            path: path.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidPattern(_)
            | CacheError::InvalidRequest(_)
            | CacheError::Configuration(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
