//! Request DTOs for the cache management API
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

use crate::cache::MAX_PATTERN_LENGTH;

/// Query string of the entry listing and bulk delete endpoints
/// (`GET /entries`, `DELETE /entries`)
///
/// # Fields
/// - `pattern`: Wildcard expression over keys, `*` for any run of
///   characters and `?` for exactly one (default: `*`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternQuery {
    #[serde(default)]
    pub pattern: Option<String>,
}

impl PatternQuery {
    /// The requested pattern, or `*` when none was given.
    pub fn pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or("*")
    }

    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let pattern = self.pattern();
        if pattern.trim().is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Some(format!(
                "Pattern exceeds maximum length of {} characters",
                MAX_PATTERN_LENGTH
            ));
        }
        None
    }
}
