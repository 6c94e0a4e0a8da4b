//! Request and Response models for the cache management API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::PatternQuery;
pub use responses::{
    DeleteEntriesResponse, EntriesResponse, ErrorResponse, HealthResponse, LocationResponse,
    RemoveResponse, StatsResponse,
};
