//! API Module
//!
//! HTTP handlers and routing for the cache management REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Interceptor statistics and entry count
//! - `GET /entries?pattern=` - Count (and list) entries matching a wildcard
//! - `DELETE /entries?pattern=` - Delete entries matching a wildcard
//! - `GET /entries/:key/location` - Where the backend keeps an entry
//! - `DELETE /entries/:key` - Remove one entry
//! - `GET /forecast/:date` - Cached example weather service

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
