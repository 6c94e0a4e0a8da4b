//! API Routes
//!
//! Configures the Axum router with all cache management endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_entries_handler, forecast_handler, health_handler, list_entries_handler,
    location_handler, remove_entry_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route(
            "/entries",
            get(list_entries_handler).delete(delete_entries_handler),
        )
        .route("/entries/:key/location", get(location_handler))
        .route("/entries/:key", delete(remove_entry_handler))
        .route("/forecast/:date", get(forecast_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use crate::cache::{ManagedCache, MemoryTextCache};

    fn create_test_app() -> Router {
        let cache = MemoryTextCache::default();
        let manager = cache.manager();
        let state = AppState::new(
            Arc::new(cache),
            manager,
            true,
            Duration::from_secs(60),
            Duration::ZERO,
        )
        .unwrap();
        create_router(state)
    }

    async fn status_of(method: &str, uri: &str) -> StatusCode {
        create_test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of("GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of("GET", "/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_entries_endpoint() {
        assert_eq!(status_of("GET", "/entries").await, StatusCode::OK);
        assert_eq!(status_of("DELETE", "/entries?pattern=*").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_remove_absent_key() {
        assert_eq!(status_of("DELETE", "/entries/missing").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forecast_bad_date() {
        assert_eq!(
            status_of("GET", "/forecast/not-a-date").await,
            StatusCode::BAD_REQUEST
        );
    }
}
