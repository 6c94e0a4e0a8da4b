//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each management endpoint, with the
//! cached example service filling the backend.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use method_cache::{
    api::create_router,
    cache::{ExpirationEvaluator, LocalFileCache, ManagedCache, MemoryTextCache},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

const FORECAST_KEY: &str = "WeatherService.forecast(2024-06-01)";

// == Helper Functions ==

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

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// == Forecast Endpoint Tests ==

#[tokio::test]
async fn test_forecast_is_cached() {
    let app = create_test_app();

    let (status, first) = send(&app, "GET", "/forecast/2024-06-01").await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(&app, "GET", "/forecast/2024-06-01").await;
    assert_eq!(first, second);
    assert_eq!(first["temperature"], 42.0);

    let (status, stats) = send(&app, "GET", "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["invocations"], 1);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["total_entries"], 1);
}

#[tokio::test]
async fn test_forecast_invalid_date() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/forecast/June-first").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("June-first"));
}

// == Entries Endpoint Tests ==

#[tokio::test]
async fn test_list_entries_by_pattern() {
    let app = create_test_app();
    send(&app, "GET", "/forecast/2024-06-01").await;
    send(&app, "GET", "/forecast/2024-06-02").await;

    let (status, json) = send(&app, "GET", "/entries?pattern=WeatherService.*").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["keys"][0], FORECAST_KEY);

    let (_, json) = send(&app, "GET", "/entries?pattern=StockPriceService.*").await;
    assert_eq!(json["count"], 0);

    let (_, json) = send(&app, "GET", "/entries").await;
    assert_eq!(json["pattern"], "*");
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn test_empty_pattern_rejected() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/entries?pattern=").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_delete_entries_forces_recompute() {
    let app = create_test_app();
    send(&app, "GET", "/forecast/2024-06-01").await;

    let (status, json) = send(&app, "DELETE", "/entries?pattern=WeatherService.*").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], 1);

    send(&app, "GET", "/forecast/2024-06-01").await;
    let (_, stats) = send(&app, "GET", "/stats").await;
    assert_eq!(stats["invocations"], 2);
}

#[tokio::test]
async fn test_remove_single_entry() {
    let app = create_test_app();
    send(&app, "GET", "/forecast/2024-06-01").await;

    let (status, json) = send(&app, "DELETE", &format!("/entries/{}", FORECAST_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], FORECAST_KEY);

    let (_, json) = send(&app, "GET", "/entries").await;
    assert_eq!(json["count"], 0);

    // Removing again is not an error
    let (status, _) = send(&app, "DELETE", &format!("/entries/{}", FORECAST_KEY)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_memory_location_is_key() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", &format!("/entries/{}/location", FORECAST_KEY)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["location"], FORECAST_KEY);
}

// == File Backend Tests ==

#[tokio::test]
async fn test_file_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cache = LocalFileCache::new(dir.path(), ExpirationEvaluator::default()).unwrap();
    let manager = cache.manager();
    let state = AppState::new(
        Arc::new(cache),
        manager,
        false,
        Duration::from_secs(60),
        Duration::ZERO,
    )
    .unwrap();
    let app = create_router(state);

    send(&app, "GET", "/forecast/2024-06-01").await;
    send(&app, "GET", "/forecast/2024-06-01").await;

    let (_, json) = send(&app, "GET", "/entries?pattern=WeatherService.*").await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["keys"].as_array().unwrap().len(), 0);

    let (_, json) = send(&app, "GET", &format!("/entries/{}/location", FORECAST_KEY)).await;
    assert!(json["location"].as_str().unwrap().ends_with(".txt"));

    let (_, stats) = send(&app, "GET", "/stats").await;
    assert_eq!(stats["invocations"], 1);
    assert_eq!(stats["total_entries"], 1);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
