//! API Handlers
//!
//! HTTP request handlers for each cache management endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use tracing::info;

use crate::cache::{
    CacheManager, CacheStats, ExpirationEvaluator, JsonTypedCache, KeyPattern, LocalFileCache,
    ManagedCache, MemoryTextCache, TextCache,
};
use crate::config::{BackendKind, Config};
use crate::error::{CacheError, Result};
use crate::interception::{CacheLockProvider, CachingInterceptor, MethodCacheOptionsLookup};
use crate::models::{
    DeleteEntriesResponse, EntriesResponse, HealthResponse, LocationResponse, PatternQuery,
    RemoveResponse, StatsResponse,
};
use crate::services::{
    CachedWeatherService, ServiceError, SlowExampleService, WeatherForecast, WeatherService,
};

/// How long a weather forecast stays cached
pub const FORECAST_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Delay of the slow example service behind the forecast endpoint
pub const FORECAST_DELAY: Duration = Duration::from_secs(2);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend holding the cached values
    pub text_cache: Arc<dyn TextCache>,
    /// Bulk operations over the same backend
    pub manager: Arc<dyn CacheManager>,
    /// Counters of every interceptor wired into this state
    pub stats: Arc<CacheStats>,
    /// Cached example service
    pub weather: Arc<dyn WeatherService>,
    /// Whether stored keys are the original cache keys and can be listed
    pub lists_keys: bool,
}

impl AppState {
    /// Wires the cached example service onto `text_cache`.
    ///
    /// `weather_delay` is how long an uncached forecast takes.
    pub fn new(
        text_cache: Arc<dyn TextCache>,
        manager: Arc<dyn CacheManager>,
        lists_keys: bool,
        lock_idle: Duration,
        weather_delay: Duration,
    ) -> Result<Self> {
        let stats = Arc::new(CacheStats::new());
        let options_lookup = MethodCacheOptionsLookup::new()
            .add_relative_expiration("WeatherService", FORECAST_EXPIRATION)?;

        let interceptor: CachingInterceptor<WeatherForecast, _> = CachingInterceptor::new(
            Arc::new(JsonTypedCache::new(Arc::clone(&text_cache))),
            Arc::new(options_lookup),
            CacheLockProvider::with_idle(lock_idle),
        )
        .with_stats(Arc::clone(&stats));

        let weather = CachedWeatherService::new(SlowExampleService::new(weather_delay), interceptor);

        Ok(Self {
            text_cache,
            manager,
            stats,
            weather: Arc::new(weather),
            lists_keys,
        })
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the configured backend with the configured default policy.
    pub fn from_config(config: &Config) -> Result<Self> {
        let evaluator = ExpirationEvaluator::new(config.default_policy());
        match config.backend {
            BackendKind::Memory => {
                let cache = MemoryTextCache::new(evaluator);
                let manager = cache.manager();
                Self::new(Arc::new(cache), manager, true, config.lock_idle, FORECAST_DELAY)
            }
            BackendKind::File => {
                let dir = config.resolved_cache_dir();
                info!("Using file cache at {}", dir.display());
                let cache = LocalFileCache::new(dir, evaluator)?;
                let manager = cache.manager();
                Self::new(Arc::new(cache), manager, false, config.lock_idle, FORECAST_DELAY)
            }
        }
    }
}

/// Runs a backend operation on the blocking pool.
async fn blocking<T, F>(operation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|err| CacheError::Internal(err.to_string()))?
}

fn validated_pattern(query: &PatternQuery) -> Result<String> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    Ok(query.pattern().to_string())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
///
/// Returns interceptor statistics and the backend's entry count.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let manager = Arc::clone(&state.manager);
    let total_entries = blocking(move || manager.entry_count()).await?;

    Ok(Json(StatsResponse::new(state.stats.snapshot(), total_entries)))
}

/// Handler for GET /entries
///
/// Counts entries matching the pattern. Keys are listed only when the
/// backend stores them verbatim.
pub async fn list_entries_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> Result<Json<EntriesResponse>> {
    let pattern = validated_pattern(&query)?;
    let manager = Arc::clone(&state.manager);
    let lists_keys = state.lists_keys;
    let expression = pattern.clone();

    let (count, keys) = blocking(move || {
        let count = manager.count_matching(&expression)?;
        let keys = if lists_keys {
            let matcher = KeyPattern::new(&expression)?;
            manager
                .keys()?
                .into_iter()
                .filter(|key| matcher.is_match(key))
                .collect()
        } else {
            Vec::new()
        };
        Ok((count, keys))
    })
    .await?;

    Ok(Json(EntriesResponse {
        pattern,
        count,
        keys,
    }))
}

/// Handler for DELETE /entries
///
/// Deletes every entry matching the pattern.
pub async fn delete_entries_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> Result<Json<DeleteEntriesResponse>> {
    let pattern = validated_pattern(&query)?;
    let manager = Arc::clone(&state.manager);
    let expression = pattern.clone();

    let deleted = blocking(move || manager.delete_matching(&expression)).await?;
    info!("Deleted {} entries matching '{}'", deleted, pattern);

    Ok(Json(DeleteEntriesResponse { pattern, deleted }))
}

/// Handler for GET /entries/:key/location
pub async fn location_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<LocationResponse> {
    let location = state.text_cache.location(&key);
    Json(LocationResponse { key, location })
}

/// Handler for DELETE /entries/:key
///
/// Removing an absent key succeeds.
pub async fn remove_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemoveResponse>> {
    let text_cache = Arc::clone(&state.text_cache);
    let removed_key = key.clone();
    blocking(move || text_cache.remove(&removed_key)).await?;

    Ok(Json(RemoveResponse::new(key)))
}

/// Handler for GET /forecast/:date
///
/// Serves the example weather service through its caching decorator.
pub async fn forecast_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> std::result::Result<Json<WeatherForecast>, ServiceError> {
    let date: NaiveDate = date
        .parse()
        .map_err(|_| CacheError::InvalidRequest(format!("'{}' is not an ISO date", date)))?;

    let forecast = state.weather.forecast(date).await?;
    Ok(Json(forecast))
}
