//! Example Services Module
//!
//! Slow services and the caching decorators that wrap them. Each cached
//! result type gets its own service trait and its own interceptor.

mod meaning;
mod slow;
mod stock;
mod weather;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::error::CacheError;
use crate::models::ErrorResponse;

pub use meaning::{meaning_of_life_method, ponder_method, CachedMeaningService, MeaningService};
pub use slow::SlowExampleService;
pub use stock::{stock_price_method, CachedStockPriceService, DailyStockPrice, StockPriceService};
pub use weather::{forecast_method, CachedWeatherService, WeatherForecast, WeatherService};

// == Service Error ==
/// Failure of an example service call.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The underlying service could not answer
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The caching layer failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Cache(err) => err.into_response(),
            ServiceError::Unavailable(_) => {
                let body = Json(ErrorResponse::new(self.to_string()));
                (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
            }
        }
    }
}
