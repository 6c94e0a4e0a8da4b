//! Weather Service Module

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::TypedCache;
use crate::interception::{CachingInterceptor, Invocation, MethodDescriptor, ReturnType, ToKeyArg};
use crate::services::ServiceError;

// == Weather Forecast ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    /// Probability of rain in `0.0..=1.0`
    pub chance_of_rain: f64,
    /// Degrees Celsius
    pub temperature: f64,
}

#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn forecast(&self, date: NaiveDate) -> Result<WeatherForecast, ServiceError>;
}

#[async_trait]
impl<S: WeatherService + ?Sized> WeatherService for Arc<S> {
    async fn forecast(&self, date: NaiveDate) -> Result<WeatherForecast, ServiceError> {
        (**self).forecast(date).await
    }
}

/// Descriptor of [`WeatherService::forecast`].
pub fn forecast_method() -> MethodDescriptor {
    MethodDescriptor::new(
        "WeatherService",
        "forecast",
        &["date"],
        ReturnType::future::<WeatherForecast>(),
    )
}

// == Cached Weather Service ==
/// Serves forecasts from cache, asking `inner` only on a miss.
pub struct CachedWeatherService<S, C> {
    inner: S,
    interceptor: CachingInterceptor<WeatherForecast, C>,
    forecast: MethodDescriptor,
}

impl<S, C> CachedWeatherService<S, C>
where
    S: WeatherService,
    C: TypedCache + 'static,
{
    pub fn new(inner: S, interceptor: CachingInterceptor<WeatherForecast, C>) -> Self {
        Self {
            inner,
            interceptor,
            forecast: forecast_method(),
        }
    }
}

#[async_trait]
impl<S, C> WeatherService for CachedWeatherService<S, C>
where
    S: WeatherService,
    C: TypedCache + 'static,
{
    async fn forecast(&self, date: NaiveDate) -> Result<WeatherForecast, ServiceError> {
        let invocation = Invocation::new(&self.forecast, vec![date.to_key_arg()]);
        self.interceptor
            .intercept_async(&invocation, || self.inner.forecast(date))
            .await
    }
}
