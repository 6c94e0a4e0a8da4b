//! Slow Example Service Module
//!
//! One service answering every example trait after an artificial delay,
//! counting how often each operation really runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use crate::services::{
    DailyStockPrice, MeaningService, ServiceError, StockPriceService, WeatherForecast,
    WeatherService,
};

// == Slow Example Service ==
#[derive(Debug, Default)]
pub struct SlowExampleService {
    delay: Duration,
    forecast_calls: AtomicUsize,
    stock_price_calls: AtomicUsize,
    meaning_calls: AtomicUsize,
    ponder_calls: AtomicUsize,
}

impl SlowExampleService {
    // == Constructor ==
    /// Service whose every operation takes `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn forecast_calls(&self) -> usize {
        self.forecast_calls.load(Ordering::SeqCst)
    }

    pub fn stock_price_calls(&self) -> usize {
        self.stock_price_calls.load(Ordering::SeqCst)
    }

    pub fn meaning_calls(&self) -> usize {
        self.meaning_calls.load(Ordering::SeqCst)
    }

    pub fn ponder_calls(&self) -> usize {
        self.ponder_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherService for SlowExampleService {
    async fn forecast(&self, date: NaiveDate) -> Result<WeatherForecast, ServiceError> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        info!(%date, "Computing weather forecast (slow)");
        tokio::time::sleep(self.delay).await;
        Ok(WeatherForecast {
            chance_of_rain: 0.42,
            temperature: 42.0,
        })
    }
}

#[async_trait]
impl StockPriceService for SlowExampleService {
    async fn stock_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<DailyStockPrice, ServiceError> {
        self.stock_price_calls.fetch_add(1, Ordering::SeqCst);
        info!(%symbol, %date, "Looking up stock price (slow)");
        tokio::time::sleep(self.delay).await;
        Ok(DailyStockPrice {
            open: 4.2,
            high: 42.0,
            low: 0.42,
            close: 42.0,
        })
    }
}

impl MeaningService for SlowExampleService {
    fn meaning_of_life(&self) -> Result<i32, ServiceError> {
        self.meaning_calls.fetch_add(1, Ordering::SeqCst);
        info!("Computing the meaning of life (slow)");
        std::thread::sleep(self.delay);
        Ok(42)
    }

    fn ponder(&self) {
        self.ponder_calls.fetch_add(1, Ordering::SeqCst);
    }
}
