//! Stock Price Service Module

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::TypedCache;
use crate::interception::{CachingInterceptor, Invocation, MethodDescriptor, ReturnType, ToKeyArg};
use crate::services::ServiceError;

// == Daily Stock Price ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStockPrice {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[async_trait]
pub trait StockPriceService: Send + Sync {
    async fn stock_price(&self, symbol: &str, date: NaiveDate)
        -> Result<DailyStockPrice, ServiceError>;
}

#[async_trait]
impl<S: StockPriceService + ?Sized> StockPriceService for Arc<S> {
    async fn stock_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<DailyStockPrice, ServiceError> {
        (**self).stock_price(symbol, date).await
    }
}

pub fn stock_price_method() -> MethodDescriptor {
    MethodDescriptor::new(
        "StockPriceService",
        "stock_price",
        &["symbol", "date"],
        ReturnType::future::<DailyStockPrice>(),
    )
}

// == Cached Stock Price Service ==
pub struct CachedStockPriceService<S, C> {
    inner: S,
    interceptor: CachingInterceptor<DailyStockPrice, C>,
    stock_price: MethodDescriptor,
}

impl<S, C> CachedStockPriceService<S, C>
where
    S: StockPriceService,
    C: TypedCache + 'static,
{
    pub fn new(inner: S, interceptor: CachingInterceptor<DailyStockPrice, C>) -> Self {
        Self {
            inner,
            interceptor,
            stock_price: stock_price_method(),
        }
    }
}

#[async_trait]
impl<S, C> StockPriceService for CachedStockPriceService<S, C>
where
    S: StockPriceService,
    C: TypedCache + 'static,
{
    async fn stock_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<DailyStockPrice, ServiceError> {
        let invocation = Invocation::new(
            &self.stock_price,
            vec![symbol.to_key_arg(), date.to_key_arg()],
        );
        self.interceptor
            .intercept_async(&invocation, || self.inner.stock_price(symbol, date))
            .await
    }
}
