use crate::domain::errors::PredictionError;
use crate::domain::market::PriceSeries;
use async_trait::async_trait;
use chrono::NaiveDate;

// Need async_trait for async functions in traits
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Daily bars for `symbol` from `start` up to (but not including) `end`,
    /// oldest first. Provider failures, unknown symbols and empty ranges all
    /// surface as `PredictionError::DataFetch`.
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PredictionError>;
}
