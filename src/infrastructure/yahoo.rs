//! Market data from the Yahoo Finance v8 chart API.
//!
//! The provider is a black box behind `MarketDataService`: network failures,
//! unknown symbols and empty ranges all come back as `DataFetch` errors and
//! are folded into the generic error path upstream.

use crate::domain::errors::PredictionError;
use crate::domain::market::{DailyBar, PriceSeries};
use crate::domain::ports::MarketDataService;
use crate::infrastructure::http_client::{build_url_with_query, create_client};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::debug;

/// Yahoo rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

pub struct YahooMarketData {
    client: ClientWithMiddleware,
    base_url: String,
}

impl YahooMarketData {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: create_client(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MarketDataService for YahooMarketData {
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PredictionError> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();

        let url = build_url_with_query(
            &format!("{}/v8/finance/chart/{}", self.base_url, symbol),
            &[
                ("period1", period1.to_string().as_str()),
                ("period2", period2.to_string().as_str()),
                ("interval", "1d"),
            ],
        );
        debug!(symbol, %start, %end, "fetching daily closes");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| PredictionError::DataFetch(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PredictionError::DataFetch(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| PredictionError::DataFetch(format!("malformed provider response: {e}")))?;

        let series = extract_series(envelope)?;
        debug!(symbol, rows = series.len(), "daily closes fetched");
        Ok(series)
    }
}

// ===== Chart API response envelope =====

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Pulls the (timestamp, close) pairs out of the chart envelope. Days with a
/// null close (halted or unreported) are skipped.
fn extract_series(envelope: ChartEnvelope) -> Result<PriceSeries, PredictionError> {
    if let Some(err) = envelope.chart.error {
        return Err(PredictionError::DataFetch(format!(
            "{}: {}",
            err.code, err.description
        )));
    }

    let result = envelope
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| PredictionError::DataFetch("no data returned for symbol".to_string()))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let bars: Vec<DailyBar> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = close?;
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            Some(DailyBar { date, close })
        })
        .collect();

    Ok(PriceSeries::new(bars))
}
