//! Orchestrates one forecast: fetch history, scale, window, train a fresh
//! model, predict, and apply the decision rule.

use crate::application::ml::SequenceModel;
use crate::application::preprocessing::{self, LOOKBACK, MIN_TRAINING_WINDOWS, MinMaxScaler};
use crate::domain::errors::PredictionError;
use crate::domain::ports::MarketDataService;
use crate::domain::signal::{TradeDecision, decide};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Minimum trading days: one lookback window plus a minimal training set.
pub const MIN_HISTORY: usize = LOOKBACK + MIN_TRAINING_WINDOWS;

/// Full passes over the window set.
const EPOCHS: usize = 10;

const BATCH_SIZE: usize = 32;

/// Everything the client needs to chart the history and act on the forecast.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub dates: Vec<String>,
    pub historical_prices: Vec<f64>,
    pub current_price: f64,
    pub predicted_price: f64,
    pub price_change_pct: f64,
    pub decision: TradeDecision,
}

pub struct Predictor {
    market_data: Arc<dyn MarketDataService>,
}

impl Predictor {
    pub fn new(market_data: Arc<dyn MarketDataService>) -> Self {
        Self { market_data }
    }

    /// Runs the pipeline for one symbol, short-circuiting on the first
    /// failing step. Every per-request artifact (scaler bounds, trained
    /// weights) is dropped when this returns; nothing is shared across
    /// requests.
    pub async fn predict_next_day(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Forecast, PredictionError> {
        let series = self
            .market_data
            .fetch_daily_closes(symbol, start, end)
            .await?;
        if series.len() < MIN_HISTORY {
            return Err(PredictionError::InsufficientHistory {
                got: series.len(),
                need: MIN_HISTORY,
            });
        }

        let closes = series.closes();
        let current_price = closes[closes.len() - 1];

        let (scaler, scaled) = MinMaxScaler::fit_transform(&closes)?;
        let windows = preprocessing::build_windows(&scaled, LOOKBACK)?;
        info!(
            symbol,
            rows = series.len(),
            windows = windows.len(),
            "training forecast model"
        );

        let mut model = SequenceModel::new();
        model.fit(&windows.inputs, &windows.targets, EPOCHS, BATCH_SIZE)?;

        // The most recent window drives the single forward prediction.
        let last_window = &scaled[scaled.len() - LOOKBACK..];
        let predicted_scaled = model.predict(last_window);
        if !predicted_scaled.is_finite() {
            return Err(PredictionError::Numerical(
                "model produced a non-finite prediction".to_string(),
            ));
        }

        let predicted_price = scaler.inverse(predicted_scaled);
        let price_change_pct = (predicted_price - current_price) / current_price * 100.0;
        let decision = decide(price_change_pct);

        debug!(
            symbol,
            current_price, predicted_price, price_change_pct, "forecast ready"
        );

        Ok(Forecast {
            dates: series.dates(),
            historical_prices: closes,
            current_price,
            predicted_price,
            price_change_pct,
            decision,
        })
    }
}
