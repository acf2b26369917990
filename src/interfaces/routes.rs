//! HTTP surface: the prediction endpoint plus the static single-page client.
//!
//! The endpoint always answers HTTP 200 with a `success` flag; every failure,
//! including malformed request bodies, reduces to the same
//! `{success: false, error}` shape.

use crate::application::predictor::{Forecast, Predictor};
use crate::domain::ports::MarketDataService;
use crate::domain::signal::TradeAction;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<dyn MarketDataService>,
}

pub fn router(state: AppState, asset_dir: &str) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .with_state(state)
        .fallback_service(
            ServeDir::new(asset_dir)
                .not_found_service(ServeFile::new(format!("{asset_dir}/index.html"))),
        )
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default = "default_symbol")]
    pub stock: String,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
}

fn default_symbol() -> String {
    "RELIANCE.NS".to_string()
}

fn default_start_date() -> String {
    "2022-01-01".to_string()
}

fn default_end_date() -> String {
    "2025-01-01".to_string()
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Success {
        success: bool,
        dates: Vec<String>,
        historical_prices: Vec<f64>,
        current_price: f64,
        predicted_price: f64,
        price_change: f64,
        decision: TradeAction,
        confidence: u8,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl PredictResponse {
    fn from_forecast(forecast: Forecast) -> Self {
        Self::Success {
            success: true,
            dates: forecast.dates,
            historical_prices: forecast.historical_prices,
            current_price: forecast.current_price,
            predicted_price: forecast.predicted_price,
            price_change: forecast.price_change_pct,
            decision: forecast.decision.action,
            confidence: forecast.decision.confidence,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Json<PredictResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(%rejection, "rejecting malformed predict request");
            return Json(PredictResponse::failure(format!("Error: {rejection}")));
        }
    };

    info!(
        stock = %request.stock,
        start = %request.start_date,
        end = %request.end_date,
        "prediction requested"
    );

    match run_prediction(&state, &request).await {
        Ok(forecast) => Json(PredictResponse::from_forecast(forecast)),
        Err(message) => {
            warn!(stock = %request.stock, error = %message, "prediction failed");
            Json(PredictResponse::failure(message))
        }
    }
}

async fn run_prediction(state: &AppState, request: &PredictRequest) -> Result<Forecast, String> {
    let start = parse_date("start_date", &request.start_date)?;
    let end = parse_date("end_date", &request.end_date)?;
    if start >= end {
        return Err("Error: start_date must fall before end_date".to_string());
    }

    Predictor::new(state.market_data.clone())
        .predict_next_day(&request.stock, start, end)
        .await
        .map_err(|e| e.to_string())
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Error: {field} {value:?} is not a YYYY-MM-DD date"))
}
