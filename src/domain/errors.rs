use thiserror::Error;

/// Failure modes of the forecast pipeline.
///
/// Display strings double as the wire-level error messages, so the exact
/// wording here is part of the HTTP contract.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Insufficient data for prediction")]
    InsufficientHistory { got: usize, need: usize },

    #[error("Insufficient data for training")]
    InsufficientWindows { got: usize, need: usize },

    #[error("Insufficient variance in price history")]
    InsufficientVariance,

    #[error("Failed to fetch market data: {0}")]
    DataFetch(String),

    #[error("Numerical error: {0}")]
    Numerical(String),
}
