//! Data preparation ahead of model training: min-max scaling of the close
//! series and slicing it into fixed-length lookback windows.

use crate::domain::errors::PredictionError;
use ndarray::{Array1, Array2};

/// Trading days each training window looks back over.
pub const LOOKBACK: usize = 60;

/// Minimum number of windows required to attempt a model fit.
pub const MIN_TRAINING_WINDOWS: usize = 10;

/// Min-max normalizer mapping the fit series into `[0, 1]`.
///
/// Fit exactly once per request over the full close series; the captured
/// min/max live only for that request.
#[derive(Debug, Clone, Copy)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Result<Self, PredictionError> {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        // A flat (or empty, or non-finite) series would divide by zero below.
        if !range.is_finite() || range <= 0.0 {
            return Err(PredictionError::InsufficientVariance);
        }

        Ok(Self { min, range })
    }

    pub fn fit_transform(values: &[f64]) -> Result<(Self, Vec<f64>), PredictionError> {
        let scaler = Self::fit(values)?;
        Ok((scaler, scaler.transform(values)))
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| (v - self.min) / self.range).collect()
    }

    /// Maps a scaled value back onto the price axis.
    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range + self.min
    }
}

/// Lookback windows paired with their next-step targets, oldest first.
#[derive(Debug, Clone)]
pub struct TrainingWindows {
    /// `[n_windows, LOOKBACK]`
    pub inputs: Array2<f64>,
    /// `[n_windows]`
    pub targets: Array1<f64>,
}

impl TrainingWindows {
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }
}

/// Slides a step-1 window of length `lookback` across the scaled series.
///
/// For `i` in `lookback..len`: input is `scaled[i - lookback..i]`, target is
/// `scaled[i]`, producing exactly `len - lookback` windows.
pub fn build_windows(
    scaled: &[f64],
    lookback: usize,
) -> Result<TrainingWindows, PredictionError> {
    let count = scaled.len().saturating_sub(lookback);
    if count < MIN_TRAINING_WINDOWS {
        return Err(PredictionError::InsufficientWindows {
            got: count,
            need: MIN_TRAINING_WINDOWS,
        });
    }

    let mut inputs = Array2::zeros((count, lookback));
    let mut targets = Array1::zeros(count);

    for w in 0..count {
        for t in 0..lookback {
            inputs[[w, t]] = scaled[w + t];
        }
        targets[w] = scaled[w + lookback];
    }

    Ok(TrainingWindows { inputs, targets })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_maps_to_unit_interval() {
        let values = vec![10.0, 20.0, 15.0, 30.0];
        let (_, scaled) = MinMaxScaler::fit_transform(&values).unwrap();

        assert_eq!(scaled[0], 0.0);
        assert_eq!(scaled[3], 1.0);
        assert!((scaled[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_round_trip() {
        let values = vec![101.3, 99.8, 143.7, 87.2, 120.0];
        let (scaler, scaled) = MinMaxScaler::fit_transform(&values).unwrap();

        for (original, s) in values.iter().zip(&scaled) {
            assert!((scaler.inverse(*s) - original).abs() < 1e-9);
        }
    }

    #[test]
    fn test_flat_series_is_rejected() {
        let values = vec![42.0; 80];
        assert!(matches!(
            MinMaxScaler::fit(&values),
            Err(PredictionError::InsufficientVariance)
        ));
    }

    #[test]
    fn test_empty_series_is_rejected() {
        assert!(MinMaxScaler::fit(&[]).is_err());
    }

    #[test]
    fn test_window_count_is_len_minus_lookback() {
        let scaled: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let windows = build_windows(&scaled, LOOKBACK).unwrap();

        assert_eq!(windows.len(), 100 - LOOKBACK);
        assert_eq!(windows.inputs.ncols(), LOOKBACK);
    }

    #[test]
    fn test_windows_are_ordered_oldest_first() {
        let scaled: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let windows = build_windows(&scaled, 5).unwrap();

        // First window covers [0, 5), targeting element 5.
        assert_eq!(windows.inputs[[0, 0]], 0.0);
        assert_eq!(windows.inputs[[0, 4]], 4.0);
        assert_eq!(windows.targets[0], 5.0);
        // Last window covers [14, 19), targeting element 19.
        assert_eq!(windows.inputs[[14, 0]], 14.0);
        assert_eq!(windows.targets[14], 19.0);
    }

    #[test]
    fn test_seventy_points_make_exactly_ten_windows() {
        let scaled: Vec<f64> = (0..70).map(|i| i as f64 / 70.0).collect();
        let windows = build_windows(&scaled, LOOKBACK).unwrap();
        assert_eq!(windows.len(), MIN_TRAINING_WINDOWS);
    }

    #[test]
    fn test_sixty_nine_points_are_not_enough() {
        let scaled: Vec<f64> = (0..69).map(|i| i as f64 / 69.0).collect();
        assert!(matches!(
            build_windows(&scaled, LOOKBACK),
            Err(PredictionError::InsufficientWindows { got: 9, need: 10 })
        ));
    }
}
