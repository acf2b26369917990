//! The per-request sequence model: two stacked LSTM layers with dropout,
//! followed by a two-layer dense head producing a single scalar.
//!
//! Constructed fresh for every request, trained once, used for exactly one
//! forward prediction, then dropped.

use super::layers::{Dense, Dropout};
use super::lstm::LstmLayer;
use super::optimizer::AdamConfig;
use crate::domain::errors::PredictionError;
use ndarray::{Array1, Array2, Array3, Axis, Ix2, Ix3, s};
use tracing::debug;

/// Width of each recurrent layer.
pub const RECURRENT_WIDTH: usize = 50;

/// Width of the first dense layer of the head.
pub const DENSE_WIDTH: usize = 25;

/// Dropout rate after each recurrent layer.
pub const DROPOUT_RATE: f64 = 0.2;

pub struct SequenceModel {
    lstm1: LstmLayer,
    drop1: Dropout<Ix3>,
    lstm2: LstmLayer,
    drop2: Dropout<Ix2>,
    fc1: Dense,
    fc2: Dense,

    adam: AdamConfig,
    step: usize,
}

impl SequenceModel {
    /// Fresh, untrained model over univariate sequences.
    pub fn new() -> Self {
        Self {
            lstm1: LstmLayer::new(1, RECURRENT_WIDTH),
            drop1: Dropout::new(DROPOUT_RATE),
            lstm2: LstmLayer::new(RECURRENT_WIDTH, RECURRENT_WIDTH),
            drop2: Dropout::new(DROPOUT_RATE),
            fc1: Dense::new(RECURRENT_WIDTH, DENSE_WIDTH),
            fc2: Dense::new(DENSE_WIDTH, 1),
            adam: AdamConfig::default(),
            step: 0,
        }
    }

    /// `[batch, time, 1] -> [batch, 1]`
    fn forward(&mut self, x: &Array3<f64>, training: bool) -> Array2<f64> {
        // First recurrent layer feeds its full output sequence into the
        // second; the second contributes only its final state to the head.
        let h = self.lstm1.forward(x);
        let h = self.drop1.forward(&h, training);
        let h = self.lstm2.forward_last(&h);
        let h = self.drop2.forward(&h, training);
        let h = self.fc1.forward(&h);
        self.fc2.forward(&h)
    }

    fn backward(&mut self, grad_output: &Array2<f64>) {
        let g = self.fc2.backward(grad_output);
        let g = self.fc1.backward(&g);
        let g = self.drop2.backward(&g);
        let g = self.lstm2.backward_last(&g);
        let g = self.drop1.backward(&g);
        self.lstm1.backward(&g);
    }

    fn apply_gradients(&mut self) {
        self.step += 1;
        self.lstm1.apply_gradients(&self.adam, self.step);
        self.lstm2.apply_gradients(&self.adam, self.step);
        self.fc1.apply_gradients(&self.adam, self.step);
        self.fc2.apply_gradients(&self.adam, self.step);
    }

    /// Trains on all windows: `epochs` full passes in minibatches of
    /// `batch_size`, mean-squared-error loss under Adam. No progress output,
    /// no validation split.
    pub fn fit(
        &mut self,
        inputs: &Array2<f64>,
        targets: &Array1<f64>,
        epochs: usize,
        batch_size: usize,
    ) -> Result<(), PredictionError> {
        let n_samples = inputs.nrows();
        let batch_size = batch_size.min(n_samples).max(1);

        for epoch in 0..epochs {
            let mut epoch_loss = 0.0;
            let mut n_batches = 0usize;

            for start in (0..n_samples).step_by(batch_size) {
                let end = (start + batch_size).min(n_samples);
                let x = inputs
                    .slice(s![start..end, ..])
                    .to_owned()
                    .insert_axis(Axis(2));
                let y = targets.slice(s![start..end]).to_owned().insert_axis(Axis(1));

                let pred = self.forward(&x, true);
                let diff = &pred - &y;
                let loss = diff.mapv(|d| d * d).mean().unwrap_or(0.0);
                if !loss.is_finite() {
                    return Err(PredictionError::Numerical(
                        "training loss became non-finite".to_string(),
                    ));
                }
                epoch_loss += loss;
                n_batches += 1;

                // d(MSE)/d(pred) = 2 * (pred - target) / n
                let grad = diff * (2.0 / ((end - start) as f64));
                self.backward(&grad);
                self.apply_gradients();
            }

            debug!(
                epoch = epoch + 1,
                loss = epoch_loss / n_batches.max(1) as f64,
                "training epoch complete"
            );
        }

        Ok(())
    }

    /// Inference-mode mean squared error over a window set.
    pub fn evaluate(&mut self, inputs: &Array2<f64>, targets: &Array1<f64>) -> f64 {
        let x = inputs.to_owned().insert_axis(Axis(2));
        let y = targets.to_owned().insert_axis(Axis(1));
        let pred = self.forward(&x, false);
        (&pred - &y).mapv(|d| d * d).mean().unwrap_or(0.0)
    }

    /// One inference-mode forward pass over a single window.
    pub fn predict(&mut self, window: &[f64]) -> f64 {
        let x = Array3::from_shape_fn((1, window.len(), 1), |(_, t, _)| window[t]);
        self.forward(&x, false)[[0, 0]]
    }
}

impl Default for SequenceModel {
    fn default() -> Self {
        Self::new()
    }
}
