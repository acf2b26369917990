//! Dense and dropout layers.

use super::optimizer::{AdamConfig, AdamState};
use ndarray::{Array, Array1, Array2, Axis, Dimension, Ix1, Ix2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;

/// Fully-connected linear layer over a batch: `output = input @ W + b`.
///
/// Both dense layers of the forecast head are linear, so no activation is
/// modeled here.
pub struct Dense {
    weights: Array2<f64>,
    biases: Array1<f64>,

    // Cached activations and accumulated gradients for the running batch
    last_input: Option<Array2<f64>>,
    w_grad: Array2<f64>,
    b_grad: Array1<f64>,

    w_state: AdamState<Ix2>,
    b_state: AdamState<Ix1>,
}

impl Dense {
    /// Xavier-initialized layer mapping `input_size` to `output_size`.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        let weights = Array2::random((input_size, output_size), Uniform::new(-limit, limit));
        let biases = Array1::zeros(output_size);

        Self {
            w_grad: Array2::zeros(weights.raw_dim()),
            b_grad: Array1::zeros(biases.raw_dim()),
            w_state: AdamState::zeros_like(&weights),
            b_state: AdamState::zeros_like(&biases),
            last_input: None,
            weights,
            biases,
        }
    }

    /// `[batch, input] -> [batch, output]`; caches the input for backprop.
    pub fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        self.last_input = Some(input.clone());
        input.dot(&self.weights) + &self.biases
    }

    /// Accumulates parameter gradients and returns the gradient w.r.t. the
    /// layer input.
    pub fn backward(&mut self, grad_output: &Array2<f64>) -> Array2<f64> {
        let input = self
            .last_input
            .as_ref()
            .expect("Must call forward before backward");

        self.w_grad += &input.t().dot(grad_output);
        self.b_grad += &grad_output.sum_axis(Axis(0));

        grad_output.dot(&self.weights.t())
    }

    /// Applies the accumulated gradients and clears them.
    pub fn apply_gradients(&mut self, cfg: &AdamConfig, step: usize) {
        self.w_state.update(cfg, step, &mut self.weights, &self.w_grad);
        self.b_state.update(cfg, step, &mut self.biases, &self.b_grad);
        self.w_grad.fill(0.0);
        self.b_grad.fill(0.0);
    }
}

/// Inverted dropout: active only during training, identity at inference.
///
/// Kept units are scaled by `1 / keep` so the expected activation is
/// unchanged, which is why inference needs no rescaling.
pub struct Dropout<D: Dimension> {
    rate: f64,
    mask: Option<Array<f64, D>>,
}

impl<D: Dimension> Dropout<D> {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            mask: None,
        }
    }

    pub fn forward(&mut self, input: &Array<f64, D>, training: bool) -> Array<f64, D> {
        if !training || self.rate == 0.0 {
            self.mask = None;
            return input.clone();
        }

        let keep = 1.0 - self.rate;
        let mut rng = rand::thread_rng();
        let mask = Array::from_shape_fn(input.raw_dim(), |_| {
            if rng.gen_range(0.0..1.0) < keep {
                1.0 / keep
            } else {
                0.0
            }
        });
        let output = input * &mask;
        self.mask = Some(mask);
        output
    }

    pub fn backward(&self, grad_output: &Array<f64, D>) -> Array<f64, D> {
        match &self.mask {
            Some(mask) => grad_output * mask,
            None => grad_output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_dense_output_shape() {
        let mut layer = Dense::new(50, 25);
        let input = Array2::ones((4, 50));
        assert_eq!(layer.forward(&input).dim(), (4, 25));
    }

    #[test]
    fn test_dense_backward_shape_and_accumulation() {
        let mut layer = Dense::new(10, 5);
        let input = Array2::ones((3, 10));
        layer.forward(&input);

        let grad_input = layer.backward(&Array2::ones((3, 5)));
        assert_eq!(grad_input.dim(), (3, 10));
        // Each weight saw a batch of three unit inputs.
        assert!((layer.w_grad[[0, 0]] - 3.0).abs() < 1e-12);
        assert!((layer.b_grad[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_dense_gradient_step_reduces_loss_on_identity_fit() {
        // One scalar weight fitting y = x converges quickly under Adam.
        let cfg = AdamConfig::default();
        let mut layer = Dense::new(1, 1);
        let x = Array2::from_elem((1, 1), 1.0);

        let mut last_loss = f64::INFINITY;
        for step in 1..=3000 {
            let out = layer.forward(&x);
            let diff = out[[0, 0]] - 1.0;
            layer.backward(&Array2::from_elem((1, 1), 2.0 * diff));
            layer.apply_gradients(&cfg, step);
            last_loss = diff * diff;
        }

        assert!(last_loss < 1e-3);
    }

    #[test]
    fn test_dropout_is_identity_at_inference() {
        let mut dropout = Dropout::new(0.2);
        let input = Array2::from_elem((5, 5), 3.0);
        assert_eq!(dropout.forward(&input, false), input);
    }

    #[test]
    fn test_dropout_zeroes_or_rescales_during_training() {
        let mut dropout = Dropout::new(0.2);
        let input = Array3::from_elem((2, 4, 8), 1.0);
        let output = dropout.forward(&input, true);

        for &v in output.iter() {
            assert!(v == 0.0 || (v - 1.0 / 0.8).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dropout_backward_reuses_the_forward_mask() {
        let mut dropout = Dropout::new(0.5);
        let input = Array2::from_elem((6, 6), 1.0);
        let output = dropout.forward(&input, true);
        let grad = dropout.backward(&Array2::from_elem((6, 6), 1.0));

        // Units dropped on the way forward must not pass gradient back.
        for (o, g) in output.iter().zip(grad.iter()) {
            assert_eq!(*o == 0.0, *g == 0.0);
        }
    }
}
