//! Adam (Adaptive Moment Estimation) optimizer.
//!
//! Each parameter tensor carries its own first/second moment estimates; the
//! step counter is shared across the network so bias correction stays in sync.

use ndarray::{Array, Dimension};

/// Hyperparameters shared by every parameter tensor.
#[derive(Debug, Clone, Copy)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Per-tensor Adam state.
#[derive(Debug, Clone)]
pub struct AdamState<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> AdamState<D> {
    pub fn zeros_like(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }

    /// One update with bias correction at step `t` (1-based).
    pub fn update(
        &mut self,
        cfg: &AdamConfig,
        t: usize,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
    ) {
        // Biased moment estimates
        self.m = &self.m * cfg.beta1 + &(grad * (1.0 - cfg.beta1));
        self.v = &self.v * cfg.beta2 + &((grad * grad) * (1.0 - cfg.beta2));

        // Bias-corrected estimates
        let m_hat = &self.m / (1.0 - cfg.beta1.powi(t as i32));
        let v_hat = &self.v / (1.0 - cfg.beta2.powi(t as i32));

        *param =
            &*param - &(m_hat * cfg.learning_rate / (v_hat.mapv(f64::sqrt) + cfg.epsilon));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_update_moves_against_the_gradient() {
        let cfg = AdamConfig::default();
        let mut weights = Array2::<f64>::ones((3, 2));
        let grads = Array2::<f64>::ones((3, 2));
        let mut state = AdamState::zeros_like(&weights);

        for t in 1..=10 {
            state.update(&cfg, t, &mut weights, &grads);
        }

        assert!(weights[[0, 0]] < 1.0);
    }

    #[test]
    fn test_first_step_size_is_the_learning_rate() {
        // With bias correction, the very first Adam step has magnitude
        // lr * g / (|g| + eps) ~= lr regardless of the gradient scale.
        let cfg = AdamConfig::default();
        let mut param = Array1::<f64>::zeros(1);
        let grad = Array1::from_elem(1, 123.456);
        let mut state = AdamState::zeros_like(&param);

        state.update(&cfg, 1, &mut param, &grad);

        assert!((param[0] + cfg.learning_rate).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_gradients_move_symmetrically() {
        let cfg = AdamConfig::default();
        let mut up = Array1::<f64>::zeros(2);
        let mut down = Array1::<f64>::zeros(2);
        let grad = Array1::from_elem(2, 0.5);
        let neg = grad.mapv(|g| -g);

        AdamState::zeros_like(&up).update(&cfg, 1, &mut up, &neg);
        AdamState::zeros_like(&down).update(&cfg, 1, &mut down, &grad);

        assert!((up[0] + down[0]).abs() < 1e-12);
        assert!(up[0] > 0.0);
    }
}
