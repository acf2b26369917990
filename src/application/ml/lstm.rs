//! Gated recurrent (LSTM) layer with full backpropagation through time.
//!
//! Sequences are processed sample-by-sample with the hidden dimension
//! vectorized; per-timestep activations are cached on the forward pass and
//! consumed by the backward pass.

use super::optimizer::{AdamConfig, AdamState};
use ndarray::{Array1, Array2, Array3, Axis, Ix1, Ix2, s};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;

/// One gate's parameters: input projection, recurrent projection, bias.
struct Gate {
    w_x: Array2<f64>, // [hidden, input]
    w_h: Array2<f64>, // [hidden, hidden]
    b: Array1<f64>,

    dw_x: Array2<f64>,
    dw_h: Array2<f64>,
    db: Array1<f64>,

    w_x_state: AdamState<Ix2>,
    w_h_state: AdamState<Ix2>,
    b_state: AdamState<Ix1>,
}

impl Gate {
    fn new(input_size: usize, hidden_size: usize, bias_init: f64) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let w_x = Array2::random((hidden_size, input_size), Uniform::new(-limit, limit));
        let w_h = Array2::random((hidden_size, hidden_size), Uniform::new(-limit, limit));
        let b = Array1::from_elem(hidden_size, bias_init);

        Self {
            dw_x: Array2::zeros(w_x.raw_dim()),
            dw_h: Array2::zeros(w_h.raw_dim()),
            db: Array1::zeros(b.raw_dim()),
            w_x_state: AdamState::zeros_like(&w_x),
            w_h_state: AdamState::zeros_like(&w_h),
            b_state: AdamState::zeros_like(&b),
            w_x,
            w_h,
            b,
        }
    }

    fn preactivation(&self, x: &Array1<f64>, h_prev: &Array1<f64>) -> Array1<f64> {
        self.w_x.dot(x) + self.w_h.dot(h_prev) + &self.b
    }

    fn accumulate(&mut self, dz: &Array1<f64>, x: &Array1<f64>, h_prev: &Array1<f64>) {
        self.dw_x += &outer(dz, x);
        self.dw_h += &outer(dz, h_prev);
        self.db += dz;
    }

    fn apply_gradients(&mut self, cfg: &AdamConfig, step: usize) {
        self.w_x_state.update(cfg, step, &mut self.w_x, &self.dw_x);
        self.w_h_state.update(cfg, step, &mut self.w_h, &self.dw_h);
        self.b_state.update(cfg, step, &mut self.b, &self.db);
        self.dw_x.fill(0.0);
        self.dw_h.fill(0.0);
        self.db.fill(0.0);
    }
}

/// Activations cached for one timestep of one sequence.
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
}

pub struct LstmLayer {
    input_size: usize,
    hidden_size: usize,

    input_gate: Gate,
    forget_gate: Gate,
    cell_gate: Gate,
    output_gate: Gate,

    // [batch][time], filled by the latest forward pass
    cache: Vec<Vec<StepCache>>,
}

impl LstmLayer {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            input_gate: Gate::new(input_size, hidden_size, 0.0),
            // Forget bias starts at 1 so early training retains state
            forget_gate: Gate::new(input_size, hidden_size, 1.0),
            cell_gate: Gate::new(input_size, hidden_size, 0.0),
            output_gate: Gate::new(input_size, hidden_size, 0.0),
            cache: Vec::new(),
        }
    }

    /// `[batch, time, input] -> [batch, time, hidden]`, the full output
    /// sequence. Hidden and cell state start at zero for every sequence.
    pub fn forward(&mut self, input: &Array3<f64>) -> Array3<f64> {
        let (batch, seq_len, _) = input.dim();
        let mut output = Array3::zeros((batch, seq_len, self.hidden_size));

        self.cache.clear();
        for b in 0..batch {
            let mut steps = Vec::with_capacity(seq_len);
            let mut h = Array1::zeros(self.hidden_size);
            let mut c = Array1::zeros(self.hidden_size);

            for t in 0..seq_len {
                let x = input.slice(s![b, t, ..]).to_owned();

                let i = sigmoid(&self.input_gate.preactivation(&x, &h));
                let f = sigmoid(&self.forget_gate.preactivation(&x, &h));
                let g = self.cell_gate.preactivation(&x, &h).mapv(f64::tanh);
                let o = sigmoid(&self.output_gate.preactivation(&x, &h));

                let c_next = &f * &c + &i * &g;
                let tanh_c = c_next.mapv(f64::tanh);
                let h_next = &o * &tanh_c;

                output.slice_mut(s![b, t, ..]).assign(&h_next);
                steps.push(StepCache {
                    x,
                    h_prev: h,
                    c_prev: c,
                    i,
                    f,
                    g,
                    o,
                    tanh_c,
                });
                h = h_next;
                c = c_next;
            }
            self.cache.push(steps);
        }

        output
    }

    /// Final hidden state per sequence, for a head that consumes only the
    /// last step: `[batch, time, input] -> [batch, hidden]`.
    pub fn forward_last(&mut self, input: &Array3<f64>) -> Array2<f64> {
        let output = self.forward(input);
        let last = output.dim().1 - 1;
        output.index_axis(Axis(1), last).to_owned()
    }

    /// Backprop given a gradient on every timestep's hidden output.
    /// Accumulates parameter gradients and returns the gradient w.r.t. the
    /// layer input, `[batch, time, input]`.
    pub fn backward(&mut self, grad_output: &Array3<f64>) -> Array3<f64> {
        let (batch, seq_len, _) = grad_output.dim();
        let mut grad_input = Array3::zeros((batch, seq_len, self.input_size));

        for b in 0..batch {
            let steps = &self.cache[b];
            let mut dh_next = Array1::<f64>::zeros(self.hidden_size);
            let mut dc_next = Array1::<f64>::zeros(self.hidden_size);

            for t in (0..seq_len).rev() {
                let step = &steps[t];

                let dh = grad_output.slice(s![b, t, ..]).to_owned() + &dh_next;
                // h = o * tanh(c): gradient reaches c through the tanh
                let dc =
                    &dc_next + &(&dh * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v));

                let dz_o =
                    &(&dh * &step.tanh_c) * &step.o.mapv(|v| v * (1.0 - v));
                let dz_f =
                    &(&dc * &step.c_prev) * &step.f.mapv(|v| v * (1.0 - v));
                let dz_i = &(&dc * &step.g) * &step.i.mapv(|v| v * (1.0 - v));
                let dz_g = &(&dc * &step.i) * &step.g.mapv(|v| 1.0 - v * v);

                self.input_gate.accumulate(&dz_i, &step.x, &step.h_prev);
                self.forget_gate.accumulate(&dz_f, &step.x, &step.h_prev);
                self.cell_gate.accumulate(&dz_g, &step.x, &step.h_prev);
                self.output_gate.accumulate(&dz_o, &step.x, &step.h_prev);

                let dx = self.input_gate.w_x.t().dot(&dz_i)
                    + self.forget_gate.w_x.t().dot(&dz_f)
                    + self.cell_gate.w_x.t().dot(&dz_g)
                    + self.output_gate.w_x.t().dot(&dz_o);
                grad_input.slice_mut(s![b, t, ..]).assign(&dx);

                dh_next = self.input_gate.w_h.t().dot(&dz_i)
                    + self.forget_gate.w_h.t().dot(&dz_f)
                    + self.cell_gate.w_h.t().dot(&dz_g)
                    + self.output_gate.w_h.t().dot(&dz_o);
                dc_next = &dc * &step.f;
            }
        }

        grad_input
    }

    /// Backprop when only the final hidden state received gradient.
    pub fn backward_last(&mut self, grad_last: &Array2<f64>) -> Array3<f64> {
        let batch = grad_last.nrows();
        let seq_len = self.cache.first().map(Vec::len).unwrap_or(0);

        let mut grad_output = Array3::zeros((batch, seq_len, self.hidden_size));
        grad_output
            .slice_mut(s![.., seq_len - 1, ..])
            .assign(grad_last);
        self.backward(&grad_output)
    }

    pub fn apply_gradients(&mut self, cfg: &AdamConfig, step: usize) {
        self.input_gate.apply_gradients(cfg, step);
        self.forget_gate.apply_gradients(cfg, step);
        self.cell_gate.apply_gradients(cfg, step);
        self.output_gate.apply_gradients(cfg, step);
    }
}

fn outer(col: &Array1<f64>, row: &Array1<f64>) -> Array2<f64> {
    col.view()
        .insert_axis(Axis(1))
        .dot(&row.view().insert_axis(Axis(0)))
}

fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_shapes() {
        let mut lstm = LstmLayer::new(1, 50);
        let input = Array3::from_elem((2, 10, 1), 0.5);

        assert_eq!(lstm.forward(&input).dim(), (2, 10, 50));
        assert_eq!(lstm.forward_last(&input).dim(), (2, 50));
    }

    #[test]
    fn test_zero_input_keeps_state_at_zero() {
        // With h0 = c0 = 0 and x = 0, the cell candidate is tanh(0) = 0, so
        // the hidden state never leaves zero regardless of the weights.
        let mut lstm = LstmLayer::new(3, 8);
        let input = Array3::zeros((1, 5, 3));
        let output = lstm.forward(&input);
        assert!(output.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_backward_input_gradient_shape() {
        let mut lstm = LstmLayer::new(4, 6);
        let input = Array3::from_elem((3, 7, 4), 0.1);
        lstm.forward(&input);

        let grad = lstm.backward_last(&Array2::ones((3, 6)));
        assert_eq!(grad.dim(), (3, 7, 4));
    }

    /// Finite-difference check of the analytic gradients, through time.
    #[test]
    fn test_backward_matches_numerical_gradient() {
        let eps = 1e-6;
        let input = Array3::from_shape_fn((1, 3, 2), |(_, t, f)| {
            0.3 * (t as f64 + 1.0) - 0.2 * f as f64
        });

        let mut lstm = LstmLayer::new(2, 4);

        // Loss: sum of the final hidden state.
        lstm.forward(&input);
        lstm.backward_last(&Array2::ones((1, 4)));

        let sum_last = |layer: &mut LstmLayer| -> f64 {
            layer.forward_last(&input).sum()
        };

        // Probe a handful of parameters across all three tensors of a gate.
        for (r, c) in [(0, 0), (2, 1), (3, 0)] {
            let analytic = lstm.forget_gate.dw_x[[r, c]];
            lstm.forget_gate.w_x[[r, c]] += eps;
            let plus = sum_last(&mut lstm);
            lstm.forget_gate.w_x[[r, c]] -= 2.0 * eps;
            let minus = sum_last(&mut lstm);
            lstm.forget_gate.w_x[[r, c]] += eps;

            let numeric = (plus - minus) / (2.0 * eps);
            assert!(
                (analytic - numeric).abs() < 1e-5,
                "w_x[{r},{c}]: analytic {analytic} vs numeric {numeric}"
            );
        }

        let analytic = lstm.input_gate.dw_h[[1, 2]];
        lstm.input_gate.w_h[[1, 2]] += eps;
        let plus = sum_last(&mut lstm);
        lstm.input_gate.w_h[[1, 2]] -= 2.0 * eps;
        let minus = sum_last(&mut lstm);
        lstm.input_gate.w_h[[1, 2]] += eps;
        let numeric = (plus - minus) / (2.0 * eps);
        assert!(
            (analytic - numeric).abs() < 1e-5,
            "w_h[1,2]: analytic {analytic} vs numeric {numeric}"
        );

        let analytic = lstm.cell_gate.db[0];
        lstm.cell_gate.b[0] += eps;
        let plus = sum_last(&mut lstm);
        lstm.cell_gate.b[0] -= 2.0 * eps;
        let minus = sum_last(&mut lstm);
        lstm.cell_gate.b[0] += eps;
        let numeric = (plus - minus) / (2.0 * eps);
        assert!(
            (analytic - numeric).abs() < 1e-5,
            "b[0]: analytic {analytic} vs numeric {numeric}"
        );
    }
}
