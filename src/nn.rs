//! Minimal dense feed-forward networks for the lab's trainers.
//!
//! Models here are tens of units by design: big enough to bend a decision
//! boundary or follow a seasonal curve, small enough that full-batch
//! gradient descent per epoch is instant. Weights are plain row-major
//! `Vec<f64>` buffers; all scratch allocated for a pass is dropped when the
//! call returns.

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
    Linear,
}

impl Activation {
    fn apply(&self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
            Activation::Linear => z,
        }
    }

    /// Derivative w.r.t. the pre-activation, expressed from the output value.
    fn derivative_from_output(&self, a: f64) -> f64 {
        match self {
            Activation::Relu => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
            Activation::Linear => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dense {
    pub in_dim: usize,
    pub out_dim: usize,
    /// Row-major: weights[o * in_dim + i].
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
    pub activation: Activation,
}

impl Dense {
    fn new(in_dim: usize, out_dim: usize, activation: Activation, rng: &mut impl Rng) -> Self {
        // Xavier-uniform keeps tiny nets stable under both relu and sigmoid.
        let limit = (6.0 / (in_dim + out_dim) as f64).sqrt();
        let weights = (0..in_dim * out_dim)
            .map(|_| (rng.gen::<f64>() * 2.0 - 1.0) * limit)
            .collect();
        Self { in_dim, out_dim, weights, biases: vec![0.0; out_dim], activation }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.out_dim);
        for o in 0..self.out_dim {
            let row = &self.weights[o * self.in_dim..(o + 1) * self.in_dim];
            let z: f64 =
                row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + self.biases[o];
            out.push(self.activation.apply(z));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Mlp {
    layers: Vec<Dense>,
}

impl Mlp {
    /// Build a network from `input_dim` through the given (width, activation)
    /// layers, e.g. `Mlp::new(3, &[(24, Relu), (12, Relu), (1, Sigmoid)], rng)`.
    pub fn new(input_dim: usize, shape: &[(usize, Activation)], rng: &mut impl Rng) -> Self {
        let mut layers = Vec::with_capacity(shape.len());
        let mut prev = input_dim;
        for &(width, activation) in shape {
            layers.push(Dense::new(prev, width, activation, rng));
            prev = width;
        }
        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.in_dim).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim).unwrap_or(0)
    }

    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        let mut acc = input.to_vec();
        for layer in &self.layers {
            acc = layer.forward(&acc);
        }
        acc
    }

    /// One inference call over a whole batch; outputs align with inputs.
    pub fn predict_batch(&self, inputs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        inputs.iter().map(|x| self.predict(x)).collect()
    }

    /// Forward pass caching every layer's outputs, inputs included.
    fn forward_cached(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut acts = Vec::with_capacity(self.layers.len() + 1);
        acts.push(input.to_vec());
        for layer in &self.layers {
            let next = layer.forward(acts.last().expect("non-empty cache"));
            acts.push(next);
        }
        acts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    MeanSquaredError,
    BinaryCrossEntropy,
}

impl Loss {
    pub fn value(&self, predictions: &[Vec<f64>], targets: &[Vec<f64>]) -> f64 {
        let n = predictions.len().max(1) as f64;
        match self {
            Loss::MeanSquaredError => {
                let mut sum = 0.0;
                for (p, t) in predictions.iter().zip(targets) {
                    for (a, y) in p.iter().zip(t) {
                        sum += (a - y) * (a - y);
                    }
                }
                sum / n
            }
            Loss::BinaryCrossEntropy => {
                let mut sum = 0.0;
                for (p, t) in predictions.iter().zip(targets) {
                    for (a, y) in p.iter().zip(t) {
                        let a = a.clamp(1e-7, 1.0 - 1e-7);
                        sum -= y * a.ln() + (1.0 - y) * (1.0 - a).ln();
                    }
                }
                sum / n
            }
        }
    }
}

/// Adam optimizer state, one moment pair per parameter buffer.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: u64,
    m_w: Vec<Vec<f64>>,
    v_w: Vec<Vec<f64>>,
    m_b: Vec<Vec<f64>>,
    v_b: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(model: &Mlp, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m_w: model.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            v_w: model.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            m_b: model.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect(),
            v_b: model.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect(),
        }
    }

    fn step_layer(&mut self, l: usize, layer: &mut Dense, grad_w: &[f64], grad_b: &[f64]) {
        let bc1 = 1.0 - self.beta1.powi(self.t as i32);
        let bc2 = 1.0 - self.beta2.powi(self.t as i32);
        apply_adam(
            &mut layer.weights,
            grad_w,
            &mut self.m_w[l],
            &mut self.v_w[l],
            self.beta1,
            self.beta2,
            self.epsilon,
            self.learning_rate,
            bc1,
            bc2,
        );
        apply_adam(
            &mut layer.biases,
            grad_b,
            &mut self.m_b[l],
            &mut self.v_b[l],
            self.beta1,
            self.beta2,
            self.epsilon,
            self.learning_rate,
            bc1,
            bc2,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_adam(
    params: &mut [f64],
    grads: &[f64],
    m: &mut [f64],
    v: &mut [f64],
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    lr: f64,
    bc1: f64,
    bc2: f64,
) {
    for i in 0..params.len() {
        m[i] = beta1 * m[i] + (1.0 - beta1) * grads[i];
        v[i] = beta2 * v[i] + (1.0 - beta2) * grads[i] * grads[i];
        params[i] -= lr * (m[i] / bc1) / ((v[i] / bc2).sqrt() + epsilon);
    }
}

/// One full-batch gradient step. Returns the pre-update mean loss over the
/// batch, the number the progress console reports.
pub fn fit_epoch(
    model: &mut Mlp,
    inputs: &[Vec<f64>],
    targets: &[Vec<f64>],
    loss: Loss,
    opt: &mut Adam,
) -> f64 {
    debug_assert_eq!(inputs.len(), targets.len());
    let n = inputs.len();
    if n == 0 {
        return f64::NAN;
    }
    let n_f = n as f64;

    // Forward, caching activations for every sample and layer.
    let cached: Vec<Vec<Vec<f64>>> = inputs.iter().map(|x| model.forward_cached(x)).collect();
    let outputs: Vec<Vec<f64>> = cached.iter().map(|acts| acts.last().cloned().unwrap_or_default()).collect();
    let loss_value = loss.value(&outputs, targets);

    let layer_count = model.layers.len();
    let mut grad_w: Vec<Vec<f64>> =
        model.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect();
    let mut grad_b: Vec<Vec<f64>> = model.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect();

    for (sample, acts) in cached.iter().enumerate() {
        // Delta w.r.t. the output layer's pre-activation. Sigmoid + BCE
        // collapses to (a - y)/n, which is also what keeps it stable.
        let out_layer = &model.layers[layer_count - 1];
        let out_act = &acts[layer_count];
        let target = &targets[sample];
        let mut delta: Vec<f64> = out_act
            .iter()
            .zip(target)
            .map(|(&a, &y)| match loss {
                Loss::BinaryCrossEntropy if out_layer.activation == Activation::Sigmoid => {
                    (a - y) / n_f
                }
                Loss::BinaryCrossEntropy => {
                    let c = a.clamp(1e-7, 1.0 - 1e-7);
                    ((c - y) / (c * (1.0 - c)) / n_f) * out_layer.activation.derivative_from_output(a)
                }
                Loss::MeanSquaredError => {
                    2.0 * (a - y) / n_f * out_layer.activation.derivative_from_output(a)
                }
            })
            .collect();

        for l in (0..layer_count).rev() {
            let layer = &model.layers[l];
            let prev_act = &acts[l];
            let gw = &mut grad_w[l];
            let gb = &mut grad_b[l];
            for o in 0..layer.out_dim {
                let d = delta[o];
                gb[o] += d;
                let row = &mut gw[o * layer.in_dim..(o + 1) * layer.in_dim];
                for (g, &x) in row.iter_mut().zip(prev_act) {
                    *g += d * x;
                }
            }
            if l > 0 {
                // Propagate to the previous layer's pre-activation.
                let below = &model.layers[l - 1];
                let mut next_delta = vec![0.0; layer.in_dim];
                for o in 0..layer.out_dim {
                    let d = delta[o];
                    let row = &layer.weights[o * layer.in_dim..(o + 1) * layer.in_dim];
                    for (nd, &w) in next_delta.iter_mut().zip(row) {
                        *nd += w * d;
                    }
                }
                for (nd, &a) in next_delta.iter_mut().zip(prev_act) {
                    *nd *= below.activation.derivative_from_output(a);
                }
                delta = next_delta;
            }
        }
    }

    opt.t += 1;
    for (l, layer) in model.layers.iter_mut().enumerate() {
        opt.step_layer(l, layer, &grad_w[l], &grad_b[l]);
    }

    loss_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn predict_batch_matches_predict() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = Mlp::new(2, &[(4, Activation::Relu), (1, Activation::Sigmoid)], &mut rng);
        let inputs = vec![vec![0.1, 0.9], vec![0.5, 0.5]];
        let batch = model.predict_batch(&inputs);
        for (x, out) in inputs.iter().zip(&batch) {
            assert_eq!(&model.predict(x), out);
        }
    }

    #[test]
    fn sigmoid_output_stays_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = Mlp::new(3, &[(24, Activation::Relu), (12, Activation::Relu), (1, Activation::Sigmoid)], &mut rng);
        for x in [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.3, 0.9, 0.0]] {
            let out = model.predict(&x)[0];
            assert!((0.0..=1.0).contains(&out), "out of range: {}", out);
        }
    }

    #[test]
    fn mse_training_reduces_loss_on_linear_target() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = Mlp::new(1, &[(8, Activation::Relu), (1, Activation::Linear)], &mut rng);
        let inputs: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 20.0]).collect();
        let targets: Vec<Vec<f64>> = inputs.iter().map(|x| vec![0.5 * x[0] + 0.1]).collect();
        let mut opt = Adam::new(&model, 0.02);
        let first = fit_epoch(&mut model, &inputs, &targets, Loss::MeanSquaredError, &mut opt);
        let mut last = first;
        for _ in 0..300 {
            last = fit_epoch(&mut model, &inputs, &targets, Loss::MeanSquaredError, &mut opt);
        }
        assert!(last.is_finite());
        assert!(last < first * 0.2, "loss did not drop: {} -> {}", first, last);
    }

    #[test]
    fn bce_training_separates_two_clusters() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut model = Mlp::new(2, &[(8, Activation::Relu), (1, Activation::Sigmoid)], &mut rng);
        let mut inputs = Vec::new();
        let mut targets = Vec::new();
        for i in 0..10 {
            let t = i as f64 / 10.0;
            inputs.push(vec![0.1 + 0.1 * t, 0.8]);
            targets.push(vec![0.0]);
            inputs.push(vec![0.8 + 0.1 * t, 0.1]);
            targets.push(vec![1.0]);
        }
        let mut opt = Adam::new(&model, 0.05);
        for _ in 0..400 {
            fit_epoch(&mut model, &inputs, &targets, Loss::BinaryCrossEntropy, &mut opt);
        }
        let legit = model.predict(&[0.15, 0.8])[0];
        let fraud = model.predict(&[0.85, 0.1])[0];
        assert!(legit < 0.5, "legit scored {}", legit);
        assert!(fraud > 0.5, "fraud scored {}", fraud);
    }

    #[test]
    fn empty_batch_reports_non_finite_loss() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut model = Mlp::new(1, &[(1, Activation::Linear)], &mut rng);
        let mut opt = Adam::new(&model, 0.01);
        let loss = fit_epoch(&mut model, &[], &[], Loss::MeanSquaredError, &mut opt);
        assert!(loss.is_nan());
    }
}
