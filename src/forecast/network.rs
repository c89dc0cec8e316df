//! Feed-forward regression network on ndarray: dense layers, inverted
//! dropout and the Adam optimizer.

use ndarray::{Array2, Axis, Zip};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, z: Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv_into(|v| v.max(0.0)),
            Activation::Linear => z,
        }
    }
}

/// A trainable tensor with its gradient and Adam moments.
#[derive(Debug, Clone)]
struct Param {
    value: Array2<f64>,
    grad: Array2<f64>,
    m: Array2<f64>,
    v: Array2<f64>,
}

impl Param {
    fn new(value: Array2<f64>) -> Self {
        let shape = value.raw_dim();
        Self {
            value,
            grad: Array2::zeros(shape),
            m: Array2::zeros(shape),
            v: Array2::zeros(shape),
        }
    }
}

#[derive(Debug, Clone)]
struct Dense {
    weights: Param,
    /// Shape (1, units) so it broadcasts over the batch.
    bias: Param,
    activation: Activation,
    input: Array2<f64>,
    output: Array2<f64>,
}

impl Dense {
    /// Glorot-uniform weights, zero bias.
    fn new<R: Rng>(inputs: usize, units: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + units) as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, units), |_| rng.gen_range(-limit..limit));
        Self {
            weights: Param::new(weights),
            bias: Param::new(Array2::zeros((1, units))),
            activation,
            input: Array2::zeros((0, inputs)),
            output: Array2::zeros((0, units)),
        }
    }

    fn infer(&self, x: &Array2<f64>) -> Array2<f64> {
        let z = x.dot(&self.weights.value) + &self.bias.value;
        self.activation.apply(z)
    }

    fn forward(&mut self, x: &Array2<f64>) -> Array2<f64> {
        let out = self.infer(x);
        self.input = x.clone();
        self.output = out.clone();
        out
    }

    fn backward(&mut self, grad_output: &Array2<f64>) -> Array2<f64> {
        let grad_z = match self.activation {
            Activation::Relu => grad_output * &self.output.mapv(|o| if o > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => grad_output.clone(),
        };
        self.weights.grad = self.input.t().dot(&grad_z);
        self.bias.grad = grad_z.sum_axis(Axis(0)).insert_axis(Axis(0));
        grad_z.dot(&self.weights.value.t())
    }
}

/// Inverted dropout: active while training, identity at inference.
#[derive(Debug, Clone)]
struct Dropout {
    rate: f64,
    mask: Array2<f64>,
}

impl Dropout {
    fn new(rate: f64) -> Self {
        Self {
            rate,
            mask: Array2::zeros((0, 0)),
        }
    }

    fn forward<R: Rng>(&mut self, x: &Array2<f64>, rng: &mut R) -> Array2<f64> {
        let keep = 1.0 - self.rate;
        self.mask = Array2::from_shape_fn(x.raw_dim(), |_| {
            if rng.gen::<f64>() < keep {
                1.0 / keep
            } else {
                0.0
            }
        });
        x * &self.mask
    }

    fn backward(&self, grad_output: &Array2<f64>) -> Array2<f64> {
        grad_output * &self.mask
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Dense(Dense),
    Dropout(Dropout),
}

/// Adam with the usual defaults (beta1 0.9, beta2 0.999, epsilon 1e-7).
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    iterations: i32,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            iterations: 0,
        }
    }

    pub fn iterations(&self) -> i32 {
        self.iterations
    }

    fn step(&mut self) {
        self.iterations += 1;
    }

    fn update(&self, param: &mut Param) {
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let t = self.iterations;
        let lr = self.learning_rate * (1.0 - b2.powi(t)).sqrt() / (1.0 - b1.powi(t));

        Zip::from(&mut param.value)
            .and(&mut param.m)
            .and(&mut param.v)
            .and(&param.grad)
            .for_each(|w, m, v, &g| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                *w -= lr * *m / (v.sqrt() + eps);
            });
    }
}

/// Sequential stack of dense and dropout layers with a single linear output.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// inputs -> dense(hidden, relu) -> dropout -> dense(hidden, relu) -> dropout -> dense(1)
    pub fn regression<R: Rng>(
        inputs: usize,
        hidden_units: usize,
        dropout_rate: f64,
        rng: &mut R,
    ) -> Self {
        let layers = vec![
            Layer::Dense(Dense::new(inputs, hidden_units, Activation::Relu, rng)),
            Layer::Dropout(Dropout::new(dropout_rate)),
            Layer::Dense(Dense::new(hidden_units, hidden_units, Activation::Relu, rng)),
            Layer::Dropout(Dropout::new(dropout_rate)),
            Layer::Dense(Dense::new(hidden_units, 1, Activation::Linear, rng)),
        ];
        Self { layers }
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| match layer {
                Layer::Dense(dense) => dense.weights.value.len() + dense.bias.value.len(),
                Layer::Dropout(_) => 0,
            })
            .sum()
    }

    /// Deterministic forward pass with dropout disabled. Output shape (n, 1).
    pub fn predict(&self, x: &Array2<f64>) -> Array2<f64> {
        self.layers.iter().fold(x.clone(), |out, layer| match layer {
            Layer::Dense(dense) => dense.infer(&out),
            Layer::Dropout(_) => out,
        })
    }

    /// Mean squared error of the inference pass.
    pub fn evaluate(&self, x: &Array2<f64>, y: &Array2<f64>) -> f64 {
        mean_squared_error(&self.predict(x), y)
    }

    /// One gradient step on a batch; returns the batch loss before the update.
    pub fn train_batch<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        optimizer: &mut Adam,
        rng: &mut R,
    ) -> f64 {
        let mut out = x.clone();
        for layer in &mut self.layers {
            out = match layer {
                Layer::Dense(dense) => dense.forward(&out),
                Layer::Dropout(dropout) => dropout.forward(&out, rng),
            };
        }

        let loss = mean_squared_error(&out, y);
        let mut grad = (&out - y) * (2.0 / out.len() as f64);

        for layer in self.layers.iter_mut().rev() {
            grad = match layer {
                Layer::Dense(dense) => dense.backward(&grad),
                Layer::Dropout(dropout) => dropout.backward(&grad),
            };
        }

        optimizer.step();
        for layer in &mut self.layers {
            if let Layer::Dense(dense) = layer {
                optimizer.update(&mut dense.weights);
                optimizer.update(&mut dense.bias);
            }
        }

        loss
    }
}

fn mean_squared_error(predicted: &Array2<f64>, actual: &Array2<f64>) -> f64 {
    if predicted.is_empty() {
        return 0.0;
    }
    (predicted - actual).mapv(|d| d * d).sum() / predicted.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_output_shape_and_parameter_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = Network::regression(4, 64, 0.1, &mut rng);

        let x = Array2::zeros((5, 4));
        assert_eq!(network.predict(&x).dim(), (5, 1));
        // 4*64+64 + 64*64+64 + 64*1+1
        assert_eq!(network.parameter_count(), 4545);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(2);
        let network = Network::regression(4, 16, 0.5, &mut rng);
        let x = array![[0.1, -0.2, 0.3, 1.0], [1.5, 0.0, -1.0, 0.2]];
        assert_eq!(network.predict(&x), network.predict(&x));
    }

    #[test]
    fn test_dropout_mask_scales_kept_units() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut dropout = Dropout::new(0.5);
        let out = dropout.forward(&Array2::ones((20, 20)), &mut rng);
        assert!(out.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-12));
        assert!(out.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut network = Network::regression(1, 16, 0.0, &mut rng);
        let mut optimizer = Adam::new(0.01);

        let x = Array2::from_shape_fn((32, 1), |(i, _)| i as f64 / 16.0 - 1.0);
        let y = x.mapv(|v| 3.0 * v + 1.0);

        let before = network.evaluate(&x, &y);
        for _ in 0..300 {
            network.train_batch(&x, &y, &mut optimizer, &mut rng);
        }
        let after = network.evaluate(&x, &y);

        assert_eq!(optimizer.iterations(), 300);
        assert!(after < before * 0.1, "loss {before} -> {after}");
    }
}
