use serde::{Deserialize, Serialize};
use std::f64::consts::E;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    #[serde(rename = "sigmoid")]
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "tanh")]
    Tanh,
    /// Vector-valued; see `apply`.
    #[serde(rename = "softmax")]
    Softmax,
    #[serde(rename = "leaky_relu")]
    LeakyReLU { alpha: f64 },
}

impl ActivationFunction {
    /// Element-wise activation. Softmax is not element-wise and maps to NaN
    /// here; use `apply` for whole layers.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => x.max(0.0),
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Softmax => f64::NAN,
            ActivationFunction::LeakyReLU { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
        }
    }

    /// Element-wise derivative at the pre-activation `x`. Softmax has a full
    /// Jacobian and is handled by `backprop`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Softmax => f64::NAN,
            ActivationFunction::LeakyReLU { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    *alpha
                }
            }
        }
    }

    /// Applies the activation to a whole pre-activation vector.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(z),
            _ => z.iter().map(|&x| self.function(x)).collect(),
        }
    }

    /// Maps `dL/da` to `dL/dz` given the layer's `z` and `a = apply(z)`.
    pub fn backprop(&self, z: &[f64], a: &[f64], grad_a: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => {
                // dz_i = a_i * (g_i - sum_j a_j g_j)
                let dot: f64 = a.iter().zip(grad_a).map(|(a, g)| a * g).sum();
                a.iter().zip(grad_a).map(|(a, g)| a * (g - dot)).collect()
            }
            _ => z
                .iter()
                .zip(grad_a)
                .map(|(&x, g)| self.derivative(x) * g)
                .collect(),
        }
    }

    /// ReLU-family layers get He init, the rest Xavier.
    pub fn prefers_he_init(&self) -> bool {
        matches!(self, ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. })
    }
}

fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
