use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{activation::activation::ActivationFunction, math::matrix::Matrix, model::Parameter};

/// Fully connected layer: `a = f(x W + b)`.
///
/// `weights` is `input_size x size`. Gradient buffers mirror the weights and
/// biases and are not serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
    pub weights: Matrix,
    pub biases: Vec<f64>,
    #[serde(skip)]
    weight_grad: Matrix,
    #[serde(skip)]
    bias_grad: Vec<f64>,
}

/// What one forward pass through a layer leaves behind for backprop.
#[derive(Debug, Clone, Default)]
pub struct LayerTrace {
    pub input: Vec<f64>,
    /// Pre-activation values `z = x W + b`.
    pub z: Vec<f64>,
    pub a: Vec<f64>,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(size: usize, input_size: usize, activation: ActivationFunction, rng: &mut R) -> Layer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };
        Layer {
            size,
            input_size,
            activation,
            weights,
            biases: vec![0.0; size],
            weight_grad: Matrix::zeros(input_size, size),
            bias_grad: vec![0.0; size],
        }
    }

    pub fn forward(&self, input: &[f64]) -> LayerTrace {
        let mut z = self.weights.vec_mul(input);
        for (zi, b) in z.iter_mut().zip(&self.biases) {
            *zi += b;
        }
        let a = self.activation.apply(&z);
        LayerTrace {
            input: input.to_vec(),
            z,
            a,
        }
    }

    /// Accumulates `scale * dL/dW` and `scale * dL/db` for one sample given
    /// `dz = dL/dz`, and returns the unscaled `dL/dx` for the layer below.
    pub fn accumulate_gradients(&mut self, trace: &LayerTrace, dz: &[f64], scale: f64) -> Vec<f64> {
        self.ensure_grad_buffers();
        self.weight_grad.add_outer(&trace.input, dz, scale);
        for (g, d) in self.bias_grad.iter_mut().zip(dz) {
            *g += scale * d;
        }
        self.weights.mul_vec(dz)
    }

    /// Weight and bias parameters, named after the layer's position.
    pub fn parameters(&mut self, index: usize) -> [Parameter<'_>; 2] {
        self.ensure_grad_buffers();
        [
            Parameter {
                name: format!("layers.{index}.weight"),
                value: &mut self.weights.data,
                grad: &mut self.weight_grad.data,
            },
            Parameter {
                name: format!("layers.{index}.bias"),
                value: &mut self.biases,
                grad: &mut self.bias_grad,
            },
        ]
    }

    pub fn weight_grad(&self) -> &[f64] {
        &self.weight_grad.data
    }

    pub fn bias_grad(&self) -> &[f64] {
        &self.bias_grad
    }

    /// Deserialized layers start without gradient buffers.
    fn ensure_grad_buffers(&mut self) {
        if self.weight_grad.data.len() != self.weights.data.len() {
            self.weight_grad = Matrix::zeros(self.weights.rows, self.weights.cols);
        }
        if self.bias_grad.len() != self.biases.len() {
            self.bias_grad = vec![0.0; self.biases.len()];
        }
    }
}
