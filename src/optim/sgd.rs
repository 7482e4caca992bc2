use crate::model::Parameter;
use crate::optim::Optimizer;

/// Stochastic gradient descent with optional classical momentum:
///   v' = momentum * v + g
///   w' = w - lr * v'
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    velocity: Vec<Vec<f64>>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd {
            learning_rate,
            momentum: 0.0,
            velocity: Vec::new(),
        }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Sgd {
        self.momentum = momentum;
        self
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [Parameter<'_>]) {
        if self.momentum == 0.0 {
            for param in params.iter_mut() {
                for (w, g) in param.value.iter_mut().zip(param.grad.iter()) {
                    *w -= self.learning_rate * g;
                }
            }
            return;
        }

        // Velocity buffers follow parameter order; rebuilt if the model changes shape.
        let shapes_match = self.velocity.len() == params.len()
            && self.velocity.iter().zip(params.iter()).all(|(v, p)| v.len() == p.len());
        if !shapes_match {
            self.velocity = params.iter().map(|p| vec![0.0; p.len()]).collect();
        }

        for (param, velocity) in params.iter_mut().zip(self.velocity.iter_mut()) {
            for ((w, g), v) in param.value.iter_mut().zip(param.grad.iter()).zip(velocity.iter_mut()) {
                *v = self.momentum * *v + g;
                *w -= self.learning_rate * *v;
            }
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(value: &'a mut [f64], grad: &'a mut [f64]) -> Parameter<'a> {
        Parameter {
            name: "w".to_string(),
            value,
            grad,
        }
    }

    #[test]
    fn plain_step_moves_against_gradient() {
        let mut value = [1.0, -1.0];
        let mut grad = [0.5, -0.5];
        let mut sgd = Sgd::new(0.1);
        sgd.step(&mut [param(&mut value, &mut grad)]);
        assert!((value[0] - 0.95).abs() < 1e-12);
        assert!((value[1] + 0.95).abs() < 1e-12);
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let mut value = [0.0];
        let mut grad = [1.0];
        let mut sgd = Sgd::new(1.0).with_momentum(0.5);
        sgd.step(&mut [param(&mut value, &mut grad)]);
        sgd.step(&mut [param(&mut value, &mut grad)]);
        // v1 = 1, v2 = 1.5 -> w = -2.5
        assert!((value[0] + 2.5).abs() < 1e-12);
    }

    #[test]
    fn zero_grad_clears_buffers() {
        let mut value = [1.0, 2.0];
        let mut grad = [3.0, 4.0];
        let mut sgd = Sgd::new(0.1);
        sgd.zero_grad(&mut [param(&mut value, &mut grad)]);
        assert_eq!(grad, [0.0, 0.0]);
        assert_eq!(value, [1.0, 2.0]);
    }
}
