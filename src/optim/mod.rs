pub mod schedule;
pub mod sgd;

pub use schedule::{LambdaLr, Schedule};
pub use sgd::Sgd;

use crate::model::Parameter;

pub trait Optimizer {
    fn zero_grad(&mut self, params: &mut [Parameter<'_>]) {
        for param in params.iter_mut() {
            param.grad.fill(0.0);
        }
    }

    fn step(&mut self, params: &mut [Parameter<'_>]);

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

/// Learning-rate schedule driven once per optimizer step.
pub trait LrScheduler {
    /// Advances the schedule and writes the new rate into `optimizer`.
    fn step(&mut self, optimizer: &mut dyn Optimizer);

    /// Current learning rate per parameter group.
    fn get_lr(&self) -> Vec<f64>;
}
