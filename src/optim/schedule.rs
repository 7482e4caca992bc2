use std::f64::consts::PI;

use crate::optim::{LrScheduler, Optimizer};

/// Multiplicative learning-rate factor as a function of the step count.
#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    Constant,
    ConstantWithWarmup {
        warmup_steps: usize,
    },
    /// Linear warmup to the base rate, then linear decay to zero at `total_steps`.
    Linear {
        warmup_steps: usize,
        total_steps: usize,
    },
    /// Linear warmup, then half-cosine decay to `min_lr_ratio * base`.
    Cosine {
        warmup_steps: usize,
        total_steps: usize,
        min_lr_ratio: f64,
    },
}

impl Schedule {
    pub fn factor(&self, step: usize) -> f64 {
        match *self {
            Schedule::Constant => 1.0,
            Schedule::ConstantWithWarmup { warmup_steps } => warmup_factor(step, warmup_steps),
            Schedule::Linear {
                warmup_steps,
                total_steps,
            } => {
                if step < warmup_steps {
                    return warmup_factor(step, warmup_steps);
                }
                let remaining = total_steps.saturating_sub(step) as f64;
                let span = total_steps.saturating_sub(warmup_steps).max(1) as f64;
                (remaining / span).max(0.0)
            }
            Schedule::Cosine {
                warmup_steps,
                total_steps,
                min_lr_ratio,
            } => {
                if step < warmup_steps {
                    return warmup_factor(step, warmup_steps);
                }
                let span = total_steps.saturating_sub(warmup_steps).max(1) as f64;
                let progress = ((step - warmup_steps) as f64 / span).clamp(0.0, 1.0);
                let cosine = 0.5 * (1.0 + (PI * progress).cos());
                min_lr_ratio + (1.0 - min_lr_ratio) * cosine
            }
        }
    }
}

fn warmup_factor(step: usize, warmup_steps: usize) -> f64 {
    if step < warmup_steps {
        step as f64 / warmup_steps.max(1) as f64
    } else {
        1.0
    }
}

/// Scales the optimizer's initial learning rate by `schedule.factor(step)`.
///
/// Construction applies the factor for step 0, so a warmup schedule starts
/// the optimizer at zero.
pub struct LambdaLr {
    base_lr: f64,
    schedule: Schedule,
    last_step: usize,
    current_lr: f64,
}

impl LambdaLr {
    pub fn new(schedule: Schedule, optimizer: &mut dyn Optimizer) -> Self {
        let base_lr = optimizer.learning_rate();
        let current_lr = base_lr * schedule.factor(0);
        optimizer.set_learning_rate(current_lr);
        Self {
            base_lr,
            schedule,
            last_step: 0,
            current_lr,
        }
    }

    pub fn base_lr(&self) -> f64 {
        self.base_lr
    }

    pub fn last_step(&self) -> usize {
        self.last_step
    }
}

impl LrScheduler for LambdaLr {
    fn step(&mut self, optimizer: &mut dyn Optimizer) {
        self.last_step += 1;
        self.current_lr = self.base_lr * self.schedule.factor(self.last_step);
        optimizer.set_learning_rate(self.current_lr);
    }

    fn get_lr(&self) -> Vec<f64> {
        vec![self.current_lr]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::Sgd;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn linear_warms_up_then_decays_to_zero() {
        let schedule = Schedule::Linear {
            warmup_steps: 2,
            total_steps: 6,
        };
        let factors: Vec<f64> = (0..=7).map(|step| schedule.factor(step)).collect();
        let expected = [0.0, 0.5, 1.0, 0.75, 0.5, 0.25, 0.0, 0.0];
        for (got, want) in factors.iter().zip(expected.iter()) {
            assert!(close(*got, *want), "got {got}, want {want}");
        }
    }

    #[test]
    fn cosine_reaches_floor() {
        let schedule = Schedule::Cosine {
            warmup_steps: 0,
            total_steps: 4,
            min_lr_ratio: 0.1,
        };
        assert!(close(schedule.factor(0), 1.0));
        assert!(close(schedule.factor(2), 0.1 + 0.9 * 0.5));
        assert!(close(schedule.factor(4), 0.1));
        assert!(close(schedule.factor(9), 0.1));
    }

    #[test]
    fn lambda_lr_drives_optimizer_rate() {
        let mut sgd = Sgd::new(0.2);
        let mut scheduler = LambdaLr::new(Schedule::ConstantWithWarmup { warmup_steps: 2 }, &mut sgd);
        assert_eq!(sgd.learning_rate(), 0.0);
        assert_eq!(scheduler.get_lr(), vec![0.0]);

        scheduler.step(&mut sgd);
        assert!(close(sgd.learning_rate(), 0.1));
        scheduler.step(&mut sgd);
        assert!(close(sgd.learning_rate(), 0.2));
        assert_eq!(scheduler.last_step(), 2);
        assert_eq!(scheduler.base_lr(), 0.2);
    }

    #[test]
    fn constant_keeps_base_rate() {
        let mut sgd = Sgd::new(0.05);
        let mut scheduler = LambdaLr::new(Schedule::Constant, &mut sgd);
        for _ in 0..3 {
            scheduler.step(&mut sgd);
        }
        assert_eq!(scheduler.get_lr(), vec![0.05]);
    }
}
