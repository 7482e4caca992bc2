use crate::distributed::ProcessRole;
use crate::metrics::Metrics;
use crate::progress::indicator::{ConsoleProgress, DrawTarget, NoopProgress, ProgressIndicator};

/// Epoch-aware progress facade.
///
/// Only a coordinator renders anything; workers get a `NoopProgress` with the
/// same interface, so callers never branch on rank themselves.
pub struct DistributedProgressBar {
    role: ProcessRole,
    epochs: usize,
    current_epoch: usize,
    steps_per_epoch: Option<usize>,
    target: DrawTarget,
    bar: Box<dyn ProgressIndicator>,
    description: Option<String>,
}

impl DistributedProgressBar {
    pub fn new(role: ProcessRole, epochs: usize, steps_per_epoch: Option<usize>) -> Self {
        Self {
            role,
            epochs,
            current_epoch: 1,
            steps_per_epoch,
            target: DrawTarget::Stderr,
            bar: Box::new(NoopProgress),
            description: None,
        }
    }

    pub fn with_draw_target(mut self, target: DrawTarget) -> Self {
        self.target = target;
        self
    }

    pub fn on_epoch_start(&mut self) {
        self.bar = if self.role.is_coordinator() {
            let total = self.steps_per_epoch.map(|steps| steps as u64);
            Box::new(ConsoleProgress::new(total, self.target))
        } else {
            Box::new(NoopProgress)
        };
    }

    pub fn update(&mut self, n: u64) {
        self.bar.update(n);
    }

    pub fn close(&mut self) {
        self.bar.close();
    }

    pub fn on_epoch_end(&mut self) {
        self.current_epoch += 1;
        self.bar.close();
    }

    /// `Epoch 2/3 - loss: 0.512300 - lr: 0.000100`
    pub fn show_metrics(&mut self, metrics: &Metrics) {
        let description = describe(self.current_epoch, self.epochs, metrics);
        self.bar.set_description(&description);
        self.description = Some(description);
    }

    pub fn current_epoch(&self) -> usize {
        self.current_epoch
    }

    pub fn role(&self) -> ProcessRole {
        self.role
    }

    /// Last description produced by `show_metrics`.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

fn describe(epoch: usize, epochs: usize, metrics: &Metrics) -> String {
    let mut description = format!("Epoch {epoch}/{epochs}");
    for (name, value) in metrics.iter() {
        description.push_str(&format!(" - {name}: {value:.6}"));
    }
    description
}
