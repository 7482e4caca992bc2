use crate::distributed::project::ProjectConfig;
use crate::distributed::role::RankInfo;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::model::Model;

/// Position of one micro-batch inside a gradient-accumulation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationStep {
    micro_batch: usize,
    steps: usize,
    sync_gradients: bool,
}

impl AccumulationStep {
    pub fn new(micro_batch: usize, steps: usize, sync_gradients: bool) -> Self {
        Self {
            micro_batch,
            steps: steps.max(1),
            sync_gradients,
        }
    }

    /// A step outside of any accumulation: every micro-batch syncs.
    pub fn immediate() -> Self {
        Self::new(0, 1, true)
    }

    /// 0-based index of this micro-batch within its cycle.
    pub fn micro_batch(&self) -> usize {
        self.micro_batch
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// First micro-batch of a cycle; gradients are cleared here.
    pub fn is_cycle_start(&self) -> bool {
        self.micro_batch == 0
    }

    /// Last micro-batch of a cycle; optimizer and scheduler step here.
    pub fn sync_gradients(&self) -> bool {
        self.sync_gradients
    }

    pub fn loss_scale(&self) -> f64 {
        1.0 / self.steps as f64
    }
}

/// The execution backend the training loop runs on.
///
/// It answers rank queries, owns the gradient-accumulation schedule, performs
/// backward passes, provides the cross-process barrier, and fans metric
/// records out to logging backends. Multi-process implementations live
/// outside this crate; `LocalContext` covers the single-process case.
pub trait ExecutionContext {
    fn rank(&self) -> RankInfo;

    fn project(&self) -> &ProjectConfig;

    /// Opens the accumulation scope for the next micro-batch. `end_of_data`
    /// forces a sync so no gradients leak into the next epoch.
    fn begin_accumulation(&mut self, end_of_data: bool) -> AccumulationStep;

    fn end_accumulation(&mut self, _step: &AccumulationStep) {}

    /// Runs `body` inside an accumulation scope.
    fn accumulate<R, F>(&mut self, end_of_data: bool, body: F) -> R
    where
        Self: Sized,
        F: FnOnce(&mut Self, &AccumulationStep) -> R,
    {
        let step = self.begin_accumulation(end_of_data);
        let out = body(self, &step);
        self.end_accumulation(&step);
        out
    }

    fn backward<M: Model>(&mut self, model: &mut M, step: &AccumulationStep) -> Result<()>
    where
        Self: Sized,
    {
        model.backward(step.loss_scale())
    }

    /// Blocks until every process reaches this point.
    fn wait_for_everyone(&mut self) -> Result<()>;

    fn log(&mut self, metrics: &Metrics, step: u64) -> Result<()>;

    /// Prints a line on the coordinating process only.
    fn print(&self, message: &str);

    /// Flushes and closes logging backends.
    fn end_training(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_scale_divides_by_cycle_length() {
        let step = AccumulationStep::new(1, 4, false);
        assert_eq!(step.loss_scale(), 0.25);
        assert!(!step.is_cycle_start());
        assert!(!step.sync_gradients());
    }

    #[test]
    fn immediate_step_always_syncs() {
        let step = AccumulationStep::immediate();
        assert!(step.is_cycle_start());
        assert!(step.sync_gradients());
        assert_eq!(step.loss_scale(), 1.0);
    }
}
