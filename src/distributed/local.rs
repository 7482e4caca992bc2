use crate::distributed::context::{AccumulationStep, ExecutionContext};
use crate::distributed::project::ProjectConfig;
use crate::distributed::role::RankInfo;
use crate::error::Result;
use crate::metrics::{Metrics, MetricsSink};

/// Single-process execution context.
///
/// Rank 0 of 1: it coordinates everything, the barrier is a no-op, and
/// metric records go to every registered sink in registration order.
pub struct LocalContext {
    project: ProjectConfig,
    accumulation_steps: usize,
    micro_batches_seen: usize,
    sinks: Vec<Box<dyn MetricsSink>>,
    finished: bool,
}

impl LocalContext {
    pub fn new(project: ProjectConfig) -> Self {
        Self {
            project,
            accumulation_steps: 1,
            micro_batches_seen: 0,
            sinks: Vec::new(),
            finished: false,
        }
    }

    pub fn with_gradient_accumulation(mut self, steps: usize) -> Self {
        self.accumulation_steps = steps.max(1);
        self
    }

    pub fn with_sink(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    pub fn gradient_accumulation_steps(&self) -> usize {
        self.accumulation_steps
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ExecutionContext for LocalContext {
    fn rank(&self) -> RankInfo {
        RankInfo::single()
    }

    fn project(&self) -> &ProjectConfig {
        &self.project
    }

    fn begin_accumulation(&mut self, end_of_data: bool) -> AccumulationStep {
        let micro_batch = self.micro_batches_seen % self.accumulation_steps;
        self.micro_batches_seen += 1;
        let sync = end_of_data || self.micro_batches_seen % self.accumulation_steps == 0;
        if end_of_data {
            self.micro_batches_seen = 0;
        }
        AccumulationStep::new(micro_batch, self.accumulation_steps, sync)
    }

    fn wait_for_everyone(&mut self) -> Result<()> {
        Ok(())
    }

    fn log(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        for sink in &mut self.sinks {
            sink.log(metrics, step)?;
        }
        Ok(())
    }

    fn print(&self, message: &str) {
        if self.rank().global_role().is_coordinator() {
            println!("{message}");
        }
    }

    fn end_training(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        for sink in &mut self.sinks {
            sink.finish()?;
        }
        self.finished = true;
        Ok(())
    }
}
