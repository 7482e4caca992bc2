#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use ferrite_sft::data::DataSource;
use ferrite_sft::distributed::AccumulationStep;
use ferrite_sft::error::{Result, TrainError};
use ferrite_sft::metrics::Metrics;
use ferrite_sft::model::{GradMode, ModelMode, ModelOutput, Parameter};
use ferrite_sft::optim::{LrScheduler, Optimizer};
use ferrite_sft::{ExecutionContext, LocalContext, Model, ProjectConfig, RankInfo, SavePretrained};

/// Shared, ordered record of what the collaborators were asked to do.
#[derive(Debug, Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.all().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// A model whose batches are their own loss values.
pub struct ScriptedModel {
    pub events: Events,
    weight: Vec<f64>,
    grad: Vec<f64>,
    mode: ModelMode,
    pending: bool,
    pub fail_save: bool,
}

impl ScriptedModel {
    pub fn new(events: Events) -> Self {
        ScriptedModel {
            events,
            weight: vec![0.0],
            grad: vec![0.0],
            mode: ModelMode::Train,
            pending: false,
            fail_save: false,
        }
    }
}

impl SavePretrained for ScriptedModel {
    fn save_pretrained(&self, dir: &Path) -> Result<()> {
        if self.fail_save {
            return Err(TrainError::model("disk full"));
        }
        fs::write(dir.join("weights.txt"), format!("{}", self.weight[0]))?;
        Ok(())
    }
}

impl Model for ScriptedModel {
    type Batch = f64;

    fn set_mode(&mut self, mode: ModelMode) {
        self.mode = mode;
    }

    fn mode(&self) -> ModelMode {
        self.mode
    }

    fn forward(&mut self, batch: &f64, grad: GradMode) -> Result<ModelOutput> {
        self.events.push(match grad {
            GradMode::Enabled => "forward",
            GradMode::Disabled => "eval_forward",
        });
        self.pending = grad == GradMode::Enabled;
        Ok(ModelOutput {
            loss: *batch,
            batch_size: 1,
        })
    }

    fn backward(&mut self, loss_scale: f64) -> Result<()> {
        if !std::mem::take(&mut self.pending) {
            return Err(TrainError::model("no pending forward"));
        }
        self.events.push(format!("backward:{loss_scale}"));
        self.grad[0] += loss_scale;
        Ok(())
    }

    fn parameters(&mut self) -> Vec<Parameter<'_>> {
        vec![Parameter {
            name: "w".to_string(),
            value: &mut self.weight,
            grad: &mut self.grad,
        }]
    }
}

pub struct RecordingOptimizer {
    pub events: Events,
    pub lr: f64,
}

impl Optimizer for RecordingOptimizer {
    fn zero_grad(&mut self, params: &mut [Parameter<'_>]) {
        self.events.push("zero_grad");
        for param in params.iter_mut() {
            param.grad.fill(0.0);
        }
    }

    fn step(&mut self, params: &mut [Parameter<'_>]) {
        let grad = params.first().map_or(0.0, |p| p.grad[0]);
        self.events.push(format!("step:{grad}"));
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}

/// Halves the learning rate on every step.
pub struct HalvingScheduler {
    pub events: Events,
    pub lr: f64,
}

impl LrScheduler for HalvingScheduler {
    fn step(&mut self, optimizer: &mut dyn Optimizer) {
        self.events.push("scheduler");
        self.lr /= 2.0;
        optimizer.set_learning_rate(self.lr);
    }

    fn get_lr(&self) -> Vec<f64> {
        vec![self.lr]
    }
}

/// A single-process context that records barriers, prints and teardown,
/// optionally posing as a non-coordinating process of a two-process run.
pub struct RecordingContext {
    inner: LocalContext,
    rank: RankInfo,
    pub events: Events,
}

impl RecordingContext {
    pub fn coordinator(project: ProjectConfig, events: Events) -> Self {
        RecordingContext {
            inner: LocalContext::new(project),
            rank: RankInfo::single(),
            events,
        }
    }

    pub fn worker(project: ProjectConfig, events: Events) -> Self {
        RecordingContext {
            rank: RankInfo::new(1, 1, 2).unwrap(),
            ..Self::coordinator(project, events)
        }
    }
}

impl ExecutionContext for RecordingContext {
    fn rank(&self) -> RankInfo {
        self.rank
    }

    fn project(&self) -> &ProjectConfig {
        self.inner.project()
    }

    fn begin_accumulation(&mut self, end_of_data: bool) -> AccumulationStep {
        self.inner.begin_accumulation(end_of_data)
    }

    fn wait_for_everyone(&mut self) -> Result<()> {
        self.events.push("barrier");
        Ok(())
    }

    fn log(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        self.inner.log(metrics, step)
    }

    fn print(&self, message: &str) {
        if self.rank.global_role().is_coordinator() {
            self.events.push(format!("print:{message}"));
        }
    }

    fn end_training(&mut self) -> Result<()> {
        self.events.push("end_training");
        self.inner.end_training()
    }
}

/// Fixed list of batches with a known length.
pub struct VecSource(pub Vec<f64>);

impl DataSource for VecSource {
    type Batch = f64;

    fn num_batches(&self) -> Option<usize> {
        Some(self.0.len())
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = f64> + '_> {
        Box::new(self.0.iter().copied())
    }
}
