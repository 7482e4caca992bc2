//! Run configuration files.
//!
//! A run is described by one TOML (or JSON, by extension) file. Relative
//! paths inside it are resolved against the file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::builtin::BuiltinDataset;
use crate::data::LabelMode;
use crate::distributed::ProjectConfig;
use crate::error::{Result, TrainError};
use crate::network::NetworkSpec;
use crate::optim::Schedule;
use crate::progress::DrawTarget;
use crate::train::TrainerOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub trainer: TrainerSection,
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub accelerator: AcceleratorSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub optimizer: OptimizerSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    pub model: NetworkSpec,
    pub data: DataSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSection {
    pub epochs: usize,
    pub log_interval: usize,
    pub save_on_epoch_end: bool,
    pub reject_non_finite_loss: bool,
    pub show_progress: bool,
    /// Seeds weight init and data shuffling.
    pub seed: u64,
}

impl Default for TrainerSection {
    fn default() -> Self {
        Self {
            epochs: 3,
            log_interval: 50,
            save_on_epoch_end: true,
            reject_non_finite_loss: false,
            show_progress: true,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub project_dir: PathBuf,
    pub total_limit: Option<usize>,
    pub atomic_checkpoints: bool,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("runs"),
            total_limit: None,
            atomic_checkpoints: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorSection {
    pub gradient_accumulation_steps: usize,
}

impl Default for AcceleratorSection {
    fn default() -> Self {
        Self {
            gradient_accumulation_steps: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Forward metric records to `tracing`.
    pub stdout: bool,
    /// Append metric records as JSON lines to this file.
    pub jsonl: Option<PathBuf>,
    pub flush_every: usize,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            stdout: true,
            jsonl: None,
            flush_every: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSection {
    pub learning_rate: f64,
    pub momentum: f64,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            momentum: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    #[default]
    Constant,
    ConstantWithWarmup,
    Linear,
    Cosine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub kind: SchedulerKind,
    pub warmup_steps: usize,
    /// Floor of the cosine schedule as a fraction of the base rate.
    pub min_lr_ratio: f64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            kind: SchedulerKind::Constant,
            warmup_steps: 0,
            min_lr_ratio: 0.0,
        }
    }
}

impl SchedulerSection {
    /// `None` for a constant rate, which needs no scheduler at all.
    pub fn schedule(&self, total_steps: usize) -> Option<Schedule> {
        match self.kind {
            SchedulerKind::Constant => None,
            SchedulerKind::ConstantWithWarmup => Some(Schedule::ConstantWithWarmup {
                warmup_steps: self.warmup_steps,
            }),
            SchedulerKind::Linear => Some(Schedule::Linear {
                warmup_steps: self.warmup_steps,
                total_steps,
            }),
            SchedulerKind::Cosine => Some(Schedule::Cosine {
                warmup_steps: self.warmup_steps,
                total_steps,
                min_lr_ratio: self.min_lr_ratio,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSourceConfig {
    Builtin {
        name: BuiltinDataset,
        #[serde(default = "default_builtin_samples")]
        samples: usize,
    },
    Csv {
        path: PathBuf,
        label: LabelMode,
    },
}

fn default_builtin_samples() -> usize {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub source: DataSourceConfig,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Percentage of samples (from the end) held out for validation, at most 50.
    #[serde(default)]
    pub val_split_pct: u8,
}

fn default_batch_size() -> usize {
    32
}

fn default_shuffle() -> bool {
    true
}

impl RunConfig {
    /// Parses `path` and resolves relative paths against its directory.
    /// Does not validate; see `validate`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<RunConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrainError::ConfigFormat(format!("{}: {e}", path.display())))?;

        let mut config: RunConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| TrainError::ConfigFormat(format!("{}: {e}", path.display())))?,
            _ => toml::from_str(&content)
                .map_err(|e| TrainError::ConfigFormat(format!("{}: {e}", path.display())))?,
        };

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<RunConfig> {
        Ok(toml::from_str(content)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.project.project_dir);
        if let Some(jsonl) = self.logging.jsonl.as_mut() {
            resolve(jsonl);
        }
        if let DataSourceConfig::Csv { path, .. } = &mut self.data.source {
            resolve(path);
        }
    }

    /// Checks every section and reports all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.trainer.epochs == 0 {
            errors.push("trainer.epochs must be at least 1".to_string());
        }
        if self.trainer.log_interval == 0 {
            errors.push("trainer.log_interval must be at least 1".to_string());
        }
        if self.project.total_limit == Some(0) {
            errors.push("project.total_limit must be at least 1 when set".to_string());
        }
        if self.accelerator.gradient_accumulation_steps == 0 {
            errors.push("accelerator.gradient_accumulation_steps must be at least 1".to_string());
        }
        if self.logging.flush_every == 0 {
            errors.push("logging.flush_every must be at least 1".to_string());
        }
        if !(self.optimizer.learning_rate.is_finite() && self.optimizer.learning_rate > 0.0) {
            errors.push("optimizer.learning_rate must be a positive number".to_string());
        }
        if !(0.0..1.0).contains(&self.optimizer.momentum) {
            errors.push("optimizer.momentum must be in [0, 1)".to_string());
        }
        if !(0.0..=1.0).contains(&self.scheduler.min_lr_ratio) {
            errors.push("scheduler.min_lr_ratio must be in [0, 1]".to_string());
        }
        if self.data.batch_size == 0 {
            errors.push("data.batch_size must be at least 1".to_string());
        }
        if self.data.val_split_pct > 50 {
            errors.push("data.val_split_pct must be at most 50".to_string());
        }

        errors.extend(self.model.validate());

        if let DataSourceConfig::Builtin { name, .. } = self.data.source {
            if self.model.input_size().is_some_and(|n| n != name.input_size()) {
                errors.push(format!(
                    "model expects {} inputs but the builtin dataset has {}",
                    self.model.input_size().unwrap_or_default(),
                    name.input_size()
                ));
            }
            if self.model.output_size().is_some_and(|n| n != name.target_size()) {
                errors.push(format!(
                    "model produces {} outputs but the builtin dataset has {} targets",
                    self.model.output_size().unwrap_or_default(),
                    name.target_size()
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TrainError::validation(errors))
        }
    }

    pub fn project_config(&self) -> ProjectConfig {
        ProjectConfig::new(&self.project.project_dir)
            .with_total_limit(self.project.total_limit)
            .with_atomic_checkpoints(self.project.atomic_checkpoints)
    }

    pub fn trainer_options(&self) -> TrainerOptions {
        let mut options = TrainerOptions::new(self.trainer.epochs)
            .with_log_interval(self.trainer.log_interval)
            .with_save_on_epoch_end(self.trainer.save_on_epoch_end);
        options.reject_non_finite_loss = self.trainer.reject_non_finite_loss;
        if !self.trainer.show_progress {
            options = options.with_draw_target(DrawTarget::Hidden);
        }
        options
    }
}
