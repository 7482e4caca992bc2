use std::sync::mpsc;
use std::sync::{atomic::AtomicBool, Arc};

use crate::error::{Result, TrainError};
use crate::progress::DrawTarget;
use crate::train::epoch_stats::EpochSummary;

/// Knobs of a `Trainer` run.
///
/// # Fields
/// - `epochs`                 — full passes over the training data
/// - `log_interval`           — a step record is logged when `batch_index % log_interval == 0`
/// - `save_on_epoch_end`      — publish a checkpoint after every epoch
/// - `reject_non_finite_loss` — fail the run on a NaN/infinite batch loss instead
///                              of folding it into the running mean
/// - `draw_target`            — where the coordinator's progress bar renders
/// - `progress_tx`            — optional channel; one `EpochSummary` per finished
///                              epoch. A dropped receiver ends training after
///                              the current epoch.
/// - `stop_flag`              — optional flag checked before every epoch
pub struct TrainerOptions {
    pub epochs: usize,
    pub log_interval: usize,
    pub save_on_epoch_end: bool,
    pub reject_non_finite_loss: bool,
    pub draw_target: DrawTarget,
    pub progress_tx: Option<mpsc::Sender<EpochSummary>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainerOptions {
    pub fn new(epochs: usize) -> Self {
        TrainerOptions {
            epochs,
            ..Self::default()
        }
    }

    pub fn with_log_interval(mut self, log_interval: usize) -> Self {
        self.log_interval = log_interval;
        self
    }

    pub fn with_save_on_epoch_end(mut self, save: bool) -> Self {
        self.save_on_epoch_end = save;
        self
    }

    pub fn with_draw_target(mut self, target: DrawTarget) -> Self {
        self.draw_target = target;
        self
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn with_progress_channel(mut self, tx: mpsc::Sender<EpochSummary>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.epochs == 0 {
            errors.push("epochs must be at least 1".to_string());
        }
        if self.log_interval == 0 {
            errors.push("log_interval must be at least 1".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TrainError::validation(errors))
        }
    }
}

impl Default for TrainerOptions {
    fn default() -> Self {
        TrainerOptions {
            epochs: 3,
            log_interval: 50,
            save_on_epoch_end: true,
            reject_non_finite_loss: false,
            draw_target: DrawTarget::Stderr,
            progress_tx: None,
            stop_flag: None,
        }
    }
}
