use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-epoch record sent on `TrainerOptions::progress_tx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    /// Rounded mean training loss of this epoch.
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
    /// Set on the coordinator when a checkpoint was published.
    pub checkpoint: Option<PathBuf>,
    /// Global step after the epoch's last batch.
    pub global_step: u64,
    /// Wall-clock duration of this epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// What `Trainer::train` returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs_completed: usize,
    pub global_step: u64,
    pub train_loss_history: Vec<f64>,
    pub validation_loss_history: Vec<f64>,
    pub checkpoints: Vec<PathBuf>,
    /// A stop flag or a dropped progress receiver ended the run before the
    /// configured number of epochs.
    pub stopped_early: bool,
}

impl TrainingSummary {
    pub fn final_train_loss(&self) -> Option<f64> {
        self.train_loss_history.last().copied()
    }
}
