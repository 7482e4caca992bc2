use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};

/// What a process is allowed to do with shared side effects.
///
/// Exactly one process (per node, or globally, depending on which rank the
/// role was resolved from) is the `Coordinator` and performs filesystem
/// writes and visible progress rendering. Every other process is a `Worker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    Coordinator,
    Worker,
}

impl ProcessRole {
    pub fn is_coordinator(self) -> bool {
        matches!(self, ProcessRole::Coordinator)
    }
}

/// Position of this process within a (possibly single-process) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankInfo {
    pub process_index: usize,
    pub local_process_index: usize,
    pub num_processes: usize,
}

impl RankInfo {
    pub fn new(process_index: usize, local_process_index: usize, num_processes: usize) -> Result<Self> {
        if num_processes == 0 {
            return Err(TrainError::runtime("num_processes must be at least 1"));
        }
        if process_index >= num_processes {
            return Err(TrainError::runtime(format!(
                "process index {process_index} out of range for {num_processes} process(es)"
            )));
        }
        if local_process_index > process_index {
            return Err(TrainError::runtime(format!(
                "local process index {local_process_index} exceeds global index {process_index}"
            )));
        }
        Ok(Self {
            process_index,
            local_process_index,
            num_processes,
        })
    }

    pub fn single() -> Self {
        Self {
            process_index: 0,
            local_process_index: 0,
            num_processes: 1,
        }
    }

    /// Coordinator iff this is global rank 0. Used for progress rendering.
    pub fn global_role(&self) -> ProcessRole {
        if self.process_index == 0 {
            ProcessRole::Coordinator
        } else {
            ProcessRole::Worker
        }
    }

    /// Coordinator iff this is local rank 0. Used for checkpoint writes.
    pub fn local_role(&self) -> ProcessRole {
        if self.local_process_index == 0 {
            ProcessRole::Coordinator
        } else {
            ProcessRole::Worker
        }
    }

    pub fn is_distributed(&self) -> bool {
        self.num_processes > 1
    }
}

impl Default for RankInfo {
    fn default() -> Self {
        Self::single()
    }
}
