use std::path::{Path, PathBuf};

/// Where a run writes its artifacts and how many checkpoints it keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project_dir: PathBuf,
    /// Maximum number of checkpoint directories kept; `None` keeps everything.
    pub total_limit: Option<usize>,
    /// Write checkpoints into a staging directory and rename into place.
    pub atomic_checkpoints: bool,
}

impl ProjectConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            total_limit: None,
            atomic_checkpoints: true,
        }
    }

    pub fn with_total_limit(mut self, limit: Option<usize>) -> Self {
        self.total_limit = limit;
        self
    }

    pub fn with_atomic_checkpoints(mut self, atomic: bool) -> Self {
        self.atomic_checkpoints = atomic;
        self
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.project_dir.join("checkpoints")
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}
