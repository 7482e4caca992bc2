use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::checkpoint::naming::{
    checkpoint_dir_name, is_staging_dir_name, staging_dir_name, trailing_index,
};
use crate::distributed::ProjectConfig;
use crate::error::{Result, TrainError};

/// Ordering key for retained checkpoints: numeric epoch index first, then the
/// directory name, so equal indices resolve lexicographically.
type SlotKey = (u64, String);

/// Owns `<project_dir>/checkpoints` on the coordinating process.
///
/// Retained directories are tracked in memory. The directory is scanned only
/// once, on first use, to pick up checkpoints left by an earlier run.
#[derive(Debug)]
pub struct CheckpointManager {
    root: PathBuf,
    total_limit: Option<usize>,
    atomic: bool,
    retained: BTreeMap<SlotKey, PathBuf>,
    discovered: bool,
}

impl CheckpointManager {
    pub fn new(project: &ProjectConfig) -> Self {
        Self {
            root: project.checkpoints_dir(),
            total_limit: project.total_limit,
            atomic: project.atomic_checkpoints,
            retained: BTreeMap::new(),
            discovered: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn total_limit(&self) -> Option<usize> {
        self.total_limit
    }

    /// Retained checkpoint directories, oldest first.
    pub fn retained(&self) -> Vec<PathBuf> {
        self.retained.values().cloned().collect()
    }

    /// Scans the checkpoint root. Directories without a numeric token are
    /// left alone; interrupted staging directories are removed.
    pub fn discover(&mut self) -> Result<()> {
        self.retained.clear();
        self.discovered = true;
        if !self.root.exists() {
            return Ok(());
        }

        let entries = fs::read_dir(&self.root).map_err(|err| TrainError::checkpoint(&self.root, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| TrainError::checkpoint(&self.root, err))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|err| TrainError::checkpoint(&path, err))?;
            if !file_type.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();

            if is_staging_dir_name(&name) {
                warn!(path = %path.display(), "removing interrupted checkpoint");
                fs::remove_dir_all(&path).map_err(|err| TrainError::checkpoint(&path, err))?;
                continue;
            }

            match trailing_index(&name) {
                Some(index) => {
                    self.retained.insert((index, name), path);
                }
                None => {
                    warn!(path = %path.display(), "ignoring checkpoint directory without an epoch index");
                }
            }
        }
        Ok(())
    }

    /// Makes room for the checkpoint of `epoch` (1-based), then creates and
    /// returns `checkpoint_<epoch-1>`.
    pub fn prepare(&mut self, epoch: usize) -> Result<PathBuf> {
        let (key, dir) = self.reserve(epoch)?;
        fs::create_dir_all(&dir).map_err(|err| TrainError::checkpoint(&dir, err))?;
        self.retained.insert(key, dir.clone());
        Ok(dir)
    }

    /// Reserves the slot for `epoch` and lets `write` fill it.
    ///
    /// With atomic checkpoints `write` receives a hidden staging directory that
    /// is renamed to its final name only after `write` succeeds. A failed write
    /// leaves no `checkpoint_<n>` behind.
    pub fn publish<F>(&mut self, epoch: usize, write: F) -> Result<PathBuf>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if !self.atomic {
            let dir = self.prepare(epoch)?;
            write(&dir)?;
            info!(path = %dir.display(), "checkpoint written");
            return Ok(dir);
        }

        let (key, dir) = self.reserve(epoch)?;
        let staging = self.root.join(staging_dir_name(key.0));
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|err| TrainError::checkpoint(&staging, err))?;
        }
        fs::create_dir_all(&staging).map_err(|err| TrainError::checkpoint(&staging, err))?;

        if let Err(err) = write(&staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }

        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|err| TrainError::checkpoint(&dir, err))?;
        }
        fs::rename(&staging, &dir).map_err(|err| TrainError::checkpoint(&dir, err))?;
        self.retained.insert(key, dir.clone());
        info!(path = %dir.display(), "checkpoint published");
        Ok(dir)
    }

    fn reserve(&mut self, epoch: usize) -> Result<(SlotKey, PathBuf)> {
        if epoch == 0 {
            return Err(TrainError::runtime("checkpoint epochs are 1-based"));
        }
        if !self.discovered {
            self.discover()?;
        }
        fs::create_dir_all(&self.root).map_err(|err| TrainError::checkpoint(&self.root, err))?;

        let index = (epoch - 1) as u64;
        let name = checkpoint_dir_name(index);
        let key = (index, name.clone());
        self.enforce_limit(&key)?;
        Ok((key, self.root.join(name)))
    }

    /// Deletes the oldest directories so that adding `incoming` stays within
    /// the limit. A directory already holding `incoming` is overwritten, not
    /// counted.
    fn enforce_limit(&mut self, incoming: &SlotKey) -> Result<()> {
        let Some(limit) = self.total_limit else {
            return Ok(());
        };
        let candidates: Vec<SlotKey> = self
            .retained
            .keys()
            .filter(|key| *key != incoming)
            .cloned()
            .collect();
        if candidates.len() + 1 <= limit {
            return Ok(());
        }
        let excess = candidates.len() + 1 - limit;
        for key in candidates.into_iter().take(excess) {
            if let Some(path) = self.retained.remove(&key) {
                info!(path = %path.display(), "pruning checkpoint");
                fs::remove_dir_all(&path).map_err(|err| TrainError::checkpoint(&path, err))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn project(dir: &Path, limit: Option<usize>, atomic: bool) -> ProjectConfig {
        ProjectConfig::new(dir)
            .with_total_limit(limit)
            .with_atomic_checkpoints(atomic)
    }

    fn names(manager: &CheckpointManager) -> Vec<String> {
        manager
            .retained()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn prepare_creates_zero_based_directory() {
        let tmp = tempdir().unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), None, false));
        let dir = manager.prepare(1).unwrap();
        assert_eq!(dir, tmp.path().join("checkpoints").join("checkpoint_0"));
        assert!(dir.is_dir());
    }

    #[test]
    fn limit_prunes_oldest_before_creating_new() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("checkpoints");
        for index in 0..4 {
            fs::create_dir_all(root.join(format!("checkpoint_{index}"))).unwrap();
        }

        let mut manager = CheckpointManager::new(&project(tmp.path(), Some(2), false));
        manager.prepare(5).unwrap();

        assert_eq!(names(&manager), vec!["checkpoint_3", "checkpoint_4"]);
        let mut on_disk: Vec<String> = fs::read_dir(&root)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        on_disk.sort();
        assert_eq!(on_disk, vec!["checkpoint_3", "checkpoint_4"]);
    }

    #[test]
    fn ordering_is_numeric_not_lexicographic() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("checkpoints");
        for index in [2, 10, 9] {
            fs::create_dir_all(root.join(format!("checkpoint_{index}"))).unwrap();
        }
        let mut manager = CheckpointManager::new(&project(tmp.path(), Some(3), false));
        manager.prepare(12).unwrap();
        assert_eq!(
            names(&manager),
            vec!["checkpoint_9", "checkpoint_10", "checkpoint_11"]
        );
    }

    #[test]
    fn equal_indices_break_ties_by_name() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("checkpoints");
        fs::create_dir_all(root.join("run_b_1")).unwrap();
        fs::create_dir_all(root.join("run_a_1")).unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), Some(2), false));
        manager.prepare(3).unwrap();
        assert_eq!(names(&manager), vec!["run_b_1", "checkpoint_2"]);
        assert!(!root.join("run_a_1").exists());
    }

    #[test]
    fn directories_without_index_and_files_are_ignored() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("checkpoints");
        fs::create_dir_all(root.join("latest")).unwrap();
        fs::write(root.join("notes_5.txt"), "x").unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), Some(1), false));
        manager.prepare(1).unwrap();
        assert_eq!(names(&manager), vec!["checkpoint_0"]);
        assert!(root.join("latest").is_dir());
        assert!(root.join("notes_5.txt").is_file());
    }

    #[test]
    fn no_limit_keeps_everything() {
        let tmp = tempdir().unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), None, false));
        for epoch in 1..=5 {
            manager.prepare(epoch).unwrap();
        }
        assert_eq!(manager.retained().len(), 5);
    }

    #[test]
    fn rewriting_same_epoch_does_not_count_twice() {
        let tmp = tempdir().unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), Some(2), true));
        manager.publish(1, |_| Ok(())).unwrap();
        manager.publish(2, |_| Ok(())).unwrap();
        manager.publish(2, |dir| Ok(fs::write(dir.join("w"), "2")?)).unwrap();
        assert_eq!(names(&manager), vec!["checkpoint_0", "checkpoint_1"]);
    }

    #[test]
    fn atomic_publish_renames_staging_into_place() {
        let tmp = tempdir().unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), None, true));
        let mut seen = PathBuf::new();
        let dir = manager
            .publish(2, |staging| {
                seen = staging.to_path_buf();
                fs::write(staging.join("model.json"), "{}")?;
                Ok(())
            })
            .unwrap();

        assert!(seen.ends_with(".checkpoint_1.partial"));
        assert!(!seen.exists());
        assert!(dir.join("model.json").is_file());
        assert!(dir.ends_with("checkpoint_1"));
    }

    #[test]
    fn failed_atomic_write_leaves_nothing_behind() {
        let tmp = tempdir().unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), None, true));
        let err = manager
            .publish(1, |_| Err(TrainError::model("disk full")))
            .unwrap_err();
        assert!(matches!(err, TrainError::Model(_)));

        let root = tmp.path().join("checkpoints");
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
        assert!(manager.retained().is_empty());
    }

    #[test]
    fn discovery_removes_interrupted_staging_dirs() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("checkpoints");
        fs::create_dir_all(root.join(".checkpoint_4.partial")).unwrap();
        fs::create_dir_all(root.join("checkpoint_3")).unwrap();

        let mut manager = CheckpointManager::new(&project(tmp.path(), None, true));
        manager.discover().unwrap();

        assert!(!root.join(".checkpoint_4.partial").exists());
        assert_eq!(names(&manager), vec!["checkpoint_3"]);
    }

    #[test]
    fn epoch_zero_is_rejected() {
        let tmp = tempdir().unwrap();
        let mut manager = CheckpointManager::new(&project(tmp.path(), None, false));
        assert!(manager.prepare(0).is_err());
    }
}
