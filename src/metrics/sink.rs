use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::error::{Result, TrainError};
use crate::metrics::record::Metrics;

/// A logging backend for metric records.
///
/// The training loop only produces `(metrics, step)` pairs; what happens to
/// them is up to the sink.
pub trait MetricsSink {
    fn log(&mut self, metrics: &Metrics, step: u64) -> Result<()>;

    /// Flushes and closes the backend. Called once at end of training.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// tracing
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn log(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        tracing::info!(target: "ferrite_sft::metrics", step, %metrics, "metrics");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON lines
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MetricsLine<'a> {
    step: u64,
    wall_time: f64,
    metrics: &'a Metrics,
}

/// Appends one JSON object per record to a file:
/// `{"step":12,"wall_time":1700000000.5,"metrics":{"loss":0.25,"lr":0.001}}`
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
    flush_every: usize,
    pending: usize,
}

impl JsonlSink {
    pub fn create(path: impl AsRef<Path>, flush_every: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            flush_every: flush_every.max(1),
            pending: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.pending = 0;
        Ok(())
    }
}

impl MetricsSink for JsonlSink {
    fn log(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        let line = MetricsLine {
            step,
            wall_time: current_wall_time(),
            metrics,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n").map_err(|err| {
            TrainError::runtime(format!(
                "failed to write metrics to {}: {err}",
                self.path.display()
            ))
        })?;

        self.pending += 1;
        if self.pending >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

fn current_wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// In-memory recorder
// ---------------------------------------------------------------------------

/// Keeps every record in memory. Clones share the same buffer, so a handle
/// can be kept outside the context that owns the sink.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<(Metrics, u64)>>>,
    finished: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Metrics, u64)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records whose metric names include `name`.
    pub fn records_with(&self, name: &str) -> Vec<(Metrics, u64)> {
        self.records()
            .into_iter()
            .filter(|(metrics, _)| metrics.get(name).is_some())
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.lock().map(|flag| *flag).unwrap_or(false)
    }
}

impl MetricsSink for RecordingSink {
    fn log(&mut self, metrics: &Metrics, step: u64) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| TrainError::runtime("metrics recorder lock poisoned"))?
            .push((metrics.clone(), step));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        *self
            .finished
            .lock()
            .map_err(|_| TrainError::runtime("metrics recorder lock poisoned"))? = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn jsonl_sink_writes_one_line_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("metrics.jsonl");
        let mut sink = JsonlSink::create(&path, 10).unwrap();

        sink.log(&Metrics::new().with("loss", 0.5), 1).unwrap();
        sink.log(&Metrics::new().with("train/loss", 0.25), 2).unwrap();
        sink.finish().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["step"], 1);
        assert_eq!(lines[0]["metrics"]["loss"], 0.5);
        assert_eq!(lines[1]["metrics"]["train/loss"], 0.25);
    }

    #[test]
    fn recording_sink_clones_share_records() {
        let handle = RecordingSink::new();
        let mut sink = handle.clone();
        sink.log(&Metrics::new().with("loss", 1.0), 3).unwrap();
        sink.finish().unwrap();

        assert_eq!(handle.records().len(), 1);
        assert_eq!(handle.records_with("loss")[0].1, 3);
        assert!(handle.is_finished());
    }
}
