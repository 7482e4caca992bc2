//! CSV datasets.
//!
//! Format: UTF-8, comma-separated, optional header row. The first row is
//! treated as a header when any of its cells is non-numeric. Double-quoted
//! fields may contain commas.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::Sample;
use crate::error::{Result, TrainError};

/// How the trailing column(s) of a row become the target vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LabelMode {
    /// Last column is a 0-based class index, one-hot encoded to `n_classes`.
    ClassIndex { n_classes: usize },
    /// Last `n_label_cols` columns are the target vector as-is.
    Columns { n_label_cols: usize },
}

pub fn load_csv(path: impl AsRef<Path>, label_mode: LabelMode) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse_csv(&text, label_mode).map_err(|err| match err {
        TrainError::Data(msg) => TrainError::data(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn parse_csv(text: &str, label_mode: LabelMode) -> Result<Vec<Sample>> {
    let mut lines = text.lines().peekable();
    if let Some(first) = lines.peek() {
        if is_header(first) {
            lines.next();
        }
    }

    let mut samples = Vec::new();
    for (row_idx, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = row_idx + 1;
        let cells = parse_row(line);

        let sample = match label_mode {
            LabelMode::ClassIndex { n_classes } => {
                let Some((label_cell, feature_cells)) = cells.split_last().filter(|(_, f)| !f.is_empty()) else {
                    return Err(TrainError::data(format!(
                        "row {row}: expected at least 2 columns, got {}",
                        cells.len()
                    )));
                };
                let class: usize = label_cell.trim().parse().map_err(|_| {
                    TrainError::data(format!("row {row}: class index '{label_cell}' is not a non-negative integer"))
                })?;
                if class >= n_classes {
                    return Err(TrainError::data(format!(
                        "row {row}: class index {class} >= n_classes {n_classes}"
                    )));
                }
                let mut target = vec![0.0; n_classes];
                target[class] = 1.0;
                Sample::new(parse_floats(feature_cells, row)?, target)
            }
            LabelMode::Columns { n_label_cols } => {
                if cells.len() < n_label_cols + 1 {
                    return Err(TrainError::data(format!(
                        "row {row}: expected at least {} columns, got {}",
                        n_label_cols + 1,
                        cells.len()
                    )));
                }
                let (features, labels) = cells.split_at(cells.len() - n_label_cols);
                Sample::new(parse_floats(features, row)?, parse_floats(labels, row)?)
            }
        };
        samples.push(sample);
    }

    let Some(first) = samples.first() else {
        return Err(TrainError::data("no data rows"));
    };
    let width = first.input.len();
    if let Some((i, bad)) = samples.iter().enumerate().find(|(_, s)| s.input.len() != width) {
        return Err(TrainError::data(format!(
            "row {}: feature count {} does not match first row's {width}",
            i + 1,
            bad.input.len()
        )));
    }
    Ok(samples)
}

fn is_header(line: &str) -> bool {
    parse_row(line).iter().any(|cell| {
        let t = cell.trim();
        !t.is_empty() && t.parse::<f64>().is_err()
    })
}

fn parse_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn parse_floats(cells: &[String], row: usize) -> Result<Vec<f64>> {
    cells
        .iter()
        .map(|c| {
            c.trim()
                .parse::<f64>()
                .map_err(|_| TrainError::data(format!("row {row}: '{c}' is not a valid number")))
        })
        .collect()
}
