use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::data::Sample;

/// Small deterministic toy datasets, handy for smoke runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinDataset {
    /// 4 samples, 2 inputs, scalar target.
    Xor,
    /// Two concentric rings, one-hot targets of length 2.
    Circles,
    /// Two clusters, one-hot targets of length 2.
    Blobs,
}

impl BuiltinDataset {
    /// `n` is ignored for `Xor`.
    pub fn samples(self, n: usize) -> Vec<Sample> {
        match self {
            BuiltinDataset::Xor => xor(),
            BuiltinDataset::Circles => circles(n),
            BuiltinDataset::Blobs => blobs(n),
        }
    }

    pub fn input_size(self) -> usize {
        2
    }

    pub fn target_size(self) -> usize {
        match self {
            BuiltinDataset::Xor => 1,
            BuiltinDataset::Circles | BuiltinDataset::Blobs => 2,
        }
    }
}

pub fn xor() -> Vec<Sample> {
    vec![
        Sample::new(vec![0.0, 0.0], vec![0.0]),
        Sample::new(vec![0.0, 1.0], vec![1.0]),
        Sample::new(vec![1.0, 0.0], vec![1.0]),
        Sample::new(vec![1.0, 1.0], vec![0.0]),
    ]
}

/// Class 0 is the inner ring (r = 0.3), class 1 the outer (r = 0.8).
/// Coordinates are mapped into [0, 1].
pub fn circles(n: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| {
            let class = i % 2;
            let angle = (i as f64 / n as f64) * 2.0 * PI * 10.0;
            let radius = if class == 0 { 0.3 } else { 0.8 };
            let noise = 0.05 * (i as f64 * 7.3).sin();
            let x = (radius + noise) * angle.cos();
            let y = (radius + noise) * angle.sin();
            Sample::new(vec![(x + 1.0) / 2.0, (y + 1.0) / 2.0], one_hot(class, 2))
        })
        .collect()
}

/// Centers at (0.3, 0.3) and (0.7, 0.7) with a deterministic spread.
pub fn blobs(n: usize) -> Vec<Sample> {
    const CENTERS: [(f64, f64); 2] = [(0.3, 0.3), (0.7, 0.7)];
    (0..n)
        .map(|i| {
            let class = i % 2;
            let (cx, cy) = CENTERS[class];
            let angle = i as f64 * 2.399;
            let r = 0.12 * (i as f64 * 0.31).sin().abs();
            let x = (cx + r * angle.cos()).clamp(0.0, 1.0);
            let y = (cy + r * angle.sin()).clamp(0.0, 1.0);
            Sample::new(vec![x, y], one_hot(class, 2))
        })
        .collect()
}

fn one_hot(class: usize, n_classes: usize) -> Vec<f64> {
    let mut v = vec![0.0; n_classes];
    v[class] = 1.0;
    v
}
