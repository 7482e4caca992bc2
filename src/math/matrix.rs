use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Builds a matrix from equally long rows. Returns `None` for ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Matrix> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(Matrix {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // (0, 1] keeps ln() finite.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let data = (0..rows * cols)
            .map(|_| Matrix::sample_standard_normal(rng) * std_dev)
            .collect();
        Matrix { rows, cols, data }
    }

    /// He initialization: N(0, sqrt(2 / rows)). `rows` is the fan-in.
    ///
    /// Suited to ReLU layers, which zero half of their inputs on average.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (2.0 / rows.max(1) as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: N(0, sqrt(1 / rows)). `rows` is the fan-in.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (1.0 / rows.max(1) as f64).sqrt(), rng)
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Row vector times matrix: `x (1 x rows) * self` -> `1 x cols`.
    pub fn vec_mul(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for (i, &xi) in x.iter().enumerate() {
            for (o, w) in out.iter_mut().zip(self.row(i)) {
                *o += xi * w;
            }
        }
        out
    }

    /// Matrix times column vector: `self * d (cols x 1)` -> `rows`.
    /// Used to push a delta back through a weight matrix.
    pub fn mul_vec(&self, d: &[f64]) -> Vec<f64> {
        debug_assert_eq!(d.len(), self.cols);
        (0..self.rows)
            .map(|i| self.row(i).iter().zip(d).map(|(w, di)| w * di).sum())
            .collect()
    }

    /// `self += scale * x^T d`, the outer-product update of a dense layer.
    pub fn add_outer(&mut self, x: &[f64], d: &[f64], scale: f64) {
        debug_assert_eq!(x.len(), self.rows);
        debug_assert_eq!(d.len(), self.cols);
        for (row, &xi) in self.data.chunks_mut(self.cols).zip(x) {
            for (cell, di) in row.iter_mut().zip(d) {
                *cell += scale * xi * di;
            }
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::zeros(0, 0)
    }
}
