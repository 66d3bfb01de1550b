//! Pitch-class (chroma) features
//!
//! A [`ChromaMatrix`] holds one row per pitch class (C through B) and one
//! column per analysis frame. [`FeatureTransform`] is the seam between
//! waveform and matrix; [`StftChroma`] is the bundled implementation.

mod filterbank;
mod stft;

pub use stft::StftChroma;

use crate::config::PITCH_CLASSES;
use crate::error::{AmenError, Result};

/// Waveform to chroma matrix transform
pub trait FeatureTransform: Send + Sync {
    /// Samples advanced between successive columns
    fn hop_length(&self) -> usize;

    /// Sample rate the transform expects its input at
    fn sample_rate(&self) -> u32;

    /// Compute a 12xN matrix of non-negative pitch-class energies
    fn transform(&self, samples: &[f32]) -> Result<ChromaMatrix>;

    /// Identifier stored with templates built by this transform
    fn algorithm_id(&self) -> &str {
        "CHROMA"
    }

    /// Parameters stored with templates built by this transform (JSON)
    fn algorithm_params(&self) -> String {
        "{}".to_string()
    }
}

/// Row-major real matrix, rows = pitch classes, columns = frames
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl ChromaMatrix {
    /// Wrap row-major values
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(AmenError::InvalidMatrix { rows, cols });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from equally long rows
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != n_cols) {
            return Err(AmenError::InvalidMatrix {
                rows: n_rows,
                cols: n_cols,
            });
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Build a 12-row matrix from per-frame pitch-class vectors
    pub fn from_columns(columns: &[[f32; PITCH_CLASSES]]) -> Self {
        let cols = columns.len();
        let mut data = vec![0.0; PITCH_CLASSES * cols];
        for (c, column) in columns.iter().enumerate() {
            for (r, &v) in column.iter().enumerate() {
                data[r * cols + c] = v;
            }
        }
        Self {
            rows: PITCH_CLASSES,
            cols,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn get(&self, r: usize, c: usize) -> f32 {
        self.data[r * self.cols + c]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Copy of the matrix with every value multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Columns `start..end` as a new matrix
    pub fn slice_cols(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.cols);
        let start = start.min(end);
        let cols = end - start;
        let mut data = Vec::with_capacity(self.rows * cols);
        for r in 0..self.rows {
            data.extend_from_slice(&self.row(r)[start..end]);
        }
        Self {
            rows: self.rows,
            cols,
            data,
        }
    }

    /// Global mean and population standard deviation
    pub fn mean_std(&self) -> (f64, f64) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.data.len() as f64;
        let mean = self.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = self
            .data
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        (mean, var.sqrt())
    }
}
