//! Normalised sliding cross-correlation of chroma matrices
//!
//! Both matrices are standardised with their own global mean and standard
//! deviation, each pitch-class row is correlated in valid mode, and the
//! twelve sequences are summed and scaled by `1 / (12 * M)` where `M` is the
//! template length in frames. The first maximum wins.

use crate::chroma::ChromaMatrix;
use crate::config::{CorrelationMethod, NORMALIZATION_EPSILON, PITCH_CLASSES};
use crate::error::{AmenError, Result};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};


/// Best alignment of a template inside a search matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Column of the search matrix where the template starts
    pub offset: usize,
    /// Summed row correlations at `offset`, before length scaling
    pub raw_score: f64,
    /// `raw_score / (12 * M)`
    pub score: f64,
}

/// Template matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    method: CorrelationMethod,
}

impl Matcher {
    pub fn new(method: CorrelationMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    /// Find the offset in `search` where `template` correlates best.
    ///
    /// Fails with [`AmenError::SearchWindowTooShort`] when the template has
    /// more frames than the search matrix.
    pub fn match_template(
        &self,
        template: &ChromaMatrix,
        search: &ChromaMatrix,
    ) -> Result<MatchResult> {
        for m in [template, search] {
            if m.rows() < PITCH_CLASSES {
                return Err(AmenError::InvalidMatrix {
                    rows: m.rows(),
                    cols: m.cols(),
                });
            }
        }
        if template.cols() == 0 {
            return Err(AmenError::InvalidMatrix {
                rows: template.rows(),
                cols: 0,
            });
        }

        let m = template.cols();
        let n = search.cols();
        if m > n {
            return Err(AmenError::SearchWindowTooShort {
                template_frames: m,
                search_frames: n,
            });
        }

        let template_norm = normalize(template);
        let search_norm = normalize(search);

        let method = match self.method {
            CorrelationMethod::Auto => choose_method(n, m),
            other => other,
        };

        log::debug!(
            "Correlating template {}x{} against search {}x{} ({:?})",
            template.rows(),
            m,
            search.rows(),
            n,
            method
        );

        let aggregate = match method {
            CorrelationMethod::Fft => aggregate_fft(&template_norm, &search_norm, m, n),
            _ => aggregate_direct(&template_norm, &search_norm, m, n),
        };

        let (offset, raw_score) = first_argmax(&aggregate);
        let score = raw_score / m as f64 / PITCH_CLASSES as f64;

        log::debug!(
            "Best offset {} of {}: raw {:.3}, score {:.4}",
            offset,
            aggregate.len(),
            raw_score,
            score
        );

        Ok(MatchResult {
            offset,
            raw_score,
            score,
        })
    }
}

/// Standardise a matrix with its global mean and population standard deviation.
///
/// Returns row-major `f64` values.
pub fn normalize(matrix: &ChromaMatrix) -> Vec<f64> {
    let (mean, std) = matrix.mean_std();
    let denom = std + NORMALIZATION_EPSILON;
    matrix
        .as_slice()
        .iter()
        .map(|&v| (v as f64 - mean) / denom)
        .collect()
}

/// Valid-mode correlation: `out[k] = sum_j template[j] * search[k + j]`
pub fn correlate_valid(search: &[f64], template: &[f64]) -> Vec<f64> {
    if template.is_empty() || template.len() > search.len() {
        return Vec::new();
    }
    search
        .windows(template.len())
        .map(|w| w.iter().zip(template).map(|(s, t)| s * t).sum::<f64>())
        .collect()
}

fn aggregate_direct(template: &[f64], search: &[f64], m: usize, n: usize) -> Vec<f64> {
    let per_row: Vec<Vec<f64>> = (0..PITCH_CLASSES)
        .into_par_iter()
        .map(|r| correlate_valid(&search[r * n..(r + 1) * n], &template[r * m..(r + 1) * m]))
        .collect();

    // Sum in row order so the result does not depend on scheduling
    let mut aggregate = vec![0.0; n - m + 1];
    for row in &per_row {
        for (acc, v) in aggregate.iter_mut().zip(row) {
            *acc += v;
        }
    }
    aggregate
}

fn aggregate_fft(template: &[f64], search: &[f64], m: usize, n: usize) -> Vec<f64> {
    let size = (n + m - 1).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let spectra: Vec<Vec<Complex<f64>>> = (0..PITCH_CLASSES)
        .into_par_iter()
        .map(|r| {
            let mut s = padded(&search[r * n..(r + 1) * n], size);
            let mut t = padded(&template[r * m..(r + 1) * m], size);
            forward.process(&mut s);
            forward.process(&mut t);
            s.iter().zip(&t).map(|(a, b)| a * b.conj()).collect()
        })
        .collect();

    // Correlation is linear, so the rows can be summed before one inverse transform
    let mut total = vec![Complex::new(0.0, 0.0); size];
    for spectrum in &spectra {
        for (acc, v) in total.iter_mut().zip(spectrum) {
            *acc += v;
        }
    }
    inverse.process(&mut total);

    let scale = 1.0 / size as f64;
    total[..n - m + 1].iter().map(|c| c.re * scale).collect()
}

fn padded(values: &[f64], size: usize) -> Vec<Complex<f64>> {
    let mut buffer: Vec<Complex<f64>> = values.iter().map(|&v| Complex::new(v, 0.0)).collect();
    buffer.resize(size, Complex::new(0.0, 0.0));
    buffer
}

/// Pick the cheaper correlation for an `n`-frame search and `m`-frame template
fn choose_method(n: usize, m: usize) -> CorrelationMethod {
    let direct_cost = (m * (n - m + 1)) as f64;
    let size = (n + m - 1).next_power_of_two() as f64;
    // Two forward transforms per row plus one shared inverse
    let fft_cost = size * size.log2() * 3.0;
    if direct_cost > fft_cost {
        CorrelationMethod::Fft
    } else {
        CorrelationMethod::Direct
    }
}

/// Index and value of the first maximum
fn first_argmax(values: &[f64]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    (best_idx, best)
}
