//! Short-time Fourier chroma
//!
//! Frames are centred: the signal is zero-padded by `n_fft / 2` on both sides,
//! so frame `t` is centred on sample `t * hop` and a signal of `n` samples
//! yields `1 + n / hop` frames.

use super::filterbank::{chroma_filterbank, BinWeight};
use super::{ChromaMatrix, FeatureTransform};
use crate::config::{AmenConfig, PITCH_CLASSES};
use crate::error::Result;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Frames whose peak energy is below this stay all-zero instead of being scaled up
const SILENCE_FLOOR: f32 = 1e-10;

/// FFT + pitch-class filter bank chroma transform
pub struct StftChroma {
    config: AmenConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    filterbank: Vec<BinWeight>,
}

impl StftChroma {
    pub fn new(config: &AmenConfig) -> Result<Self> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        Ok(Self {
            config: config.clone(),
            fft,
            window: create_hann_window(config.n_fft),
            filterbank: chroma_filterbank(config),
        })
    }

    pub fn config(&self) -> &AmenConfig {
        &self.config
    }

    /// Number of columns produced for `num_samples` input samples
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples == 0 {
            0
        } else {
            1 + num_samples / self.config.hop_length
        }
    }

    fn frame_chroma(
        &self,
        samples: &[f32],
        frame_idx: usize,
        buffer: &mut [Complex<f32>],
    ) -> [f32; PITCH_CLASSES] {
        let n_fft = self.config.n_fft;
        let centre = (frame_idx * self.config.hop_length) as isize;
        let first = centre - (n_fft / 2) as isize;

        for (i, slot) in buffer.iter_mut().enumerate() {
            let idx = first + i as isize;
            let sample = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(buffer);

        let mut chroma = [0.0f32; PITCH_CLASSES];
        for w in &self.filterbank {
            chroma[w.pitch_class] += w.weight * buffer[w.bin].norm_sqr();
        }

        // Peak-normalise each frame
        let peak = chroma.iter().cloned().fold(0.0f32, f32::max);
        if peak > SILENCE_FLOOR {
            for v in chroma.iter_mut() {
                *v /= peak;
            }
        } else {
            chroma = [0.0; PITCH_CLASSES];
        }

        chroma
    }
}

impl FeatureTransform for StftChroma {
    fn hop_length(&self) -> usize {
        self.config.hop_length
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn transform(&self, samples: &[f32]) -> Result<ChromaMatrix> {
        let num_frames = self.num_frames(samples.len());
        let n_fft = self.config.n_fft;

        let columns: Vec<[f32; PITCH_CLASSES]> = (0..num_frames)
            .into_par_iter()
            .map_init(
                || vec![Complex::new(0.0f32, 0.0); n_fft],
                |buffer, t| self.frame_chroma(samples, t, buffer),
            )
            .collect();

        log::debug!(
            "Chroma: {} samples -> {} frames (hop {}, n_fft {})",
            samples.len(),
            num_frames,
            self.config.hop_length,
            n_fft
        );

        Ok(ChromaMatrix::from_columns(&columns))
    }

    fn algorithm_id(&self) -> &str {
        "CHROMA-STFT"
    }

    fn algorithm_params(&self) -> String {
        serde_json::to_string(&self.config).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Create Hann window
fn create_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}
