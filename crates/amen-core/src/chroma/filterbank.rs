//! FFT-bin to pitch-class mapping

use crate::config::{AmenConfig, PITCH_CLASSES};

/// Width of the Gaussian around each semitone centre, in semitones
const SEMITONE_SIGMA: f32 = 0.25;

/// One FFT bin's contribution to a pitch class
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BinWeight {
    pub bin: usize,
    pub pitch_class: usize,
    pub weight: f32,
}

/// Map every FFT bin inside `[min_freq, max_freq]` to its nearest pitch class.
///
/// All octaves of a pitch class fold onto the same row; bins between two
/// semitones are down-weighted.
pub(crate) fn chroma_filterbank(config: &AmenConfig) -> Vec<BinWeight> {
    let sample_rate = config.sample_rate as f32;
    let n_fft = config.n_fft;

    (1..=n_fft / 2)
        .filter_map(|bin| {
            let freq = bin as f32 * sample_rate / n_fft as f32;
            if freq < config.min_freq || freq > config.max_freq {
                return None;
            }

            // MIDI note number; 60 is C4, so C maps to class 0
            let midi = 69.0 + 12.0 * (freq / config.ref_freq).log2();
            let nearest = midi.round();
            let deviation = midi - nearest;
            let weight = (-0.5 * (deviation / SEMITONE_SIGMA).powi(2)).exp();
            let pitch_class = (nearest as i64).rem_euclid(PITCH_CLASSES as i64) as usize;

            Some(BinWeight {
                bin,
                pitch_class,
                weight,
            })
        })
        .collect()
}
