//! Band-limited sample-rate conversion with rubato

use crate::error::{AmenError, Result};
use rubato::{FftFixedIn, Resampler};

/// Input frames handed to the resampler per call
const CHUNK_SIZE: usize = 1024;

fn resample_error(e: impl std::fmt::Display) -> AmenError {
    AmenError::Resample(e.to_string())
}

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// Content above the lower of the two Nyquist frequencies is filtered out.
/// The output is aligned with the input (the filter delay is removed) and
/// holds `round(len * to_rate / from_rate)` samples.
pub fn resample_to_target(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AmenError::InvalidConfig(format!(
            "cannot resample {} Hz to {} Hz",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 2, 1)
        .map_err(resample_error)?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let chunk = resampler
            .process(&[&samples[pos..pos + n]], None)
            .map_err(resample_error)?;
        output.extend_from_slice(&chunk[0]);
        pos += n;
    }
    if pos < samples.len() {
        let chunk = resampler
            .process_partial(Some(&[&samples[pos..]]), None)
            .map_err(resample_error)?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the filter tail
    while output.len() < expected + delay {
        let chunk = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(resample_error)?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    log::debug!(
        "Resampled {} samples at {} Hz to {} at {} Hz",
        samples.len(),
        from_rate,
        output.len(),
        to_rate
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        (0..(seconds * sample_rate as f32) as usize)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    /// RMS over the middle half, away from edge transients
    fn mid_rms(samples: &[f32]) -> f32 {
        let mid = &samples[samples.len() / 4..samples.len() * 3 / 4];
        (mid.iter().map(|v| v * v).sum::<f32>() / mid.len() as f32).sqrt()
    }

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(resample_to_target(&samples, 22050, 22050).unwrap(), samples);
    }

    #[test]
    fn test_downsample_length() {
        let samples = vec![0.0; 44100];
        assert_eq!(resample_to_target(&samples, 44100, 22050).unwrap().len(), 22050);
        let samples = vec![0.0; 48000];
        assert_eq!(resample_to_target(&samples, 48000, 22050).unwrap().len(), 22050);
    }

    #[test]
    fn test_tone_above_target_nyquist_is_removed() {
        let input = sine(19_000.0, 1.0, 44100);
        let output = resample_to_target(&input, 44100, 22050).unwrap();

        let ratio = mid_rms(&output) / mid_rms(&input);
        assert!(ratio < 0.05, "19 kHz leaked through with ratio {}", ratio);
    }

    #[test]
    fn test_tone_in_band_is_kept() {
        let input = sine(1000.0, 1.0, 48000);
        let output = resample_to_target(&input, 48000, 22050).unwrap();

        let ratio = mid_rms(&output) / mid_rms(&input);
        assert!((ratio - 1.0).abs() < 0.05, "in-band ratio {}", ratio);
    }

    #[test]
    fn test_output_is_time_aligned() {
        // A 1 kHz tone keeps its phase: sample k of the output sits at k / 22050 s
        let input = sine(1000.0, 1.0, 44100);
        let output = resample_to_target(&input, 44100, 22050).unwrap();
        let expected = sine(1000.0, 1.0, 22050);

        for k in 5000..5100 {
            assert!((output[k] - expected[k]).abs() < 0.05, "sample {}", k);
        }
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(resample_to_target(&[0.0], 0, 22050).is_err());
    }
}
