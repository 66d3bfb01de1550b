//! 16-bit WAV clips via hound

use super::{downmix, resample_to_target};
use crate::error::Result;
use std::path::Path;

/// Decoded PCM, interleaved when `channels > 1`
#[derive(Debug, Clone)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    pub fn to_mono(&self) -> Vec<f32> {
        downmix(&self.samples, self.channels as usize)
    }

    pub fn duration(&self) -> f64 {
        let frames = self.samples.len() / self.channels.max(1) as usize;
        frames as f64 / self.sample_rate as f64
    }
}

/// Read any integer or float WAV into `[-1, 1]` samples
pub fn read_wav(path: &Path) -> Result<PcmAudio> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    Ok(PcmAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Read a WAV file as mono audio at `target_rate`
pub fn read_wav_mono(path: &Path, target_rate: u32) -> Result<Vec<f32>> {
    let audio = read_wav(path)?;
    log::debug!(
        "Read {}: {} Hz, {} channel(s), {:.2}s",
        path.display(),
        audio.sample_rate,
        audio.channels,
        audio.duration()
    );
    resample_to_target(&audio.to_mono(), audio.sample_rate, target_rate)
}

/// Write mono samples as 16-bit PCM, clipping to `[-1, 1]`
pub fn write_wav_i16(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AmenError;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("amen-wav-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_write_read_round_trip() {
        let path = temp_path("roundtrip.wav");
        let samples: Vec<f32> = (0..2205).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        write_wav_i16(&path, &samples, 22050).unwrap();

        let back = read_wav_mono(&path, 22050).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.len(), samples.len());
        for (a, b) in samples.iter().zip(&back) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_stereo_is_mixed_and_resampled() {
        let path = temp_path("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..44100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let mono = read_wav_mono(&path, 22050).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(mono.len(), 22050);
        assert!((mono[11025] - 0.25).abs() < 5e-3);
    }

    #[test]
    fn test_missing_file() {
        let err = read_wav(&temp_path("missing.wav")).unwrap_err();
        assert!(matches!(err, AmenError::Wav(_)));
    }
}
