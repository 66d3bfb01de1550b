//! In-process decoding with Symphonia

use super::{downmix, resample_to_target, MediaBackend};
use crate::error::{AmenError, Result};
use std::path::Path;
use std::time::Instant;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};

/// Decodes the first audio track of a container without external tools
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

struct OpenTrack {
    format: Box<dyn FormatReader>,
    track_id: u32,
    params: CodecParameters,
}

fn open(path: &Path) -> std::result::Result<OpenTrack, String> {
    let file = std::fs::File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &MetadataOptions::default())
        .map_err(|e| format!("unrecognised media {}: {}", path.display(), e))?;
    let format = probed.format;

    let (track_id, params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| format!("no audio track in {}", path.display()))?;
        (track.id, track.codec_params.clone())
    };

    Ok(OpenTrack {
        format,
        track_id,
        params,
    })
}

fn seconds(time: Time) -> f64 {
    time.seconds as f64 + time.frac
}

/// Track timestamp to a frame index at `sample_rate`
fn ts_to_frames(ts: u64, time_base: Option<TimeBase>, sample_rate: u32) -> u64 {
    match time_base {
        Some(tb) => (seconds(tb.calc_time(ts)) * sample_rate as f64).round() as u64,
        None => ts,
    }
}

fn extraction(stderr: impl Into<String>) -> AmenError {
    AmenError::AudioExtraction { stderr: stderr.into() }
}

impl MediaBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn duration(&self, path: &Path) -> Result<f64> {
        let mut track = open(path).map_err(|stderr| AmenError::DurationQuery { stderr })?;
        let params = &track.params;

        match (params.n_frames, params.time_base, params.sample_rate) {
            (Some(n), Some(tb), _) => return Ok(seconds(tb.calc_time(n))),
            (Some(n), None, Some(sr)) => return Ok(n as f64 / sr as f64),
            _ => {}
        }

        // No frame count in the header; add up packet durations
        let time_base = params.time_base;
        let sample_rate = params.sample_rate;
        let mut total: u64 = 0;
        loop {
            match track.format.next_packet() {
                Ok(packet) if packet.track_id() == track.track_id => total += packet.dur(),
                Ok(_) => {}
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(AmenError::DurationQuery { stderr: e.to_string() }),
            }
        }

        match (time_base, sample_rate) {
            (Some(tb), _) => Ok(seconds(tb.calc_time(total))),
            (None, Some(sr)) => Ok(total as f64 / sr as f64),
            _ => Err(AmenError::DurationQuery {
                stderr: format!("no timing information in {}", path.display()),
            }),
        }
    }

    fn extract(&self, path: &Path, start_s: f64, duration_s: f64, sample_rate: u32) -> Result<Vec<f32>> {
        let started = Instant::now();
        let mut track = open(path).map_err(extraction)?;
        let source_rate = track
            .params
            .sample_rate
            .ok_or_else(|| extraction(format!("unknown sample rate in {}", path.display())))?;
        let time_base = track.params.time_base;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.params, &DecoderOptions::default())
            .map_err(|e| extraction(e.to_string()))?;

        if start_s > 0.0 {
            let seek = track.format.seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::new(start_s.trunc() as u64, start_s.fract()),
                    track_id: Some(track.track_id),
                },
            );
            match seek {
                Ok(_) => decoder.reset(),
                Err(e) => log::debug!("Seek failed ({}), decoding from the start", e),
            }
        }

        let first_frame = (start_s * source_rate as f64).round() as u64;
        let wanted = (duration_s * source_rate as f64).round() as usize;
        let mut mono: Vec<f32> = Vec::with_capacity(wanted);

        while mono.len() < wanted {
            let packet = match track.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(extraction(e.to_string())),
            };
            if packet.track_id() != track.track_id {
                continue;
            }
            let packet_frame = ts_to_frames(packet.ts(), time_base, source_rate);

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(extraction(e.to_string())),
            };

            let spec = *decoded.spec();
            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);
            let frames = downmix(buf.samples(), spec.channels.count());

            let skip = first_frame.saturating_sub(packet_frame).min(frames.len() as u64) as usize;
            let take = (wanted - mono.len()).min(frames.len() - skip);
            mono.extend_from_slice(&frames[skip..skip + take]);
        }

        log::info!(
            "Decoded {:.1}s of audio in {:.2?}",
            mono.len() as f64 / source_rate as f64,
            started.elapsed()
        );
        resample_to_target(&mono, source_rate, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Three-second sawtooth at 8 kHz: frame `i` holds `(i % 8000) / 8000 - 0.5`
    fn write_sawtooth(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("amen-native-{}-{}", std::process::id(), name));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..24_000 {
            let v = ((i % 8000) as f32 / 8000.0 - 0.5) * 32767.0;
            writer.write_sample(v as i16).unwrap();
            writer.write_sample(v as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_duration_from_header() {
        let path = write_sawtooth("duration.wav");
        let duration = NativeBackend::new().duration(&path);
        std::fs::remove_file(&path).ok();
        assert!((duration.unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_extract_window() {
        let path = write_sawtooth("window.wav");
        let samples = NativeBackend::new().extract(&path, 1.0, 0.5, 8000);
        std::fs::remove_file(&path).ok();

        let samples = samples.unwrap();
        assert_eq!(samples.len(), 4000);
        assert!((samples[0] + 0.5).abs() < 1e-3);
        assert!((samples[3999] - (3999.0 / 8000.0 - 0.5)).abs() < 1e-3);
    }

    #[test]
    fn test_extract_clamps_at_end_and_resamples() {
        let path = write_sawtooth("tail.wav");
        let samples = NativeBackend::new().extract(&path, 2.5, 1.0, 4000);
        std::fs::remove_file(&path).ok();
        assert_eq!(samples.unwrap().len(), 2000);
    }

    #[test]
    fn test_unreadable_file() {
        let path = std::env::temp_dir().join(format!("amen-native-{}-junk.mp4", std::process::id()));
        std::fs::write(&path, b"definitely not a media file").unwrap();
        let backend = NativeBackend::new();
        let duration = backend.duration(&path);
        let extract = backend.extract(&path, 0.0, 1.0, 22050);
        std::fs::remove_file(&path).ok();

        assert!(matches!(duration, Err(AmenError::DurationQuery { .. })));
        assert!(matches!(extract, Err(AmenError::AudioExtraction { .. })));
    }
}
