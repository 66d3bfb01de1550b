//! Media decoding
//!
//! Two backends turn a window of a recording into mono PCM at the analysis
//! rate: one drives the ffmpeg/ffprobe tools, the other decodes in-process
//! with Symphonia. Which one runs is decided once from [`Capabilities`].

mod ffmpeg;
mod native;
mod resample;
mod wav;

pub use ffmpeg::FfmpegBackend;
pub use native::NativeBackend;
pub use resample::resample_to_target;
pub use wav::{read_wav, read_wav_mono, write_wav_i16, PcmAudio};

use crate::error::{AmenError, Result};
use crate::settings::{BackendPreference, ToolsConfig};
use std::path::Path;
use std::process::{Command, Stdio};

/// Source of mono PCM for a time window of a media file
pub trait MediaBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Total duration of the media in seconds
    fn duration(&self, path: &Path) -> Result<f64>;

    /// Mono samples in `[-1, 1]` for `duration_s` seconds starting at `start_s`
    fn extract(&self, path: &Path, start_s: f64, duration_s: f64, sample_rate: u32) -> Result<Vec<f32>>;
}

/// External tools found on this machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub ffmpeg: bool,
    pub ffprobe: bool,
}

impl Capabilities {
    /// Run `<tool> -version` for each configured tool
    pub fn probe(tools: &ToolsConfig) -> Self {
        let caps = Self {
            ffmpeg: tool_runs(&tools.ffmpeg_path),
            ffprobe: tool_runs(&tools.ffprobe_path),
        };
        log::debug!("Tool probe: ffmpeg={} ffprobe={}", caps.ffmpeg, caps.ffprobe);
        caps
    }

    /// Both ffmpeg and ffprobe are usable
    pub fn has_ffmpeg_suite(&self) -> bool {
        self.ffmpeg && self.ffprobe
    }
}

fn tool_runs(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Pick the backend for `tools.backend` given what is installed
pub fn select_backend(tools: &ToolsConfig, caps: &Capabilities) -> Result<Box<dyn MediaBackend>> {
    let backend: Box<dyn MediaBackend> = match tools.backend {
        BackendPreference::Ffmpeg => {
            if !caps.ffmpeg {
                return Err(AmenError::MissingTool(tools.ffmpeg_path.clone()));
            }
            if !caps.ffprobe {
                return Err(AmenError::MissingTool(tools.ffprobe_path.clone()));
            }
            Box::new(FfmpegBackend::new(tools))
        }
        BackendPreference::Native => Box::new(NativeBackend::new()),
        BackendPreference::Auto => {
            if caps.has_ffmpeg_suite() {
                Box::new(FfmpegBackend::new(tools))
            } else {
                log::info!("ffmpeg/ffprobe not available, decoding in-process");
                Box::new(NativeBackend::new())
            }
        }
    };
    log::info!("Using {} media backend", backend.name());
    Ok(backend)
}

/// Average interleaved channels into one
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
