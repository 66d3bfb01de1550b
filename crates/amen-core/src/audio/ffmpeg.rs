//! ffprobe/ffmpeg subprocess backend

use super::{read_wav_mono, MediaBackend};
use crate::error::{AmenError, Result};
use crate::settings::ToolsConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Decodes with external `ffmpeg` and `ffprobe` binaries
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegBackend {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg_path.clone(),
            ffprobe: tools.ffprobe_path.clone(),
        }
    }
}

/// Temporary WAV file, removed on drop
struct TempWav {
    path: PathBuf,
}

impl TempWav {
    fn new() -> Self {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("amen_extract_{}_{}.wav", std::process::id(), n));
        Self { path }
    }
}

impl Drop for TempWav {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

fn run(program: &str, command: &mut Command) -> Result<Output> {
    command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => AmenError::MissingTool(program.to_string()),
            _ => AmenError::Io(e),
        })
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn duration(&self, path: &Path) -> Result<f64> {
        let output = run(
            &self.ffprobe,
            Command::new(&self.ffprobe)
                .args([
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                ])
                .arg(path),
        )?;

        if !output.status.success() {
            return Err(AmenError::DurationQuery {
                stderr: stderr_text(&output),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let text = text.trim();
        text.parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| AmenError::DurationQuery {
                stderr: format!("unexpected ffprobe output '{}'", text),
            })
    }

    fn extract(&self, path: &Path, start_s: f64, duration_s: f64, sample_rate: u32) -> Result<Vec<f32>> {
        let temp = TempWav::new();
        let started = Instant::now();

        let output = run(
            &self.ffmpeg,
            Command::new(&self.ffmpeg)
                .args(["-y", "-v", "error", "-ss"])
                .arg(format!("{}", start_s))
                .arg("-i")
                .arg(path)
                .arg("-t")
                .arg(format!("{}", duration_s))
                .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
                .arg(sample_rate.to_string())
                .args(["-ac", "1"])
                .arg(&temp.path),
        )?;

        if !output.status.success() {
            return Err(AmenError::AudioExtraction {
                stderr: stderr_text(&output),
            });
        }

        let samples = read_wav_mono(&temp.path, sample_rate).map_err(|e| AmenError::AudioExtraction {
            stderr: format!("unreadable ffmpeg output: {}", e),
        })?;
        log::info!(
            "Extracted {:.1}s of audio in {:.2?}",
            samples.len() as f64 / sample_rate as f64,
            started.elapsed()
        );
        Ok(samples)
    }
}
