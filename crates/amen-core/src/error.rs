//! Error taxonomy for detection and template handling

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AmenError>;

#[derive(Debug, Error)]
pub enum AmenError {
    #[error("Cannot build a template from empty audio")]
    EmptyAudio,

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Corrupt template {}: {reason}", .path.display())]
    CorruptTemplate { path: PathBuf, reason: String },

    #[error("Search window too short: template has {template_frames} frames, search has {search_frames}")]
    SearchWindowTooShort {
        template_frames: usize,
        search_frames: usize,
    },

    #[error("Chroma matrix needs at least 12 rows and one column, got {rows}x{cols}")]
    InvalidMatrix { rows: usize, cols: usize },

    #[error("Video file not found: {}", .0.display())]
    VideoNotFound(PathBuf),

    #[error("Video too short: {duration_s:.0}s, need at least {search_start_s:.0}s")]
    VideoTooShort { duration_s: f64, search_start_s: f64 },

    #[error("Failed to extract audio from video: {stderr}")]
    AudioExtraction { stderr: String },

    #[error("Failed to get video duration: {stderr}")]
    DurationQuery { stderr: String },

    #[error("Required tool not available: {0}")]
    MissingTool(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Template format error: {0}")]
    TemplateFormat(#[from] amen_tpl::TplError),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AmenError {
    /// Usage errors, missing inputs and missing prerequisites.
    ///
    /// Everything else is reported as an ordinary `detected=false` outcome.
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            AmenError::VideoNotFound(_)
                | AmenError::TemplateNotFound(_)
                | AmenError::CorruptTemplate { .. }
                | AmenError::MissingTool(_)
                | AmenError::InvalidConfig(_)
        )
    }
}
