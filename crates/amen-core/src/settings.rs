//! Detector settings
//!
//! Provides TOML-based configuration for the search window and confidence
//! threshold, the template location, the analysis parameters used when
//! authoring templates, and the media tools used for decoding.

use crate::config::AmenConfig;
use crate::error::{AmenError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DetectorSettings {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub analysis: AmenConfig,
}

/// Search window, threshold and template location
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DetectionConfig {
    #[serde(default = "default_start_offset_minutes")]
    pub start_offset_minutes: u32,
    #[serde(default = "default_search_duration_minutes")]
    pub search_duration_minutes: u32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_template_dir")]
    pub template_dir: String,
    #[serde(default = "default_template_file")]
    pub template_file: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            start_offset_minutes: default_start_offset_minutes(),
            search_duration_minutes: default_search_duration_minutes(),
            min_confidence: default_min_confidence(),
            template_dir: default_template_dir(),
            template_file: default_template_file(),
        }
    }
}

fn default_start_offset_minutes() -> u32 {
    20
}
fn default_search_duration_minutes() -> u32 {
    90
}
fn default_min_confidence() -> f64 {
    0.50
}
fn default_template_dir() -> String {
    "config/audio_templates".to_string()
}
fn default_template_file() -> String {
    "amen_chroma.tpl".to_string()
}

impl DetectionConfig {
    /// Full path of the template file
    pub fn template_path(&self) -> PathBuf {
        Path::new(&self.template_dir).join(&self.template_file)
    }
}

/// Which media backend decodes audio
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// ffmpeg when available, otherwise the in-process decoder
    Auto,
    Ffmpeg,
    Native,
}

impl Default for BackendPreference {
    fn default() -> Self {
        BackendPreference::Auto
    }
}

/// External tool locations
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolsConfig {
    #[serde(default)]
    pub backend: BackendPreference,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}
fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

impl DetectorSettings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AmenError::InvalidConfig(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let settings: DetectorSettings = toml::from_str(&content)
            .map_err(|e| AmenError::InvalidConfig(format!("Failed to parse TOML config: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.detection.min_confidence;
        if !threshold.is_finite() {
            return Err(AmenError::InvalidConfig(format!(
                "min_confidence must be finite, got {}",
                threshold
            )));
        }
        if self.detection.template_file.is_empty() {
            return Err(AmenError::InvalidConfig("template_file must not be empty".into()));
        }
        self.analysis.validate()
    }
}
