//! Analysis parameters for chroma extraction and matching
//!
//! Defaults: 22 050 Hz mono audio analysed with a 512-sample hop
//! (~23.2 ms per frame).

use crate::error::{AmenError, Result};
use serde::{Deserialize, Serialize};

/// Added to the standard deviation when normalising chroma matrices.
///
/// Changing it changes scores on near-silent audio.
pub const NORMALIZATION_EPSILON: f64 = 1e-10;

/// Number of pitch classes (C through B)
pub const PITCH_CLASSES: usize = 12;

/// Valid-mode correlation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Pick by estimated cost
    Auto,
    /// Sliding dot product
    Direct,
    /// Frequency-domain product
    Fft,
}

impl Default for CorrelationMethod {
    fn default() -> Self {
        CorrelationMethod::Auto
    }
}

/// Algorithm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmenConfig {
    // Audio processing
    pub sample_rate: u32,
    pub hop_length: usize,
    pub n_fft: usize,

    // Chroma filter bank
    pub min_freq: f32,
    pub max_freq: f32,
    pub ref_freq: f32,

    // Matching
    pub correlation: CorrelationMethod,
}

impl Default for AmenConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            hop_length: 512,
            n_fft: 4096,

            // C1 .. C8
            min_freq: 32.703,
            max_freq: 4186.0,
            ref_freq: 440.0,

            correlation: CorrelationMethod::Auto,
        }
    }
}

impl AmenConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AmenError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if self.hop_length == 0 {
            return Err(AmenError::InvalidConfig("hop_length must be > 0".into()));
        }
        if self.n_fft < self.hop_length {
            return Err(AmenError::InvalidConfig("n_fft must be >= hop_length".into()));
        }
        if self.min_freq <= 0.0 || self.min_freq >= self.max_freq {
            return Err(AmenError::InvalidConfig("min_freq must be in (0, max_freq)".into()));
        }
        if self.max_freq > self.sample_rate as f32 / 2.0 {
            return Err(AmenError::InvalidConfig("max_freq must not exceed Nyquist".into()));
        }
        Ok(())
    }

    /// Seconds covered by one hop
    pub fn frame_duration(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AmenConfig::default();
        assert!(config.validate().is_ok());
        // 512 / 22050 ~ 23.2 ms
        assert!((config.frame_duration() - 0.02322).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_inverted_frequency_range() {
        let config = AmenConfig {
            min_freq: 5000.0,
            max_freq: 100.0,
            ..AmenConfig::default()
        };
        assert!(matches!(config.validate(), Err(AmenError::InvalidConfig(_))));
    }

    #[test]
    fn test_correlation_method_serde() {
        let json = serde_json::to_string(&AmenConfig::default()).unwrap();
        assert!(json.contains("\"correlation\":\"auto\""));
        let parsed: AmenConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, AmenConfig::default());
    }
}
