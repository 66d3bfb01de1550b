//! Amen Core - chroma template detection
//!
//! Finds a short reference motif inside long recordings by sliding a
//! 12-row pitch-class template over the chroma of a search window and
//! scoring normalised cross-correlation.

pub mod audio;
pub mod chroma;
pub mod config;
pub mod detector;
pub mod error;
pub mod localizer;
pub mod matching;
pub mod settings;
pub mod template;
pub mod timestamp;

pub use audio::{select_backend, Capabilities, MediaBackend};
pub use chroma::{ChromaMatrix, FeatureTransform, StftChroma};
pub use config::{AmenConfig, CorrelationMethod};
pub use detector::AmenDetector;
pub use error::{AmenError, Result};
pub use localizer::{DetectionOutcome, DetectionReport, Localizer, SearchWindow};
pub use matching::{MatchResult, Matcher};
pub use settings::DetectorSettings;
pub use template::Template;
pub use timestamp::{format_timestamp, parse_timestamp};

/// Build a template from a mono clip already at `config.sample_rate`
pub fn build_template(samples: &[f32], config: &AmenConfig) -> Result<Template> {
    let transform = StftChroma::new(config)?;
    Template::build(samples, config.sample_rate, &transform)
}
