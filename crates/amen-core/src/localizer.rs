//! Frame offsets to absolute times, and the detect/no-detect decision

use crate::error::{AmenError, Result};
use crate::matching::MatchResult;
use crate::timestamp::format_timestamp;
use serde::{Deserialize, Serialize};

/// Default minimum confidence for a detection
pub const DEFAULT_THRESHOLD: f64 = 0.50;

/// Portion of a recording to search, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWindow {
    /// Offset from the start of the recording
    pub offset_s: f64,
    /// Length of the window, clamped to the recording
    pub duration_s: f64,
    /// Total length of the recording
    pub media_duration_s: f64,
}

impl SearchWindow {
    /// Clamp `requested_duration_s` so the window ends inside the recording
    pub fn new(offset_s: f64, requested_duration_s: f64, media_duration_s: f64) -> Result<Self> {
        let duration_s = requested_duration_s.min(media_duration_s - offset_s);
        if !(duration_s > 0.0) {
            return Err(AmenError::VideoTooShort {
                duration_s: media_duration_s,
                search_start_s: offset_s,
            });
        }
        Ok(Self {
            offset_s,
            duration_s,
            media_duration_s,
        })
    }

    /// Window starting `start_minutes` in and lasting up to `duration_minutes`
    pub fn from_minutes(start_minutes: u32, duration_minutes: u32, media_duration_s: f64) -> Result<Self> {
        Self::new(
            start_minutes as f64 * 60.0,
            duration_minutes as f64 * 60.0,
            media_duration_s,
        )
    }

    pub fn end_s(&self) -> f64 {
        self.offset_s + self.duration_s
    }
}

/// Start time of frame `frame` relative to the first frame
pub fn frame_to_seconds(frame: usize, hop_length: usize, sample_rate: u32) -> f64 {
    frame as f64 * hop_length as f64 / sample_rate as f64
}

/// Result of one detection run
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    Detected {
        start_time: f64,
        end_time: f64,
        confidence: f64,
    },
    NotDetected {
        reason: String,
        best_score: Option<f64>,
        best_time: Option<f64>,
    },
}

impl DetectionOutcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, DetectionOutcome::Detected { .. })
    }
}

/// Converts a match into absolute times and applies the confidence threshold
#[derive(Debug, Clone, Copy)]
pub struct Localizer {
    threshold: f64,
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Localizer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `search_start_s` is the absolute time of search frame 0.
    ///
    /// A score equal to the threshold counts as detected.
    pub fn localize(
        &self,
        result: &MatchResult,
        search_start_s: f64,
        hop_length: usize,
        sample_rate: u32,
        template_duration_s: f64,
    ) -> DetectionOutcome {
        let start_time = search_start_s + frame_to_seconds(result.offset, hop_length, sample_rate);
        let end_time = start_time + template_duration_s;

        if result.score >= self.threshold {
            log::info!(
                "Detected motif {:.2}s - {:.2}s (confidence {:.3})",
                start_time,
                end_time,
                result.score
            );
            DetectionOutcome::Detected {
                start_time,
                end_time,
                confidence: result.score,
            }
        } else {
            log::info!(
                "Best candidate ends at {:.2}s with score {:.3}, below threshold {:.2}",
                end_time,
                result.score,
                self.threshold
            );
            DetectionOutcome::NotDetected {
                reason: format!(
                    "Best match score {:.2} below threshold {:.2}",
                    result.score, self.threshold
                ),
                best_score: Some(result.score),
                best_time: Some(end_time),
            }
        }
    }
}

/// Flat, serialisable form of a [`DetectionOutcome`] or a failure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionReport {
    pub detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amen_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amen_start_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amen_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amen_end_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_time: Option<String>,
}

impl DetectionReport {
    /// Report for a run that failed before producing a match
    pub fn failure(error: &AmenError) -> Self {
        Self {
            detected: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

impl From<&DetectionOutcome> for DetectionReport {
    fn from(outcome: &DetectionOutcome) -> Self {
        match outcome {
            DetectionOutcome::Detected {
                start_time,
                end_time,
                confidence,
            } => Self {
                detected: true,
                amen_start: Some(format_timestamp(*start_time)),
                amen_start_seconds: Some(start_time.max(0.0) as u64),
                amen_end: Some(format_timestamp(*end_time)),
                amen_end_seconds: Some(end_time.max(0.0) as u64),
                confidence: Some(*confidence),
                ..Self::default()
            },
            DetectionOutcome::NotDetected {
                reason,
                best_score,
                best_time,
            } => Self {
                detected: false,
                error: Some(reason.clone()),
                best_score: *best_score,
                best_time: best_time.map(format_timestamp),
                ..Self::default()
            },
        }
    }
}
