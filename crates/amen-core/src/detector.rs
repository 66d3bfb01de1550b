//! End-to-end detection: window, decode, chroma, match, decide

use crate::audio::MediaBackend;
use crate::chroma::{FeatureTransform, StftChroma};
use crate::config::AmenConfig;
use crate::error::{AmenError, Result};
use crate::localizer::{DetectionOutcome, DetectionReport, Localizer, SearchWindow, DEFAULT_THRESHOLD};
use crate::matching::Matcher;
use crate::template::Template;
use std::path::Path;
use std::time::Instant;

/// Analysis configuration matching the one a template was built with.
///
/// Uses the parameters recorded in the template metadata when they parse,
/// with hop length and sample rate always taken from the template header.
pub fn analysis_config(template: &Template) -> AmenConfig {
    let recorded = serde_json::from_str::<AmenConfig>(&template.metadata().algorithm_params).ok();
    let base = recorded.unwrap_or_default();
    let nyquist = template.sample_rate() as f32 / 2.0;

    AmenConfig {
        sample_rate: template.sample_rate(),
        hop_length: template.hop_length(),
        n_fft: base.n_fft.max(template.hop_length()),
        max_freq: base.max_freq.min(nyquist),
        ..base
    }
}

/// Locates one template inside recordings
pub struct AmenDetector {
    template: Template,
    transform: Box<dyn FeatureTransform>,
    backend: Box<dyn MediaBackend>,
    matcher: Matcher,
    localizer: Localizer,
}

impl AmenDetector {
    pub fn new(template: Template, backend: Box<dyn MediaBackend>) -> Result<Self> {
        let config = analysis_config(&template);
        let transform = StftChroma::new(&config)?;
        Ok(Self {
            template,
            transform: Box::new(transform),
            backend,
            matcher: Matcher::new(config.correlation),
            localizer: Localizer::new(DEFAULT_THRESHOLD),
        })
    }

    /// Minimum confidence for a detection
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.localizer = Localizer::new(threshold);
        self
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the feature transform; it must run at the template's hop and rate
    pub fn with_transform(mut self, transform: Box<dyn FeatureTransform>) -> Result<Self> {
        if transform.hop_length() != self.template.hop_length()
            || transform.sample_rate() != self.template.sample_rate()
        {
            return Err(AmenError::InvalidConfig(format!(
                "transform runs at hop {} / {} Hz but the template was built at hop {} / {} Hz",
                transform.hop_length(),
                transform.sample_rate(),
                self.template.hop_length(),
                self.template.sample_rate()
            )));
        }
        self.transform = transform;
        Ok(self)
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn threshold(&self) -> f64 {
        self.localizer.threshold()
    }

    /// Search `video` from `start_offset_minutes` for up to `search_duration_minutes`
    pub fn detect(
        &self,
        video: &Path,
        start_offset_minutes: u32,
        search_duration_minutes: u32,
    ) -> Result<DetectionOutcome> {
        if !video.exists() {
            return Err(AmenError::VideoNotFound(video.to_path_buf()));
        }

        let media_duration = self.backend.duration(video)?;
        let window = SearchWindow::from_minutes(start_offset_minutes, search_duration_minutes, media_duration)?;
        log::info!(
            "Searching {} from {:.0}s for {:.0}s (media is {:.0}s)",
            video.display(),
            window.offset_s,
            window.duration_s,
            window.media_duration_s
        );

        let sample_rate = self.template.sample_rate();
        let samples = self
            .backend
            .extract(video, window.offset_s, window.duration_s, sample_rate)?;
        if samples.is_empty() {
            return Err(AmenError::AudioExtraction {
                stderr: "no audio decoded in the search window".into(),
            });
        }

        let started = Instant::now();
        let search = self.transform.transform(&samples)?;
        log::info!(
            "Search chroma: {} frames in {:.2?}",
            search.cols(),
            started.elapsed()
        );

        let started = Instant::now();
        let result = self.matcher.match_template(self.template.chroma(), &search)?;
        log::info!(
            "Best offset {} (score {:.3}) in {:.2?}",
            result.offset,
            result.score,
            started.elapsed()
        );

        Ok(self.localizer.localize(
            &result,
            window.offset_s,
            self.template.hop_length(),
            sample_rate,
            self.template.duration(),
        ))
    }

    /// Like [`detect`](Self::detect), with every error folded into the report
    pub fn run(
        &self,
        video: &Path,
        start_offset_minutes: u32,
        search_duration_minutes: u32,
    ) -> DetectionReport {
        match self.detect(video, start_offset_minutes, search_duration_minutes) {
            Ok(outcome) => DetectionReport::from(&outcome),
            Err(e) => {
                log::warn!("Detection failed: {}", e);
                DetectionReport::failure(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chroma::ChromaMatrix;
    use amen_tpl::TplMetadata;
    use std::path::PathBuf;

    const SR: u32 = 22050;

    /// Serves a fixed waveform at `SR`
    struct MemoryBackend {
        samples: Vec<f32>,
    }

    impl MediaBackend for MemoryBackend {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn duration(&self, _path: &Path) -> Result<f64> {
            Ok(self.samples.len() as f64 / SR as f64)
        }

        fn extract(&self, _path: &Path, start_s: f64, duration_s: f64, sample_rate: u32) -> Result<Vec<f32>> {
            assert_eq!(sample_rate, SR);
            let start = ((start_s * SR as f64) as usize).min(self.samples.len());
            let end = (((start_s + duration_s) * SR as f64) as usize).min(self.samples.len());
            Ok(self.samples[start..end].to_vec())
        }
    }

    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> f32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0
        }
    }

    fn noise(seconds: f32, amplitude: f32, seed: u64) -> Vec<f32> {
        let mut rng = Lcg(seed);
        (0..(seconds * SR as f32) as usize)
            .map(|_| rng.next() * amplitude)
            .collect()
    }

    /// Half-second notes walking through a short melody
    fn motif(seconds: f32) -> Vec<f32> {
        let notes = [261.63, 329.63, 392.0, 220.0, 293.66, 349.23, 246.94, 523.25];
        (0..(seconds * SR as f32) as usize)
            .map(|i| {
                let t = i as f32 / SR as f32;
                let f = notes[(t * 2.0) as usize % notes.len()];
                0.3 * (2.0 * std::f32::consts::PI * f * t).sin()
            })
            .collect()
    }

    fn placeholder_video(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("amen-detector-{}-{}", std::process::id(), name));
        std::fs::write(&path, b"").unwrap();
        path
    }

    fn template(seconds: f32) -> Template {
        let transform = StftChroma::new(&AmenConfig::default()).unwrap();
        Template::build(&motif(seconds), SR, &transform).unwrap()
    }

    fn detector(samples: Vec<f32>, template: Template) -> AmenDetector {
        AmenDetector::new(template, Box::new(MemoryBackend { samples })).unwrap()
    }

    #[test]
    fn test_detects_motif_inside_window() {
        let mut samples = noise(150.0, 0.02, 7);
        let start = 100 * SR as usize;
        for (i, s) in motif(4.0).into_iter().enumerate() {
            samples[start + i] += s;
        }

        let video = placeholder_video("hit.mp4");
        let outcome = detector(samples, template(4.0)).detect(&video, 1, 1);
        std::fs::remove_file(&video).ok();

        match outcome.unwrap() {
            DetectionOutcome::Detected {
                start_time,
                end_time,
                confidence,
            } => {
                assert!((start_time - 100.0).abs() < 0.1, "start {}", start_time);
                assert!((end_time - start_time - 4.0).abs() < 0.1);
                assert!(confidence >= 0.5, "confidence {}", confidence);
            }
            other => panic!("expected detection, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_video() {
        let det = detector(noise(10.0, 0.1, 1), template(2.0));
        let missing = std::env::temp_dir().join("amen-detector-does-not-exist.mp4");

        let err = det.detect(&missing, 0, 1).unwrap_err();
        assert!(matches!(err, AmenError::VideoNotFound(_)));
        assert!(det.run(&missing, 0, 1).error.unwrap().starts_with("Video file not found"));
    }

    #[test]
    fn test_video_shorter_than_offset() {
        let video = placeholder_video("short.mp4");
        let report = detector(noise(30.0, 0.1, 2), template(2.0)).run(&video, 1, 90);
        std::fs::remove_file(&video).ok();

        assert!(!report.detected);
        assert!(report.error.unwrap().starts_with("Video too short: 30s"));
    }

    #[test]
    fn test_window_shorter_than_template() {
        let video = placeholder_video("tail.mp4");
        let det = detector(noise(62.0, 0.1, 3), template(4.0));
        let err = det.detect(&video, 1, 90).unwrap_err();
        std::fs::remove_file(&video).ok();

        assert!(matches!(err, AmenError::SearchWindowTooShort { .. }));
        assert!(!err.is_hard_failure());
    }

    #[test]
    fn test_transform_must_match_template() {
        let det = detector(Vec::new(), template(1.0));
        let other = StftChroma::new(&AmenConfig {
            hop_length: 256,
            ..AmenConfig::default()
        })
        .unwrap();
        assert!(matches!(
            det.with_transform(Box::new(other)),
            Err(AmenError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_analysis_config_follows_template() {
        let chroma = ChromaMatrix::new(12, 4, vec![0.5; 48]).unwrap();
        let tpl = Template::from_parts(chroma, 1024, 16000, TplMetadata::new("CHROMA", "{}".into(), String::new())).unwrap();
        let config = analysis_config(&tpl);

        assert_eq!(config.hop_length, 1024);
        assert_eq!(config.sample_rate, 16000);
        assert!(config.max_freq <= 8000.0);
        assert!(config.validate().is_ok());
    }
}
