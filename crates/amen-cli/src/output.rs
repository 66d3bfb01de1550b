//! JSON output formatting

use amen_core::{DetectionReport, Template};
use serde::Serialize;
use std::path::Path;

/// What `amengen` produced
#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub status: &'static str,
    pub template_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_file: Option<String>,
    pub source: String,
    pub rows: usize,
    pub cols: usize,
    pub hop_length: usize,
    pub sample_rate: u32,
    pub duration_seconds: f64,
    pub processing_time_seconds: f64,
}

impl TemplateSummary {
    pub fn new(template: &Template, template_file: &Path, clip_file: Option<&Path>, elapsed_s: f64) -> Self {
        Self {
            status: "success",
            template_file: template_file.display().to_string(),
            clip_file: clip_file.map(|p| p.display().to_string()),
            source: template.metadata().source_filename.clone(),
            rows: template.chroma().rows(),
            cols: template.chroma().cols(),
            hop_length: template.hop_length(),
            sample_rate: template.sample_rate(),
            duration_seconds: template.duration(),
            processing_time_seconds: elapsed_s,
        }
    }
}

/// Print a detection report as one JSON object
pub fn print_json_report(report: &DetectionReport) {
    print_json(report);
}

/// Print any serialisable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amen_core::{AmenConfig, ChromaMatrix};
    use amen_tpl::TplMetadata;

    #[test]
    fn test_template_summary_fields() {
        let chroma = ChromaMatrix::new(12, 861, vec![0.0; 12 * 861]).unwrap();
        let metadata = TplMetadata::new("CHROMA-STFT", "{}".into(), "match.mp4".into());
        let config = AmenConfig::default();
        let template = Template::from_parts(chroma, config.hop_length, config.sample_rate, metadata).unwrap();

        let summary = TemplateSummary::new(&template, Path::new("out/amen_chroma.tpl"), None, 1.5);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["rows"], 12);
        assert_eq!(json["cols"], 861);
        assert_eq!(json["source"], "match.mp4");
        assert!((json["duration_seconds"].as_f64().unwrap() - 19.99).abs() < 0.01);
        assert!(json.get("clip_file").is_none());
    }
}
