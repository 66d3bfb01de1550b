//! amenfind - Locate the reference motif in a recording
//!
//! Usage:
//!   amenfind <video> [start_offset_minutes] [search_duration_minutes] [template_dir]
//!   amenfind --config <path> <video>

use amen_cli::output::print_json_report;
use amen_core::settings::BackendPreference;
use amen_core::{
    select_backend, AmenDetector, AmenError, Capabilities, DetectionReport, DetectorSettings, Template,
};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "amenfind")]
#[command(about = "Find the reference motif in a video", long_about = None)]
struct Args {
    /// Video or audio file to search
    video: PathBuf,

    /// Minutes into the recording where the search starts
    start_offset_minutes: Option<u32>,

    /// Minutes to search from the start offset
    search_duration_minutes: Option<u32>,

    /// Directory holding the template file
    template_dir: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum confidence for a detection
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Media decoding backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Ffmpeg,
    Native,
}

impl From<BackendArg> for BackendPreference {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => BackendPreference::Auto,
            BackendArg::Ffmpeg => BackendPreference::Ffmpeg,
            BackendArg::Native => BackendPreference::Native,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (stdout carries only the JSON report)
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    let (report, hard_failure) = match run_amenfind(&args) {
        Ok(report) => (report, false),
        Err(e) => {
            log::error!("{}", e);
            (DetectionReport::failure(&e), e.is_hard_failure())
        }
    };

    print_json_report(&report);

    if hard_failure {
        std::process::exit(1);
    }
    Ok(())
}

fn load_settings(args: &Args) -> amen_core::Result<DetectorSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            DetectorSettings::load(path)?
        }
        None => DetectorSettings::default(),
    };

    let detection = &mut settings.detection;
    if let Some(start) = args.start_offset_minutes {
        detection.start_offset_minutes = start;
    }
    if let Some(duration) = args.search_duration_minutes {
        detection.search_duration_minutes = duration;
    }
    if let Some(dir) = &args.template_dir {
        detection.template_dir = dir.clone();
    }
    if let Some(threshold) = args.threshold {
        detection.min_confidence = threshold;
    }
    if let Some(backend) = args.backend {
        settings.tools.backend = backend.into();
    }

    settings.validate()?;
    Ok(settings)
}

fn run_amenfind(args: &Args) -> amen_core::Result<DetectionReport> {
    if !args.video.exists() {
        return Err(AmenError::VideoNotFound(args.video.clone()));
    }

    let settings = load_settings(args)?;
    let detection = &settings.detection;

    let template_path = detection.template_path();
    let template = Template::load(&template_path)?;
    log::info!(
        "Loaded template {} ({} frames, {:.2}s)",
        template_path.display(),
        template.num_frames(),
        template.duration()
    );

    let caps = Capabilities::probe(&settings.tools);
    let backend = select_backend(&settings.tools, &caps)?;

    let detector = AmenDetector::new(template, backend)?.with_threshold(detection.min_confidence);
    let outcome = detector.detect(
        &args.video,
        detection.start_offset_minutes,
        detection.search_duration_minutes,
    )?;

    Ok(DetectionReport::from(&outcome))
}
