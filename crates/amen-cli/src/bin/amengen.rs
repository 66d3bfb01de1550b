//! amengen - Build a chroma template from a reference clip
//!
//! Usage:
//!   amengen <video> <start_ts> <end_ts> [output_dir]
//!   amengen --from-wav <clip.wav> [-o output_dir]

use amen_cli::authoring::author_template;
use amen_cli::output::{print_json, TemplateSummary};
use amen_core::audio::read_wav_mono;
use amen_core::{parse_timestamp, select_backend, Capabilities, DetectorSettings};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "amengen")]
#[command(about = "Generate a chroma template from a reference clip", long_about = None)]
struct Args {
    /// Video containing the reference clip
    #[arg(required_unless_present = "from_wav")]
    video: Option<PathBuf>,

    /// Clip start (HH:MM:SS or MM:SS)
    #[arg(required_unless_present = "from_wav")]
    start_ts: Option<String>,

    /// Clip end (HH:MM:SS or MM:SS)
    #[arg(required_unless_present = "from_wav")]
    end_ts: Option<String>,

    /// Output directory for the template
    output_dir: Option<PathBuf>,

    /// Build from an existing WAV clip instead of a video
    #[arg(long, conflicts_with_all = ["video", "start_ts", "end_ts"])]
    from_wav: Option<PathBuf>,

    /// Output directory (alternative to the positional argument)
    #[arg(short = 'o', long = "output-dir", conflicts_with = "output_dir")]
    output_dir_opt: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (clean JSON output for parsing)
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    run_amengen(&args)
}

fn run_amengen(args: &Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => DetectorSettings::load(path)?,
        None => DetectorSettings::default(),
    };
    let config = &settings.analysis;

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| args.output_dir_opt.clone())
        .unwrap_or_else(|| PathBuf::from(&settings.detection.template_dir));

    let start = Instant::now();

    let (samples, source, clip) = match &args.from_wav {
        Some(wav) => {
            if !wav.exists() {
                anyhow::bail!("Input file not found: {}", wav.display());
            }
            log::info!("Reading clip {}", wav.display());
            (read_wav_mono(wav, config.sample_rate)?, wav.as_path(), None)
        }
        None => {
            let (video, start_ts, end_ts) = match (&args.video, &args.start_ts, &args.end_ts) {
                (Some(v), Some(s), Some(e)) => (v, s, e),
                _ => anyhow::bail!("<video> <start_ts> <end_ts> are required without --from-wav"),
            };
            if !video.exists() {
                anyhow::bail!("Video file not found: {}", video.display());
            }

            let clip_start = parse_timestamp(start_ts)? as f64;
            let clip_end = parse_timestamp(end_ts)? as f64;
            if clip_end <= clip_start {
                anyhow::bail!("End time {} must be after start time {}", end_ts, start_ts);
            }

            let caps = Capabilities::probe(&settings.tools);
            let backend = select_backend(&settings.tools, &caps)?;
            log::info!(
                "Extracting {:.0}s - {:.0}s from {}",
                clip_start,
                clip_end,
                video.display()
            );
            let samples = backend.extract(video, clip_start, clip_end - clip_start, config.sample_rate)?;
            (samples, video.as_path(), Some((clip_start, clip_end)))
        }
    };

    let authored = author_template(
        &samples,
        config,
        &source_name(source),
        clip,
        &output_dir,
        &settings.detection.template_file,
    )
    .with_context(|| format!("Failed to author template in {}", output_dir.display()))?;

    let summary = TemplateSummary::new(
        &authored.template,
        &authored.template_path,
        authored.clip_path.as_deref(),
        start.elapsed().as_secs_f64(),
    );
    print_json(&summary);

    Ok(())
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
