//! Template authoring: build the template, then write its artifacts

use amen_core::audio::write_wav_i16;
use amen_core::{build_template, AmenConfig, Result, Template};
use std::path::{Path, PathBuf};

/// File name of the reference clip written next to the template
pub const CLIP_FILE: &str = "amen_template.wav";

/// Files written by [`author_template`]
#[derive(Debug)]
pub struct Authored {
    pub template: Template,
    pub template_path: PathBuf,
    pub clip_path: Option<PathBuf>,
}

/// Build a template from `samples` and write it to `output_dir/template_file`.
///
/// When `clip` is set the samples are also stored as `amen_template.wav`.
/// Nothing is written unless the template builds.
pub fn author_template(
    samples: &[f32],
    config: &AmenConfig,
    source: &str,
    clip: Option<(f64, f64)>,
    output_dir: &Path,
    template_file: &str,
) -> Result<Authored> {
    let template = build_template(samples, config)?.with_source(source, clip);

    std::fs::create_dir_all(output_dir)?;

    let clip_path = match clip {
        Some(_) => {
            let path = output_dir.join(CLIP_FILE);
            write_wav_i16(&path, samples, config.sample_rate)?;
            log::info!("Saved clip to {}", path.display());
            Some(path)
        }
        None => None,
    };

    let template_path = output_dir.join(template_file);
    template.save(&template_path)?;
    log::info!(
        "Saved template to {} ({}x{})",
        template_path.display(),
        template.chroma().rows(),
        template.chroma().cols()
    );

    Ok(Authored {
        template,
        template_path,
        clip_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amen_core::AmenError;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("amen-authoring-{}-{}", std::process::id(), name))
    }

    fn tone(seconds: f32, sample_rate: u32) -> Vec<f32> {
        (0..(seconds * sample_rate as f32) as usize)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_failed_build_writes_nothing() {
        let dir = temp_dir("empty");
        let config = AmenConfig::default();

        let err = author_template(&[], &config, "match.mp4", Some((10.0, 30.0)), &dir, "amen_chroma.tpl").unwrap_err();

        assert!(matches!(err, AmenError::EmptyAudio));
        assert!(!dir.join(CLIP_FILE).exists());
        assert!(!dir.join("amen_chroma.tpl").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clip_and_template_written() {
        let dir = temp_dir("clip");
        let config = AmenConfig::default();
        let samples = tone(2.0, config.sample_rate);

        let authored =
            author_template(&samples, &config, "match.mp4", Some((10.0, 12.0)), &dir, "amen_chroma.tpl").unwrap();

        assert_eq!(authored.clip_path.as_deref(), Some(dir.join(CLIP_FILE).as_path()));
        assert!(dir.join(CLIP_FILE).exists());
        let loaded = Template::load(&authored.template_path).unwrap();
        assert_eq!(loaded, authored.template);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wav_source_writes_only_template() {
        let dir = temp_dir("wav");
        let config = AmenConfig::default();
        let samples = tone(1.0, config.sample_rate);

        let authored = author_template(&samples, &config, "clip.wav", None, &dir, "t.tpl").unwrap();

        assert!(authored.clip_path.is_none());
        assert!(!dir.join(CLIP_FILE).exists());
        assert!(authored.template_path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
