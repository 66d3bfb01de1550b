//! Reference templates
//!
//! A template is the chroma matrix of a manually identified clip together
//! with the hop length and sample rate it was computed at. Templates are
//! built once, stored as .tpl files and only read afterwards.

use crate::chroma::{ChromaMatrix, FeatureTransform};
use crate::config::PITCH_CLASSES;
use crate::error::{AmenError, Result};
use amen_tpl::{TplError, TplFile, TplMetadata, TplReader, TplWriter};
use std::path::Path;

/// Immutable reference motif
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    chroma: ChromaMatrix,
    hop_length: usize,
    sample_rate: u32,
    metadata: TplMetadata,
}

impl Template {
    /// Run the feature transform over a clip.
    ///
    /// `samples` must already be at `transform.sample_rate()`.
    pub fn build(
        samples: &[f32],
        sample_rate: u32,
        transform: &dyn FeatureTransform,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(AmenError::EmptyAudio);
        }
        if sample_rate != transform.sample_rate() {
            return Err(AmenError::InvalidConfig(format!(
                "waveform is {} Hz but the transform expects {} Hz",
                sample_rate,
                transform.sample_rate()
            )));
        }

        let chroma = transform.transform(samples)?;
        let metadata = TplMetadata::new(
            transform.algorithm_id(),
            transform.algorithm_params(),
            String::new(),
        );

        log::info!(
            "Built template: {} frames, {:.2}s",
            chroma.cols(),
            chroma.cols() as f64 * transform.hop_length() as f64 / sample_rate as f64
        );

        Ok(Self {
            chroma,
            hop_length: transform.hop_length(),
            sample_rate,
            metadata,
        })
    }

    /// Wrap an existing matrix
    pub fn from_parts(
        chroma: ChromaMatrix,
        hop_length: usize,
        sample_rate: u32,
        metadata: TplMetadata,
    ) -> Result<Self> {
        if chroma.rows() < PITCH_CLASSES || chroma.cols() == 0 {
            return Err(AmenError::InvalidMatrix {
                rows: chroma.rows(),
                cols: chroma.cols(),
            });
        }
        if hop_length == 0 || sample_rate == 0 {
            return Err(AmenError::InvalidConfig(
                "hop_length and sample_rate must be > 0".into(),
            ));
        }
        Ok(Self {
            chroma,
            hop_length,
            sample_rate,
            metadata,
        })
    }

    /// Record where the clip came from
    pub fn with_source(mut self, source_filename: &str, clip: Option<(f64, f64)>) -> Self {
        self.metadata.source_filename = source_filename.to_string();
        if let Some((start, end)) = clip {
            self.metadata = self.metadata.with_clip(start, end);
        }
        self
    }

    /// Load a template written by [`Template::save`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AmenError::TemplateNotFound(path.to_path_buf()));
        }

        let file = TplReader::read(path).map_err(|e| match e {
            TplError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                AmenError::TemplateNotFound(path.to_path_buf())
            }
            other => corrupt(path, other.to_string()),
        })?;

        let rows = file.header.rows as usize;
        let cols = file.header.cols as usize;
        if rows < PITCH_CLASSES {
            return Err(corrupt(path, format!("matrix has {} rows, need {}", rows, PITCH_CLASSES)));
        }
        if cols == 0 {
            return Err(corrupt(path, "matrix has no frames".to_string()));
        }
        if file.header.hop_length == 0 || file.header.sample_rate == 0 {
            return Err(corrupt(path, "hop_length and sample_rate must be > 0".to_string()));
        }

        if let Some(idx) = file.values.iter().position(|v| !v.is_finite()) {
            return Err(corrupt(
                path,
                format!("non-finite value {} at row {}, column {}", file.values[idx], idx / cols, idx % cols),
            ));
        }

        let chroma = ChromaMatrix::new(rows, cols, file.values)
            .map_err(|e| corrupt(path, e.to_string()))?;

        log::info!(
            "Loaded template {}: {}x{} @ hop {} / {} Hz",
            path.display(),
            rows,
            cols,
            file.header.hop_length,
            file.header.sample_rate
        );

        Ok(Self {
            chroma,
            hop_length: file.header.hop_length as usize,
            sample_rate: file.header.sample_rate,
            metadata: file.metadata,
        })
    }

    /// Write the template as a .tpl file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = TplFile::new(
            self.chroma.rows() as u32,
            self.chroma.cols() as u32,
            self.hop_length as u32,
            self.sample_rate,
            self.metadata.clone(),
            self.chroma.as_slice().to_vec(),
        )?;
        TplWriter::write(path, &file)?;
        Ok(())
    }

    pub fn chroma(&self) -> &ChromaMatrix {
        &self.chroma
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn metadata(&self) -> &TplMetadata {
        &self.metadata
    }

    /// Number of analysis frames
    pub fn num_frames(&self) -> usize {
        self.chroma.cols()
    }

    /// `frames * hop / sample_rate`, in seconds
    pub fn duration(&self) -> f64 {
        self.chroma.cols() as f64 * self.hop_length as f64 / self.sample_rate as f64
    }
}

fn corrupt(path: &Path, reason: String) -> AmenError {
    AmenError::CorruptTemplate {
        path: path.to_path_buf(),
        reason,
    }
}
