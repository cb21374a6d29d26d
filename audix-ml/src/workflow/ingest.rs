//! Upload ingestion
//!
//! Turns an uploaded file into a `Recording`. Only uncompressed WAV at the configured
//! sample rate is accepted. Each upload is staged to its own temporary file, which is
//! removed before `ingest` returns regardless of outcome.

use crate::models::{DeviceId, Recording, Waveform};
use crate::types::ComponentSelection;
use crate::utils::{decode_wav_file, DecodedAudio};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Raw uploaded file
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Rejected upload (never reaches the pipeline)
#[derive(Debug, Error)]
pub enum InputFormatError {
    #[error("Only .wav files are supported (got '{0}')")]
    UnsupportedExtension(String),

    #[error("Failed to stage upload: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Failed to decode WAV: {0}")]
    Decode(String),

    #[error("Sample rate {actual} Hz does not match required {expected} Hz")]
    SampleRate { expected: u32, actual: u32 },

    #[error("Recording contains no audio samples")]
    Empty,
}

/// Validates, stages and decodes uploads
#[derive(Debug, Clone)]
pub struct Ingestor {
    sample_rate: u32,
    staging_dir: Option<PathBuf>,
}

impl Ingestor {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            staging_dir: None,
        }
    }

    /// Stage uploads under `dir` instead of the system temp directory
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Cheap pre-check on the client-supplied name
    pub fn check_filename(filename: &str) -> Result<(), InputFormatError> {
        let is_wav = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if is_wav {
            Ok(())
        } else {
            Err(InputFormatError::UnsupportedExtension(filename.to_string()))
        }
    }

    pub async fn ingest(
        &self,
        upload: AudioUpload,
        device_id: DeviceId,
        requested: Option<ComponentSelection>,
    ) -> Result<Recording, InputFormatError> {
        Self::check_filename(&upload.filename)?;

        let staging_dir = self.staging_dir.clone();
        let filename = upload.filename;
        let bytes = upload.bytes;
        let decoded = tokio::task::spawn_blocking(move || stage_and_decode(&bytes, staging_dir.as_deref()))
            .await
            .map_err(|e| InputFormatError::Decode(format!("decode task failed: {}", e)))??;

        if decoded.sample_rate != self.sample_rate {
            return Err(InputFormatError::SampleRate {
                expected: self.sample_rate,
                actual: decoded.sample_rate,
            });
        }
        if decoded.samples.is_empty() {
            return Err(InputFormatError::Empty);
        }

        debug!(
            %device_id,
            %filename,
            duration_seconds = decoded.duration_seconds(),
            channels = decoded.channels,
            "Upload decoded"
        );

        let recording = Recording::new(device_id, Waveform::new(decoded.samples, decoded.sample_rate));
        Ok(match requested {
            Some(selection) => recording.with_components(selection),
            None => recording,
        })
    }
}

/// Write the upload to an exclusively owned temp file and decode it
///
/// The temp file is deleted when `staged` drops, on success and on every error path.
fn stage_and_decode(bytes: &[u8], dir: Option<&Path>) -> Result<DecodedAudio, InputFormatError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("audix-upload-").suffix(".wav");
    let mut staged = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };

    staged.write_all(bytes)?;
    staged.flush()?;

    decode_wav_file(staged.path()).map_err(|e| InputFormatError::Decode(format!("{:#}", e)))
}
