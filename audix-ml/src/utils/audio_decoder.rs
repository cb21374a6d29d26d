//! Audio Decoding Utilities
//!
//! Decodes uncompressed WAV to mono f32 PCM with symphonia. Multi-channel input is
//! averaged down to one channel; no resampling is performed.

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a WAV file to mono f32 PCM samples
///
/// # Errors
/// * File I/O errors
/// * Not a WAV container / unsupported sample format
/// * Corrupt audio data
pub fn decode_wav_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Not a readable WAV file: {}", file_path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let channels = track
        .codec_params
        .channels
        .context("Channels unknown")?
        .count();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .with_context(|| format!("Failed to decode packet in: {}", file_path.display()))?;
        samples.extend(to_mono(&decoded));
    }

    tracing::debug!(
        path = %file_path.display(),
        sample_rate,
        channels,
        total_samples = samples.len(),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

fn to_mono(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::U8(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::U16(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::U24(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::U32(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::S8(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::S16(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::S24(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::S32(buf) => mix_down(&**buf, f32::from_sample),
        AudioBufferRef::F32(buf) => mix_down(&**buf, |s| s),
        AudioBufferRef::F64(buf) => mix_down(&**buf, f32::from_sample),
    }
}

/// Average all channels of each frame
fn mix_down<S: Sample>(buf: &AudioBuffer<S>, to_f32: impl Fn(S) -> f32) -> Vec<f32> {
    let channels = buf.spec().channels.count();
    if channels == 0 {
        return Vec::new();
    }
    (0..buf.frames())
        .map(|frame| {
            let sum: f32 = (0..channels).map(|ch| to_f32(buf.chan(ch)[frame])).sum();
            sum / channels as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_missing_file() {
        let result = decode_wav_file(Path::new("/nonexistent/file.wav"));
        assert!(result.unwrap_err().to_string().contains("Failed to open audio file"));
    }

    #[test]
    fn test_decode_stereo_mixes_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames: Vec<Vec<i16>> = (0..800).map(|_| vec![16384, 0]).collect();
        write_wav(&path, 2, 8000, &frames);

        let decoded = decode_wav_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), 800);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-3);
        assert!((decoded.duration_seconds() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_non_wav_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.wav");
        std::fs::write(&path, b"ID3 definitely not a riff header").unwrap();
        assert!(decode_wav_file(&path).is_err());
    }
}
