//! Utility modules for audix-ml

pub mod audio_decoder;

pub use audio_decoder::{decode_wav_file, DecodedAudio};
