//! WAV fixtures generated in memory with hound

use std::io::Cursor;

/// Mono 16-bit WAV of a 440 Hz tone at `amplitude` (0.0-1.0)
pub fn tone_wav(sample_rate: u32, seconds: f64, amplitude: f64) -> Vec<u8> {
    let total = (seconds * sample_rate as f64) as usize;
    let samples = (0..total).map(|i| {
        let t = i as f64 / sample_rate as f64;
        (amplitude * (2.0 * std::f64::consts::PI * 440.0 * t).sin() * i16::MAX as f64) as i16
    });
    encode(sample_rate, samples)
}

/// Mono 16-bit WAV of digital silence
pub fn silent_wav(sample_rate: u32, seconds: f64) -> Vec<u8> {
    let total = (seconds * sample_rate as f64) as usize;
    encode(sample_rate, std::iter::repeat(0i16).take(total))
}

fn encode(sample_rate: u32, samples: impl Iterator<Item = i16>) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for sample in samples {
            writer.write_sample(sample).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}
