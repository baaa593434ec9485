//! Generated audio test data.
//!
//! Sine tones stand in for speech: they are deterministic, non-silent (so
//! PCM conversion paths see real values) and cheap to produce at any length.
//!
//! Audio format throughout:
//! - Sample rate: 16 kHz
//! - Bit depth: 16-bit signed PCM
//! - Channels: mono

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// Sample rate the streaming pipeline runs at.
pub const SAMPLE_RATE: u32 = 16_000;

/// Generate a sine tone as float samples in `[-1.0, 1.0]`.
pub fn sine_samples(count: usize, frequency: f32, amplitude: f32) -> Vec<f32> {
    let angular = 2.0 * PI * frequency / SAMPLE_RATE as f32;
    (0..count).map(|i| (angular * i as f32).sin() * amplitude).collect()
}

/// One 440 Hz frame at the given frame size, half amplitude.
pub fn tone_frame(samples: usize) -> Vec<f32> {
    sine_samples(samples, 440.0, 0.5)
}

/// Generate a sine tone as 16-bit integer samples.
pub fn sine_samples_i16(count: usize, frequency: f32, amplitude: f32) -> Vec<i16> {
    sine_samples(count, frequency, amplitude)
        .into_iter()
        .map(|s| (s * i16::MAX as f32) as i16)
        .collect()
}

/// Encode 16-bit mono samples as a complete in-memory WAV file.
pub fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Write a short tone WAV under `dir` and return its path. Stands in for a
/// recorded user utterance on the file-capture path.
pub fn write_tone_wav(dir: &Path, sample_count: usize) -> PathBuf {
    let tone = sine_samples_i16(sample_count, 440.0, 0.5);
    let path = dir.join("utterance.wav");
    std::fs::write(&path, wav_bytes(&tone, SAMPLE_RATE)).unwrap();
    path
}

/// Base64 of the given bytes, for building `audio_chunk` payloads.
pub fn b64(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
