//! PCM sample conversion for the outbound audio path.
//!
//! The server expects mono 16 kHz signed 16-bit little-endian frames. Capture
//! sources produce `f32` samples in `[-1.0, 1.0]`, so every frame crosses
//! through here exactly once before it is handed to the stream client.

use bytes::{BufMut, Bytes, BytesMut};

/// Sample rate the server-side transcriber is configured for.
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples per outbound frame (roughly 256 ms at 16 kHz).
pub const FRAME_SAMPLES: usize = 4096;

/// Capture is always mono.
pub const CHANNELS: u16 = 1;

/// Convert one float sample to a signed 16-bit PCM sample.
///
/// The input is clamped to `[-1.0, 1.0]` first. Negative values scale by
/// 32768 and non-negative values by 32767 so both endpoints map onto the
/// exact i16 range (`-1.0 -> -32768`, `1.0 -> 32767`).
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 { (s * 32768.0) as i16 } else { (s * 32767.0) as i16 }
}

/// Convert a float frame to i16 samples.
pub fn convert_frame(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| sample_to_i16(s)).collect()
}

/// Encode a float frame as little-endian PCM bytes ready for the wire.
pub fn encode_frame(samples: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for &sample in samples {
        buf.put_i16_le(sample_to_i16(sample));
    }
    buf.freeze()
}

/// Convert a signed 16-bit PCM sample back to float in `[-1.0, 1.0)`.
///
/// Used when reading WAV fixtures so file-backed sources feed the same
/// float pipeline a live microphone would.
#[inline]
pub fn sample_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_samples_map_to_full_range() {
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32768);
        assert_eq!(sample_to_i16(0.0), 0);
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        assert_eq!(sample_to_i16(2.5), 32767);
        assert_eq!(sample_to_i16(-3.0), -32768);
    }

    #[test]
    fn test_nan_becomes_silence() {
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_half_scale() {
        assert_eq!(sample_to_i16(0.5), 16383);
        assert_eq!(sample_to_i16(-0.5), -16384);
    }

    #[test]
    fn test_encode_frame_is_little_endian() {
        let bytes = encode_frame(&[1.0, -1.0]);
        assert_eq!(bytes.as_ref(), &[0xFF, 0x7F, 0x00, 0x80]);
    }

    #[test]
    fn test_encode_frame_length() {
        let frame = vec![0.25_f32; FRAME_SAMPLES];
        let bytes = encode_frame(&frame);
        assert_eq!(bytes.len(), FRAME_SAMPLES * 2);
    }

    #[test]
    fn test_i16_round_trip_stays_in_range() {
        for &s in &[i16::MIN, -12345, -1, 0, 1, 12345, i16::MAX] {
            let f = sample_to_f32(s);
            assert!((-1.0..=1.0).contains(&f), "{s} mapped outside unit range");
        }
    }
}
