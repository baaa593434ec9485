//! Audio container sniffing.
//!
//! Servers return synthesized speech in whatever container the upstream TTS
//! provider produced. The bytes themselves are the only reliable signal, so
//! uploads and playback both sniff magic bytes instead of trusting headers
//! or file extensions.

/// Detect an audio container from magic bytes. Returns `(mime, extension)`.
pub fn detect_audio_format(data: &[u8]) -> (&'static str, &'static str) {
    if data.len() < 12 {
        return ("application/octet-stream", "bin");
    }

    if data.starts_with(b"ID3") || (data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xE0) == 0xE0)
    {
        return ("audio/mpeg", "mp3");
    }
    if data.starts_with(b"RIFF") && data.len() >= 12 && &data[8..12] == b"WAVE" {
        return ("audio/wav", "wav");
    }
    if data.starts_with(b"ftyp") || (data.len() >= 8 && &data[4..8] == b"ftyp") {
        return ("audio/mp4", "m4a");
    }
    if data.starts_with(b"OggS") {
        return ("audio/ogg", "ogg");
    }
    if data.starts_with(b"fLaC") {
        return ("audio/flac", "flac");
    }

    // Raw PCM and anything unrecognized is treated as WAV.
    ("audio/wav", "wav")
}

/// Wrap raw 16-bit little-endian PCM in a WAV container. A dangling odd
/// byte at the end of `pcm` is dropped.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::with_capacity(44 + pcm.len()));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for chunk in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_mp3_by_id3_tag() {
        let data = b"ID3\x04\x00\x00\x00\x00\x00\x00extra";
        assert_eq!(detect_audio_format(data), ("audio/mpeg", "mp3"));
    }

    #[test]
    fn test_detects_mp3_by_frame_sync() {
        let mut data = vec![0xFF, 0xFB];
        data.extend_from_slice(&[0u8; 16]);
        assert_eq!(detect_audio_format(&data), ("audio/mpeg", "mp3"));
    }

    #[test]
    fn test_detects_wav() {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&1234u32.to_le_bytes());
        data.extend_from_slice(b"WAVEfmt ");
        assert_eq!(detect_audio_format(&data), ("audio/wav", "wav"));
    }

    #[test]
    fn test_detects_ogg_and_flac() {
        assert_eq!(detect_audio_format(b"OggS\x00\x02\x00\x00\x00\x00\x00\x00"), ("audio/ogg", "ogg"));
        assert_eq!(detect_audio_format(b"fLaC\x00\x00\x00\x22aaaa"), ("audio/flac", "flac"));
    }

    #[test]
    fn test_short_payload_is_opaque() {
        assert_eq!(detect_audio_format(b"RIFF"), ("application/octet-stream", "bin"));
    }

    #[test]
    fn test_unknown_defaults_to_wav() {
        assert_eq!(detect_audio_format(&[0x01; 32]), ("audio/wav", "wav"));
    }

    #[test]
    fn test_pcm_to_wav_round_trips() {
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let mut pcm = Vec::new();
        for s in &samples {
            pcm.extend_from_slice(&s.to_le_bytes());
        }

        let wav = pcm_to_wav(&pcm, 16_000, 1).unwrap();
        assert_eq!(detect_audio_format(&wav), ("audio/wav", "wav"));

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(decoded, samples);
    }
}
