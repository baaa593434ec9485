//! Audio input sources.
//!
//! A source hands out fixed-size float frames until the input is exhausted.
//! The streaming pipeline only ever sees this trait, so a WAV file, a test
//! tone or a real microphone (behind the `device-audio` feature) all feed the
//! same path.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use hound::SampleFormat;

use super::pcm;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("WAV read failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pull-based frame producer. `next_frame` yields `None` once the input is
/// exhausted; every yielded frame has exactly `frame_samples` samples.
#[async_trait]
pub trait AudioSource: Send {
    async fn next_frame(&mut self) -> Result<Option<Vec<f32>>, CaptureError>;

    fn sample_rate(&self) -> u32;
}

/// Frame source backed by a WAV file.
///
/// Samples are loaded eagerly and normalized to mono float: stereo input is
/// averaged per sample pair, 16-bit integers are scaled to `[-1.0, 1.0)`.
/// The final partial frame is zero-padded so consumers always see fixed-size
/// frames. With pacing enabled, frames are released at the cadence a live
/// microphone would produce them.
pub struct WavFileSource {
    samples: VecDeque<f32>,
    sample_rate: u32,
    frame_samples: usize,
    paced: bool,
}

impl WavFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let mono = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => {
                let raw: Result<Vec<i16>, _> = reader.into_samples::<i16>().collect();
                downmix_to_mono(raw?.into_iter().map(pcm::sample_to_f32), spec.channels)
            }
            (SampleFormat::Float, 32) => {
                let raw: Result<Vec<f32>, _> = reader.into_samples::<f32>().collect();
                downmix_to_mono(raw?.into_iter(), spec.channels)
            }
            (format, bits) => {
                return Err(CaptureError::UnsupportedFormat(format!(
                    "{bits}-bit {format:?} WAV (expected 16-bit int or 32-bit float)"
                )));
            }
        };

        Ok(Self {
            samples: mono.into(),
            sample_rate: spec.sample_rate,
            frame_samples: pcm::FRAME_SAMPLES,
            paced: false,
        })
    }

    /// Override the frame size (defaults to [`pcm::FRAME_SAMPLES`]).
    pub fn with_frame_samples(mut self, frame_samples: usize) -> Self {
        self.frame_samples = frame_samples.max(1);
        self
    }

    /// Release frames in real time instead of as fast as the consumer pulls.
    /// Live servers run turn detection on wall-clock silence, so replaying a
    /// file faster than real time confuses them.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Frames remaining, counting the zero-padded tail frame.
    pub fn frames_remaining(&self) -> usize {
        self.samples.len().div_ceil(self.frame_samples)
    }
}

/// Average interleaved multi-channel samples down to one channel.
pub(crate) fn downmix_to_mono(samples: impl Iterator<Item = f32>, channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.collect();
    }
    let mut mono = Vec::new();
    let mut acc = 0.0f32;
    let mut n = 0usize;
    for s in samples {
        acc += s;
        n += 1;
        if n == channels {
            mono.push(acc / channels as f32);
            acc = 0.0;
            n = 0;
        }
    }
    mono
}

#[async_trait]
impl AudioSource for WavFileSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<f32>>, CaptureError> {
        if self.samples.is_empty() {
            return Ok(None);
        }
        if self.paced {
            let frame_ms = self.frame_samples as u64 * 1000 / u64::from(self.sample_rate.max(1));
            tokio::time::sleep(Duration::from_millis(frame_ms)).await;
        }
        let take = self.frame_samples.min(self.samples.len());
        let mut frame: Vec<f32> = self.samples.drain(..take).collect();
        frame.resize(self.frame_samples, 0.0);
        Ok(Some(frame))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Source that yields a fixed number of silent frames. Handy for exercising
/// the pipeline without audio fixtures.
pub struct SilenceSource {
    frames_left: usize,
    frame_samples: usize,
    sample_rate: u32,
}

impl SilenceSource {
    pub fn new(frames: usize) -> Self {
        Self {
            frames_left: frames,
            frame_samples: pcm::FRAME_SAMPLES,
            sample_rate: pcm::SAMPLE_RATE,
        }
    }

    pub fn with_frame_samples(mut self, frame_samples: usize) -> Self {
        self.frame_samples = frame_samples.max(1);
        self
    }
}

#[async_trait]
impl AudioSource for SilenceSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<f32>>, CaptureError> {
        if self.frames_left == 0 {
            return Ok(None);
        }
        self.frames_left -= 1;
        Ok(Some(vec![0.0; self.frame_samples]))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_wav(samples: &[i16], channels: u16, sample_rate: u32) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        {
            let mut writer = hound::WavWriter::new(file.as_file_mut(), spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_wav_source_pads_final_frame() {
        let file = write_wav(&[16384; 10], 1, 16_000);
        let mut source = WavFileSource::open(file.path()).unwrap().with_frame_samples(8);
        assert_eq!(source.frames_remaining(), 2);

        let first = source.next_frame().await.unwrap().unwrap();
        assert_eq!(first.len(), 8);
        assert!((first[0] - 0.5).abs() < 1e-3);

        let second = source.next_frame().await.unwrap().unwrap();
        assert_eq!(second.len(), 8, "tail frame is padded to full size");
        assert_eq!(&second[2..], &[0.0; 6], "padding is silence");

        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stereo_wav_is_downmixed() {
        // L/R pairs average to the midpoint.
        let file = write_wav(&[1000, 3000, -2000, 2000], 2, 16_000);
        let mut source = WavFileSource::open(file.path()).unwrap().with_frame_samples(2);
        let frame = source.next_frame().await.unwrap().unwrap();
        assert!((frame[0] - pcm::sample_to_f32(2000)).abs() < 1e-4);
        assert!(frame[1].abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_silence_source_is_finite() {
        let mut source = SilenceSource::new(2).with_frame_samples(4);
        assert_eq!(source.next_frame().await.unwrap(), Some(vec![0.0; 4]));
        assert_eq!(source.next_frame().await.unwrap(), Some(vec![0.0; 4]));
        assert_eq!(source.next_frame().await.unwrap(), None);
    }

    #[test]
    fn test_sample_rate_is_reported() {
        let file = write_wav(&[0; 4], 1, 44_100);
        let source = WavFileSource::open(file.path()).unwrap();
        assert_eq!(source.sample_rate(), 44_100);
    }
}
