//! Real microphone capture and speaker playback.
//!
//! Only compiled with the `device-audio` feature so the core pipeline stays
//! buildable on headless hosts. Device streams are not `Send`, so each one
//! lives on a thread of its own and hands samples across through shared
//! buffers.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use cpal::SampleRate;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{debug, error};

use super::capture::{AudioSource, CaptureError, downmix_to_mono};
use super::format::detect_audio_format;
use super::pcm;
use super::playback::{AudioSink, PlaybackError};

/// How often the pull side checks the capture buffer for a full frame.
const CAPTURE_POLL: Duration = Duration::from_millis(20);

/// Frame source backed by the default input device, capturing mono audio at
/// [`pcm::SAMPLE_RATE`].
pub struct DeviceSource {
    buffer: Arc<Mutex<Vec<f32>>>,
    stop: Arc<AtomicBool>,
    frame_samples: usize,
    thread: Option<JoinHandle<()>>,
}

impl DeviceSource {
    /// Acquire the default input device and start capturing. This is the
    /// moment the OS permission prompt fires on platforms that have one.
    pub fn open() -> Result<Self, CaptureError> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let thread_buffer = Arc::clone(&buffer);
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::spawn(move || {
            let stream = match build_capture_stream(thread_buffer) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(e.to_string())));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            while !thread_stop.load(Ordering::Acquire) {
                std::thread::park_timeout(Duration::from_millis(50));
            }
            drop(stream);
            debug!("Capture stream released");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                buffer,
                stop,
                frame_samples: pcm::FRAME_SAMPLES,
                thread: Some(thread),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::DeviceUnavailable(
                "capture thread exited before reporting readiness".to_string(),
            )),
        }
    }

    /// Stop capturing. Frames already buffered can still be pulled.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

impl Drop for DeviceSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
impl AudioSource for DeviceSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<f32>>, CaptureError> {
        loop {
            {
                let mut buf = self.buffer.lock();
                if buf.len() >= self.frame_samples {
                    return Ok(Some(buf.drain(..self.frame_samples).collect()));
                }
                if self.stop.load(Ordering::Acquire) {
                    if buf.is_empty() {
                        return Ok(None);
                    }
                    let mut frame: Vec<f32> = buf.drain(..).collect();
                    frame.resize(self.frame_samples, 0.0);
                    return Ok(Some(frame));
                }
            }
            tokio::time::sleep(CAPTURE_POLL).await;
        }
    }

    fn sample_rate(&self) -> u32 {
        pcm::SAMPLE_RATE
    }
}

fn build_capture_stream(buffer: Arc<Mutex<Vec<f32>>>) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("no input device available".to_string()))?;

    let supported = device
        .supported_input_configs()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(pcm::SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(pcm::SAMPLE_RATE)
        })
        .ok_or_else(|| {
            CaptureError::UnsupportedFormat(format!(
                "no mono input config at {} Hz",
                pcm::SAMPLE_RATE
            ))
        })?;
    let config = supported.with_sample_rate(SampleRate(pcm::SAMPLE_RATE)).config();

    debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = pcm::SAMPLE_RATE,
        "Microphone capture initialized"
    );

    device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                buffer.lock().extend_from_slice(data);
            },
            |err| {
                error!(error = %err, "Audio capture error");
            },
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
}

/// Playback sink backed by the default output device. Decodes WAV and MP3
/// payloads; `play` blocks its worker until the samples have been consumed,
/// which is exactly the completion signal the queue needs.
pub struct DeviceSink;

impl DeviceSink {
    pub fn new() -> Result<Self, PlaybackError> {
        cpal::default_host()
            .default_output_device()
            .ok_or_else(|| PlaybackError::Device("no output device available".to_string()))?;
        Ok(Self)
    }
}

#[async_trait]
impl AudioSink for DeviceSink {
    async fn play(&self, audio: &[u8]) -> Result<(), PlaybackError> {
        let (samples, sample_rate) = decode_audio(audio)?;
        if samples.is_empty() {
            return Ok(());
        }
        tokio::task::spawn_blocking(move || play_samples_blocking(&samples, sample_rate))
            .await
            .map_err(|e| PlaybackError::Device(format!("playback task failed: {e}")))?
    }
}

fn decode_audio(audio: &[u8]) -> Result<(Vec<f32>, u32), PlaybackError> {
    match detect_audio_format(audio).1 {
        "wav" => decode_wav(audio),
        "mp3" => decode_mp3(audio),
        other => Err(PlaybackError::Decode(format!("unsupported playback container: {other}"))),
    }
}

fn decode_wav(audio: &[u8]) -> Result<(Vec<f32>, u32), PlaybackError> {
    let reader = hound::WavReader::new(Cursor::new(audio))
        .map_err(|e| PlaybackError::Decode(e.to_string()))?;
    let spec = reader.spec();

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => {
            let raw: Result<Vec<i16>, _> = reader.into_samples::<i16>().collect();
            let raw = raw.map_err(|e| PlaybackError::Decode(e.to_string()))?;
            downmix_to_mono(raw.into_iter().map(pcm::sample_to_f32), spec.channels)
        }
        (hound::SampleFormat::Float, 32) => {
            let raw: Result<Vec<f32>, _> = reader.into_samples::<f32>().collect();
            let raw = raw.map_err(|e| PlaybackError::Decode(e.to_string()))?;
            downmix_to_mono(raw.into_iter(), spec.channels)
        }
        (format, bits) => {
            return Err(PlaybackError::Decode(format!("unsupported WAV layout: {bits}-bit {format:?}")));
        }
    };
    Ok((samples, spec.sample_rate))
}

fn decode_mp3(audio: &[u8]) -> Result<(Vec<f32>, u32), PlaybackError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(audio));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                let channels = frame.channels as u16;
                samples.extend(downmix_to_mono(
                    frame.data.iter().map(|&s| pcm::sample_to_f32(s)),
                    channels,
                ));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(PlaybackError::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(PlaybackError::Decode("MP3 payload contained no frames".to_string()));
    }
    Ok((samples, sample_rate))
}

fn play_samples_blocking(samples: &[f32], sample_rate: u32) -> Result<(), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::Device("no output device".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| PlaybackError::Device(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: duplicate mono onto a stereo device.
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| {
            PlaybackError::Device(format!("no output config at {sample_rate} Hz"))
        })?;
    let config = supported.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = config.channels as usize;

    let shared = Arc::new(Mutex::new((samples.to_vec(), 0usize)));
    let finished = Arc::new(AtomicBool::new(false));

    let cb_shared = Arc::clone(&shared);
    let cb_finished = Arc::clone(&finished);
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut guard = cb_shared.lock();
                let (samples, pos) = &mut *guard;
                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples.len() {
                        let s = samples[*pos];
                        *pos += 1;
                        s
                    } else {
                        cb_finished.store(true, Ordering::Release);
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| {
                error!(error = %err, "Audio playback error");
            },
            None,
        )
        .map_err(|e| PlaybackError::Device(e.to_string()))?;

    stream.play().map_err(|e| PlaybackError::Device(e.to_string()))?;

    // Poll until the callback runs off the end of the buffer, with a ceiling
    // slightly above the segment's nominal duration.
    let duration_ms = samples.len() as u64 * 1000 / u64::from(sample_rate.max(1));
    let deadline = std::time::Instant::now() + Duration::from_millis(duration_ms + 500);
    while !finished.load(Ordering::Acquire) {
        if std::time::Instant::now() > deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    debug!(samples = samples.len(), sample_rate, "Playback segment complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Device-backed paths need real hardware; only the pure decode helpers
    // are covered here.

    #[test]
    fn test_decode_wav_payload() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 24_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [0i16, 16384, -16384] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let (samples, rate) = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(rate, 24_000);
        assert_eq!(samples.len(), 3);
        assert!((samples[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_container_is_rejected() {
        // OggS is detected but not decodable here.
        let err = decode_audio(b"OggS\x00\x02\x00\x00\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
    }
}
