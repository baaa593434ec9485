pub mod capture;
pub mod chunks;
#[cfg(feature = "device-audio")]
pub mod device;
pub mod format;
pub mod pcm;
pub mod playback;

// Re-export commonly used types for convenience
pub use capture::{AudioSource, CaptureError, SilenceSource, WavFileSource};
pub use chunks::{ChunkAssembler, ChunkProgress};
#[cfg(feature = "device-audio")]
pub use device::{DeviceSink, DeviceSource};
pub use format::{detect_audio_format, pcm_to_wav};
pub use pcm::{CHANNELS, FRAME_SAMPLES, SAMPLE_RATE, encode_frame, sample_to_f32, sample_to_i16};
pub use playback::{AudioSink, PlaybackConfig, PlaybackError, PlaybackQueue, QueueState};
