pub mod audio;
pub mod session;
pub mod stream;
pub mod transcript;

// Re-export commonly used types for convenience
pub use audio::{
    AudioSink, AudioSource, CaptureError, ChunkAssembler, ChunkProgress, PlaybackConfig,
    PlaybackError, PlaybackQueue, QueueState, SilenceSource, WavFileSource, detect_audio_format,
};

pub use stream::{
    ConnectionState, FrameSender, ServerMessage, SessionKeys, StatusLevel, StatusUpdate,
    StreamClient, StreamConfig, StreamError,
};

pub use session::{
    SessionDriver, SessionError, SessionHandle, SessionMachine, SessionOptions, SessionState,
    SourceFactory,
};

// Re-export transcript types for convenience
pub use transcript::{ChatRole, ChatTurn, FilterConfig, TranscriptLog, TurnFilter};
