pub mod client;
pub mod config;
pub mod messages;

// Re-export commonly used types for convenience
pub use client::{
    AudioOutputCallback, CloseCallback, ConnectionState, FrameSender, StatusCallback, StatusLevel,
    StatusUpdate, StreamClient, StreamError, StreamErrorCallback, TranscriptCallback,
};
pub use config::{StreamConfig, ws_endpoint};
pub use messages::{
    AudioChunkMessage, AudioCompleteMessage, AudioMessage, ConfigMessage, EOF_SENTINEL,
    ErrorMessage, ServerMessage, SessionKeys, StartMessage, StatusMessage, StopMessage,
    TextMessage, TranscriptionMessage, TurnEndMessage,
};
