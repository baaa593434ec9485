//! Wire types for the duplex voice-agent WebSocket.
//!
//! The client sends binary PCM frames plus a small set of JSON control
//! messages, and receives JSON text frames from the server. Inbound frames
//! carry a `type` tag; the tag is peeked first so an unrecognized type can be
//! skipped without failing the whole stream, and a malformed payload for a
//! known type only poisons that one frame.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// Text sentinel the client sends when capture ends. Tells the server to
/// flush its transcriber even though the socket stays open for the response.
pub const EOF_SENTINEL: &str = "EOF";

// ============================================================================
// Inbound (server -> client)
// ============================================================================

/// Transcript of the caller's speech. Partial transcripts stream in with
/// `end_of_turn: false` and are display noise; only the end-of-turn snapshot
/// is a candidate for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionMessage {
    pub text: String,
    #[serde(default)]
    pub end_of_turn: bool,
}

/// Marks the boundary of a caller turn once the server's turn detector fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEndMessage {
    #[serde(default)]
    pub message: Option<String>,
}

/// One slice of synthesized speech. Chunks arrive in `chunk_index` order and
/// each carries its own base64 payload; `is_final` closes the utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioChunkMessage {
    pub chunk_index: u32,
    pub total_chunks: u32,
    #[serde(default)]
    pub audio_data: Option<String>,
    #[serde(default)]
    pub is_final: bool,
}

impl AudioChunkMessage {
    /// Decode this chunk's base64 payload, if present.
    pub fn decode(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.audio_data.as_deref().map(|data| general_purpose::STANDARD.decode(data))
    }
}

/// Trailer confirming how many chunks the server sent for the utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCompleteMessage {
    #[serde(default)]
    pub total_chunks: Option<u32>,
}

/// Synthesized speech delivered as one base64 blob instead of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMessage {
    pub b64: String,
}

impl AudioMessage {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.b64)
    }
}

/// Application-level failure reported by the server. The stream stays usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Human-readable progress line ("generating response", and so on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

/// Text payload shared by the `final`, `assistant` and `llm` message types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub text: String,
}

/// Every inbound frame the client understands, plus `Unknown` so newer server
/// builds can add types without breaking older clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Transcription(TranscriptionMessage),
    TurnEnd(TurnEndMessage),
    AudioChunk(AudioChunkMessage),
    AudioComplete(AudioCompleteMessage),
    Audio(AudioMessage),
    Error(ErrorMessage),
    Status(StatusMessage),
    /// Final transcript of the caller's turn.
    Final(TextMessage),
    /// Full assistant response text.
    Assistant(TextMessage),
    /// Streaming snapshot of the assistant response so far.
    Llm(TextMessage),
    /// Valid JSON with an unrecognized `type` tag.
    Unknown(String),
}

/// Minimal view used to route a frame before committing to a full parse.
#[derive(Debug, Deserialize)]
struct TypePeek {
    #[serde(rename = "type")]
    message_type: String,
}

impl ServerMessage {
    /// Parse one inbound text frame. Returns `Err` only when the frame is not
    /// valid JSON or a known type has a malformed payload; an unknown type is
    /// not an error.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let peek: TypePeek = serde_json::from_str(text)?;
        let message = match peek.message_type.as_str() {
            "transcription" => Self::Transcription(serde_json::from_str(text)?),
            "turn_end" => Self::TurnEnd(serde_json::from_str(text)?),
            "audio_chunk" => Self::AudioChunk(serde_json::from_str(text)?),
            "audio_complete" => Self::AudioComplete(serde_json::from_str(text)?),
            "audio" => Self::Audio(serde_json::from_str(text)?),
            "error" => Self::Error(serde_json::from_str(text)?),
            "status" => Self::Status(serde_json::from_str(text)?),
            "final" => Self::Final(serde_json::from_str(text)?),
            "assistant" => Self::Assistant(serde_json::from_str(text)?),
            "llm" => Self::Llm(serde_json::from_str(text)?),
            _ => Self::Unknown(peek.message_type),
        };
        Ok(message)
    }
}

// ============================================================================
// Outbound (client -> server)
// ============================================================================

/// Per-session provider credentials forwarded in the `config` message.
/// Fields left unset are omitted from the wire so the server falls back to
/// its own environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionKeys {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub murf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assemblyai: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serpapi: Option<String>,
}

impl SessionKeys {
    pub fn is_empty(&self) -> bool {
        self.murf.is_none()
            && self.assemblyai.is_none()
            && self.gemini.is_none()
            && self.serpapi.is_none()
    }
}

/// First frame of the handshake. Tells the server a capture session begins.
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

impl Default for StartMessage {
    fn default() -> Self {
        Self { message_type: "start" }
    }
}

/// Second frame of the handshake, carrying session credentials. Must be on
/// the wire before any audio frame.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub keys: SessionKeys,
}

impl ConfigMessage {
    pub fn new(keys: SessionKeys) -> Self {
        Self { message_type: "config", keys }
    }
}

/// Explicit session teardown request sent during shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct StopMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

impl Default for StopMessage {
    fn default() -> Self {
        Self { message_type: "stop" }
    }
}
