//! Wire types for the HTTP API surface.
//!
//! The backend evolved over time, so a few shapes exist in two spellings
//! (`voiceId` vs `voice_id`, bare list vs wrapped list). Deserialization
//! accepts both; serialization sticks to the current spelling.

use serde::{Deserialize, Serialize};

/// Response from `POST /tts` and `POST /llm/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsResponse {
    pub audio_url: String,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "detail")]
    pub error: String,
}

/// One entry from `GET /voices`. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    #[serde(rename = "voiceId", alias = "voice_id", default)]
    pub voice_id: String,
    #[serde(alias = "displayName", default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// `GET /voices` comes back either as a bare array or wrapped in an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VoicesResponse {
    Wrapped { voices: Vec<Voice> },
    Bare(Vec<Voice>),
}

impl VoicesResponse {
    pub fn into_vec(self) -> Vec<Voice> {
        match self {
            VoicesResponse::Wrapped { voices } => voices,
            VoicesResponse::Bare(voices) => voices,
        }
    }
}

/// Response from `POST /upload-audio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Response from `POST /transcribe/file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub transcription: String,
}

/// Response from `POST /tts/echo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub audio_url: String,
    #[serde(default)]
    pub text: String,
}

/// Reply from `POST /agent/chat/{session_id}`.
///
/// The healthy path returns JSON with a URL to fetch. When the backend's
/// pipeline fails it streams canned audio inline instead, flagged with an
/// `X-Error: true` header so the caller can still play it while surfacing
/// the failure.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentChatReply {
    Url(String),
    Audio {
        bytes: Vec<u8>,
        content_type: String,
        fallback: bool,
    },
}
