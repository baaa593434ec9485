//! HTTP client for the voice backend's REST surface.
//!
//! Everything here is a one-shot request/response call: speech synthesis,
//! voice listing, file transcription, and the agent chat fallback path. The
//! streaming conversation loop lives in [`crate::core::stream`] instead.

pub mod types;

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use crate::core::audio::detect_audio_format;

// Re-export commonly used types for convenience
pub use types::{
    AgentChatReply, EchoResponse, ErrorBody, TranscriptionResponse, TtsResponse, UploadResponse,
    Voice, VoicesResponse,
};

// =============================================================================
// Constants
// =============================================================================

/// Default request timeout in seconds. Synthesis of long passages can take
/// a while on the backend.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default connect timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// User-Agent header value for API requests.
const USER_AGENT: &str = concat!("voxlink/", env!("CARGO_PKG_VERSION"));

/// Multipart field name the backend expects for every audio upload.
const AUDIO_FIELD: &str = "audio_file";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx from the backend, message taken from its `{error}` body.
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Client
// =============================================================================

/// Client for the backend's REST endpoints.
///
/// Holds a pooled `reqwest::Client`, so clone-free reuse across calls is
/// cheap. All methods take `&self`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the given base URL, e.g. `http://localhost:8000`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Synthesize `text` with the given voice. `POST /tts`.
    pub async fn generate_speech(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<TtsResponse, ApiError> {
        let url = self.endpoint("/tts")?;
        debug!("POST {} ({} chars, voice {})", url, text.len(), voice_id);

        let response = self
            .http
            .post(url)
            .form(&[("text", text), ("voiceId", voice_id)])
            .send()
            .await?;
        let response = Self::check_error(response).await?;
        Ok(response.json().await?)
    }

    /// List the voices the backend can synthesize with. `GET /voices`.
    pub async fn list_voices(&self) -> Result<Vec<Voice>, ApiError> {
        let url = self.endpoint("/voices")?;
        debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let response = Self::check_error(response).await?;
        let voices: VoicesResponse = response.json().await?;
        Ok(voices.into_vec())
    }

    /// Upload an audio file without further processing. `POST /upload-audio`.
    pub async fn upload_audio(
        &self,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse, ApiError> {
        let response = self.post_audio("/upload-audio", filename, data).await?;
        Ok(response.json().await?)
    }

    /// Transcribe an uploaded audio file. `POST /transcribe/file`.
    pub async fn transcribe_file(
        &self,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<TranscriptionResponse, ApiError> {
        let response = self.post_audio("/transcribe/file", filename, data).await?;
        Ok(response.json().await?)
    }

    /// Transcribe an audio file and speak the same words back in a
    /// synthesized voice. `POST /tts/echo`.
    pub async fn tts_echo(&self, filename: &str, data: Vec<u8>) -> Result<EchoResponse, ApiError> {
        let response = self.post_audio("/tts/echo", filename, data).await?;
        Ok(response.json().await?)
    }

    /// Transcribe an audio question and answer it with synthesized speech.
    /// `POST /llm/query`.
    pub async fn llm_query(&self, filename: &str, data: Vec<u8>) -> Result<TtsResponse, ApiError> {
        let response = self.post_audio("/llm/query", filename, data).await?;
        Ok(response.json().await?)
    }

    /// One turn of voice chat with conversation memory.
    /// `POST /agent/chat/{session_id}`.
    ///
    /// A JSON body carries the audio URL; a binary body is the audio itself,
    /// served inline when the backend's pipeline degraded (flagged with
    /// `X-Error: true`).
    pub async fn agent_chat(
        &self,
        session_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<AgentChatReply, ApiError> {
        let path = format!("/agent/chat/{session_id}");
        let response = self.post_audio(&path, filename, data).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if content_type.starts_with("application/json") {
            let body: TtsResponse = response.json().await?;
            return Ok(AgentChatReply::Url(body.audio_url));
        }

        let fallback = response
            .headers()
            .get("x-error")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if fallback {
            warn!("Backend served fallback audio for session {}", session_id);
        }

        let bytes = response.bytes().await?.to_vec();
        Ok(AgentChatReply::Audio { bytes, content_type, fallback })
    }

    /// Fetch audio by URL. Relative URLs (the backend returns
    /// `/uploads/...` paths) resolve against the client's base URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let url = self
            .base_url
            .join(url)
            .map_err(|e| ApiError::InvalidRequest(format!("{url}: {e}")))?;
        debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let response = Self::check_error(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{path}: {e}")))
    }

    /// POST one audio file as multipart under the backend's expected field
    /// name, sniffing the MIME type from the bytes.
    async fn post_audio(
        &self,
        path: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(path)?;
        let (mime, _) = detect_audio_format(&data);
        debug!("POST {} ({} bytes, {})", url, data.len(), mime);

        let part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid MIME type: {e}")))?;
        let form = Form::new().part(AUDIO_FIELD, part);

        let response = self.http.post(url).multipart(form).send().await?;
        Self::check_error(response).await
    }

    /// Map non-2xx responses to typed errors, preferring the backend's
    /// `{error}` body over the raw status line.
    async fn check_error(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => err.error,
            Err(_) if body.is_empty() => format!("HTTP {status}"),
            Err(_) => format!("HTTP {status}: {body}"),
        };
        Err(ApiError::Backend { status: status.as_u16(), message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = ApiClient::new("ftp://localhost:8000").unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));

        let err = ApiClient::new("not a url").unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_endpoint_joins_against_base() {
        let client = ApiClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.endpoint("/tts").unwrap().as_str(),
            "http://localhost:8000/tts"
        );
        assert_eq!(
            client.endpoint("/agent/chat/abc-123").unwrap().as_str(),
            "http://localhost:8000/agent/chat/abc-123"
        );
    }

    #[test]
    fn test_base_url_keeps_https_scheme() {
        let client = ApiClient::new("https://voice.example.com").unwrap();
        assert_eq!(client.base_url().scheme(), "https");
    }
}
