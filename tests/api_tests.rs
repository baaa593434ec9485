//! REST client integration tests.
//!
//! Every test runs the real `ApiClient` against a wiremock backend and
//! checks both what goes onto the wire (form fields, multipart parts) and
//! how responses and error bodies come back out.

mod fixtures;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxlink::api::{AgentChatReply, ApiClient, ApiError};

use fixtures::audio_fixtures;

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// A small real WAV body so MIME sniffing sees actual RIFF magic.
fn wav_fixture() -> Vec<u8> {
    audio_fixtures::wav_bytes(&audio_fixtures::sine_samples_i16(64, 440.0, 0.5), 16_000)
}

// =============================================================================
// Speech synthesis
// =============================================================================

#[tokio::test]
async fn test_generate_speech_posts_form_and_parses_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .and(body_string_contains("text=hello+world"))
        .and(body_string_contains("voiceId=en-US-natalie"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"audio_url": "/uploads/out.mp3"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let response = client.generate_speech("hello world", "en-US-natalie").await.unwrap();
    assert_eq!(response.audio_url, "/uploads/out.mp3");
}

#[tokio::test]
async fn test_backend_error_body_becomes_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "voice not found"})))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let err = client.generate_speech("hi there", "nope").await.unwrap_err();
    match &err {
        ApiError::Backend { status, message } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "voice not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The rendered error is the backend's message, nothing wrapped around it.
    assert_eq!(err.to_string(), "voice not found");
}

#[tokio::test]
async fn test_fastapi_detail_alias_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"detail": "text must not be empty"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let err = client.generate_speech("", "en-US-natalie").await.unwrap_err();
    assert_eq!(err.to_string(), "text must not be empty");
}

#[tokio::test]
async fn test_non_json_error_body_falls_back_to_status_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let err = client.generate_speech("hi there", "v").await.unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("500"), "status missing from: {rendered}");
    assert!(rendered.contains("boom"), "body missing from: {rendered}");
}

// =============================================================================
// Voices
// =============================================================================

#[tokio::test]
async fn test_list_voices_accepts_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"voiceId": "en-US-natalie", "displayName": "Natalie", "gender": "Female", "locale": "en-US"},
            {"voice_id": "en-UK-ruby", "displayName": "Ruby"}
        ])))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let voices = client.list_voices().await.unwrap();
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].voice_id, "en-US-natalie");
    assert_eq!(voices[0].name, "Natalie");
    assert_eq!(voices[0].locale.as_deref(), Some("en-US"));
    assert_eq!(voices[1].voice_id, "en-UK-ruby");
    assert!(voices[1].gender.is_none());
}

#[tokio::test]
async fn test_list_voices_accepts_wrapped_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [{"voiceId": "en-US-ken", "displayName": "Ken"}]
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let voices = client.list_voices().await.unwrap();
    assert_eq!(voices.len(), 1);
    assert_eq!(voices[0].voice_id, "en-US-ken");
}

// =============================================================================
// Audio uploads
// =============================================================================

#[tokio::test]
async fn test_upload_audio_sends_expected_multipart_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-audio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filename": "utterance.wav",
            "content_type": "audio/wav",
            "size": 172,
            "file_url": "/uploads/utterance.wav"
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let response = client.upload_audio("utterance.wav", wav_fixture()).await.unwrap();
    assert_eq!(response.filename, "utterance.wav");
    assert_eq!(response.file_url.as_deref(), Some("/uploads/utterance.wav"));

    // The wire request carries the field name, the filename and the sniffed
    // MIME type.
    let requests = server.received_requests().await.expect("request recording enabled");
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    assert!(contains_subslice(body, b"name=\"audio_file\""));
    assert!(contains_subslice(body, b"filename=\"utterance.wav\""));
    assert!(contains_subslice(body, b"audio/wav"));
    assert!(contains_subslice(body, b"RIFF"), "payload bytes missing from the body");
}

#[tokio::test]
async fn test_transcribe_file_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transcribe/file"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"transcription": "hello world"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let response = client.transcribe_file("utterance.wav", wav_fixture()).await.unwrap();
    assert_eq!(response.transcription, "hello world");
}

#[tokio::test]
async fn test_tts_echo_returns_url_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts/echo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audio_url": "/uploads/echo.mp3",
            "text": "hello world"
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let response = client.tts_echo("utterance.wav", wav_fixture()).await.unwrap();
    assert_eq!(response.audio_url, "/uploads/echo.mp3");
    assert_eq!(response.text, "hello world");
}

#[tokio::test]
async fn test_llm_query_returns_answer_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/llm/query"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"audio_url": "/uploads/answer.mp3"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let response = client.llm_query("utterance.wav", wav_fixture()).await.unwrap();
    assert_eq!(response.audio_url, "/uploads/answer.mp3");
}

// =============================================================================
// Agent chat
// =============================================================================

#[tokio::test]
async fn test_agent_chat_json_reply_is_a_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/chat/sess-42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"audio_url": "/uploads/reply.mp3"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let reply = client.agent_chat("sess-42", "utterance.wav", wav_fixture()).await.unwrap();
    match reply {
        AgentChatReply::Url(url) => assert_eq!(url, "/uploads/reply.mp3"),
        other => panic!("expected a URL reply, got {other:?}"),
    }
}

#[tokio::test]
async fn test_agent_chat_binary_reply_carries_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/chat/sess-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![7u8; 32])
                .insert_header("content-type", "audio/mpeg"),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let reply = client.agent_chat("sess-42", "utterance.wav", wav_fixture()).await.unwrap();
    match reply {
        AgentChatReply::Audio { bytes, content_type, fallback } => {
            assert_eq!(bytes, vec![7u8; 32]);
            assert_eq!(content_type, "audio/mpeg");
            assert!(!fallback);
        }
        other => panic!("expected binary audio, got {other:?}"),
    }
}

#[tokio::test]
async fn test_agent_chat_fallback_header_is_flagged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/chat/sess-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![7u8; 16])
                .insert_header("content-type", "audio/mpeg")
                .insert_header("x-error", "true"),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let reply = client.agent_chat("sess-42", "utterance.wav", wav_fixture()).await.unwrap();
    match reply {
        AgentChatReply::Audio { fallback, .. } => assert!(fallback),
        other => panic!("expected binary audio, got {other:?}"),
    }
}

// =============================================================================
// Downloads
// =============================================================================

#[tokio::test]
async fn test_download_resolves_relative_urls_against_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/reply.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let bytes = client.download("/uploads/reply.mp3").await.unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_download_accepts_absolute_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/abs.wav"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8; 4]))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let bytes = client.download(&format!("{}/uploads/abs.wav", server.uri())).await.unwrap();
    assert_eq!(bytes, vec![9u8; 4]);
}

#[tokio::test]
async fn test_download_of_missing_file_is_a_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/gone.mp3"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "File not found"})))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let err = client.download("/uploads/gone.mp3").await.unwrap_err();
    match err {
        ApiError::Backend { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "File not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
