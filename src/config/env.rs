//! Environment variable overlay.
//!
//! Provider key names match what the backend's own `.env` files use, so a
//! shared `.env` works for both sides. Client-only knobs carry a `VOXLINK_`
//! prefix.

use super::ClientConfig;

pub(super) const ENV_SERVER_URL: &str = "VOXLINK_SERVER_URL";
pub(super) const ENV_WS_PATH: &str = "VOXLINK_WS_PATH";
pub(super) const ENV_SESSION_ID: &str = "VOXLINK_SESSION_ID";
pub(super) const ENV_VOICE_ID: &str = "VOXLINK_VOICE_ID";

pub(super) const ENV_MURF_API_KEY: &str = "MURF_API_KEY";
pub(super) const ENV_ASSEMBLYAI_API_KEY: &str = "ASSEMBLYAI_API_KEY";
pub(super) const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub(super) const ENV_SERPAPI_API_KEY: &str = "SERPAPI_API_KEY";

/// Read one variable, treating empty values as unset.
fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Overlay set environment variables onto `config`. Unset variables leave
/// the existing values alone.
pub(super) fn apply_env(config: &mut ClientConfig) {
    if let Some(url) = var(ENV_SERVER_URL) {
        config.server_url = url;
    }
    if let Some(path) = var(ENV_WS_PATH) {
        config.ws_path = path;
    }
    if let Some(id) = var(ENV_SESSION_ID) {
        config.session_id = Some(id);
    }
    if let Some(voice) = var(ENV_VOICE_ID) {
        config.default_voice_id = voice;
    }

    if let Some(key) = var(ENV_MURF_API_KEY) {
        config.murf_api_key = Some(key);
    }
    if let Some(key) = var(ENV_ASSEMBLYAI_API_KEY) {
        config.assemblyai_api_key = Some(key);
    }
    if let Some(key) = var(ENV_GEMINI_API_KEY) {
        config.gemini_api_key = Some(key);
    }
    if let Some(key) = var(ENV_SERPAPI_API_KEY) {
        config.serpapi_api_key = Some(key);
    }
}
