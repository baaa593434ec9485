//! Client configuration management.
//!
//! This module handles configuration from various sources: .env files, YAML
//! files, and environment variables. Priority: YAML > ENV vars > .env values
//! > defaults. The .env file is loaded into the environment in main.rs at
//! application startup.
//!
//! Submodules:
//! - `env`: Environment variable overlay
//! - `yaml`: YAML file structure and the generate-config template

mod env;
mod yaml;

pub use yaml::YamlConfig;

use std::path::Path;
use std::time::Duration;

use crate::core::audio::PlaybackConfig;
use crate::core::stream::{SessionKeys, StreamConfig, ws_endpoint};
use crate::core::transcript::FilterConfig;

/// Base URL of a local development backend.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Streaming endpoint path on the backend.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Voice used when none is configured.
pub const DEFAULT_VOICE_ID: &str = "en-US-natalie";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration.
///
/// Contains everything needed to talk to the voice backend: connection
/// settings, provider API keys forwarded in the streaming handshake, PCM
/// framing, and the tuning knobs for duplicate suppression and playback.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // Backend connection
    pub server_url: String,
    pub ws_path: String,
    /// Conversation identity; a UUID is generated per run when unset.
    pub session_id: Option<String>,
    pub connect_timeout_secs: u64,

    // Provider API keys, forwarded only inside the handshake config message
    pub murf_api_key: Option<String>,
    pub assemblyai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub serpapi_api_key: Option<String>,

    // Synthesis
    pub default_voice_id: String,

    // Upstream PCM framing
    pub sample_rate: u32,
    pub frame_samples: usize,

    // Duplicate-turn suppression
    pub filter_min_chars: usize,
    pub filter_min_gap_ms: u64,
    pub filter_seen_ttl_ms: u64,

    // Playback queue
    pub playback_start_threshold: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let filter = FilterConfig::default();
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_path: DEFAULT_WS_PATH.to_string(),
            session_id: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            murf_api_key: None,
            assemblyai_api_key: None,
            gemini_api_key: None,
            serpapi_api_key: None,
            default_voice_id: DEFAULT_VOICE_ID.to_string(),
            sample_rate: crate::core::audio::SAMPLE_RATE,
            frame_samples: crate::core::audio::FRAME_SAMPLES,
            filter_min_chars: filter.min_chars,
            filter_min_gap_ms: filter.min_gap.as_millis() as u64,
            filter_seen_ttl_ms: filter.seen_ttl.as_millis() as u64,
            playback_start_threshold: PlaybackConfig::default().start_threshold,
        }
    }
}

/// Zeroize all secret fields when the config is dropped so keys do not
/// linger in freed memory.
impl Drop for ClientConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.murf_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.assemblyai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.serpapi_api_key {
            key.zeroize();
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        env::apply_env(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        env::apply_env(&mut config);
        config.apply_yaml(YamlConfig::from_file(path)?);
        config.validate()?;
        Ok(config)
    }

    /// The YAML template written by the `generate-config` subcommand.
    pub fn yaml_template() -> &'static str {
        yaml::TEMPLATE
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) {
        if let Some(server) = yaml.server {
            if let Some(url) = server.url {
                self.server_url = url;
            }
            if let Some(path) = server.ws_path {
                self.ws_path = path;
            }
            if let Some(id) = server.session_id {
                self.session_id = Some(id);
            }
            if let Some(voice) = server.voice_id {
                self.default_voice_id = voice;
            }
            if let Some(secs) = server.connect_timeout_secs {
                self.connect_timeout_secs = secs;
            }
        }
        if let Some(keys) = yaml.keys {
            if let Some(key) = keys.murf {
                self.murf_api_key = Some(key);
            }
            if let Some(key) = keys.assemblyai {
                self.assemblyai_api_key = Some(key);
            }
            if let Some(key) = keys.gemini {
                self.gemini_api_key = Some(key);
            }
            if let Some(key) = keys.serpapi {
                self.serpapi_api_key = Some(key);
            }
        }
        if let Some(audio) = yaml.audio {
            if let Some(rate) = audio.sample_rate {
                self.sample_rate = rate;
            }
            if let Some(samples) = audio.frame_samples {
                self.frame_samples = samples;
            }
        }
        if let Some(filter) = yaml.filter {
            if let Some(chars) = filter.min_chars {
                self.filter_min_chars = chars;
            }
            if let Some(ms) = filter.min_gap_ms {
                self.filter_min_gap_ms = ms;
            }
            if let Some(ms) = filter.seen_ttl_ms {
                self.filter_seen_ttl_ms = ms;
            }
        }
        if let Some(playback) = yaml.playback {
            if let Some(threshold) = playback.start_threshold {
                self.playback_start_threshold = threshold;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.server_url)
            .map_err(|e| ConfigError::Invalid(format!("server_url '{}': {e}", self.server_url)))?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::Invalid(format!(
                "server_url scheme must be http(s) or ws(s), got '{}'",
                url.scheme()
            )));
        }
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "ws_path must start with '/', got '{}'",
                self.ws_path
            )));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be non-zero".into()));
        }
        if self.frame_samples == 0 {
            return Err(ConfigError::Invalid("frame_samples must be non-zero".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be non-zero".into(),
            ));
        }
        if self.playback_start_threshold == 0 {
            return Err(ConfigError::Invalid(
                "playback_start_threshold must be at least 1".into(),
            ));
        }
        if self.default_voice_id.is_empty() {
            return Err(ConfigError::Invalid("voice_id must not be empty".into()));
        }
        Ok(())
    }

    /// Provider keys in the shape the handshake config message carries.
    pub fn session_keys(&self) -> SessionKeys {
        SessionKeys {
            murf: self.murf_api_key.clone(),
            assemblyai: self.assemblyai_api_key.clone(),
            gemini: self.gemini_api_key.clone(),
            serpapi: self.serpapi_api_key.clone(),
        }
    }

    /// Full WebSocket endpoint derived from the base URL and path.
    pub fn ws_endpoint(&self) -> Result<String, ConfigError> {
        ws_endpoint(&self.server_url, &self.ws_path)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Configured session id, or a fresh UUID v4.
    pub fn session_id_or_generated(&self) -> String {
        self.session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            min_chars: self.filter_min_chars,
            min_gap: Duration::from_millis(self.filter_min_gap_ms),
            seen_ttl: Duration::from_millis(self.filter_seen_ttl_ms),
        }
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig { start_threshold: self.playback_start_threshold }
    }

    /// Stream client configuration for one session.
    pub fn stream_config(&self) -> Result<StreamConfig, ConfigError> {
        Ok(StreamConfig {
            endpoint: self.ws_endpoint()?,
            sample_rate: self.sample_rate,
            frame_samples: self.frame_samples,
            keys: self.session_keys(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            filter: self.filter_config(),
            ..StreamConfig::default()
        })
    }
}
