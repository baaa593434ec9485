use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure.
///
/// All fields are optional to allow partial configuration; anything left
/// unset keeps the value from the environment or the built-in default.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   url: "http://localhost:8000"
///   ws_path: "/ws"
///   session_id: "demo-session"
///   voice_id: "en-US-natalie"
///   connect_timeout_secs: 10
///
/// keys:
///   murf: "your-murf-key"
///   assemblyai: "your-assemblyai-key"
///   gemini: "your-gemini-key"
///   serpapi: "your-serpapi-key"
///
/// audio:
///   sample_rate: 16000
///   frame_samples: 4096
///
/// filter:
///   min_chars: 3
///   min_gap_ms: 2000
///   seen_ttl_ms: 2000
///
/// playback:
///   start_threshold: 2
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub keys: Option<KeysYaml>,
    pub audio: Option<AudioYaml>,
    pub filter: Option<FilterYaml>,
    pub playback: Option<PlaybackYaml>,
}

/// Backend connection settings from YAML.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub url: Option<String>,
    pub ws_path: Option<String>,
    pub session_id: Option<String>,
    pub voice_id: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

/// Provider API keys from YAML. These travel only inside the handshake
/// `config` message, never in HTTP headers or query strings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KeysYaml {
    pub murf: Option<String>,
    pub assemblyai: Option<String>,
    pub gemini: Option<String>,
    pub serpapi: Option<String>,
}

/// Upstream PCM framing from YAML.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub sample_rate: Option<u32>,
    pub frame_samples: Option<usize>,
}

/// Duplicate-turn suppression tuning from YAML.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterYaml {
    pub min_chars: Option<usize>,
    pub min_gap_ms: Option<u64>,
    pub seen_ttl_ms: Option<u64>,
}

/// Playback queue tuning from YAML.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PlaybackYaml {
    pub start_threshold: Option<usize>,
}

impl YamlConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Commented template emitted by the `generate-config` subcommand.
pub(super) const TEMPLATE: &str = r#"# voxlink configuration.
# Priority: this file > environment variables > .env > built-in defaults.

server:
  # Base URL of the voice backend. The streaming endpoint derives from it
  # (http -> ws, https -> wss).
  url: "http://localhost:8000"
  # WebSocket path of the streaming conversation loop.
  ws_path: "/ws"
  # Conversation identity for the chat subcommand. Leave unset to generate
  # a fresh UUID per run.
  # session_id: "my-session"
  # Voice used for synthesis.
  voice_id: "en-US-natalie"
  # Seconds to wait for the WebSocket handshake.
  connect_timeout_secs: 10

# Provider keys forwarded to the backend inside the handshake config
# message. MURF_API_KEY, ASSEMBLYAI_API_KEY, GEMINI_API_KEY and
# SERPAPI_API_KEY environment variables fill these when unset here.
keys:
  # murf: "your-murf-key"
  # assemblyai: "your-assemblyai-key"
  # gemini: "your-gemini-key"
  # serpapi: "your-serpapi-key"

audio:
  # PCM sent upstream: mono 16-bit little-endian at this rate.
  sample_rate: 16000
  # Samples per outbound frame.
  frame_samples: 4096

filter:
  # Normalized transcripts with this many characters or fewer are noise.
  min_chars: 3
  # Repeated or rapid-fire transcripts inside this window are suppressed.
  min_gap_ms: 2000
  seen_ttl_ms: 2000

playback:
  # Audio segments buffered before an idle queue starts playing.
  start_threshold: 2
"#;
