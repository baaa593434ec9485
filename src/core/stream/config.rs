//! Connection settings for the streaming client.

use std::time::Duration;

use url::Url;

use super::client::StreamError;
use super::messages::SessionKeys;
use crate::core::audio::pcm;
use crate::core::transcript::FilterConfig;

/// Everything [`StreamClient`](super::StreamClient) needs to open and run one
/// duplex session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Full `ws://` or `wss://` endpoint of the voice-agent server.
    pub endpoint: String,
    /// Sample rate of the PCM frames this client will send.
    pub sample_rate: u32,
    /// Samples per outbound frame.
    pub frame_samples: usize,
    /// Provider credentials forwarded in the handshake `config` message.
    pub keys: SessionKeys,
    /// Send the `start` handshake frame after connecting.
    pub send_start: bool,
    /// Send the `config` handshake frame after connecting.
    pub send_config: bool,
    /// Send the EOF sentinel when input is exhausted.
    pub send_eof: bool,
    /// Send `{"type":"stop"}` before closing the socket.
    pub send_stop: bool,
    /// How long to wait for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Depth of the outbound audio and control channels.
    pub channel_capacity: usize,
    /// Duplicate-turn suppression tuning for this session.
    pub filter: FilterConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8000/ws".to_string(),
            sample_rate: pcm::SAMPLE_RATE,
            frame_samples: pcm::FRAME_SAMPLES,
            keys: SessionKeys::default(),
            send_start: true,
            send_config: true,
            send_eof: true,
            send_stop: true,
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 32,
            filter: FilterConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Check the configuration before any connection attempt.
    pub fn validate(&self) -> Result<(), StreamError> {
        let parsed = Url::parse(&self.endpoint).map_err(|e| {
            StreamError::InvalidConfiguration(format!("invalid endpoint '{}': {e}", self.endpoint))
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(StreamError::InvalidConfiguration(format!(
                "endpoint must use ws:// or wss://, got '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(StreamError::InvalidConfiguration("endpoint has no host".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(StreamError::InvalidConfiguration("sample_rate must be non-zero".to_string()));
        }
        if self.frame_samples == 0 {
            return Err(StreamError::InvalidConfiguration("frame_samples must be non-zero".to_string()));
        }
        if self.channel_capacity == 0 {
            return Err(StreamError::InvalidConfiguration(
                "channel_capacity must be non-zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(StreamError::InvalidConfiguration(
                "connect_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build a WebSocket endpoint from an HTTP(S) base URL and a socket path.
/// `http` maps to `ws` and `https` to `wss`; existing `ws`/`wss` schemes pass
/// through unchanged.
pub fn ws_endpoint(base_url: &str, path: &str) -> Result<String, StreamError> {
    let parsed = Url::parse(base_url).map_err(|e| {
        StreamError::InvalidConfiguration(format!("invalid base URL '{base_url}': {e}"))
    })?;
    let scheme = match parsed.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(StreamError::InvalidConfiguration(format!(
                "unsupported URL scheme '{other}'"
            )));
        }
    };
    let host = parsed
        .host_str()
        .ok_or_else(|| StreamError::InvalidConfiguration("base URL has no host".to_string()))?;

    let mut url = String::with_capacity(256);
    url.push_str(scheme);
    url.push_str("://");
    url.push_str(host);
    if let Some(port) = parsed.port() {
        url.push(':');
        url.push_str(&port.to_string());
    }
    if !path.starts_with('/') {
        url.push('/');
    }
    url.push_str(path);
    Ok(url)
}
