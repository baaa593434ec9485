//! Duplex streaming client for the voice-agent WebSocket.
//!
//! Owns the connection lifecycle: open the socket, send the `start`/`config`
//! handshake, pump PCM frames out and server messages in, and tear the
//! session down in a fixed order. Inbound messages are dispatched straight to
//! async callbacks, so the caller never touches the socket.
//!
//! # Handshake ordering
//!
//! The handshake frames are written before the connection task is spawned and
//! before the client reports ready, so no audio frame can ever reach the wire
//! ahead of the `config` message.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voxlink::core::stream::{StreamClient, StreamConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut client = StreamClient::new(StreamConfig::default()).unwrap();
//!
//!     client.on_transcript(Arc::new(|turn| Box::pin(async move {
//!         println!("{}: {}", turn.role, turn.text);
//!     })));
//!
//!     client.connect().await.unwrap();
//!     client.send_audio(&frame);
//!     client.finish_input();
//!     client.close().await.unwrap();
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::config::StreamConfig;
use super::messages::{ConfigMessage, EOF_SENTINEL, ServerMessage, StartMessage, StopMessage};
use crate::core::audio::chunks::{ChunkAssembler, ChunkProgress};
use crate::core::audio::pcm;
use crate::core::transcript::{ChatTurn, TurnFilter};

/// Upper bound on one encoded outbound frame. Anything larger is a caller
/// bug, not a capture buffer.
const MAX_FRAME_BYTES: usize = 256 * 1024;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Shared slot for an optional callback. Locked only long enough to clone the
/// callback out, never across an await.
type Slot<T> = Arc<Mutex<Option<T>>>;

// =============================================================================
// Errors and state
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("WebSocket error: {0}")]
    WebSocketError(String),
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("Not connected")]
    NotConnected,
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Connection lifecycle. There is no reconnecting state: a lost connection is
/// reported and stays down until the caller connects again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// Severity of a status line update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// Human-readable progress reported by the server or derived client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusUpdate {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, text: text.into() }
    }
}

// =============================================================================
// Callback types
// =============================================================================

/// Invoked once per rendered transcript turn (user turns that survived the
/// duplicate filter, plus every assistant update).
pub type TranscriptCallback =
    Arc<dyn Fn(ChatTurn) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Invoked with decoded audio bytes ready for playback.
pub type AudioOutputCallback =
    Arc<dyn Fn(Vec<u8>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Invoked on status line changes.
pub type StatusCallback =
    Arc<dyn Fn(StatusUpdate) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Side channel for transport failures. Nothing is raised to senders
/// directly; they observe readiness instead.
pub type StreamErrorCallback =
    Arc<dyn Fn(StreamError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Invoked once when the connection task ends, whether the client, the
/// server or a transport failure ended it.
pub type CloseCallback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Client
// =============================================================================

/// Client for one duplex voice-agent session.
///
/// All shared state lives behind `Arc` so the spawned connection task and the
/// owning struct stay consistent; the `connected` flag is an `AtomicBool` for
/// lock-free readiness checks on the audio hot path.
pub struct StreamClient {
    config: StreamConfig,
    state: Arc<RwLock<ConnectionState>>,
    connected: Arc<AtomicBool>,
    frames_dropped: Arc<AtomicU64>,

    audio_tx: Option<mpsc::Sender<Bytes>>,
    control_tx: Option<mpsc::Sender<String>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    connection_handle: Option<JoinHandle<()>>,

    transcript_callback: Slot<TranscriptCallback>,
    audio_callback: Slot<AudioOutputCallback>,
    status_callback: Slot<StatusCallback>,
    error_callback: Slot<StreamErrorCallback>,
    close_callback: Slot<CloseCallback>,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            connected: Arc::new(AtomicBool::new(false)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            audio_tx: None,
            control_tx: None,
            shutdown_tx: None,
            connection_handle: None,
            transcript_callback: Arc::new(Mutex::new(None)),
            audio_callback: Arc::new(Mutex::new(None)),
            status_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            close_callback: Arc::new(Mutex::new(None)),
        })
    }

    pub fn on_transcript(&self, callback: TranscriptCallback) {
        *self.transcript_callback.lock() = Some(callback);
    }

    pub fn on_audio(&self, callback: AudioOutputCallback) {
        *self.audio_callback.lock() = Some(callback);
    }

    pub fn on_status(&self, callback: StatusCallback) {
        *self.status_callback.lock() = Some(callback);
    }

    pub fn on_error(&self, callback: StreamErrorCallback) {
        *self.error_callback.lock() = Some(callback);
    }

    pub fn on_close(&self, callback: CloseCallback) {
        *self.close_callback.lock() = Some(callback);
    }

    /// Open the socket, send the handshake and start the connection task.
    /// A no-op when already connected.
    pub async fn connect(&mut self) -> Result<(), StreamError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        *self.state.write().await = ConnectionState::Connecting;

        let request = self.build_request()?;
        let connect = tokio_tungstenite::connect_async(request);
        let (ws_stream, _response) =
            match tokio::time::timeout(self.config.connect_timeout, connect).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    *self.state.write().await = ConnectionState::Failed;
                    return Err(StreamError::ConnectionFailed(e.to_string()));
                }
                Err(_) => {
                    *self.state.write().await = ConnectionState::Failed;
                    return Err(StreamError::Timeout(self.config.connect_timeout));
                }
            };

        tracing::info!("Connected to voice agent at {}", self.config.endpoint);

        let (mut ws_sink, ws_stream) = ws_stream.split();

        // Handshake goes out before the sender channels exist, so audio can
        // never overtake the config message.
        if let Err(e) = self.send_handshake(&mut ws_sink).await {
            *self.state.write().await = ConnectionState::Failed;
            return Err(e);
        }

        let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(self.config.channel_capacity);
        let (control_tx, control_rx) = mpsc::channel::<String>(self.config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.audio_tx = Some(audio_tx);
        self.control_tx = Some(control_tx);
        self.shutdown_tx = Some(shutdown_tx);

        let transcript_cb = self.transcript_callback.clone();
        let audio_cb = self.audio_callback.clone();
        let status_cb = self.status_callback.clone();
        let error_cb = self.error_callback.clone();
        let close_cb = self.close_callback.clone();
        let state = self.state.clone();
        let connected = self.connected.clone();
        let filter_config = self.config.filter.clone();
        let send_stop = self.config.send_stop;

        self.connected.store(true, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Connected;

        let handle = tokio::spawn(Self::run_connection(
            ws_sink,
            ws_stream,
            audio_rx,
            control_rx,
            shutdown_rx,
            send_stop,
            TurnFilter::new(filter_config),
            transcript_cb,
            audio_cb,
            status_cb,
            error_cb,
            close_cb,
            state,
            connected,
        ));
        self.connection_handle = Some(handle);

        Ok(())
    }

    /// Convert one float frame to PCM and hand it to the connection task.
    /// Returns `false` (and counts the frame as dropped) when the session is
    /// not ready or the outbound channel is full; dropped frames are never
    /// queued or retried.
    pub fn send_audio(&self, samples: &[f32]) -> bool {
        if !self.is_ready() {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Channel not open, dropping audio frame");
            return false;
        }
        self.send_frame(pcm::encode_frame(samples))
    }

    /// Forward an already-encoded PCM frame. Same drop semantics as
    /// [`send_audio`](Self::send_audio).
    pub fn send_frame(&self, frame: Bytes) -> bool {
        if frame.len() > MAX_FRAME_BYTES {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Dropping oversized audio frame ({} bytes)", frame.len());
            return false;
        }
        let Some(tx) = &self.audio_tx else {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(e) => {
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Dropping audio frame: {}", e);
                false
            }
        }
    }

    /// Tell the server the caller is done speaking. The socket stays open so
    /// the response can stream back.
    pub fn finish_input(&self) -> bool {
        if !self.config.send_eof || !self.is_ready() {
            return false;
        }
        let Some(tx) = &self.control_tx else { return false };
        match tx.try_send(EOF_SENTINEL.to_string()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Failed to queue EOF sentinel: {}", e);
                false
            }
        }
    }

    /// Tear the session down: optionally send `stop`, close the socket and
    /// wait for the connection task to finish. Safe to call twice; the second
    /// call is a no-op.
    pub async fn close(&mut self) -> Result<(), StreamError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.connection_handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Connection task ended abnormally: {}", e);
            }
        }
        self.audio_tx = None;
        self.control_tx = None;
        self.connected.store(false, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Disconnected;
        Ok(())
    }

    /// Lock-free readiness check for the audio hot path.
    pub fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.audio_tx.is_some()
    }

    /// Detachable handle for feeding audio from another task. `None` until
    /// [`connect`](Self::connect) has succeeded.
    pub fn frame_sender(&self) -> Option<FrameSender> {
        self.audio_tx.as_ref().map(|tx| FrameSender {
            audio_tx: tx.clone(),
            connected: self.connected.clone(),
            frames_dropped: self.frames_dropped.clone(),
        })
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Frames dropped because the channel was not ready or was backed up.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    fn build_request(&self) -> Result<http::Request<()>, StreamError> {
        let parsed = Url::parse(&self.config.endpoint)
            .map_err(|e| StreamError::InvalidConfiguration(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| StreamError::InvalidConfiguration("endpoint has no host".to_string()))?;
        let host_header = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        http::Request::builder()
            .uri(self.config.endpoint.as_str())
            .header("Sec-WebSocket-Key", tungstenite::handshake::client::generate_key())
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host_header)
            .body(())
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))
    }

    async fn send_handshake(&self, ws_sink: &mut WsSink) -> Result<(), StreamError> {
        if self.config.send_start {
            let json = serde_json::to_string(&StartMessage::default())?;
            ws_sink
                .send(Message::Text(json.into()))
                .await
                .map_err(|e| StreamError::WebSocketError(e.to_string()))?;
        }
        if self.config.send_config {
            let json = serde_json::to_string(&ConfigMessage::new(self.config.keys.clone()))?;
            ws_sink
                .send(Message::Text(json.into()))
                .await
                .map_err(|e| StreamError::WebSocketError(e.to_string()))?;
            tracing::debug!("Session config sent");
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_connection(
        mut ws_sink: WsSink,
        mut ws_stream: WsStream,
        mut audio_rx: mpsc::Receiver<Bytes>,
        mut control_rx: mpsc::Receiver<String>,
        mut shutdown_rx: oneshot::Receiver<()>,
        send_stop: bool,
        mut filter: TurnFilter,
        transcript_cb: Slot<TranscriptCallback>,
        audio_cb: Slot<AudioOutputCallback>,
        status_cb: Slot<StatusCallback>,
        error_cb: Slot<StreamErrorCallback>,
        close_cb: Slot<CloseCallback>,
        state: Arc<RwLock<ConnectionState>>,
        connected: Arc<AtomicBool>,
    ) {
        let mut assembler = ChunkAssembler::new();

        loop {
            tokio::select! {
                Some(frame) = audio_rx.recv() => {
                    if let Err(e) = ws_sink.send(Message::Binary(frame)).await {
                        tracing::error!("Failed to send audio frame: {}", e);
                        emit_error(&error_cb, StreamError::WebSocketError(e.to_string())).await;
                        break;
                    }
                }

                Some(text) = control_rx.recv() => {
                    if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                        tracing::error!("Failed to send control message: {}", e);
                        emit_error(&error_cb, StreamError::WebSocketError(e.to_string())).await;
                        break;
                    }
                }

                Some(msg) = ws_stream.next() => {
                    match msg {
                        Ok(Message::Text(text)) => {
                            Self::dispatch_message(
                                &text,
                                &mut filter,
                                &mut assembler,
                                &transcript_cb,
                                &audio_cb,
                                &status_cb,
                            ).await;
                        }
                        Ok(Message::Close(_)) => {
                            tracing::info!("WebSocket closed by server");
                            break;
                        }
                        Ok(Message::Ping(data)) => {
                            if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                tracing::error!("Failed to send pong: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::error!("WebSocket error: {}", e);
                            emit_error(&error_cb, StreamError::WebSocketError(e.to_string())).await;
                            break;
                        }
                        _ => {}
                    }
                }

                _ = &mut shutdown_rx => {
                    if send_stop {
                        match serde_json::to_string(&StopMessage::default()) {
                            Ok(json) => {
                                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                                    tracing::debug!("Failed to send stop message: {}", e);
                                }
                            }
                            Err(e) => tracing::error!("Failed to serialize stop message: {}", e),
                        }
                    }
                    let _ = ws_sink.send(Message::Close(None)).await;
                    tracing::info!("Session closed by client");
                    break;
                }

                else => break,
            }
        }

        connected.store(false, Ordering::SeqCst);
        *state.write().await = ConnectionState::Disconnected;
        let cb = close_cb.lock().clone();
        if let Some(cb) = cb {
            cb().await;
        }
        tracing::debug!("Connection task ended");
    }

    /// Route one inbound text frame. A frame that fails to decode is logged
    /// and skipped; the connection stays up.
    async fn dispatch_message(
        text: &str,
        filter: &mut TurnFilter,
        assembler: &mut ChunkAssembler,
        transcript_cb: &Slot<TranscriptCallback>,
        audio_cb: &Slot<AudioOutputCallback>,
        status_cb: &Slot<StatusCallback>,
    ) {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Failed to parse server message: {} - {}", e, text);
                return;
            }
        };

        match message {
            ServerMessage::Transcription(t) if !t.end_of_turn => {
                tracing::trace!("Dropping partial transcript");
            }
            ServerMessage::Transcription(t) => {
                deliver_user_turn(t.text, filter, transcript_cb).await;
            }
            ServerMessage::Final(t) => {
                deliver_user_turn(t.text, filter, transcript_cb).await;
            }
            ServerMessage::Assistant(t) | ServerMessage::Llm(t) => {
                let cb = transcript_cb.lock().clone();
                if let Some(cb) = cb {
                    cb(ChatTurn::assistant(t.text)).await;
                }
            }
            ServerMessage::Audio(audio) => match audio.decode() {
                Ok(bytes) => {
                    let cb = audio_cb.lock().clone();
                    if let Some(cb) = cb {
                        cb(bytes).await;
                    }
                }
                Err(e) => tracing::warn!("Failed to decode audio payload: {}", e),
            },
            ServerMessage::AudioChunk(chunk) => match assembler.push(&chunk) {
                ChunkProgress::Accumulating { received, expected } => {
                    emit_status(
                        status_cb,
                        StatusUpdate::info(format!("Receiving audio: {received}/{expected} chunks")),
                    )
                    .await;
                }
                ChunkProgress::Complete { audio, total } => {
                    emit_status(
                        status_cb,
                        StatusUpdate::info(format!(
                            "Audio received ({total} chunks). Ready for next turn."
                        )),
                    )
                    .await;
                    if !audio.is_empty() {
                        let cb = audio_cb.lock().clone();
                        if let Some(cb) = cb {
                            cb(audio).await;
                        }
                    }
                }
            },
            ServerMessage::AudioComplete(_) => {
                if let Some((audio, total)) = assembler.finish() {
                    emit_status(
                        status_cb,
                        StatusUpdate::info(format!(
                            "Audio received ({total} chunks). Ready for next turn."
                        )),
                    )
                    .await;
                    let cb = audio_cb.lock().clone();
                    if let Some(cb) = cb {
                        cb(audio).await;
                    }
                }
            }
            ServerMessage::TurnEnd(t) => {
                let text = t
                    .message
                    .unwrap_or_else(|| "Turn completed. Processing response...".to_string());
                emit_status(status_cb, StatusUpdate::info(text)).await;
            }
            ServerMessage::Status(s) => {
                emit_status(status_cb, StatusUpdate::info(s.message)).await;
            }
            ServerMessage::Error(e) => {
                // Application errors keep the stream usable; only the status
                // line flips into its error state.
                emit_status(status_cb, StatusUpdate::error(format!("Error: {}", e.message))).await;
            }
            ServerMessage::Unknown(tag) => {
                tracing::trace!("Ignoring unknown message type: {}", tag);
            }
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Cloneable handle that pumps PCM frames into a connected client. Carries
/// the same silent-drop semantics as [`StreamClient::send_audio`].
#[derive(Clone)]
pub struct FrameSender {
    audio_tx: mpsc::Sender<Bytes>,
    connected: Arc<AtomicBool>,
    frames_dropped: Arc<AtomicU64>,
}

impl FrameSender {
    pub fn send_audio(&self, samples: &[f32]) -> bool {
        if !self.is_ready() {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Channel not open, dropping audio frame");
            return false;
        }
        let frame = pcm::encode_frame(samples);
        if frame.len() > MAX_FRAME_BYTES {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Dropping oversized audio frame ({} bytes)", frame.len());
            return false;
        }
        match self.audio_tx.try_send(frame) {
            Ok(()) => true,
            Err(e) => {
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Dropping audio frame: {}", e);
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn deliver_user_turn(
    text: String,
    filter: &mut TurnFilter,
    transcript_cb: &Slot<TranscriptCallback>,
) {
    if filter.accept(&text) {
        let cb = transcript_cb.lock().clone();
        if let Some(cb) = cb {
            cb(ChatTurn::user(text)).await;
        }
    } else {
        tracing::debug!("Suppressed duplicate turn: {}", text);
    }
}

async fn emit_status(status_cb: &Slot<StatusCallback>, update: StatusUpdate) {
    let cb = status_cb.lock().clone();
    if let Some(cb) = cb {
        cb(update).await;
    }
}

async fn emit_error(error_cb: &Slot<StreamErrorCallback>, error: StreamError) {
    let cb = error_cb.lock().clone();
    if let Some(cb) = cb {
        cb(error).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let config = StreamConfig { endpoint: "not a url".to_string(), ..StreamConfig::default() };
        assert!(matches!(
            StreamClient::new(config),
            Err(StreamError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_send_audio_before_connect_is_a_silent_drop() {
        let client = StreamClient::new(StreamConfig::default()).unwrap();
        assert!(!client.send_audio(&[0.0; 16]));
        assert!(!client.send_audio(&[0.5; 16]));
        assert_eq!(client.frames_dropped(), 2);
        assert!(!client.is_ready());
    }

    #[tokio::test]
    async fn test_finish_input_requires_open_channel() {
        let client = StreamClient::new(StreamConfig::default()).unwrap();
        assert!(!client.finish_input());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_without_connection() {
        let mut client = StreamClient::new(StreamConfig::default()).unwrap();
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert_eq!(client.state().await, ConnectionState::Disconnected);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Failed.to_string(), "failed");
    }

    #[test]
    fn test_status_update_constructors() {
        assert_eq!(StatusUpdate::info("hi").level, StatusLevel::Info);
        assert_eq!(StatusUpdate::error("no").level, StatusLevel::Error);
    }
}
