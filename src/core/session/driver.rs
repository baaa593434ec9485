//! Session orchestration.
//!
//! [`SessionMachine`] is the pure state machine: one dispatch function maps
//! (state, event) to the next state plus an ordered list of actions, nothing
//! else. [`SessionDriver`] owns the real resources (capture source, stream
//! client, playback queue, transcript log) and executes those actions,
//! feeding resulting events back through the same dispatch function. All
//! shared state is touched from the driver's single event loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{SessionAction, SessionEvent, SessionState};
use crate::core::audio::capture::{AudioSource, CaptureError};
use crate::core::audio::playback::PlaybackQueue;
use crate::core::stream::client::{
    StatusCallback, StatusUpdate, StreamClient, TranscriptCallback,
};
use crate::core::transcript::TranscriptLog;

/// Why a session ended in failure. Both kinds leave the driver idle and
/// retryable; nothing here is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Capture failed: {0}")]
    Capture(String),
    #[error("Stream failed: {0}")]
    Stream(String),
}

/// Builds the capture source when the session actually starts. Acquiring a
/// device can block on a permission prompt, so it must not happen at
/// construction time.
pub type SourceFactory = Box<dyn FnOnce() -> Result<Box<dyn AudioSource>, CaptureError> + Send>;

/// Driver tunables.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// After the capture source runs dry, request a stop automatically once
    /// this much time has passed (long enough for the response to stream
    /// back). `None` leaves stopping entirely to the caller.
    pub auto_stop_after_input: Option<Duration>,
}

// =============================================================================
// State machine
// =============================================================================

/// Pure session state machine. Holds nothing but the current state.
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self { state: SessionState::Idle }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Advance on one event, returning the actions to perform in order.
    /// Unexpected (state, event) pairs are ignored, which is what makes the
    /// stop path idempotent.
    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        use SessionAction as A;
        use SessionEvent as E;
        use SessionState as S;

        let (next, actions) = match (self.state, event) {
            (S::Idle, E::StartRequested) => (S::Connecting, vec![A::AcquireCapture]),

            (S::Connecting, E::CaptureReady) => (S::Connecting, vec![A::OpenChannel]),
            // Permission denied: nothing was opened, so nothing to close.
            (S::Connecting, E::CaptureFailed(e)) => (S::Idle, vec![A::ReportError(e)]),
            (S::Connecting, E::ChannelOpened) => (S::Streaming, vec![A::BeginStreaming]),
            (S::Connecting, E::ChannelFailed(e)) => {
                (S::Idle, vec![A::StopCapture, A::ReportError(e)])
            }
            (S::Connecting, E::StopRequested) => {
                (S::Idle, vec![A::StopCapture, A::CloseChannel])
            }

            // Input ran dry but the response still has to stream back, so
            // the session stays up with capture released.
            (S::Streaming, E::InputExhausted) => {
                (S::Streaming, vec![A::StopCapture, A::SendEof])
            }
            (S::Streaming, E::CaptureFailed(e)) => {
                (S::Streaming, vec![A::StopCapture, A::SendEof, A::ReportError(e)])
            }
            (S::Streaming, E::StopRequested) => {
                (S::Stopping, vec![A::StopCapture, A::CloseChannel, A::ClearPlayback])
            }
            (S::Streaming, E::ChannelFailed(e)) => {
                (S::Idle, vec![A::StopCapture, A::ClearPlayback, A::ReportError(e)])
            }
            (S::Streaming, E::ChannelClosed) => {
                (S::Idle, vec![A::StopCapture, A::ClearPlayback])
            }

            (S::Stopping, E::ChannelClosed) => (S::Idle, vec![]),
            (S::Stopping, E::ChannelFailed(e)) => (S::Idle, vec![A::ReportError(e)]),

            (state, event) => {
                tracing::debug!("Ignoring {:?} in state {}", event, state);
                (state, vec![])
            }
        };

        self.state = next;
        actions
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Cloneable handle for poking a running session from outside.
#[derive(Clone)]
pub struct SessionHandle {
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Ask the session to stop. Safe to call repeatedly; requests after the
    /// first are no-ops.
    pub fn request_stop(&self) {
        let _ = self.events_tx.send(SessionEvent::StopRequested);
    }
}

/// Owns one recording attempt end to end. Construct a fresh driver per
/// attempt; `run` consumes it and returns the transcript.
pub struct SessionDriver {
    machine: SessionMachine,
    client: StreamClient,
    source_factory: Option<SourceFactory>,
    source: Option<Box<dyn AudioSource>>,
    playback: PlaybackQueue,
    transcript: Arc<Mutex<TranscriptLog>>,
    options: SessionOptions,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    pump_stop: Arc<AtomicBool>,
    pump_handle: Option<JoinHandle<()>>,
    user_transcript: Arc<Mutex<Option<TranscriptCallback>>>,
    user_status: Arc<Mutex<Option<StatusCallback>>>,
    error: Option<SessionError>,
}

impl SessionDriver {
    pub fn new(
        client: StreamClient,
        source_factory: SourceFactory,
        playback: PlaybackQueue,
        options: SessionOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transcript = Arc::new(Mutex::new(TranscriptLog::new()));
        let user_transcript: Arc<Mutex<Option<TranscriptCallback>>> = Arc::new(Mutex::new(None));
        let user_status: Arc<Mutex<Option<StatusCallback>>> = Arc::new(Mutex::new(None));

        let log = transcript.clone();
        let tap = user_transcript.clone();
        client.on_transcript(Arc::new(move |turn| {
            let log = log.clone();
            let tap = tap.lock().clone();
            Box::pin(async move {
                log.lock().record(turn.clone());
                if let Some(cb) = tap {
                    cb(turn).await;
                }
            })
        }));

        let queue = playback.clone();
        client.on_audio(Arc::new(move |bytes| {
            let queue = queue.clone();
            Box::pin(async move {
                queue.enqueue(bytes);
            })
        }));

        let tap = user_status.clone();
        client.on_status(Arc::new(move |update| {
            let tap = tap.lock().clone();
            Box::pin(async move {
                if let Some(cb) = tap {
                    cb(update).await;
                }
            })
        }));

        let tx = events_tx.clone();
        client.on_error(Arc::new(move |err| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(SessionEvent::ChannelFailed(err.to_string()));
            })
        }));

        // A server-initiated close must reach the machine too, not only the
        // teardown the driver starts itself.
        let tx = events_tx.clone();
        client.on_close(Arc::new(move || {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(SessionEvent::ChannelClosed);
            })
        }));

        Self {
            machine: SessionMachine::new(),
            client,
            source_factory: Some(source_factory),
            source: None,
            playback,
            transcript,
            options,
            events_tx,
            events_rx,
            pump_stop: Arc::new(AtomicBool::new(false)),
            pump_handle: None,
            user_transcript,
            user_status,
            error: None,
        }
    }

    /// Observe every rendered transcript turn as it lands in the log.
    pub fn on_transcript(&self, callback: TranscriptCallback) {
        *self.user_transcript.lock() = Some(callback);
    }

    /// Observe status line changes.
    pub fn on_status(&self, callback: StatusCallback) {
        *self.user_status.lock() = Some(callback);
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle { events_tx: self.events_tx.clone() }
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Run the session until it returns to idle, then hand back everything
    /// that was transcribed. A failed capture or channel surfaces as `Err`
    /// after the session has cleaned up; the caller can simply try again.
    pub async fn run(mut self) -> Result<TranscriptLog, SessionError> {
        self.dispatch(SessionEvent::StartRequested).await;

        while self.machine.state() != SessionState::Idle {
            let Some(event) = self.events_rx.recv().await else { break };
            self.dispatch(event).await;
        }

        self.stop_pump().await;
        let transcript = self.transcript.lock().clone();
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(transcript),
        }
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        tracing::debug!("Session event {:?} in state {}", event, self.machine.state());

        match (self.machine.state(), &event) {
            (SessionState::Connecting, SessionEvent::CaptureFailed(e)) => {
                self.error = Some(SessionError::Capture(e.clone()));
            }
            (_, SessionEvent::ChannelFailed(e)) => {
                self.error = Some(SessionError::Stream(e.clone()));
            }
            _ => {}
        }

        if matches!(event, SessionEvent::InputExhausted) {
            if let Some(delay) = self.options.auto_stop_after_input {
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SessionEvent::StopRequested);
                });
            }
        }

        for action in self.machine.dispatch(event) {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::AcquireCapture => {
                let Some(factory) = self.source_factory.take() else {
                    let _ = self.events_tx.send(SessionEvent::CaptureFailed(
                        "capture source already consumed".to_string(),
                    ));
                    return;
                };
                match factory() {
                    Ok(source) => {
                        self.source = Some(source);
                        let _ = self.events_tx.send(SessionEvent::CaptureReady);
                    }
                    Err(e) => {
                        let _ = self.events_tx.send(SessionEvent::CaptureFailed(e.to_string()));
                    }
                }
            }

            SessionAction::OpenChannel => match self.client.connect().await {
                Ok(()) => {
                    let _ = self.events_tx.send(SessionEvent::ChannelOpened);
                }
                Err(e) => {
                    let _ = self.events_tx.send(SessionEvent::ChannelFailed(e.to_string()));
                }
            },

            SessionAction::BeginStreaming => self.start_pump(),

            SessionAction::StopCapture => self.stop_pump().await,

            SessionAction::SendEof => {
                self.client.finish_input();
            }

            SessionAction::CloseChannel => {
                if let Err(e) = self.client.close().await {
                    tracing::warn!("Error while closing channel: {}", e);
                }
                let _ = self.events_tx.send(SessionEvent::ChannelClosed);
            }

            SessionAction::ClearPlayback => self.playback.clear(),

            SessionAction::ReportError(message) => {
                tracing::error!("Session error: {}", message);
                let cb = self.user_status.lock().clone();
                if let Some(cb) = cb {
                    cb(StatusUpdate::error(message)).await;
                }
            }
        }
    }

    fn start_pump(&mut self) {
        let Some(mut source) = self.source.take() else {
            tracing::warn!("No capture source to stream from");
            let _ = self.events_tx.send(SessionEvent::InputExhausted);
            return;
        };
        let Some(sender) = self.client.frame_sender() else {
            let _ = self.events_tx.send(SessionEvent::ChannelFailed(
                "channel not ready for streaming".to_string(),
            ));
            return;
        };

        let stop = Arc::new(AtomicBool::new(false));
        self.pump_stop = stop.clone();
        let events_tx = self.events_tx.clone();
        self.pump_handle = Some(tokio::spawn(async move {
            loop {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                match source.next_frame().await {
                    Ok(Some(frame)) => {
                        sender.send_audio(&frame);
                    }
                    Ok(None) => {
                        tracing::debug!("Capture source exhausted");
                        let _ = events_tx.send(SessionEvent::InputExhausted);
                        break;
                    }
                    Err(e) => {
                        let _ = events_tx.send(SessionEvent::CaptureFailed(e.to_string()));
                        break;
                    }
                }
            }
        }));
    }

    async fn stop_pump(&mut self) {
        self.pump_stop.store(true, Ordering::Release);
        if let Some(handle) = self.pump_handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!("Capture pump ended abnormally: {}", e);
                }
            }
        }
        self.source = None;
    }
}
