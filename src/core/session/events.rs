//! Session lifecycle vocabulary.
//!
//! Everything that can happen to a recording session is an event, and every
//! side effect the session performs is an action. The driver feeds events
//! through one dispatch function and executes the actions it gets back, so
//! ordering and cancellation are testable without a microphone or a socket.

/// Named lifecycle states of one recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing running. Every failure path leads back here, retryable.
    #[default]
    Idle,
    /// Capture requested and channel being opened.
    Connecting,
    /// Frames flowing out, responses flowing in.
    Streaming,
    /// Teardown requested, waiting for the channel to confirm closure.
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Inputs to the session state machine, from the caller or the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Caller asked the session to start.
    StartRequested,
    /// The capture source was acquired (the permission prompt, where one
    /// exists, was granted).
    CaptureReady,
    /// The capture source could not be acquired or died mid-stream.
    CaptureFailed(String),
    /// The duplex channel finished its handshake.
    ChannelOpened,
    /// The duplex channel could not be opened or failed in flight.
    ChannelFailed(String),
    /// The capture source ran out of frames.
    InputExhausted,
    /// Caller asked the session to stop. Idempotent.
    StopRequested,
    /// The duplex channel is confirmed closed.
    ChannelClosed,
}

/// Side effects the driver performs in response to an event, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Acquire the capture source (fires the permission prompt).
    AcquireCapture,
    /// Open the duplex channel and run its handshake.
    OpenChannel,
    /// Start pumping frames from the capture source into the channel.
    BeginStreaming,
    /// Stop the frame pump and release the capture source.
    StopCapture,
    /// Send the end-of-input sentinel; the channel stays open.
    SendEof,
    /// Send the stop control message (if configured) and close the channel.
    CloseChannel,
    /// Drop any queued playback segments.
    ClearPlayback,
    /// Surface a failure without tearing the process down.
    ReportError(String),
}
