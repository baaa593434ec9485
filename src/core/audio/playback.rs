//! Ordered playback of synthesized audio.
//!
//! Inbound audio arrives faster than it plays, so segments are queued and a
//! single worker plays them strictly in arrival order, one at a time. The
//! worker only advances when the sink reports the previous segment finished;
//! nothing is timer-driven. An optional start threshold holds the first
//! segment back until enough are buffered to ride out network jitter, after
//! which segments play back-to-back.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Errors a sink can report for one segment. Either way the queue skips the
/// segment and advances.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Audio decode failed: {0}")]
    Decode(String),
    #[error("Audio device error: {0}")]
    Device(String),
}

/// Destination for decoded audio segments. `play` returning is the completion
/// signal the queue advances on, so implementations must not return before
/// the segment has actually finished (or failed).
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: &[u8]) -> Result<(), PlaybackError>;
}

/// Queue lifecycle. At most one segment is ever in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Playing,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueState::Idle => write!(f, "idle"),
            QueueState::Playing => write!(f, "playing"),
        }
    }
}

/// Tunables for [`PlaybackQueue`].
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Segments that must be buffered before an idle queue starts playing.
    /// `1` starts immediately; the threshold re-arms every time the queue
    /// drains back to idle.
    pub start_threshold: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { start_threshold: 2 }
    }
}

struct QueueInner {
    queue: Mutex<VecDeque<Vec<u8>>>,
    state: Mutex<QueueState>,
    notify: Notify,
    shutdown: AtomicBool,
    start_threshold: usize,
    items_played: AtomicU64,
    items_skipped: AtomicU64,
}

/// Strict-FIFO playback queue backed by one worker task.
///
/// Cloning is cheap and all clones share the same queue and worker. The
/// worker runs until [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct PlaybackQueue {
    inner: Arc<QueueInner>,
}

impl PlaybackQueue {
    /// Create the queue and spawn its worker on the current runtime.
    pub fn new(config: PlaybackConfig, sink: Arc<dyn AudioSink>) -> Self {
        let inner = Arc::new(QueueInner {
            queue: Mutex::new(VecDeque::new()),
            state: Mutex::new(QueueState::Idle),
            notify: Notify::new(),
            shutdown: AtomicBool::new(false),
            start_threshold: config.start_threshold.max(1),
            items_played: AtomicU64::new(0),
            items_skipped: AtomicU64::new(0),
        });
        tokio::spawn(Self::run_worker(Arc::clone(&inner), sink));
        Self { inner }
    }

    /// Append one segment to the tail of the queue.
    pub fn enqueue(&self, audio: Vec<u8>) {
        if self.inner.shutdown.load(Ordering::Acquire) {
            debug!("Playback queue is shut down, dropping segment");
            return;
        }
        self.inner.queue.lock().push_back(audio);
        self.inner.notify.notify_one();
    }

    /// Number of segments waiting (excludes any segment currently playing).
    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }

    pub fn state(&self) -> QueueState {
        *self.inner.state.lock()
    }

    /// Drop all waiting segments. A segment already in flight finishes on its
    /// own; it cannot be interrupted mid-play.
    pub fn clear(&self) {
        self.inner.queue.lock().clear();
    }

    /// Stop the worker after the in-flight segment (if any) completes.
    /// Pending segments are discarded. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.queue.lock().clear();
        self.inner.notify.notify_one();
    }

    pub fn items_played(&self) -> u64 {
        self.inner.items_played.load(Ordering::Relaxed)
    }

    pub fn items_skipped(&self) -> u64 {
        self.inner.items_skipped.load(Ordering::Relaxed)
    }

    async fn run_worker(inner: Arc<QueueInner>, sink: Arc<dyn AudioSink>) {
        loop {
            inner.notify.notified().await;
            if inner.shutdown.load(Ordering::Acquire) {
                break;
            }
            // Stay idle until the buffer threshold is met.
            if inner.queue.lock().len() < inner.start_threshold {
                continue;
            }

            *inner.state.lock() = QueueState::Playing;
            loop {
                if inner.shutdown.load(Ordering::Acquire) {
                    *inner.state.lock() = QueueState::Idle;
                    return;
                }
                let segment = inner.queue.lock().pop_front();
                let Some(segment) = segment else { break };

                match sink.play(&segment).await {
                    Ok(()) => {
                        inner.items_played.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        // A bad segment must not stall the queue.
                        warn!(error = %e, "Skipping playback segment");
                        inner.items_skipped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            *inner.state.lock() = QueueState::Idle;
        }
    }
}
