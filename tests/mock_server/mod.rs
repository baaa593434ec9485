//! In-process voice-agent WebSocket mock.
//!
//! Stands in for the backend's `/ws` endpoint: accepts connections on an
//! ephemeral port, records every inbound frame in arrival order, and plays a
//! scripted sequence of server frames either right after the connection opens
//! or when the EOF sentinel arrives.

// Allow dead code in test infrastructure - not every test binary uses every helper
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// One client-to-server frame as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Text(String),
    Binary(Vec<u8>),
}

impl Recorded {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Recorded::Text(t) => Some(t),
            Recorded::Binary(_) => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Recorded::Binary(_))
    }
}

/// One step of a scripted server response.
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a text frame to the client.
    Send(String),
    /// Wait before the next step.
    Pause(Duration),
    /// Close the connection from the server side.
    Close,
}

pub fn send(json: &str) -> Step {
    Step::Send(json.to_string())
}

pub fn pause(ms: u64) -> Step {
    Step::Pause(Duration::from_millis(ms))
}

/// What the mock plays back, and when.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Steps run as soon as a client connects (after its handshake frames
    /// have been read is NOT guaranteed; the mock sends independently).
    pub on_connect: Vec<Step>,
    /// Steps run when the EOF sentinel arrives.
    pub on_eof: Vec<Step>,
}

impl Script {
    pub fn on_connect(steps: Vec<Step>) -> Self {
        Self { on_connect: steps, ..Self::default() }
    }

    pub fn on_eof(steps: Vec<Step>) -> Self {
        Self { on_eof: steps, ..Self::default() }
    }
}

/// The mock server itself. Dropping it stops the accept loop.
pub struct MockVoiceServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Recorded>>>,
    connections: Arc<AtomicUsize>,
    accept_task: JoinHandle<()>,
}

impl MockVoiceServer {
    /// Bind an ephemeral port and start accepting connections.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let recorded = received.clone();
        let conns = connections.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                conns.fetch_add(1, Ordering::SeqCst);
                let recorded = recorded.clone();
                let script = script.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, recorded, script).await {
                        eprintln!("mock connection error: {e}");
                    }
                });
            }
        });

        Self { addr, received, connections, accept_task }
    }

    /// `ws://` endpoint clients should connect to.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Snapshot of everything received so far, in arrival order.
    pub fn received(&self) -> Vec<Recorded> {
        self.received.lock().clone()
    }

    /// Total connections accepted since start.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Poll until `predicate` holds over the recorded frames, or time out.
    /// Returns whether the predicate was ever satisfied.
    pub async fn wait_for<F>(&self, mut predicate: F, timeout: Duration) -> bool
    where
        F: FnMut(&[Recorded]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if predicate(&self.received.lock()) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for MockVoiceServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn handle_connection(
    stream: TcpStream,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    script: Script,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    if run_steps(&mut write, &script.on_connect).await? {
        return Ok(());
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let is_eof = text.as_str() == "EOF";
                recorded.lock().push(Recorded::Text(text.to_string()));
                if is_eof && run_steps(&mut write, &script.on_eof).await? {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                recorded.lock().push(Recorded::Binary(data.to_vec()));
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                write.send(Message::Pong(data)).await?;
            }
            Err(_) => break,
            _ => {}
        }
    }
    Ok(())
}

/// Run script steps in order. Returns `true` when a `Close` step ended the
/// connection.
async fn run_steps(
    write: &mut WsSink,
    steps: &[Step],
) -> Result<bool, tokio_tungstenite::tungstenite::Error> {
    for step in steps {
        match step {
            Step::Send(json) => write.send(Message::Text(json.clone().into())).await?,
            Step::Pause(delay) => tokio::time::sleep(*delay).await,
            Step::Close => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(true);
            }
        }
    }
    Ok(false)
}
