use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};

use voxlink::{
    ApiClient, ClientConfig,
    api::AgentChatReply,
    core::audio::{
        AudioSink, AudioSource, PlaybackError, PlaybackQueue, QueueState, WavFileSource,
        detect_audio_format, pcm_to_wav,
    },
    core::session::{SessionDriver, SessionOptions, SourceFactory},
    core::stream::{StatusLevel, StatusUpdate, StreamClient},
    core::transcript::ChatTurn,
};

/// voxlink - streaming voice-agent client
#[derive(Parser, Debug)]
#[command(name = "voxlink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a live conversation over the streaming endpoint
    Stream {
        /// WAV file to stream as the user's voice. Defaults to the
        /// microphone when built with the device-audio feature.
        #[arg(short, long, value_name = "WAV")]
        input: Option<PathBuf>,

        /// Pace file frames at real time instead of sending them as fast
        /// as possible
        #[arg(long)]
        realtime: bool,

        /// Seconds to keep the session open for the reply after the input
        /// runs out
        #[arg(long, default_value_t = 20)]
        linger: u64,

        /// Save reply audio into this directory instead of playing it
        #[arg(long, value_name = "DIR")]
        save_dir: Option<PathBuf>,
    },

    /// Synthesize text to speech
    Tts {
        /// Text to synthesize
        text: String,

        /// Voice id (defaults to the configured voice)
        #[arg(short, long)]
        voice: Option<String>,

        /// Download the audio to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the voices the backend can synthesize with
    Voices,

    /// Transcribe an audio file
    Transcribe {
        /// Audio file to transcribe
        file: PathBuf,
    },

    /// Speak an audio file's words back in a synthesized voice
    Echo {
        /// Audio file to echo
        file: PathBuf,

        /// Download the reply audio to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask a spoken question, receive a spoken answer
    Query {
        /// Audio file with the question
        file: PathBuf,

        /// Download the answer audio to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// One voice-chat turn with conversation memory
    Chat {
        /// Audio file with this turn's speech
        file: PathBuf,

        /// Session id (defaults to the configured or a generated one)
        #[arg(short, long)]
        session: Option<String>,

        /// Download the reply audio to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a commented configuration template
    GenerateConfig {
        /// Output path
        #[arg(short, long, default_value = "voxlink.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    // generate-config must work before any valid configuration exists
    if let Commands::GenerateConfig { ref output } = cli.command {
        return generate_config(output);
    }

    let config = if let Some(ref config_path) = cli.config {
        println!("Loading configuration from {}", config_path.display());
        ClientConfig::from_file(config_path)?
    } else {
        ClientConfig::from_env()?
    };

    match cli.command {
        Commands::Stream { input, realtime, linger, save_dir } => {
            run_stream(config, input, realtime, linger, save_dir).await
        }
        Commands::Tts { text, voice, output } => run_tts(config, text, voice, output).await,
        Commands::Voices => run_voices(config).await,
        Commands::Transcribe { file } => run_transcribe(config, file).await,
        Commands::Echo { file, output } => run_echo(config, file, output).await,
        Commands::Query { file, output } => run_query(config, file, output).await,
        Commands::Chat { file, session, output } => run_chat(config, file, session, output).await,
        Commands::GenerateConfig { .. } => unreachable!("handled above"),
    }
}

// =============================================================================
// stream
// =============================================================================

async fn run_stream(
    config: ClientConfig,
    input: Option<PathBuf>,
    realtime: bool,
    linger: u64,
    save_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = StreamClient::new(config.stream_config()?)?;
    let sink = build_sink(&config, save_dir)?;
    let playback = PlaybackQueue::new(config.playback_config(), sink);

    let frame_samples = config.frame_samples;
    let source_factory: SourceFactory = match input {
        Some(path) => Box::new(move || {
            let source = WavFileSource::open(&path)?
                .with_frame_samples(frame_samples)
                .paced(realtime);
            Ok(Box::new(source) as Box<dyn AudioSource>)
        }),
        None => microphone_factory()?,
    };

    let options = SessionOptions {
        auto_stop_after_input: Some(Duration::from_secs(linger)),
    };
    let driver = SessionDriver::new(client, source_factory, playback.clone(), options);

    driver.on_transcript(Arc::new(|turn: ChatTurn| {
        Box::pin(async move {
            println!("[{}] {}", turn.role, turn.text);
        })
    }));
    driver.on_status(Arc::new(|update: StatusUpdate| {
        Box::pin(async move {
            match update.level {
                StatusLevel::Info => println!("   ({})", update.text),
                StatusLevel::Error => eprintln!("   !! {}", update.text),
            }
        })
    }));

    let handle = driver.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nStopping...");
            handle.request_stop();
        }
    });

    println!("Streaming... press Ctrl-C to stop.");
    let transcript = driver.run().await?;

    // Let already-queued replies finish before tearing the queue down.
    while !playback.is_empty() || playback.state() == QueueState::Playing {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    playback.shutdown();

    println!("\nSession ended with {} transcript turn(s).", transcript.len());
    Ok(())
}

#[cfg(feature = "device-audio")]
fn microphone_factory() -> anyhow::Result<SourceFactory> {
    Ok(Box::new(|| {
        let source = voxlink::core::audio::DeviceSource::open()?;
        Ok(Box::new(source) as Box<dyn AudioSource>)
    }))
}

#[cfg(not(feature = "device-audio"))]
fn microphone_factory() -> anyhow::Result<SourceFactory> {
    bail!("microphone capture requires the device-audio feature; pass --input <WAV> instead")
}

fn build_sink(
    config: &ClientConfig,
    save_dir: Option<PathBuf>,
) -> anyhow::Result<Arc<dyn AudioSink>> {
    if let Some(dir) = save_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        return Ok(Arc::new(FileSink {
            dir,
            counter: AtomicU64::new(0),
            sample_rate: config.sample_rate,
        }));
    }
    default_sink()
}

#[cfg(feature = "device-audio")]
fn default_sink() -> anyhow::Result<Arc<dyn AudioSink>> {
    Ok(Arc::new(voxlink::core::audio::DeviceSink::new()?))
}

#[cfg(not(feature = "device-audio"))]
fn default_sink() -> anyhow::Result<Arc<dyn AudioSink>> {
    Ok(Arc::new(DiscardSink))
}

/// Saves each reply into a numbered file instead of playing it.
struct FileSink {
    dir: PathBuf,
    counter: AtomicU64,
    sample_rate: u32,
}

#[async_trait]
impl AudioSink for FileSink {
    async fn play(&self, audio: &[u8]) -> Result<(), PlaybackError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let (_, ext) = detect_audio_format(audio);
        // Bare PCM gets a WAV header so the file is playable as-is.
        let (bytes, ext) = if ext == "wav" && !audio.starts_with(b"RIFF") {
            let wav = pcm_to_wav(audio, self.sample_rate, 1)
                .map_err(|e| PlaybackError::Decode(e.to_string()))?;
            (wav, "wav")
        } else {
            (audio.to_vec(), ext)
        };

        let path = self.dir.join(format!("reply-{n:03}.{ext}"));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PlaybackError::Device(e.to_string()))?;
        println!("   (saved {} bytes to {})", bytes.len(), path.display());
        Ok(())
    }
}

/// Swallows replies when no audio output is available.
#[cfg(not(feature = "device-audio"))]
struct DiscardSink;

#[cfg(not(feature = "device-audio"))]
#[async_trait]
impl AudioSink for DiscardSink {
    async fn play(&self, audio: &[u8]) -> Result<(), PlaybackError> {
        tracing::info!("Discarding {} bytes of reply audio (no device-audio)", audio.len());
        Ok(())
    }
}

// =============================================================================
// one-shot API commands
// =============================================================================

async fn run_tts(
    config: ClientConfig,
    text: String,
    voice: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.server_url)?;
    let voice = voice.unwrap_or_else(|| config.default_voice_id.clone());

    let response = api.generate_speech(&text, &voice).await?;
    println!("Audio URL: {}", response.audio_url);
    if output.is_some() {
        save_from_url(&api, &response.audio_url, output, "speech").await?;
    }
    Ok(())
}

async fn run_voices(config: ClientConfig) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.server_url)?;
    let voices = api.list_voices().await?;

    println!("{} voice(s) available:", voices.len());
    for voice in voices {
        let mut line = format!("  {:<24} {}", voice.voice_id, voice.name);
        if let Some(locale) = voice.locale {
            line.push_str(&format!(" [{locale}]"));
        }
        if let Some(gender) = voice.gender {
            line.push_str(&format!(" ({gender})"));
        }
        println!("{line}");
    }
    Ok(())
}

async fn run_transcribe(config: ClientConfig, file: PathBuf) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.server_url)?;
    let (name, data) = read_audio(&file).await?;

    let response = api.transcribe_file(&name, data).await?;
    println!("{}", response.transcription);
    Ok(())
}

async fn run_echo(
    config: ClientConfig,
    file: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.server_url)?;
    let (name, data) = read_audio(&file).await?;

    let response = api.tts_echo(&name, data).await?;
    if !response.text.is_empty() {
        println!("Heard: {}", response.text);
    }
    save_from_url(&api, &response.audio_url, output, "echo").await?;
    Ok(())
}

async fn run_query(
    config: ClientConfig,
    file: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.server_url)?;
    let (name, data) = read_audio(&file).await?;

    let response = api.llm_query(&name, data).await?;
    save_from_url(&api, &response.audio_url, output, "answer").await?;
    Ok(())
}

async fn run_chat(
    config: ClientConfig,
    file: PathBuf,
    session: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.server_url)?;
    let session = session.unwrap_or_else(|| config.session_id_or_generated());
    println!("Session: {session}");

    let (name, data) = read_audio(&file).await?;
    match api.agent_chat(&session, &name, data).await? {
        AgentChatReply::Url(url) => {
            save_from_url(&api, &url, output, "chat-reply").await?;
        }
        AgentChatReply::Audio { bytes, content_type, fallback } => {
            if fallback {
                eprintln!("!! backend degraded, reply is canned fallback audio");
            }
            let (_, ext) = detect_audio_format(&bytes);
            let path = output.unwrap_or_else(|| PathBuf::from(format!("chat-reply.{ext}")));
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} bytes ({}) to {}", bytes.len(), content_type, path.display());
        }
    }
    Ok(())
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        bail!("{} already exists, not overwriting", output.display());
    }
    std::fs::write(output, ClientConfig::yaml_template())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote configuration template to {}", output.display());
    Ok(())
}

// =============================================================================
// helpers
// =============================================================================

async fn read_audio(file: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.wav")
        .to_string();
    Ok((name, data))
}

async fn save_from_url(
    api: &ApiClient,
    url: &str,
    output: Option<PathBuf>,
    stem: &str,
) -> anyhow::Result<PathBuf> {
    let bytes = api.download(url).await?;
    let (_, ext) = detect_audio_format(&bytes);
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{stem}.{ext}")));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
