use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use voicebridge::audio::{CaptureConfig, DeviceSink, MicrophoneBackend};
use voicebridge::live::WsLiveEndpoint;
use voicebridge::session::{LiveSession, SessionConfig, Speaker};
use voicebridge::Config;

/// Real-time voice conversation client: Start on launch, Stop on Enter.
#[derive(Parser, Debug)]
#[command(name = "voicebridge", version)]
struct Args {
    /// Path to a config file (defaults built in when omitted)
    #[arg(long)]
    config: Option<String>,

    /// Override the live endpoint URL
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let endpoint_url = args.endpoint.unwrap_or(cfg.live.endpoint_url);

    info!("{} starting", cfg.service.name);

    let session_config = SessionConfig {
        model: cfg.live.model,
        voice: cfg.live.voice,
        system_instruction: cfg.live.system_instruction,
        capture_sample_rate: cfg.audio.capture_sample_rate,
        playback_sample_rate: cfg.audio.playback_sample_rate,
        ..SessionConfig::default()
    };

    let capture = Box::new(MicrophoneBackend::new(CaptureConfig {
        sample_rate: cfg.audio.capture_sample_rate,
        frame_duration_ms: cfg.audio.frame_duration_ms,
    }));
    let endpoint = Box::new(WsLiveEndpoint::new(endpoint_url));
    let sink = Box::new(DeviceSink::open(cfg.audio.playback_sample_rate)?);

    let mut session = LiveSession::new(session_config);
    let mut entries = match session.take_entries() {
        Some(entries) => entries,
        None => anyhow::bail!("transcript stream already taken"),
    };
    let mut status = session.status();

    if let Err(e) = session.start(capture, endpoint, sink).await {
        eprintln!("{}", e);
        return Ok(());
    }

    println!("Session active. Speak into your microphone; press Enter to stop.");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            entry = entries.recv() => {
                match entry {
                    Some(entry) => {
                        let label = match entry.speaker {
                            Speaker::User => "You",
                            Speaker::Model => "Assistant",
                        };
                        println!("[{}] {}", label, entry.text);
                    }
                    None => break,
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("-- {}", status.borrow_and_update().clone());
            }
            line = stdin.next_line() => {
                // Enter or EOF stops the session.
                if let Err(e) = &line {
                    warn!("stdin error: {}", e);
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop().await?;

    let transcript = session.transcript().await;
    println!("Session closed ({} transcript entries)", transcript.len());

    Ok(())
}
