use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LiveConfig {
    /// WebSocket URL of the streaming conversation endpoint
    pub endpoint_url: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub capture_sample_rate: u32,
    pub playback_sample_rate: u32,
    pub frame_duration_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        let session = crate::session::SessionConfig::default();
        Self {
            service: ServiceConfig {
                name: "voicebridge".to_string(),
            },
            live: LiveConfig {
                endpoint_url: "wss://localhost:8765/live".to_string(),
                model: session.model,
                voice: session.voice,
                system_instruction: session.system_instruction,
            },
            audio: AudioConfig {
                capture_sample_rate: session.capture_sample_rate,
                playback_sample_rate: session.playback_sample_rate,
                frame_duration_ms: 100,
            },
        }
    }
}
