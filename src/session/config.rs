use serde::{Deserialize, Serialize};

use crate::audio::pcm;
use crate::live::SessionSetup;

/// Configuration for one live voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "voice-2026-08-30-demo")
    pub session_id: String,

    /// Model identity requested at session open
    pub model: String,

    /// Fixed voice identity for spoken responses
    pub voice: String,

    /// System instruction sent at session open
    pub system_instruction: String,

    /// Microphone sample rate (the endpoint expects 16kHz)
    pub capture_sample_rate: u32,

    /// Playback sample rate of inbound audio fragments (24kHz)
    pub playback_sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            model: "models/gemini-2.5-flash-native-audio-preview".to_string(),
            voice: "Orus".to_string(),
            system_instruction: "You are a helpful voice assistant. You do not have access to \
                                 live web data; never claim that you do."
                .to_string(),
            capture_sample_rate: pcm::CAPTURE_SAMPLE_RATE,
            playback_sample_rate: pcm::PLAYBACK_SAMPLE_RATE,
        }
    }
}

impl SessionConfig {
    /// The setup message parameters for this session.
    pub fn setup(&self) -> SessionSetup {
        SessionSetup {
            model: self.model.clone(),
            voice: self.voice.clone(),
            system_instruction: self.system_instruction.clone(),
        }
    }
}
