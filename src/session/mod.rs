//! Live voice session management
//!
//! This module provides the `LiveSession` abstraction that manages:
//! - Microphone capture and fire-and-forget frame streaming
//! - Server-event dispatch (transcripts, audio, interruption, close)
//! - Gapless playback scheduling of inbound audio
//! - Transcript turn assembly and append-only history
//! - Lifecycle state and the user-visible status line

mod config;
mod session;
mod transcript;

pub use config::SessionConfig;
pub use session::{LiveSession, SessionState};
pub use transcript::{Speaker, TranscriptAccumulator, TranscriptEntry};
