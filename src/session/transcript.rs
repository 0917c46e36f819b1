use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the conversation produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Model,
}

/// One finalized transcript turn. Immutable once appended to the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    /// When the turn was finalized
    pub timestamp: DateTime<Utc>,
}

/// Accumulates transcription fragments until a turn-complete marker.
///
/// One running buffer per direction; at most one partial entry per
/// direction exists at any time. `end_turn` emits each non-empty buffer
/// as a finalized entry (user before model) and clears both.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    user: String,
    model: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment of the user's speech.
    pub fn append_user(&mut self, fragment: &str) {
        self.user.push_str(fragment);
    }

    /// Append a fragment of the model's speech.
    pub fn append_model(&mut self, fragment: &str) {
        self.model.push_str(fragment);
    }

    /// Current partial text for the user direction.
    pub fn partial_user(&self) -> &str {
        &self.user
    }

    /// Current partial text for the model direction.
    pub fn partial_model(&self) -> &str {
        &self.model
    }

    /// Finalize the turn: flush non-empty buffers in user-then-model
    /// order and clear both.
    pub fn end_turn(&mut self) -> Vec<TranscriptEntry> {
        let now = Utc::now();
        let mut entries = Vec::new();

        if !self.user.is_empty() {
            entries.push(TranscriptEntry {
                speaker: Speaker::User,
                text: std::mem::take(&mut self.user),
                timestamp: now,
            });
        }
        if !self.model.is_empty() {
            entries.push(TranscriptEntry {
                speaker: Speaker::Model,
                text: std::mem::take(&mut self.model),
                timestamp: now,
            });
        }

        entries
    }
}
