use crate::audio::{AudioBackendConfig, AudioSource};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Configuration for one attendance session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (e.g. "lista-2026-08-29")
    pub session_id: String,

    /// Where capture audio comes from
    pub source: AudioSource,

    /// Capture normalization (rate, channels, block size)
    pub audio: AudioBackendConfig,

    /// Reference date handed to the extraction call for the `date` field
    pub reference_date: NaiveDate,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            session_id: format!("lista-{}", uuid::Uuid::new_v4()),
            source: AudioSource::Microphone,
            audio: AudioBackendConfig::default(),
            reference_date: today,
        }
    }
}

/// Snapshot of a session for status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    /// Current step of the staged pipeline
    pub step: super::SessionStep,
    /// Size of the finalized audio payload awaiting transcription (0 if none)
    pub audio_bytes: usize,
    /// Characters of transcript accumulated so far (0 if none)
    pub transcript_chars: usize,
    /// Records extracted so far
    pub records_count: usize,
    /// Last surfaced user-visible error, if any
    pub error: Option<String>,
}
