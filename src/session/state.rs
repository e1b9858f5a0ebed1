//! Session step machine for the staged (non-live) pipeline
//!
//! Seven steps with strict linear progression and one error-recovery edge
//! per remote-call step back to its pre-call step. Modeled as a tagged
//! union with a single transition function that rejects events not legal
//! for the current step; `Reset` is the only event legal everywhere.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    Idle,
    Recording,
    Recorded,
    Transcribing,
    Transcribed,
    Generating,
    Done,
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStep::Idle => "idle",
            SessionStep::Recording => "recording",
            SessionStep::Recorded => "recorded",
            SessionStep::Transcribing => "transcribing",
            SessionStep::Transcribed => "transcribed",
            SessionStep::Generating => "generating",
            SessionStep::Done => "done",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StartRecording,
    StopRecording,
    BeginTranscription,
    TranscriptionSucceeded,
    /// Remote transcription failed; roll back so the user can retry
    /// without re-recording
    TranscriptionFailed,
    BeginExtraction,
    ExtractionSucceeded,
    /// Remote extraction failed; roll back with the transcript intact
    ExtractionFailed,
    /// Restore a persisted attendance list, skipping straight to Done
    RestoreSaved,
    /// Always legal; clears everything and returns to Idle
    Reset,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl SessionStep {
    /// Apply one event, yielding the next step or rejecting the event.
    pub fn transition(self, event: SessionEvent) -> Result<SessionStep> {
        use SessionEvent::*;
        use SessionStep::*;

        let next = match (self, event) {
            (_, Reset) => Idle,
            (Idle, StartRecording) => Recording,
            (Idle, RestoreSaved) => Done,
            (Recording, StopRecording) => Recorded,
            (Recorded, BeginTranscription) => Transcribing,
            (Transcribing, TranscriptionSucceeded) => Transcribed,
            (Transcribing, TranscriptionFailed) => Recorded,
            (Transcribed, BeginExtraction) => Generating,
            (Generating, ExtractionSucceeded) => Done,
            (Generating, ExtractionFailed) => Transcribed,
            (step, event) => {
                return Err(Error::IllegalTransition {
                    step: step.to_string(),
                    event: event.to_string(),
                })
            }
        };

        Ok(next)
    }
}
