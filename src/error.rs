//! Error types for the attendance assistant

use thiserror::Error;

/// Result type alias for attendance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while recording, transcribing, or extracting attendance
#[derive(Error, Debug)]
pub enum Error {
    /// Microphone access was denied or no input device is available.
    /// The message is the fixed user-facing string surfaced by the UI.
    #[error("No se pudo acceder al micrófono. Por favor, permite el acceso.")]
    PermissionDenied,

    /// Transcription returned empty or whitespace-only text. This is a
    /// controller policy, not a remote service error.
    #[error("La transcripción está vacía")]
    EmptyTranscription,

    /// Network or service failure on a remote model call
    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    /// The extraction result could not be parsed against the schema
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Persistence read/write failure. Treated as non-fatal by callers that
    /// can recover as if no saved data existed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An event was applied that is not legal for the current session step
    #[error("Illegal transition: {event} is not valid in step {step}")]
    IllegalTransition { step: String, event: String },

    /// Audio device or stream error
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Audio playback error
    #[error("Playback error: {0}")]
    Playback(String),

    /// Channel send/receive error between capture and session tasks
    #[error("Channel error: {0}")]
    Channel(String),
}
