//! HTTP API server for external control
//!
//! This module provides a REST API for driving attendance sessions:
//! - POST /sessions/start - Create a session and begin recording
//! - POST /sessions/:id/stop - Stop recording
//! - POST /sessions/:id/transcribe - Run the transcription call
//! - POST /sessions/:id/extract - Run the extraction call
//! - POST /sessions/:id/reset - Return to idle, clearing everything
//! - GET /sessions/:id/status - Query session step and counters
//! - GET /sessions/:id/transcript - Get the transcript
//! - GET /attendance - Persisted attendance list
//! - GET /attendance/export - CSV download
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
