//! Remote AI client adapter
//!
//! Two capability surfaces over the hosted Gemini service:
//! - one-shot calls (`client`): transcription and structured attendance
//!   extraction via `generateContent`
//! - a duplex streaming channel (`live`): realtime audio in, incremental
//!   transcript and model audio out

pub mod client;
pub mod live;
pub mod types;

pub use client::{extraction_prompt, extraction_schema, GeminiClient};
pub use live::{LiveInput, LiveOutput, LiveSession};
pub use types::{LiveEvent, ServerMessage};
