//! Wire types for the Gemini REST and Live APIs
//!
//! Requests are assembled with `serde_json::json!` in the callers; only the
//! shapes we parse get typed structs.

use serde::Deserialize;

// ============================================================================
// REST (generateContent) response
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
}

// ============================================================================
// Live (BidiGenerateContent) server messages
// ============================================================================

/// One inbound message on the live channel. A single message can carry
/// several signals at once; `into_events` flattens them in a fixed order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
pub struct SetupComplete {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub turn_complete: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<LivePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePart {
    pub inline_data: Option<InlineData>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded payload (PCM16 for audio parts)
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

/// Decoded live-channel signal, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    SetupComplete,
    /// Incremental input transcription text
    Transcript(String),
    /// Model audio, decoded from base64 to raw PCM16 bytes
    Audio(Vec<u8>),
    /// Server dropped its pending audio; scheduled playback must stop
    Interrupted,
    /// The model's conversational turn has finished
    TurnComplete,
}

impl ServerMessage {
    /// Flatten into events. Transcript and audio precede the interruption
    /// and turn-completion markers so accumulated content is never lost.
    pub fn into_events(self) -> Vec<LiveEvent> {
        use base64::Engine;

        let mut events = Vec::new();

        if self.setup_complete.is_some() {
            events.push(LiveEvent::SetupComplete);
        }

        if let Some(content) = self.server_content {
            if let Some(transcription) = content.input_transcription {
                if !transcription.text.is_empty() {
                    events.push(LiveEvent::Transcript(transcription.text));
                }
            }

            if let Some(turn) = content.model_turn {
                for part in turn.parts {
                    if let Some(inline) = part.inline_data {
                        if inline.mime_type.starts_with("audio/pcm") {
                            match base64::engine::general_purpose::STANDARD.decode(&inline.data) {
                                Ok(bytes) => events.push(LiveEvent::Audio(bytes)),
                                Err(e) => {
                                    tracing::warn!("Dropping undecodable audio part: {e}");
                                }
                            }
                        }
                    }
                }
            }

            if content.interrupted {
                events.push(LiveEvent::Interrupted);
            }

            if content.turn_complete {
                events.push(LiveEvent::TurnComplete);
            }
        }

        events
    }
}
