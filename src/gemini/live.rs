//! Duplex streaming session against the Gemini Live API
//!
//! One WebSocket carries both directions: base64 PCM16 media chunks go up
//! as realtime input, incremental transcription / model audio / control
//! signals come down. After the setup handshake the session splits into an
//! input half (for the capture task) and an output half (for the single
//! consumer processing inbound messages in arrival order).

use super::types::{LiveEvent, ServerMessage};
use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use base64::Engine;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct LiveSession {
    ws: WsStream,
}

impl LiveSession {
    /// Connect, send the setup message, and wait for setup-complete.
    ///
    /// The session is configured for audio-modality output with input
    /// transcription enabled, matching the roll-call flow: the instructor
    /// speaks, the model answers aloud, and the transcript accumulates for
    /// extraction.
    pub async fn connect(config: &GeminiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| Error::RemoteCall(format!("{} is not set", config.api_key_env)))?;

        let url = format!("{}?key={}", config.live_endpoint, api_key);

        info!("Connecting live session ({})", config.live_model);

        let (mut ws, _) = connect_async(&url)
            .await
            .map_err(|e| Error::RemoteCall(format!("Live connect failed: {e}")))?;

        let setup = json!({
            "setup": {
                "model": config.live_model,
                "generationConfig": {
                    "responseModalities": ["AUDIO"]
                },
                "inputAudioTranscription": {}
            }
        });

        ws.send(Message::Text(setup.to_string()))
            .await
            .map_err(|e| Error::RemoteCall(format!("Setup send failed: {e}")))?;

        // The first server message acknowledges setup; anything else is a
        // protocol violation.
        loop {
            let msg = ws
                .next()
                .await
                .ok_or_else(|| Error::RemoteCall("Live channel closed during setup".to_string()))?
                .map_err(|e| Error::RemoteCall(format!("Setup receive failed: {e}")))?;

            match parse_server_message(&msg)? {
                Some(message) => {
                    let events = message.into_events();
                    if events.contains(&LiveEvent::SetupComplete) {
                        info!("Live session established");
                        return Ok(Self { ws });
                    }
                    return Err(Error::RemoteCall(
                        "Expected setupComplete as first live message".to_string(),
                    ));
                }
                None => continue, // ping/pong
            }
        }
    }

    /// Split into the uplink and downlink halves.
    pub fn split(self) -> (LiveInput, LiveOutput) {
        let (sink, stream) = self.ws.split();
        (LiveInput { sink }, LiveOutput { stream })
    }
}

/// Uplink half: pushes capture audio as realtime input frames.
pub struct LiveInput {
    sink: SplitSink<WsStream, Message>,
}

impl LiveInput {
    /// Push one block of PCM16 bytes as a continuously-updated realtime
    /// input media chunk.
    pub async fn send_audio_frame(&mut self, pcm: &[u8], sample_rate: u32) -> Result<()> {
        let chunk = json!({
            "realtimeInput": {
                "mediaChunks": [{
                    "mimeType": format!("audio/pcm;rate={sample_rate}"),
                    "data": base64::engine::general_purpose::STANDARD.encode(pcm)
                }]
            }
        });

        self.sink
            .send(Message::Text(chunk.to_string()))
            .await
            .map_err(|e| Error::RemoteCall(format!("Audio frame send failed: {e}")))
    }

    /// Close the uplink; the server will finish its turn and close.
    pub async fn close(&mut self) -> Result<()> {
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::RemoteCall(format!("Close failed: {e}")))
    }
}

/// Downlink half: yields decoded events in strict arrival order.
pub struct LiveOutput {
    stream: SplitStream<WsStream>,
}

impl LiveOutput {
    /// Next batch of events, or `None` once the server closes the channel.
    pub async fn next_events(&mut self) -> Result<Option<Vec<LiveEvent>>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Err(Error::RemoteCall(format!("Live receive failed: {e}")));
                }
                None => return Ok(None),
            };

            if msg.is_close() {
                return Ok(None);
            }

            match parse_server_message(&msg)? {
                Some(message) => return Ok(Some(message.into_events())),
                None => continue,
            }
        }
    }
}

/// Parse a WebSocket message into a server message. The live API sends
/// JSON in both text and binary frames; control frames yield `None`.
fn parse_server_message(msg: &Message) -> Result<Option<ServerMessage>> {
    let payload: &[u8] = match msg {
        Message::Text(text) => text.as_bytes(),
        Message::Binary(bytes) => bytes,
        _ => return Ok(None),
    };

    match serde_json::from_slice::<ServerMessage>(payload) {
        Ok(message) => Ok(Some(message)),
        Err(e) => {
            warn!("Unparseable live message ({e}); ignoring");
            Ok(None)
        }
    }
}
