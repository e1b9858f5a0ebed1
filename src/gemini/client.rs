//! One-shot Gemini calls: audio transcription and attendance extraction
//!
//! Both operations go through `generateContent`. Extraction is constrained
//! with a response schema so the model returns JSON conforming to the
//! attendance record shape instead of free text.

use super::types::GenerateContentResponse;
use crate::attendance::AttendanceRecord;
use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use base64::Engine;
use chrono::NaiveDate;
use serde_json::json;
use tracing::info;

const TRANSCRIBE_INSTRUCTION: &str = "Transcribe el siguiente audio de un pase de lista escolar. \
     Devuelve únicamente el texto transcrito, sin comentarios ni formato adicional.";

/// Fixed extraction instruction. The presence rule is delegated to the
/// model's judgment: a name counts as "Presente" only if "presente" is
/// heard within roughly two seconds after it, approximated by textual
/// proximity in the transcript.
pub fn extraction_prompt(transcript: &str, reference_date: NaiveDate) -> String {
    format!(
        "Analiza la siguiente transcripción de un pase de lista y determina la asistencia de cada \
         alumno mencionado.\n\
         Regla: un alumno está \"Presente\" únicamente si la palabra \"presente\" aparece \
         aproximadamente dentro de los 2 segundos posteriores a su nombre (aproxímalo por la \
         cercanía en el texto); en cualquier otro caso está \"Ausente\".\n\
         Usa la fecha {} para el campo date de todos los registros.\n\
         Transcripción:\n{}",
        reference_date.format("%Y-%m-%d"),
        transcript
    )
}

/// Structured-output schema: array of objects with required name, status,
/// and date fields.
pub fn extraction_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "status": { "type": "STRING", "enum": ["Presente", "Ausente"] },
                "date": { "type": "STRING" }
            },
            "required": ["name", "status", "date"]
        }
    })
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    /// Build from config; the API key is read from the configured
    /// environment variable.
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| Error::RemoteCall(format!("{} is not set", config.api_key_env)))?;

        Ok(Self::new(
            api_key,
            config.model.clone(),
            config.rest_endpoint.clone(),
        ))
    }

    pub fn new(api_key: String, model: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            endpoint,
        }
    }

    /// Transcribe one audio payload.
    ///
    /// An empty or whitespace-only result is an `EmptyTranscription` error;
    /// that policy belongs to this adapter, not the remote service.
    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": TRANSCRIBE_INSTRUCTION },
                    {
                        "inlineData": {
                            "mimeType": mime_type,
                            "data": base64::engine::general_purpose::STANDARD.encode(audio)
                        }
                    }
                ]
            }]
        });

        info!("Transcribing {} bytes of audio ({mime_type})", audio.len());

        let response = self.generate_content(&body).await?;
        let text = response.text().trim().to_string();

        if text.is_empty() {
            return Err(Error::EmptyTranscription);
        }

        info!("Transcription received ({} chars)", text.len());

        Ok(text)
    }

    /// Extract attendance records from a transcript.
    pub async fn extract_attendance(
        &self,
        transcript: &str,
        reference_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": extraction_prompt(transcript, reference_date) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": extraction_schema()
            }
        });

        info!("Extracting attendance from transcript ({} chars)", transcript.len());

        let response = self.generate_content(&body).await?;
        let text = response.text();

        let records: Vec<AttendanceRecord> =
            serde_json::from_str(&text).map_err(|e| Error::MalformedResponse(e.to_string()))?;

        info!("Extraction returned {} records", records.len());

        Ok(records)
    }

    async fn generate_content(&self, body: &serde_json::Value) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::RemoteCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::RemoteCall(format!("HTTP {status}: {detail}")));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}
