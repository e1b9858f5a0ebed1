use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub gemini: GeminiConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate pushed to the model (Gemini Live expects 16kHz)
    pub capture_sample_rate: u32,
    /// Playback sample rate of model audio (Gemini Live emits 24kHz PCM)
    pub playback_sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Model for one-shot transcription and attendance extraction
    pub model: String,
    /// Model for the live duplex session
    pub live_model: String,
    pub rest_endpoint: String,
    pub live_endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the single JSON snapshot holding the attendance list
    pub snapshot_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Directory where CSV exports are written
    pub output_dir: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load from a settings file if present, otherwise fall back to defaults
    /// so the binary runs unconfigured.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("No config at {path} ({e}); using defaults");
                Self::default()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "pase-lista".to_string(),
                http: HttpConfig {
                    bind: "127.0.0.1".to_string(),
                    port: 8520,
                },
            },
            audio: AudioConfig {
                capture_sample_rate: 16000,
                playback_sample_rate: 24000,
                channels: 1,
                buffer_duration_ms: 100,
            },
            gemini: GeminiConfig {
                api_key_env: "GEMINI_API_KEY".to_string(),
                model: "gemini-2.5-flash".to_string(),
                live_model: "models/gemini-2.0-flash-live-001".to_string(),
                rest_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                live_endpoint: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            },
            storage: StorageConfig {
                snapshot_path: "asistencia.json".to_string(),
            },
            export: ExportConfig {
                output_dir: ".".to_string(),
            },
        }
    }
}
