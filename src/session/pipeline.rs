//! Staged attendance session: capture → transcription → extraction → done
//!
//! The controller sequences the two remote calls strictly: transcription
//! must settle (and yield non-empty trimmed text) before extraction is
//! invoked. Each remote failure rolls the step back to its pre-call step so
//! the user retries without redoing earlier work; `reset` is legal from any
//! step and clears both in-memory state and the persisted snapshot.

use super::config::{SessionConfig, SessionStatus};
use super::state::{SessionEvent, SessionStep};
use crate::attendance::{AttendanceRecord, AttendanceStore};
use crate::audio::{pcm, AudioBackend, AudioBackendFactory};
use crate::error::{Error, Result};
use crate::gemini::GeminiClient;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct AttendanceSession {
    config: SessionConfig,

    client: Arc<GeminiClient>,

    store: Arc<AttendanceStore>,

    /// Current step of the staged pipeline
    step: Arc<Mutex<SessionStep>>,

    /// Active capture backend while recording
    backend: Arc<Mutex<Option<Box<dyn AudioBackend>>>>,

    /// Samples accumulated by the capture task
    captured: Arc<Mutex<Vec<i16>>>,

    /// Sample rate carried by the captured frames (set by the first frame;
    /// may sit above the target when the device rate is not divisible)
    captured_rate: Arc<Mutex<Option<u32>>>,

    /// Handle for the capture task
    capture_task: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Finalized WAV payload, ready for transcription
    audio_wav: Arc<Mutex<Option<Vec<u8>>>>,

    /// Transcript obtained from the transcription call
    transcript: Arc<Mutex<Option<String>>>,

    /// Attendance list produced by the extraction call
    records: Arc<Mutex<Vec<AttendanceRecord>>>,

    /// Last user-visible error message
    last_error: Arc<Mutex<Option<String>>>,
}

impl AttendanceSession {
    pub fn new(config: SessionConfig, client: GeminiClient, store: AttendanceStore) -> Self {
        info!("Creating attendance session: {}", config.session_id);

        Self {
            config,
            client: Arc::new(client),
            store: Arc::new(store),
            step: Arc::new(Mutex::new(SessionStep::Idle)),
            backend: Arc::new(Mutex::new(None)),
            captured: Arc::new(Mutex::new(Vec::new())),
            captured_rate: Arc::new(Mutex::new(None)),
            capture_task: Arc::new(Mutex::new(None)),
            audio_wav: Arc::new(Mutex::new(None)),
            transcript: Arc::new(Mutex::new(None)),
            records: Arc::new(Mutex::new(Vec::new())),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub async fn step(&self) -> SessionStep {
        *self.step.lock().await
    }

    /// Apply one event to the step machine, rejecting illegal transitions.
    async fn apply(&self, event: SessionEvent) -> Result<SessionStep> {
        let mut step = self.step.lock().await;
        let next = step.transition(event)?;
        info!("Session {}: {} -> {}", self.config.session_id, *step, next);
        *step = next;
        Ok(next)
    }

    async fn surface_error(&self, error: &Error) {
        let mut last = self.last_error.lock().await;
        *last = Some(error.to_string());
    }

    /// Request the microphone and begin buffering audio.
    ///
    /// On device denial the step stays at Idle and the fixed user-facing
    /// message is surfaced; nothing else changes.
    pub async fn start_recording(&self) -> Result<()> {
        {
            let step = self.step.lock().await;
            step.transition(SessionEvent::StartRecording)?;
        }

        let mut backend =
            AudioBackendFactory::create(self.config.source.clone(), self.config.audio.clone())?;

        let mut frame_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.surface_error(&e).await;
                return Err(e);
            }
        };

        // The permission prompt has settled; commit the transition.
        self.apply(SessionEvent::StartRecording).await?;

        {
            let mut captured = self.captured.lock().await;
            captured.clear();
        }
        {
            let mut rate = self.captured_rate.lock().await;
            *rate = None;
        }

        let captured = Arc::clone(&self.captured);
        let captured_rate = Arc::clone(&self.captured_rate);

        let task = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                {
                    let mut rate = captured_rate.lock().await;
                    *rate = Some(frame.sample_rate);
                }
                let mut captured = captured.lock().await;
                captured.extend_from_slice(&frame.samples);
            }
        });

        {
            let mut handle = self.capture_task.lock().await;
            *handle = Some(task);
        }
        {
            let mut slot = self.backend.lock().await;
            *slot = Some(backend);
        }

        info!("Recording started for session {}", self.config.session_id);

        Ok(())
    }

    /// Finalize buffered audio into one WAV payload and release the device.
    pub async fn stop_recording(&self) -> Result<()> {
        self.apply(SessionEvent::StopRecording).await?;

        let backend = {
            let mut slot = self.backend.lock().await;
            slot.take()
        };

        if let Some(mut backend) = backend {
            backend.stop().await?;
        }

        if let Some(task) = self.capture_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Capture task panicked: {e}");
            }
        }

        // Hand the raw buffer off and drop it after encoding
        let samples = {
            let mut captured = self.captured.lock().await;
            std::mem::take(&mut *captured)
        };

        // The header must carry the rate the frames were actually captured
        // at, which the decimator may leave above the target.
        let sample_rate = {
            let rate = self.captured_rate.lock().await;
            (*rate).unwrap_or(self.config.audio.target_sample_rate)
        };

        let wav = pcm::wav_from_pcm16(&samples, sample_rate, self.config.audio.target_channels)?;

        info!(
            "Recording stopped: {} samples -> {} WAV bytes",
            samples.len(),
            wav.len()
        );

        {
            let mut slot = self.audio_wav.lock().await;
            *slot = Some(wav);
        }

        Ok(())
    }

    /// Run the remote transcription call.
    ///
    /// Empty or whitespace-only results report `EmptyTranscription` and the
    /// step rolls back to Recorded; retry does not require re-recording.
    pub async fn transcribe(&self) -> Result<String> {
        self.apply(SessionEvent::BeginTranscription).await?;

        let wav = {
            let slot = self.audio_wav.lock().await;
            slot.clone()
        };

        let wav = match wav {
            Some(wav) => wav,
            None => {
                let e = Error::AudioDevice("No recorded audio to transcribe".to_string());
                self.apply(SessionEvent::TranscriptionFailed).await?;
                self.surface_error(&e).await;
                return Err(e);
            }
        };

        match self.client.transcribe(&wav, "audio/wav").await {
            Ok(text) => {
                {
                    let mut transcript = self.transcript.lock().await;
                    *transcript = Some(text.clone());
                }
                self.apply(SessionEvent::TranscriptionSucceeded).await?;
                Ok(text)
            }
            Err(e) => {
                warn!("Transcription failed: {e}");
                self.apply(SessionEvent::TranscriptionFailed).await?;
                self.surface_error(&e).await;
                Err(e)
            }
        }
    }

    /// Run the remote extraction call and persist the resulting list.
    ///
    /// Never invoked with an empty transcript; on failure the transcript is
    /// preserved so the user can retry without re-recording or re-listening.
    pub async fn extract(&self) -> Result<Vec<AttendanceRecord>> {
        self.apply(SessionEvent::BeginExtraction).await?;

        let transcript = {
            let slot = self.transcript.lock().await;
            slot.clone().unwrap_or_default()
        };

        if transcript.trim().is_empty() {
            let e = Error::EmptyTranscription;
            self.apply(SessionEvent::ExtractionFailed).await?;
            self.surface_error(&e).await;
            return Err(e);
        }

        match self
            .client
            .extract_attendance(&transcript, self.config.reference_date)
            .await
        {
            Ok(extracted) => {
                {
                    let mut records = self.records.lock().await;
                    *records = extracted.clone();
                }

                // Persistence failure is non-fatal: the in-memory list stands
                if let Err(e) = self.store.save(&extracted) {
                    warn!("Failed to persist attendance snapshot: {e}");
                }

                self.apply(SessionEvent::ExtractionSucceeded).await?;
                Ok(extracted)
            }
            Err(e) => {
                warn!("Extraction failed: {e}");
                self.apply(SessionEvent::ExtractionFailed).await?;
                self.surface_error(&e).await;
                Err(e)
            }
        }
    }

    /// Restore a persisted attendance list, jumping straight to Done.
    ///
    /// Returns false (leaving the step untouched) when no snapshot exists.
    pub async fn load_saved(&self) -> Result<bool> {
        let saved = self.store.load();
        if saved.is_empty() {
            return Ok(false);
        }

        self.apply(SessionEvent::RestoreSaved).await?;

        let count = saved.len();
        {
            let mut records = self.records.lock().await;
            *records = saved;
        }

        info!("Restored {count} persisted attendance records");

        Ok(true)
    }

    /// Return to Idle from any step, clearing all in-memory data and the
    /// persisted snapshot.
    pub async fn reset(&self) -> Result<()> {
        self.apply(SessionEvent::Reset).await?;

        let backend = {
            let mut slot = self.backend.lock().await;
            slot.take()
        };
        if let Some(mut backend) = backend {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop capture during reset: {e}");
            }
        }

        if let Some(task) = self.capture_task.lock().await.take() {
            task.abort();
        }

        self.captured.lock().await.clear();
        *self.captured_rate.lock().await = None;
        *self.audio_wav.lock().await = None;
        *self.transcript.lock().await = None;
        self.records.lock().await.clear();
        *self.last_error.lock().await = None;

        if let Err(e) = self.store.clear() {
            warn!("Failed to clear attendance snapshot: {e}");
        }

        info!("Session {} reset", self.config.session_id);

        Ok(())
    }

    pub async fn transcript(&self) -> Option<String> {
        self.transcript.lock().await.clone()
    }

    pub async fn records(&self) -> Vec<AttendanceRecord> {
        self.records.lock().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.config.session_id.clone(),
            step: *self.step.lock().await,
            audio_bytes: self
                .audio_wav
                .lock()
                .await
                .as_deref()
                .map(<[u8]>::len)
                .unwrap_or(0),
            transcript_chars: self
                .transcript
                .lock()
                .await
                .as_deref()
                .map(str::len)
                .unwrap_or(0),
            records_count: self.records.lock().await.len(),
            error: self.last_error.lock().await.clone(),
        }
    }

    pub fn reference_date(&self) -> chrono::NaiveDate {
        self.config.reference_date
    }
}
