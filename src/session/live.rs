//! Live attendance session over the duplex streaming channel
//!
//! Replaces the staged pipeline with one persistent session: capture frames
//! go up continuously as realtime input, incremental transcript and model
//! audio come down, and when the turn completes (or a fallback timer after
//! manual stop expires) the accumulated transcript is handed to the same
//! extraction call as the staged pipeline.
//!
//! The turn-complete signal and the fallback timer can both fire for one
//! recording. Finalization therefore runs behind a once-guard: the downlink
//! task finalizes as soon as the server reports turn completion, and the
//! stop path finalizes after the fallback wait; whichever trigger arrives
//! second observes the guard and does nothing, so a single transcript
//! snapshot feeds a single extraction.

use super::config::SessionConfig;
use crate::attendance::{AttendanceRecord, AttendanceStore};
use crate::audio::{pcm, AudioBackend, AudioBackendFactory, Playback};
use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::gemini::{GeminiClient, LiveEvent, LiveSession};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Fallback delay after manual stop, in case the turn-complete signal
/// never arrives.
const FINALIZE_FALLBACK: Duration = Duration::from_secs(1);

/// Grace period for the downlink task to drain after teardown.
const DOWNLINK_DRAIN: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct LiveAttendanceSession {
    config: SessionConfig,
    gemini: GeminiConfig,
    playback_sample_rate: u32,

    client: Arc<GeminiClient>,
    store: Arc<AttendanceStore>,

    is_recording: Arc<AtomicBool>,
    is_loading: Arc<AtomicBool>,

    /// Accumulating live transcript (single writer: the downlink task)
    transcript: Arc<Mutex<String>>,

    /// Once-guard for finalize-and-extract
    finalized: Arc<AtomicBool>,

    /// Signaled when the server reports turn completion
    turn_complete: Arc<Notify>,

    records: Arc<Mutex<Vec<AttendanceRecord>>>,

    backend: Arc<Mutex<Option<Box<dyn AudioBackend>>>>,
    uplink_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    downlink_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LiveAttendanceSession {
    pub fn new(
        config: SessionConfig,
        gemini: GeminiConfig,
        playback_sample_rate: u32,
        client: GeminiClient,
        store: AttendanceStore,
    ) -> Self {
        info!("Creating live attendance session: {}", config.session_id);

        Self {
            config,
            gemini,
            playback_sample_rate,
            client: Arc::new(client),
            store: Arc::new(store),
            is_recording: Arc::new(AtomicBool::new(false)),
            is_loading: Arc::new(AtomicBool::new(false)),
            transcript: Arc::new(Mutex::new(String::new())),
            finalized: Arc::new(AtomicBool::new(false)),
            turn_complete: Arc::new(Notify::new()),
            records: Arc::new(Mutex::new(Vec::new())),
            backend: Arc::new(Mutex::new(None)),
            uplink_task: Arc::new(Mutex::new(None)),
            downlink_task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub async fn transcript(&self) -> String {
        self.transcript.lock().await.clone()
    }

    pub async fn records(&self) -> Vec<AttendanceRecord> {
        self.records.lock().await.clone()
    }

    /// Open the live channel and start streaming capture audio.
    pub async fn start(&self) -> Result<()> {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            warn!("Live session already recording");
            return Ok(());
        }

        let session = match LiveSession::connect(&self.gemini).await {
            Ok(s) => s,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        let (mut input, mut output) = session.split();

        let mut backend =
            match AudioBackendFactory::create(self.config.source.clone(), self.config.audio.clone())
            {
                Ok(b) => b,
                Err(e) => {
                    self.is_recording.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            };

        let mut frame_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        // Headless hosts may have no output device; the session still works,
        // it just cannot play the model's audio back.
        let playback = match Playback::new(self.playback_sample_rate) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Playback unavailable: {e}");
                None
            }
        };

        {
            let mut slot = self.backend.lock().await;
            *slot = Some(backend);
        }

        self.finalized.store(false, Ordering::SeqCst);
        {
            let mut transcript = self.transcript.lock().await;
            transcript.clear();
        }

        // Uplink: capture frames -> PCM16 realtime input chunks
        let is_recording = Arc::clone(&self.is_recording);
        let uplink = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if !is_recording.load(Ordering::SeqCst) {
                    break;
                }

                let bytes = pcm::i16_to_le_bytes(&frame.samples);
                if let Err(e) = input.send_audio_frame(&bytes, frame.sample_rate).await {
                    warn!("Failed to push audio frame: {e}");
                    break;
                }
            }

            if let Err(e) = input.close().await {
                warn!("Failed to close uplink: {e}");
            }

            info!("Uplink task stopped");
        });

        // Downlink: single consumer, strict arrival order
        let transcript = Arc::clone(&self.transcript);
        let turn_complete = Arc::clone(&self.turn_complete);
        let session_id = self.config.session_id.clone();
        let finalizer = self.clone();

        let downlink = tokio::spawn(async move {
            loop {
                let events = match output.next_events().await {
                    Ok(Some(events)) => events,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Live channel error: {e}");
                        break;
                    }
                };

                for event in events {
                    match event {
                        LiveEvent::Transcript(text) => {
                            let mut transcript = transcript.lock().await;
                            transcript.push_str(&text);
                        }
                        LiveEvent::Audio(bytes) => {
                            if let Some(playback) = &playback {
                                let samples = pcm::le_bytes_to_i16(&bytes);
                                if let Err(e) = playback.enqueue(samples) {
                                    warn!("Playback enqueue failed: {e}");
                                }
                            }
                        }
                        LiveEvent::Interrupted => {
                            if let Some(playback) = &playback {
                                if let Err(e) = playback.interrupt() {
                                    warn!("Playback interrupt failed: {e}");
                                }
                            }
                        }
                        LiveEvent::TurnComplete => {
                            info!("Turn complete for session {session_id}");
                            turn_complete.notify_waiters();

                            // An unattended turn completion must still hand
                            // the transcript to extraction; the once-guard
                            // keeps the stop path from repeating it. A turn
                            // that completed before any input transcription
                            // is deferred to the stop path.
                            if finalizer.transcript().await.trim().is_empty() {
                                info!("Turn completed with no transcript yet; deferring");
                            } else if let Err(e) = finalizer.finalize().await {
                                warn!("Finalize on turn completion failed: {e}");
                            }
                        }
                        LiveEvent::SetupComplete => {}
                    }
                }
            }

            info!("Downlink task stopped");
        });

        {
            let mut slot = self.uplink_task.lock().await;
            *slot = Some(uplink);
        }
        {
            let mut slot = self.downlink_task.lock().await;
            *slot = Some(downlink);
        }

        info!("Live session {} started", self.config.session_id);

        Ok(())
    }

    /// Stop streaming, wait briefly for turn completion, then finalize.
    ///
    /// When the downlink already finalized on a turn-complete signal the
    /// fallback wait is skipped and the once-guard returns the existing
    /// records immediately.
    pub async fn stop(&self) -> Result<Vec<AttendanceRecord>> {
        if !self.is_recording.swap(false, Ordering::SeqCst) {
            warn!("Live session not recording");
            return Ok(self.records().await);
        }

        info!("Stopping live session {}", self.config.session_id);

        let result = self.teardown().await;

        // The downlink is drained on every exit path so no task is left
        // holding the channel after an error.
        if let Some(task) = self.downlink_task.lock().await.take() {
            match tokio::time::timeout(DOWNLINK_DRAIN, task).await {
                Ok(Err(e)) => warn!("Downlink task panicked: {e}"),
                Err(_) => warn!("Downlink task did not drain; continuing"),
                Ok(Ok(())) => {}
            }
        }

        result
    }

    async fn teardown(&self) -> Result<Vec<AttendanceRecord>> {
        let backend = {
            let mut slot = self.backend.lock().await;
            slot.take()
        };
        if let Some(mut backend) = backend {
            backend.stop().await?;
        }

        if let Some(task) = self.uplink_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Uplink task panicked: {e}");
            }
        }

        // Fallback timer: proceed even if turn completion never arrives.
        // Skipped entirely when the downlink already finalized.
        if !self.finalized.load(Ordering::SeqCst) {
            let waited =
                tokio::time::timeout(FINALIZE_FALLBACK, self.turn_complete.notified()).await;
            if waited.is_err() {
                info!("Turn-complete signal did not arrive; finalizing on fallback timer");
            }
        }

        self.finalize().await
    }

    /// Hand the accumulated transcript to the extraction call, at most once.
    async fn finalize(&self) -> Result<Vec<AttendanceRecord>> {
        if self.finalized.swap(true, Ordering::SeqCst) {
            // Second trigger of the turn-complete/fallback race: nothing to do
            return Ok(self.records().await);
        }

        let snapshot = self.transcript.lock().await.clone();

        if snapshot.trim().is_empty() {
            return Err(Error::EmptyTranscription);
        }

        self.is_loading.store(true, Ordering::SeqCst);

        let result = self
            .client
            .extract_attendance(&snapshot, self.config.reference_date)
            .await;

        self.is_loading.store(false, Ordering::SeqCst);

        let extracted = result?;

        {
            let mut records = self.records.lock().await;
            *records = extracted.clone();
        }

        if let Err(e) = self.store.save(&extracted) {
            warn!("Failed to persist attendance snapshot: {e}");
        }

        info!(
            "Live session {} finalized: {} records",
            self.config.session_id,
            extracted.len()
        );

        Ok(extracted)
    }

    pub fn reference_date(&self) -> chrono::NaiveDate {
        self.config.reference_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioBackendConfig, AudioSource};
    use std::time::Instant;

    /// Session wired to an endpoint that refuses connections, so any
    /// extraction attempt fails fast with a remote-call error.
    fn unreachable_session(dir: &std::path::Path) -> LiveAttendanceSession {
        let config = SessionConfig {
            session_id: "lista-live-test".to_string(),
            source: AudioSource::Microphone,
            audio: AudioBackendConfig::default(),
            reference_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let client = GeminiClient::new(
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
            "http://127.0.0.1:9".to_string(),
        );
        LiveAttendanceSession::new(
            config,
            crate::config::Config::default().gemini,
            24000,
            client,
            AttendanceStore::new(dir.join("asistencia.json")),
        )
    }

    #[tokio::test]
    async fn finalize_runs_extraction_at_most_once() {
        let dir = tempfile::tempdir().unwrap();
        let session = unreachable_session(dir.path());

        *session.transcript.lock().await = "Ana... presente.".to_string();

        // First trigger reaches the (unreachable) extraction call
        let first = session.finalize().await;
        assert!(matches!(first, Err(Error::RemoteCall(_))));

        // Second trigger of the turn-complete/fallback race observes the
        // guard: an Ok result proves no second network attempt was made
        let second = session.finalize().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn finalize_with_empty_transcript_errors_once() {
        let dir = tempfile::tempdir().unwrap();
        let session = unreachable_session(dir.path());

        let first = session.finalize().await;
        assert!(matches!(first, Err(Error::EmptyTranscription)));

        let second = session.finalize().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn stop_skips_fallback_wait_when_already_finalized() {
        let dir = tempfile::tempdir().unwrap();
        let session = unreachable_session(dir.path());

        // As if the downlink finalized on an earlier turn-complete signal
        session.is_recording.store(true, Ordering::SeqCst);
        session.finalized.store(true, Ordering::SeqCst);

        let started = Instant::now();
        let records = session.stop().await.unwrap();

        assert!(records.is_empty());
        assert!(
            started.elapsed() < FINALIZE_FALLBACK,
            "stop must not burn the fallback timer after finalization"
        );
    }
}
