//! File-based capture backend
//!
//! Reads a WAV file and replays it as capture frames, normalized the same
//! way as the microphone path. Used for offline testing and batch
//! processing; frames are emitted as fast as the consumer drains them.

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::pcm;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct FileBackend {
    path: String,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: String, config: AudioBackendConfig) -> Result<Self> {
        Ok(Self {
            path,
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(Error::AudioDevice("Capture already started".to_string()));
        }

        let reader = hound::WavReader::open(&self.path)
            .map_err(|e| Error::AudioDevice(format!("Failed to open WAV file: {e}")))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::AudioDevice(format!("Failed to read audio samples: {e}")))?;

        info!(
            "Audio file loaded: {} ({}Hz, {} channels, {} samples)",
            self.path,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        let mono = pcm::downmix_to_mono(&samples, spec.channels);
        let normalized = pcm::decimate(&mono, spec.sample_rate, self.config.target_sample_rate);
        let sample_rate = pcm::decimated_rate(spec.sample_rate, self.config.target_sample_rate);

        let block_samples =
            ((sample_rate as u64 * self.config.buffer_duration_ms) / 1000).max(1) as usize;

        let (frame_tx, frame_rx) = mpsc::channel(32);

        self.capturing.store(true, Ordering::SeqCst);
        let capturing = Arc::clone(&self.capturing);

        let task = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            let block_ms = (block_samples as u64 * 1000) / sample_rate as u64;

            for block in normalized.chunks(block_samples) {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                let frame = AudioFrame {
                    samples: block.to_vec(),
                    sample_rate,
                    channels: 1,
                    timestamp_ms,
                };
                timestamp_ms += block_ms;

                if frame_tx.send(frame).await.is_err() {
                    break;
                }
            }

            capturing.store(false, Ordering::SeqCst);
        });

        self.task = Some(task);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            task.await.map_err(|e| Error::Channel(e.to_string()))?;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "file"
    }
}
