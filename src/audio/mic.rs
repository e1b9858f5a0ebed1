//! Microphone capture via cpal
//!
//! The cpal stream is not `Send`, so it lives on a dedicated worker thread
//! for the duration of the capture. The callback converts whatever sample
//! format the device delivers into i16; the worker drains the shared buffer
//! once per block and ships normalized frames (target rate, mono) over the
//! session channel.

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::pcm;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct MicBackend {
    preferred_device: Option<String>,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicBackend {
    pub fn new(preferred_device: Option<String>, config: AudioBackendConfig) -> Result<Self> {
        Ok(Self {
            preferred_device,
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }

    /// List input device names so callers can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| Error::AudioDevice(format!("Failed to enumerate input devices: {e}")))?;

        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn resolve_device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();

        match &self.preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|_| Error::PermissionDenied)?;
                devices
                    .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                    .ok_or_else(|| Error::AudioDevice(format!("Input device '{name}' not found")))
            }
            None => host.default_input_device().ok_or(Error::PermissionDenied),
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(Error::AudioDevice("Capture already started".to_string()));
        }

        let device = self.resolve_device()?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        self.capturing.store(true, Ordering::SeqCst);

        let capturing = Arc::clone(&self.capturing);
        let config = self.config.clone();

        let worker = std::thread::spawn(move || {
            run_capture(device, config, frame_tx, capturing, ready_tx);
        });

        // Wait for the stream to come up (or fail) before reporting success
        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = worker.join();
                return Err(Error::AudioDevice(
                    "Timed out waiting for the capture stream".to_string(),
                ));
            }
        }

        info!("Microphone capture started on '{device_name}'");

        self.worker = Some(worker);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| Error::Channel(e.to_string()))?
                .map_err(|_| Error::Channel("Capture thread panicked".to_string()))?;
        }

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicBackend {
    fn drop(&mut self) {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Worker thread body: owns the cpal stream and drains the callback buffer
/// into normalized frames once per block.
fn run_capture(
    device: cpal::Device,
    config: AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    capturing: Arc<AtomicBool>,
    ready_tx: std::sync::mpsc::Sender<Result<()>>,
) {
    let default_config = match device.default_input_config() {
        Ok(c) => c,
        Err(_) => {
            capturing.store(false, Ordering::SeqCst);
            let _ = ready_tx.send(Err(Error::PermissionDenied));
            return;
        }
    };

    let format = default_config.sample_format();
    let device_config: StreamConfig = default_config.into();
    let device_rate = device_config.sample_rate.0;
    let device_channels = device_config.channels.max(1);

    let buffer: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::new()));
    let callback_buffer = Arc::clone(&buffer);

    let err_fn = |err| warn!("Audio stream error: {err}");

    // Convert every supported sample type to i16 up front so the drain loop
    // stays format-agnostic.
    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            &device_config,
            move |data: &[f32], _| {
                if let Ok(mut buf) = callback_buffer.lock() {
                    buf.extend(pcm::f32_to_i16(data));
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &device_config,
            move |data: &[i16], _| {
                if let Ok(mut buf) = callback_buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &device_config,
            move |data: &[u16], _| {
                if let Ok(mut buf) = callback_buffer.lock() {
                    buf.extend(data.iter().map(|&s| (s as i32 - 32_768) as i16));
                }
            },
            err_fn,
            None,
        ),
        other => {
            capturing.store(false, Ordering::SeqCst);
            let _ = ready_tx.send(Err(Error::AudioDevice(format!(
                "Unsupported sample format: {other:?}"
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(_) => {
            // Permission denials surface here on most platforms
            capturing.store(false, Ordering::SeqCst);
            let _ = ready_tx.send(Err(Error::PermissionDenied));
            return;
        }
    };

    if let Err(e) = stream.play() {
        capturing.store(false, Ordering::SeqCst);
        let _ = ready_tx.send(Err(Error::AudioDevice(format!(
            "Failed to start stream: {e}"
        ))));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    let started = Instant::now();
    let block = Duration::from_millis(config.buffer_duration_ms.max(10));
    let frame_rate = pcm::decimated_rate(device_rate, config.target_sample_rate);

    while capturing.load(Ordering::SeqCst) {
        std::thread::sleep(block);

        let raw: Vec<i16> = {
            let mut buf = match buffer.lock() {
                Ok(b) => b,
                Err(_) => break,
            };
            std::mem::take(&mut *buf)
        };

        if raw.is_empty() {
            continue;
        }

        let mono = pcm::downmix_to_mono(&raw, device_channels);
        let samples = pcm::decimate(&mono, device_rate, config.target_sample_rate);

        let frame = AudioFrame {
            samples,
            sample_rate: frame_rate,
            channels: 1,
            timestamp_ms: started.elapsed().as_millis() as u64,
        };

        if frame_tx.blocking_send(frame).is_err() {
            // Receiver gone, session has moved on
            break;
        }
    }

    drop(stream);
    capturing.store(false, Ordering::SeqCst);
}
