//! Scheduled playback of model audio with an interruption kill-switch
//!
//! Gemini Live returns 24kHz PCM16 in small buffers. Buffers must play
//! gaplessly and in order: each one starts at the later of "now" or the
//! previous buffer's computed end time. An `interrupted` signal from the
//! server drops everything not yet finished and resets the schedule to
//! zero.
//!
//! The rodio output stream is not `Send`, so a worker thread owns it and
//! takes commands over a channel; the sink's FIFO queue preserves ordering
//! while `PlaybackSchedule` tracks the timing bookkeeping.

use crate::error::{Error, Result};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Pure scheduling state: next start time relative to the playback clock.
#[derive(Debug, Default)]
pub struct PlaybackSchedule {
    next_start: Duration,
}

impl PlaybackSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one buffer arriving at `now`, returning its start time:
    /// the later of `now` and the previous buffer's end.
    pub fn schedule(&mut self, now: Duration, buffer_duration: Duration) -> Duration {
        let start = now.max(self.next_start);
        self.next_start = start + buffer_duration;
        start
    }

    /// Reset after an interruption: pending time is discarded.
    pub fn reset(&mut self) {
        self.next_start = Duration::ZERO;
    }

    pub fn next_start(&self) -> Duration {
        self.next_start
    }
}

/// Duration of a mono PCM16 buffer at the given rate.
pub fn buffer_duration(sample_count: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(sample_count as f64 / sample_rate as f64)
}

enum PlaybackCmd {
    Enqueue(Vec<i16>),
    Interrupt,
    Shutdown,
}

/// Handle to the playback worker thread.
pub struct Playback {
    cmd_tx: std::sync::mpsc::Sender<PlaybackCmd>,
    worker: Option<std::thread::JoinHandle<()>>,
    sample_rate: u32,
}

impl Playback {
    /// Open the default output device and start the worker.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let worker = std::thread::spawn(move || {
            run_playback(sample_rate, cmd_rx, ready_tx);
        });

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(Error::Playback(
                    "Timed out opening the output device".to_string(),
                ));
            }
        }

        info!("Playback ready at {sample_rate}Hz");

        Ok(Self {
            cmd_tx,
            worker: Some(worker),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Queue one PCM16 buffer for gapless playback.
    pub fn enqueue(&self, samples: Vec<i16>) -> Result<()> {
        self.cmd_tx
            .send(PlaybackCmd::Enqueue(samples))
            .map_err(|_| Error::Playback("Playback worker is gone".to_string()))
    }

    /// Stop all not-yet-finished buffers and reset the schedule.
    pub fn interrupt(&self) -> Result<()> {
        self.cmd_tx
            .send(PlaybackCmd::Interrupt)
            .map_err(|_| Error::Playback("Playback worker is gone".to_string()))
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PlaybackCmd::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_playback(
    sample_rate: u32,
    cmd_rx: std::sync::mpsc::Receiver<PlaybackCmd>,
    ready_tx: std::sync::mpsc::Sender<Result<()>>,
) {
    // The stream handle must outlive the sink; both stay on this thread.
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(Error::Playback(format!(
                "Failed to open output device: {e}"
            ))));
            return;
        }
    };

    let sink = match Sink::try_new(&handle) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(Error::Playback(format!("Failed to create sink: {e}"))));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));

    let clock = Instant::now();
    let mut schedule = PlaybackSchedule::new();

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            PlaybackCmd::Enqueue(samples) => {
                let duration = buffer_duration(samples.len(), sample_rate);
                let start = schedule.schedule(clock.elapsed(), duration);
                tracing::debug!(
                    "Scheduling {}ms buffer at t={}ms",
                    duration.as_millis(),
                    start.as_millis()
                );
                // The sink's FIFO realizes the computed ordering
                sink.append(SamplesBuffer::new(1, sample_rate, samples));
            }
            PlaybackCmd::Interrupt => {
                sink.stop();
                schedule.reset();
                warn!("Playback interrupted, schedule reset");
            }
            PlaybackCmd::Shutdown => break,
        }
    }
}
