// Unit tests for audio types, PCM helpers, and playback scheduling

use pase_lista::audio::{
    buffer_duration, pcm, AudioBackendConfig, AudioFrame, PlaybackSchedule,
};
use std::time::Duration;

#[test]
fn test_audio_frame_creation() {
    let frame = AudioFrame {
        samples: vec![100, 200, 300],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 1000,
    };

    assert_eq!(frame.samples.len(), 3);
    assert_eq!(frame.sample_rate, 16000);
    assert_eq!(frame.channels, 1);
    assert_eq!(frame.timestamp_ms, 1000);
}

#[test]
fn test_audio_backend_config_default() {
    let config = AudioBackendConfig::default();

    assert_eq!(config.target_sample_rate, 16000, "Default should be 16kHz for live input");
    assert_eq!(config.target_channels, 1, "Default should be mono");
    assert_eq!(config.buffer_duration_ms, 100, "Default buffer should be 100ms");
}

// ============================================================================
// PCM helpers
// ============================================================================

#[test]
fn test_f32_to_i16_full_scale() {
    let samples = pcm::f32_to_i16(&[0.0, 1.0, -1.0]);
    assert_eq!(samples, vec![0, 32767, -32767]);
}

#[test]
fn test_f32_to_i16_clamps_out_of_range() {
    let samples = pcm::f32_to_i16(&[2.0, -3.5]);
    assert_eq!(samples, vec![32767, -32767]);
}

#[test]
fn test_le_bytes_round_trip() {
    let original = vec![0i16, 1, -1, i16::MAX, i16::MIN];

    let bytes = pcm::i16_to_le_bytes(&original);
    assert_eq!(bytes.len(), original.len() * 2);

    assert_eq!(pcm::le_bytes_to_i16(&bytes), original);
}

#[test]
fn test_le_bytes_drops_trailing_odd_byte() {
    let samples = pcm::le_bytes_to_i16(&[0x01, 0x00, 0xff]);
    assert_eq!(samples, vec![1]);
}

#[test]
fn test_wav_from_pcm16_header_and_size() {
    let samples = vec![0i16; 1600]; // 100ms at 16kHz mono
    let wav = pcm::wav_from_pcm16(&samples, 16000, 1).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    // 44-byte header plus 2 bytes per sample
    assert_eq!(wav.len(), 44 + samples.len() * 2);
}

#[test]
fn test_downmix_stereo_sums_channels() {
    // Interleaved [L, R, L, R]
    let mono = pcm::downmix_to_mono(&[100, 200, -50, 50], 2);
    assert_eq!(mono, vec![300, 0]);
}

#[test]
fn test_downmix_clamps_on_overflow() {
    let mono = pcm::downmix_to_mono(&[i16::MAX, i16::MAX], 2);
    assert_eq!(mono, vec![i16::MAX]);
}

#[test]
fn test_downmix_mono_passthrough() {
    let samples = vec![1, 2, 3];
    assert_eq!(pcm::downmix_to_mono(&samples, 1), samples);
}

#[test]
fn test_decimate_48k_to_16k() {
    let samples: Vec<i16> = (0..12).collect();
    let decimated = pcm::decimate(&samples, 48000, 16000);

    // Every 3rd sample
    assert_eq!(decimated, vec![0, 3, 6, 9]);
}

#[test]
fn test_decimate_never_upsamples() {
    let samples = vec![1, 2, 3];
    assert_eq!(pcm::decimate(&samples, 8000, 16000), samples);
}

#[test]
fn test_decimated_rate_matches_decimate_output() {
    // Divisible ratio hits the target exactly
    assert_eq!(pcm::decimated_rate(48000, 16000), 16000);

    // 44.1kHz over a 16kHz target uses the integer ratio 2 and stays at
    // 22.05kHz; labeling such frames 16kHz would slow the audio by ~38%
    assert_eq!(pcm::decimated_rate(44100, 16000), 22050);
    let one_second: Vec<i16> = vec![0; 44100];
    assert_eq!(pcm::decimate(&one_second, 44100, 16000).len(), 22050);

    // At or below the target the source rate passes through
    assert_eq!(pcm::decimated_rate(8000, 16000), 8000);
    assert_eq!(pcm::decimated_rate(16000, 16000), 16000);
}

#[tokio::test]
async fn test_file_backend_labels_frames_with_true_rate() {
    use pase_lista::audio::file::FileBackend;
    use pase_lista::audio::AudioBackend;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture-44100.wav");

    // 200ms at 44.1kHz mono
    let samples = vec![0i16; 8820];
    let wav = pcm::wav_from_pcm16(&samples, 44100, 1).unwrap();
    std::fs::write(&path, wav).unwrap();

    let mut backend = FileBackend::new(
        path.to_string_lossy().into_owned(),
        AudioBackendConfig::default(),
    )
    .unwrap();

    let mut frame_rx = backend.start().await.unwrap();

    let mut total = 0;
    while let Some(frame) = frame_rx.recv().await {
        assert_eq!(frame.sample_rate, 22050);
        total += frame.samples.len();
    }

    assert_eq!(total, 4410, "integer ratio 2 keeps every other sample");

    backend.stop().await.unwrap();
}

// ============================================================================
// Playback scheduling
// ============================================================================

#[test]
fn test_buffer_duration_at_24khz() {
    let duration = buffer_duration(2400, 24000);
    assert_eq!(duration, Duration::from_millis(100));
}

#[test]
fn test_schedule_starts_immediately_when_idle() {
    let mut schedule = PlaybackSchedule::new();

    let start = schedule.schedule(Duration::from_millis(500), Duration::from_millis(100));

    assert_eq!(start, Duration::from_millis(500));
    assert_eq!(schedule.next_start(), Duration::from_millis(600));
}

#[test]
fn test_schedule_is_gapless_under_backlog() {
    let mut schedule = PlaybackSchedule::new();
    let now = Duration::from_millis(100);

    // Three buffers arriving faster than they play
    let first = schedule.schedule(now, Duration::from_millis(100));
    let second = schedule.schedule(now, Duration::from_millis(100));
    let third = schedule.schedule(now, Duration::from_millis(100));

    assert_eq!(first, Duration::from_millis(100));
    assert_eq!(second, Duration::from_millis(200), "second starts at the first's end");
    assert_eq!(third, Duration::from_millis(300), "third starts at the second's end");
}

#[test]
fn test_schedule_catches_up_after_gap() {
    let mut schedule = PlaybackSchedule::new();

    schedule.schedule(Duration::from_millis(0), Duration::from_millis(100));

    // Next buffer arrives well after the previous one finished
    let start = schedule.schedule(Duration::from_millis(500), Duration::from_millis(100));
    assert_eq!(start, Duration::from_millis(500), "no replay of elapsed time");
}

#[test]
fn test_schedule_reset_discards_pending_time() {
    let mut schedule = PlaybackSchedule::new();

    schedule.schedule(Duration::from_millis(0), Duration::from_secs(10));
    assert!(schedule.next_start() > Duration::ZERO);

    schedule.reset();
    assert_eq!(schedule.next_start(), Duration::ZERO);

    // After an interruption the next buffer plays immediately
    let start = schedule.schedule(Duration::from_millis(50), Duration::from_millis(100));
    assert_eq!(start, Duration::from_millis(50));
}
