//! PCM16 conversion and WAV framing helpers
//!
//! Everything the pipeline sends to or receives from the model is signed
//! 16-bit little-endian PCM: capture frames are encoded to WAV for the
//! one-shot transcription call, raw frames are base64-framed for the live
//! channel, and model audio arrives as bare PCM16 at 24kHz.

use crate::error::{Error, Result};
use std::io::Cursor;

/// Convert floating-point samples (-1.0..1.0) to signed 16-bit PCM.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}

/// Serialize i16 samples as little-endian bytes.
pub fn i16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode little-endian PCM16 bytes back into samples.
///
/// A trailing odd byte (truncated frame) is dropped.
pub fn le_bytes_to_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Encode PCM16 samples as a complete WAV payload for API upload.
pub fn wav_from_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::AudioDevice(format!("WAV header write failed: {e}")))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::AudioDevice(format!("WAV sample write failed: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::AudioDevice(format!("WAV finalize failed: {e}")))?;
    }

    Ok(cursor.into_inner())
}

/// Downmix interleaved multi-channel samples to mono by summing channels.
pub fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / channels);

    for chunk in samples.chunks_exact(channels) {
        let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }

    mono
}

/// Decimate mono samples down to `target_rate` by taking every Nth sample.
///
/// Upsampling is not supported; a source rate at or below the target is
/// returned unchanged. The ratio is integer, so a non-divisible source
/// rate lands above the target (44.1kHz against a 16kHz target keeps
/// 22.05kHz); frames must be labeled with `decimated_rate`, not the target.
pub fn decimate(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if source_rate <= target_rate || target_rate == 0 {
        return samples.to_vec();
    }

    let ratio = (source_rate / target_rate).max(1) as usize;
    samples.iter().step_by(ratio).copied().collect()
}

/// The rate `decimate` actually produces for the given pair.
pub fn decimated_rate(source_rate: u32, target_rate: u32) -> u32 {
    if source_rate <= target_rate || target_rate == 0 {
        return source_rate;
    }

    source_rate / (source_rate / target_rate).max(1)
}
