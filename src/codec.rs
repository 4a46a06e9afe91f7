//! Byte-level helpers for audio payloads exchanged with the model service.
//!
//! Audio travels as base64 text wrapping little-endian 16-bit PCM.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::{NovaError, Result};

/// Sample rate the service streams speech at
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Decoded audio, one sample vector per channel, samples in `[-1.0, 1.0)`
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

/// Splits interleaved 16-bit little-endian PCM into normalized channels.
///
/// A trailing partial frame is dropped. An odd byte count or a zero channel
/// count is rejected.
pub fn decode_pcm16(data: &[u8], sample_rate: u32, channel_count: usize) -> Result<AudioBuffer> {
    if channel_count == 0 {
        return Err(NovaError::InvalidFormat {
            message: "channel count must be at least 1".to_string(),
        });
    }
    if data.len() % 2 != 0 {
        return Err(NovaError::InvalidFormat {
            message: format!("PCM16 payload has odd length {}", data.len()),
        });
    }

    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let frame_count = samples.len() / channel_count;

    let channels = (0..channel_count)
        .map(|channel| {
            (0..frame_count)
                .map(|i| f32::from(samples[i * channel_count + channel]) / 32768.0)
                .collect()
        })
        .collect();

    Ok(AudioBuffer {
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_helpers_match_standard_alphabet() {
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(decode_base64("***"), Err(NovaError::Decode(_))));
    }

    #[test]
    fn mono_samples_are_normalized() {
        let bytes = [0x00, 0x80, 0x00, 0x00, 0x00, 0x40, 0xff, 0x7f];
        let buffer = decode_pcm16(&bytes, DEFAULT_SAMPLE_RATE, 1).unwrap();
        assert_eq!(buffer.sample_rate, 24_000);
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.channels[0][0], -1.0);
        assert_eq!(buffer.channels[0][1], 0.0);
        assert_eq!(buffer.channels[0][2], 0.5);
        assert!(buffer.channels[0][3] < 1.0);
    }

    #[test]
    fn stereo_is_deinterleaved_and_partial_frames_dropped() {
        // L=0x4000, R=0xC000, L=0, R=0, then a lone left sample
        let bytes = [0x00, 0x40, 0x00, 0xc0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40];
        let buffer = decode_pcm16(&bytes, 48_000, 2).unwrap();
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channels[0], vec![0.5, 0.0]);
        assert_eq!(buffer.channels[1], vec![-0.5, 0.0]);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(decode_pcm16(&[0, 0, 0], DEFAULT_SAMPLE_RATE, 1).is_err());
        assert!(decode_pcm16(&[0, 0], DEFAULT_SAMPLE_RATE, 0).is_err());
        assert_eq!(decode_pcm16(&[], DEFAULT_SAMPLE_RATE, 1).unwrap().frame_count(), 0);
    }
}
