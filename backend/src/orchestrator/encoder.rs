//! Artifact encoding
//!
//! Pure transforms that turn provider payloads into something a consumer can
//! play or display: base64 handling, 16-bit PCM decoding, data URIs, and
//! session-local blob URIs.

use crate::orchestrator::constants::BLOB_URI_PREFIX;
use base64::Engine;
use serde::Serialize;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while encoding or decoding artifact payloads
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Payload is not valid base64
    #[error("Base64 decode error: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// PCM payload doesn't split into whole frames
    #[error("PCM payload of {len} bytes is not a multiple of the {frame_size}-byte frame size")]
    MisalignedPcm {
        /// Payload length in bytes
        len: usize,
        /// Bytes per frame (2 * channels)
        frame_size: usize,
    },

    /// Channel count of zero
    #[error("Audio must have at least one channel")]
    NoChannels,

    /// Sample rate of zero
    #[error("Audio sample rate must be positive")]
    InvalidSampleRate,

    /// WAV rendering failed
    #[error("Failed to render WAV: {0}")]
    Wav(#[from] hound::Error),
}

/// Decode standard base64, tolerating a `data:` prefix and embedded whitespace
pub fn decode_base64(data: &str) -> Result<Vec<u8>, EncodeError> {
    let payload = if data.starts_with("data:") {
        data.split_once(',').map(|(_, b64)| b64).unwrap_or(data)
    } else {
        data
    };

    let normalized: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(normalized.as_bytes())?)
}

/// Encode bytes as standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Format a base64 payload as a `data:` URI
pub fn data_uri(mime_type: &str, base64_data: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// Decoded audio, one sample vector per channel, samples in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples per second
    pub sample_rate: u32,
    /// Planar samples, `channels[c][frame]`
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Playback length
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Render as a 16-bit PCM WAV file
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let spec = hound::WavSpec {
            channels: self.channels.len() as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut out = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut out), spec)?;
            for frame in 0..self.frames() {
                for channel in &self.channels {
                    let sample = (channel[frame] * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32);
                    writer.write_sample(sample as i16)?;
                }
            }
            writer.finalize()?;
        }
        Ok(out)
    }
}

/// Decode little-endian signed 16-bit interleaved PCM into an `AudioBuffer`
///
/// Each sample is divided by 32768 so the output lies in [-1, 1].
/// An empty payload yields an empty buffer.
pub fn decode_pcm16(
    bytes: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, EncodeError> {
    if channels == 0 {
        return Err(EncodeError::NoChannels);
    }
    if sample_rate == 0 {
        return Err(EncodeError::InvalidSampleRate);
    }

    let channel_count = channels as usize;
    let frame_size = 2 * channel_count;
    if bytes.len() % frame_size != 0 {
        return Err(EncodeError::MisalignedPcm {
            len: bytes.len(),
            frame_size,
        });
    }

    let frames = bytes.len() / frame_size;
    let mut planar = vec![Vec::with_capacity(frames); channel_count];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        planar[i % channel_count].push(sample as f32 / 32768.0);
    }

    Ok(AudioBuffer {
        sample_rate,
        channels: planar,
    })
}

/// In-memory payload addressed by a session-local URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalBlob {
    /// Blob id, the last URI segment
    pub id: Uuid,
    /// `blob:` URI handed to consumers
    pub uri: String,
    /// MIME type of `data`
    pub mime_type: String,
    /// Raw bytes
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl LocalBlob {
    /// Wrap raw bytes under a fresh blob URI
    pub fn from_bytes(data: Vec<u8>, mime_type: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            uri: blob_uri(id),
            mime_type: mime_type.to_string(),
            data,
        }
    }
}

/// URI for a blob id
pub fn blob_uri(id: Uuid) -> String {
    format!("{}{}", BLOB_URI_PREFIX, id)
}

/// Parse the id back out of a blob URI
pub fn parse_blob_uri(uri: &str) -> Option<Uuid> {
    uri.strip_prefix(BLOB_URI_PREFIX)
        .and_then(|id| Uuid::parse_str(id).ok())
}
