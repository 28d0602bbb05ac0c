//! Speech playback
//!
//! One playback context (24 kHz mono) is opened lazily on first use, shared
//! by every clip afterwards, and released when the player is closed or
//! dropped.

use crate::orchestrator::artifact::Artifact;
use crate::orchestrator::constants::{SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use crate::orchestrator::encoder::{self, AudioBuffer, EncodeError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while preparing audio for playback
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The player was already closed
    #[error("Playback context has been released")]
    Closed,

    /// The artifact doesn't carry audio
    #[error("Artifact of type {0} is not audio")]
    NotAudio(&'static str),

    /// Payload could not be decoded
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Decoder bound to a fixed sample rate and channel layout
///
/// Once released, every handle to the context refuses further work.
#[derive(Debug)]
pub struct PlaybackContext {
    id: Uuid,
    sample_rate: u32,
    channels: u16,
    clips: AtomicU64,
    released: AtomicBool,
}

impl PlaybackContext {
    fn open(sample_rate: u32, channels: u16) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(context_id = %id, sample_rate, channels, "Opened playback context");
        Self {
            id,
            sample_rate,
            channels,
            clips: AtomicU64::new(0),
            released: AtomicBool::new(false),
        }
    }

    /// Context id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Clips decoded so far
    pub fn clips_decoded(&self) -> u64 {
        self.clips.load(Ordering::Relaxed)
    }

    /// Whether the context has been released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Decode a speech artifact into planar samples
    pub fn decode(&self, artifact: &Artifact) -> Result<AudioBuffer, PlaybackError> {
        if self.is_released() {
            return Err(PlaybackError::Closed);
        }
        let Artifact::RawAudioBase64 { data, .. } = artifact else {
            return Err(PlaybackError::NotAudio(artifact.variant_name()));
        };
        let bytes = encoder::decode_base64(data)?;
        let buffer = encoder::decode_pcm16(&bytes, self.sample_rate, self.channels)?;
        self.clips.fetch_add(1, Ordering::Relaxed);
        Ok(buffer)
    }

    /// Decode a speech artifact and render it as a WAV file
    pub fn render_wav(&self, artifact: &Artifact) -> Result<Vec<u8>, PlaybackError> {
        Ok(self.decode(artifact)?.to_wav_bytes()?)
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(
            context_id = %self.id,
            clips = self.clips_decoded(),
            "Released playback context"
        );
    }
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Idle,
    Open(Arc<PlaybackContext>),
    Closed,
}

/// Owner of the shared playback context
#[derive(Debug, Default)]
pub struct SpeechPlayer {
    slot: Mutex<Slot>,
}

impl SpeechPlayer {
    /// Player with no context opened yet
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the context has been opened and not yet released
    pub fn is_open(&self) -> bool {
        matches!(*self.slot(), Slot::Open(_))
    }

    /// The shared context, opened on first call
    pub fn context(&self) -> Result<Arc<PlaybackContext>, PlaybackError> {
        let mut slot = self.slot();
        if matches!(*slot, Slot::Idle) {
            let context = PlaybackContext::open(SPEECH_SAMPLE_RATE, SPEECH_CHANNELS);
            *slot = Slot::Open(Arc::new(context));
        }
        match &*slot {
            Slot::Open(context) => Ok(context.clone()),
            _ => Err(PlaybackError::Closed),
        }
    }

    /// Render a speech artifact as WAV using the shared context
    pub fn render_wav(&self, artifact: &Artifact) -> Result<Vec<u8>, PlaybackError> {
        self.context()?.render_wav(artifact)
    }

    /// Release the context and drop the player's handle to it
    ///
    /// Later calls to `context` fail, as does any work on handles taken
    /// before the close.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.slot(), Slot::Closed);
        if let Slot::Open(context) = previous {
            context.release();
        }
    }
}

impl Drop for SpeechPlayer {
    fn drop(&mut self) {
        self.close();
    }
}
