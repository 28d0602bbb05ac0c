//! Orchestrator constants
//!
//! Centralized constants used throughout the orchestrator module.

/// SSE stream termination signal
pub const SSE_DONE_SIGNAL: &str = "[DONE]";

/// SSE error prefix
pub const SSE_ERROR_PREFIX: &str = "[ERROR]";

/// Sample rate of synthesized speech (Hz)
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Channel count of synthesized speech
pub const SPEECH_CHANNELS: u16 = 1;

/// Default pause between video operation polls (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default hard ceiling on a video generation task (seconds)
pub const DEFAULT_VIDEO_DEADLINE_SECS: u64 = 900;

/// Default prebuilt voice for speech
pub const DEFAULT_VOICE: &str = "Kore";

/// Default reasoning budget for thinking tasks (tokens)
pub const DEFAULT_THINKING_BUDGET: u32 = 32_768;

/// Maximum prompt length in characters
pub const DEFAULT_MAX_PROMPT_LENGTH: usize = 10_000;

/// MIME type assumed for generated video downloads
pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// MIME type of generated images
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Scheme prefix of session-local blob URIs
pub const BLOB_URI_PREFIX: &str = "blob:genai-studio/";
