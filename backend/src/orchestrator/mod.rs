//! Orchestrator module
//!
//! Drives generation and analysis tasks from submission to a final artifact.
//! The building blocks (polling, upload with cleanup, ordered chat, artifact
//! encoding) are usable on their own; `TaskOrchestrator` composes them per
//! task kind.

pub mod artifact;
pub mod chat;
pub mod config;
pub mod constants;
pub mod encoder;
pub mod error;
pub mod executor;
pub mod playback;
pub mod poll;
pub mod task;
pub mod upload;

pub use artifact::Artifact;
pub use chat::ChatConversation;
pub use config::OrchestratorConfig;
pub use error::TaskError;
pub use executor::TaskOrchestrator;
pub use playback::{PlaybackContext, PlaybackError, SpeechPlayer};
pub use poll::{poll_until_done, with_deadline};
pub use task::{
    InputFile, PhaseEvent, PhaseLabel, PhaseObserver, TaskKind, TaskLifecycle, TaskRequest,
    TaskState,
};
pub use upload::{CleanupTracker, UploadCleanupPipeline};
