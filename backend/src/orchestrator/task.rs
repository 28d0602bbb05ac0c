//! Task model
//!
//! Requests, states, and the per-task lifecycle that moves a request from
//! `Idle` to `Done` or `Failed` and reports every step to an observer.

use crate::orchestrator::chat::ChatConversation;
use crate::orchestrator::encoder;
use crate::orchestrator::error::TaskError;
use crate::provider::{AspectRatio, VideoAspectRatio};
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Capability a task exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Single-shot text generation
    TextGen,
    /// One turn of a conversation
    Chat,
    /// Image generation
    ImageGen,
    /// Video generation
    VideoGen,
    /// Image editing
    ImageEdit,
    /// Question answering over an uploaded video
    VideoAnalysis,
    /// Question answering over an uploaded audio clip
    AudioAnalysis,
    /// Text generation with a reasoning budget
    Thinking,
    /// Text-to-speech
    Tts,
}

impl TaskKind {
    /// Stable name used in logs and API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::TextGen => "text_gen",
            TaskKind::Chat => "chat",
            TaskKind::ImageGen => "image_gen",
            TaskKind::VideoGen => "video_gen",
            TaskKind::ImageEdit => "image_edit",
            TaskKind::VideoAnalysis => "video_analysis",
            TaskKind::AudioAnalysis => "audio_analysis",
            TaskKind::Thinking => "thinking",
            TaskKind::Tts => "tts",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File supplied with a request
#[derive(Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `video/mp4`
    pub mime_type: String,
    /// Name shown in the provider's file listing
    pub display_name: String,
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl InputFile {
    /// Wrap raw bytes
    pub fn new(
        bytes: Vec<u8>,
        mime_type: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            display_name: display_name.into(),
        }
    }

    /// Decode a base64 (or `data:` URI) payload
    pub fn from_base64(
        data: &str,
        mime_type: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Self, TaskError> {
        let bytes = encoder::decode_base64(data)
            .map_err(|e| TaskError::Validation(format!("Invalid file payload: {}", e)))?;
        Ok(Self::new(bytes, mime_type, display_name))
    }

    /// Read a file from disk, inferring its MIME type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, TaskError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TaskError::Validation(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(bytes, mime_type, display_name))
    }

    fn check_family(&self, family: &str, what: &str) -> Result<(), TaskError> {
        if self.bytes.is_empty() {
            return Err(TaskError::Validation(format!("{} is empty", what)));
        }
        if !self.mime_type.starts_with(family) {
            return Err(TaskError::Validation(format!(
                "{} must be {}*, got {}",
                what, family, self.mime_type
            )));
        }
        Ok(())
    }
}

/// One user-initiated generation or analysis request
#[derive(Debug, Clone)]
pub enum TaskRequest {
    /// Single-shot text generation
    TextGen {
        /// Prompt
        prompt: String,
    },
    /// One turn of an existing conversation
    Chat {
        /// Conversation the turn belongs to
        conversation: Arc<ChatConversation>,
        /// User message
        message: String,
    },
    /// Image generation
    ImageGen {
        /// Prompt
        prompt: String,
        /// Output shape
        aspect_ratio: AspectRatio,
    },
    /// Video generation, optionally seeded with a still image
    VideoGen {
        /// Prompt
        prompt: String,
        /// First frame
        image: Option<InputFile>,
        /// Output shape
        aspect_ratio: VideoAspectRatio,
    },
    /// Image editing
    ImageEdit {
        /// Image to edit
        image: InputFile,
        /// Edit instructions
        prompt: String,
    },
    /// Question answering over a video
    VideoAnalysis {
        /// Video to analyze
        file: InputFile,
        /// Question
        prompt: String,
    },
    /// Question answering over an audio clip
    AudioAnalysis {
        /// Audio to analyze
        file: InputFile,
        /// Question
        prompt: String,
    },
    /// Text generation with extended reasoning
    Thinking {
        /// Prompt
        prompt: String,
        /// Reasoning budget in tokens; the orchestrator default when `None`
        reasoning_budget: Option<u32>,
    },
    /// Text-to-speech
    Tts {
        /// Text to speak
        text: String,
        /// Prebuilt voice; the orchestrator default when `None`
        voice: Option<String>,
    },
}

impl TaskRequest {
    /// Capability this request exercises
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::TextGen { .. } => TaskKind::TextGen,
            TaskRequest::Chat { .. } => TaskKind::Chat,
            TaskRequest::ImageGen { .. } => TaskKind::ImageGen,
            TaskRequest::VideoGen { .. } => TaskKind::VideoGen,
            TaskRequest::ImageEdit { .. } => TaskKind::ImageEdit,
            TaskRequest::VideoAnalysis { .. } => TaskKind::VideoAnalysis,
            TaskRequest::AudioAnalysis { .. } => TaskKind::AudioAnalysis,
            TaskRequest::Thinking { .. } => TaskKind::Thinking,
            TaskRequest::Tts { .. } => TaskKind::Tts,
        }
    }

    fn prompt(&self) -> &str {
        match self {
            TaskRequest::TextGen { prompt }
            | TaskRequest::ImageGen { prompt, .. }
            | TaskRequest::VideoGen { prompt, .. }
            | TaskRequest::ImageEdit { prompt, .. }
            | TaskRequest::VideoAnalysis { prompt, .. }
            | TaskRequest::AudioAnalysis { prompt, .. }
            | TaskRequest::Thinking { prompt, .. } => prompt,
            TaskRequest::Chat { message, .. } => message,
            TaskRequest::Tts { text, .. } => text,
        }
    }

    /// Check required inputs before handing the request to the orchestrator
    ///
    /// # Errors
    /// * `TaskError::Validation` for an empty or over-long prompt, an empty
    ///   file, or a file of the wrong media family.
    pub fn validate(&self, max_prompt_length: usize) -> Result<(), TaskError> {
        let prompt = self.prompt().trim();
        if prompt.is_empty() {
            return Err(TaskError::Validation("Prompt cannot be empty".to_string()));
        }
        if prompt.chars().count() > max_prompt_length {
            return Err(TaskError::Validation(format!(
                "Prompt exceeds maximum length of {} characters",
                max_prompt_length
            )));
        }

        match self {
            TaskRequest::ImageEdit { image, .. } => image.check_family("image/", "Image"),
            TaskRequest::VideoGen {
                image: Some(image), ..
            } => image.check_family("image/", "Seed image"),
            TaskRequest::VideoAnalysis { file, .. } => file.check_family("video/", "Video"),
            TaskRequest::AudioAnalysis { file, .. } => file.check_family("audio/", "Audio"),
            _ => Ok(()),
        }
    }
}

/// Where a task is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, nothing sent yet
    Idle,
    /// Sending a file to the provider
    Uploading,
    /// Waiting on a long-running provider job
    Polling,
    /// Provider is generating or analyzing
    Processing,
    /// Artifact produced
    Done,
    /// Ended with an error
    Failed,
}

impl TaskState {
    fn rank(&self) -> u8 {
        match self {
            TaskState::Idle => 0,
            TaskState::Uploading => 1,
            TaskState::Polling => 2,
            TaskState::Processing => 3,
            TaskState::Done | TaskState::Failed => 4,
        }
    }

    /// Whether the task has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }

    /// Label shown to the user for this state, if any
    pub fn label(&self) -> Option<PhaseLabel> {
        match self {
            TaskState::Uploading => Some(PhaseLabel::Uploading),
            TaskState::Polling | TaskState::Processing => Some(PhaseLabel::Analyzing),
            TaskState::Done => Some(PhaseLabel::Done),
            TaskState::Idle | TaskState::Failed => None,
        }
    }
}

/// User-facing phase label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseLabel {
    /// "uploading…"
    Uploading,
    /// "analyzing…"
    Analyzing,
    /// finished
    Done,
}

/// A single state transition, as reported to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseEvent {
    /// Task the transition belongs to
    pub task_id: Uuid,
    /// Kind of that task
    pub kind: TaskKind,
    /// State before
    pub from: TaskState,
    /// State after
    pub to: TaskState,
    /// Display label for `to`
    pub label: Option<PhaseLabel>,
}

/// Receives every state transition of a task
///
/// Called synchronously. Errors and panics are logged and otherwise ignored;
/// they never affect the task.
pub trait PhaseObserver: Send + Sync {
    /// Handle one transition
    fn on_transition(&self, event: &PhaseEvent) -> anyhow::Result<()>;
}

impl<F> PhaseObserver for F
where
    F: Fn(&PhaseEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_transition(&self, event: &PhaseEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// State machine for one task execution
///
/// Transitions only move forward; `Done` and `Failed` are final.
pub struct TaskLifecycle {
    task_id: Uuid,
    kind: TaskKind,
    state: TaskState,
    observer: Option<Arc<dyn PhaseObserver>>,
}

impl TaskLifecycle {
    /// Start a lifecycle in `Idle`
    pub fn new(kind: TaskKind, observer: Option<Arc<dyn PhaseObserver>>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            kind,
            state: TaskState::Idle,
            observer,
        }
    }

    /// Id of the task
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Kind of the task
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `to`, notifying the observer
    ///
    /// Returns `false` and leaves the state unchanged if the move would go
    /// backwards or leave a terminal state.
    pub fn advance(&mut self, to: TaskState) -> bool {
        let from = self.state;
        if from.is_terminal() || to.rank() <= from.rank() {
            tracing::error!(
                task_id = %self.task_id,
                from = ?from,
                to = ?to,
                "Rejected non-forward task state transition"
            );
            return false;
        }

        self.state = to;
        tracing::debug!(task_id = %self.task_id, from = ?from, to = ?to, "Task state changed");
        self.notify(PhaseEvent {
            task_id: self.task_id,
            kind: self.kind,
            from,
            to,
            label: to.label(),
        });
        true
    }

    fn notify(&self, event: PhaseEvent) {
        let Some(observer) = &self.observer else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| observer.on_transition(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                task_id = %self.task_id,
                error = %e,
                "Phase observer failed; continuing"
            ),
            Err(_) => tracing::warn!(
                task_id = %self.task_id,
                "Phase observer panicked; continuing"
            ),
        }
    }
}
