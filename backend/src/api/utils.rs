//! API utility functions
//!
//! Request payloads, credential extraction, and the shared path from a JSON
//! payload to a validated, ready-to-run task.

use crate::error::AppError;
use crate::orchestrator::{
    with_deadline, Artifact, InputFile, PhaseObserver, TaskError, TaskKind, TaskOrchestrator,
    TaskRequest,
};
use crate::provider::{AspectRatio, VideoAspectRatio};
use crate::state::SharedState;
use axum::http::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Header carrying a per-request API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// File sent inline with a task
#[derive(Debug, Deserialize)]
pub struct FilePayload {
    /// Base64 bytes, optionally as a `data:` URI
    pub data: String,
    /// MIME type of the file
    pub mime_type: String,
    /// Display name (defaults to "upload")
    #[serde(default)]
    pub name: Option<String>,
}

impl FilePayload {
    fn into_input_file(self) -> Result<InputFile, TaskError> {
        let name = self.name.unwrap_or_else(|| "upload".to_string());
        InputFile::from_base64(&self.data, self.mime_type, name)
    }
}

/// Task request body
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Single-shot text
    TextGen {
        /// Prompt
        prompt: String,
    },
    /// One turn of an open conversation
    Chat {
        /// Conversation id from `POST /api/chats`
        conversation_id: Uuid,
        /// User message
        message: String,
    },
    /// Image generation
    ImageGen {
        /// Prompt
        prompt: String,
        /// Output shape (default 1:1)
        #[serde(default)]
        aspect_ratio: AspectRatio,
    },
    /// Video generation
    VideoGen {
        /// Prompt
        prompt: String,
        /// Optional first frame
        #[serde(default)]
        image: Option<FilePayload>,
        /// Output shape (default 16:9)
        #[serde(default)]
        aspect_ratio: VideoAspectRatio,
    },
    /// Image editing
    ImageEdit {
        /// Image to edit
        image: FilePayload,
        /// Edit instructions
        prompt: String,
    },
    /// Question answering over a video
    VideoAnalysis {
        /// Video
        file: FilePayload,
        /// Question
        prompt: String,
    },
    /// Question answering over an audio clip
    AudioAnalysis {
        /// Audio
        file: FilePayload,
        /// Question
        prompt: String,
    },
    /// Reasoning
    Thinking {
        /// Prompt
        prompt: String,
        /// Reasoning budget in tokens
        #[serde(default)]
        reasoning_budget: Option<u32>,
    },
    /// Text-to-speech
    Tts {
        /// Text to speak
        text: String,
        /// Prebuilt voice
        #[serde(default)]
        voice: Option<String>,
    },
}

/// Read the per-request API key, if one was sent
pub fn supplied_api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

/// A validated task with everything needed to run it off the state lock
pub struct PreparedTask {
    orchestrator: TaskOrchestrator,
    request: TaskRequest,
    deadline: Option<Duration>,
}

impl PreparedTask {
    /// Kind of the prepared task
    pub fn kind(&self) -> TaskKind {
        self.request.kind()
    }

    /// Run the task, racing it against the deadline when one applies
    pub async fn run(self, observer: Option<Arc<dyn PhaseObserver>>) -> Result<Artifact, TaskError> {
        let task = self.orchestrator.execute_with_observer(self.request, observer);
        match self.deadline {
            Some(deadline) => with_deadline(deadline, task).await,
            None => task.await,
        }
    }
}

/// Turn a payload into a validated, runnable task
///
/// # Errors
/// * `AppError::MissingCredential` if no key is available.
/// * `AppError::ConversationNotFound` for an unknown conversation id.
/// * `AppError::Task(TaskError::Validation)` for bad input.
pub async fn prepare_task(
    state: &SharedState,
    headers: &HeaderMap,
    payload: TaskPayload,
) -> Result<PreparedTask, AppError> {
    let request = {
        let state = state.read().await;
        match payload {
            TaskPayload::TextGen { prompt } => TaskRequest::TextGen { prompt },
            TaskPayload::Chat {
                conversation_id,
                message,
            } => TaskRequest::Chat {
                conversation: state.conversation(conversation_id)?,
                message,
            },
            TaskPayload::ImageGen {
                prompt,
                aspect_ratio,
            } => TaskRequest::ImageGen {
                prompt,
                aspect_ratio,
            },
            TaskPayload::VideoGen {
                prompt,
                image,
                aspect_ratio,
            } => TaskRequest::VideoGen {
                prompt,
                image: image.map(FilePayload::into_input_file).transpose()?,
                aspect_ratio,
            },
            TaskPayload::ImageEdit { image, prompt } => TaskRequest::ImageEdit {
                image: image.into_input_file()?,
                prompt,
            },
            TaskPayload::VideoAnalysis { file, prompt } => TaskRequest::VideoAnalysis {
                file: file.into_input_file()?,
                prompt,
            },
            TaskPayload::AudioAnalysis { file, prompt } => TaskRequest::AudioAnalysis {
                file: file.into_input_file()?,
                prompt,
            },
            TaskPayload::Thinking {
                prompt,
                reasoning_budget,
            } => TaskRequest::Thinking {
                prompt,
                reasoning_budget,
            },
            TaskPayload::Tts { text, voice } => TaskRequest::Tts { text, voice },
        }
    };

    prepare_request(state, headers, request).await
}

/// Validate an already-built request and bind it to a provider client
pub async fn prepare_request(
    state: &SharedState,
    headers: &HeaderMap,
    request: TaskRequest,
) -> Result<PreparedTask, AppError> {
    let state = state.read().await;
    let credential = state.resolve_credential(supplied_api_key(headers))?;

    request.validate(state.settings().max_prompt_length)?;

    let deadline = match request.kind() {
        TaskKind::VideoGen => state.settings().video_deadline(),
        _ => None,
    };

    Ok(PreparedTask {
        orchestrator: state.orchestrator(credential)?,
        request,
        deadline,
    })
}

/// Keep a produced video reachable through `/api/blobs/:id`
pub async fn register_artifact(state: &SharedState, artifact: &Artifact) {
    if let Artifact::BlobUri(blob) = artifact {
        state.write().await.blobs.insert(blob.clone());
    }
}
