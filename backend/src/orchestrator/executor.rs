//! Task orchestrator
//!
//! Drives one `TaskRequest` through the stage sequence for its kind and
//! returns exactly one artifact or one error.
//!
//! | Kind                           | Stages                                        |
//! |--------------------------------|-----------------------------------------------|
//! | TextGen, Thinking, Chat        | one call → text                               |
//! | ImageGen                       | one call → data URI                           |
//! | ImageEdit                      | one call → first inline part → data URI       |
//! | VideoGen                       | submit → poll until done → fetch → blob URI   |
//! | VideoAnalysis, AudioAnalysis   | upload → analyze → detached delete → text     |
//! | Tts                            | one call → first inline part → raw base64     |

use crate::orchestrator::artifact::Artifact;
use crate::orchestrator::chat::ChatConversation;
use crate::orchestrator::config::OrchestratorConfig;
use crate::orchestrator::constants::{IMAGE_MIME_TYPE, VIDEO_MIME_TYPE};
use crate::orchestrator::encoder::{self, LocalBlob};
use crate::orchestrator::error::TaskError;
use crate::orchestrator::poll::poll_until_done;
use crate::orchestrator::task::{InputFile, PhaseObserver, TaskLifecycle, TaskRequest, TaskState};
use crate::orchestrator::upload::{CleanupTracker, UploadCleanupPipeline};
use crate::provider::{
    AspectRatio, ChatTurn, InlineData, ProviderClient, ResponsePart, VideoAspectRatio,
};
use std::sync::Arc;
use tracing::Instrument;

/// Runs generation and analysis tasks against a provider
pub struct TaskOrchestrator {
    client: Arc<dyn ProviderClient>,
    settings: OrchestratorConfig,
    cleanups: CleanupTracker,
}

impl TaskOrchestrator {
    /// Orchestrator over `client` with its own cleanup tracker
    pub fn new(client: Arc<dyn ProviderClient>, settings: OrchestratorConfig) -> Self {
        Self {
            client,
            settings,
            cleanups: CleanupTracker::new(),
        }
    }

    /// Register detached deletes with a shared tracker instead
    pub fn with_cleanup_tracker(mut self, cleanups: CleanupTracker) -> Self {
        self.cleanups = cleanups;
        self
    }

    /// Tracker holding this orchestrator's detached deletes
    pub fn cleanups(&self) -> &CleanupTracker {
        &self.cleanups
    }

    /// Open a conversation seeded with `history`
    pub fn start_chat(&self, history: Vec<ChatTurn>) -> Arc<ChatConversation> {
        let conversation = ChatConversation::new(history);
        tracing::debug!(conversation_id = %conversation.id(), "Started conversation");
        Arc::new(conversation)
    }

    /// Run a task to completion
    pub async fn execute(&self, request: TaskRequest) -> Result<Artifact, TaskError> {
        self.execute_with_observer(request, None).await
    }

    /// Run a task to completion, reporting every state transition
    ///
    /// The observer is called synchronously on each transition. Its
    /// failures are logged and never affect the task.
    pub async fn execute_with_observer(
        &self,
        request: TaskRequest,
        observer: Option<Arc<dyn PhaseObserver>>,
    ) -> Result<Artifact, TaskError> {
        let kind = request.kind();
        let mut lifecycle = TaskLifecycle::new(kind, observer);
        let span = tracing::info_span!("task", task_id = %lifecycle.task_id(), kind = %kind);

        async move {
            tracing::info!("Task started");
            let outcome = self.run_stages(request, &mut lifecycle).await;
            match &outcome {
                Ok(artifact) => {
                    lifecycle.advance(TaskState::Done);
                    tracing::info!(artifact = artifact.variant_name(), "Task completed");
                }
                Err(e) => {
                    lifecycle.advance(TaskState::Failed);
                    tracing::warn!(
                        error = %e,
                        credential_invalid = e.is_credential_invalid(),
                        "Task failed"
                    );
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        request: TaskRequest,
        lifecycle: &mut TaskLifecycle,
    ) -> Result<Artifact, TaskError> {
        match request {
            TaskRequest::TextGen { prompt } => {
                lifecycle.advance(TaskState::Processing);
                let text = self.client.generate_text(&prompt).await?;
                Ok(Artifact::text(text))
            }
            TaskRequest::Thinking {
                prompt,
                reasoning_budget,
            } => {
                lifecycle.advance(TaskState::Processing);
                let budget = reasoning_budget.unwrap_or(self.settings.thinking_budget);
                let text = self.client.generate_with_reasoning(&prompt, budget).await?;
                Ok(Artifact::text(text))
            }
            TaskRequest::Chat {
                conversation,
                message,
            } => {
                lifecycle.advance(TaskState::Processing);
                let reply = conversation.send(self.client.as_ref(), &message).await?;
                Ok(Artifact::text(reply))
            }
            TaskRequest::ImageGen {
                prompt,
                aspect_ratio,
            } => self.generate_image(&prompt, aspect_ratio, lifecycle).await,
            TaskRequest::ImageEdit { image, prompt } => {
                lifecycle.advance(TaskState::Processing);
                let parts = self
                    .client
                    .edit_image(&image.bytes, &image.mime_type, &prompt)
                    .await?;
                let inline =
                    first_inline_data(parts).ok_or(TaskError::NoArtifactProduced("image"))?;
                Ok(Artifact::DataUri {
                    uri: encoder::data_uri(&inline.mime_type, &inline.data),
                    mime_type: inline.mime_type,
                })
            }
            TaskRequest::VideoGen {
                prompt,
                image,
                aspect_ratio,
            } => {
                self.generate_video(&prompt, image.as_ref(), aspect_ratio, lifecycle)
                    .await
            }
            TaskRequest::VideoAnalysis { file, prompt }
            | TaskRequest::AudioAnalysis { file, prompt } => {
                self.analyze_file(&file, &prompt, lifecycle).await
            }
            TaskRequest::Tts { text, voice } => {
                lifecycle.advance(TaskState::Processing);
                let voice = voice.as_deref().unwrap_or(&self.settings.default_voice);
                let parts = self.client.text_to_speech(&text, voice).await?;
                let inline =
                    first_inline_data(parts).ok_or(TaskError::NoArtifactProduced("audio"))?;
                Ok(Artifact::RawAudioBase64 {
                    mime_type: inline.mime_type,
                    data: inline.data,
                })
            }
        }
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        lifecycle: &mut TaskLifecycle,
    ) -> Result<Artifact, TaskError> {
        lifecycle.advance(TaskState::Processing);
        let image = self
            .client
            .generate_image(prompt, aspect_ratio)
            .await?
            .ok_or(TaskError::NoArtifactProduced("image"))?;
        Ok(Artifact::DataUri {
            mime_type: IMAGE_MIME_TYPE.to_string(),
            uri: encoder::data_uri(IMAGE_MIME_TYPE, &image),
        })
    }

    async fn generate_video(
        &self,
        prompt: &str,
        image: Option<&InputFile>,
        aspect_ratio: VideoAspectRatio,
        lifecycle: &mut TaskLifecycle,
    ) -> Result<Artifact, TaskError> {
        lifecycle.advance(TaskState::Polling);
        let seed = image.map(|f| (f.bytes.as_slice(), f.mime_type.as_str()));
        let initial = self.client.generate_video(prompt, seed, aspect_ratio).await?;
        tracing::info!(operation = %initial.name, "Video generation submitted");

        let client = self.client.as_ref();
        let finished = poll_until_done(
            initial,
            move |op| async move { client.poll_video_operation(&op).await },
            self.settings.poll_interval(),
        )
        .await?;

        if let Some(failure) = finished.error {
            return Err(TaskError::Provider(failure.into()));
        }

        lifecycle.advance(TaskState::Processing);
        let uri = finished
            .result_uri
            .ok_or(TaskError::NoArtifactProduced("video"))?;
        let bytes = self.client.fetch_video_bytes(&uri).await?;
        tracing::debug!(bytes = bytes.len(), "Video downloaded");

        Ok(Artifact::BlobUri(LocalBlob::from_bytes(bytes, VIDEO_MIME_TYPE)))
    }

    async fn analyze_file(
        &self,
        file: &InputFile,
        prompt: &str,
        lifecycle: &mut TaskLifecycle,
    ) -> Result<Artifact, TaskError> {
        let pipeline = UploadCleanupPipeline::new(self.client.clone(), self.cleanups.clone());
        let client = self.client.as_ref();
        pipeline
            .run_with_cleanup(file, lifecycle, |handle| async move {
                let text = client.generate_content_from_file(&handle, prompt).await?;
                Ok::<_, TaskError>(Artifact::text(text))
            })
            .await
    }
}

fn first_inline_data(parts: Vec<ResponsePart>) -> Option<InlineData> {
    parts.into_iter().find_map(|part| part.inline_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::poll::with_deadline;
    use crate::orchestrator::task::{PhaseEvent, PhaseLabel};
    use crate::provider::stub::StubProvider;
    use crate::provider::{ChatRole, Operation, OperationFailure, ProviderError};
    use std::sync::Mutex;
    use std::time::Duration;

    fn orchestrator(stub: StubProvider) -> (TaskOrchestrator, Arc<StubProvider>) {
        let stub = Arc::new(stub);
        let settings = OrchestratorConfig {
            poll_interval_secs: 1,
            ..OrchestratorConfig::default()
        };
        (TaskOrchestrator::new(stub.clone(), settings), stub)
    }

    fn recorder() -> (Arc<dyn PhaseObserver>, Arc<Mutex<Vec<PhaseEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let observer = move |event: &PhaseEvent| -> anyhow::Result<()> {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        };
        (Arc::new(observer), events)
    }

    fn states(events: &Mutex<Vec<PhaseEvent>>) -> Vec<TaskState> {
        events.lock().unwrap().iter().map(|e| e.to).collect()
    }

    fn text(prompt: &str) -> TaskRequest {
        TaskRequest::TextGen {
            prompt: prompt.to_string(),
        }
    }

    fn video_request() -> TaskRequest {
        TaskRequest::VideoGen {
            prompt: "a sunrise over mountains".to_string(),
            image: None,
            aspect_ratio: VideoAspectRatio::Landscape,
        }
    }

    #[tokio::test]
    async fn test_text_gen_sequence() {
        let (orch, _) = orchestrator(StubProvider::default());
        let (observer, events) = recorder();

        let artifact = orch
            .execute_with_observer(text("write a haiku"), Some(observer))
            .await
            .unwrap();

        assert_eq!(artifact.as_text(), Some("generated text"));
        assert_eq!(states(&events), vec![TaskState::Processing, TaskState::Done]);
    }

    #[tokio::test]
    async fn test_thinking_uses_default_budget() {
        let (orch, stub) = orchestrator(StubProvider::default());
        let artifact = orch
            .execute(TaskRequest::Thinking {
                prompt: "prove it".to_string(),
                reasoning_budget: None,
            })
            .await
            .unwrap();
        assert_eq!(artifact.as_text(), Some("generated text"));
        assert_eq!(stub.count("generate_with_reasoning"), 1);
    }

    #[tokio::test]
    async fn test_chat_turns_accumulate() {
        let (orch, _) = orchestrator(StubProvider::default());
        let conversation = orch.start_chat(Vec::new());

        for message in ["hi", "how are you"] {
            orch.execute(TaskRequest::Chat {
                conversation: conversation.clone(),
                message: message.to_string(),
            })
            .await
            .unwrap();
        }

        let history = conversation.history().await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[3].role, ChatRole::Model);
        assert_eq!(history[3].text, "echo: how are you");
    }

    #[tokio::test]
    async fn test_image_gen_produces_jpeg_data_uri() {
        let (orch, _) = orchestrator(StubProvider::default());
        let artifact = orch
            .execute(TaskRequest::ImageGen {
                prompt: "a red fox".to_string(),
                aspect_ratio: AspectRatio::Widescreen,
            })
            .await
            .unwrap();
        assert_eq!(
            artifact,
            Artifact::DataUri {
                mime_type: "image/jpeg".to_string(),
                uri: "data:image/jpeg;base64,aW1hZ2U=".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_image_gen_without_images_is_no_artifact() {
        let (orch, _) = orchestrator(StubProvider {
            image: Ok(None),
            ..Default::default()
        });
        let err = orch
            .execute(TaskRequest::ImageGen {
                prompt: "a red fox".to_string(),
                aspect_ratio: AspectRatio::Square,
            })
            .await
            .unwrap_err();
        assert_eq!(err, TaskError::NoArtifactProduced("image"));
    }

    #[tokio::test]
    async fn test_image_edit_takes_first_inline_part() {
        let (orch, _) = orchestrator(StubProvider::default());
        let artifact = orch
            .execute(TaskRequest::ImageEdit {
                image: InputFile::new(vec![1, 2, 3], "image/png", "cat.png"),
                prompt: "add a hat".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            artifact,
            Artifact::DataUri {
                mime_type: "image/png".to_string(),
                uri: "data:image/png;base64,ZWRpdGVk".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_image_edit_without_inline_part_is_no_artifact() {
        let (orch, _) = orchestrator(StubProvider {
            edit_parts: Ok(vec![ResponsePart::text("I can't do that")]),
            ..Default::default()
        });
        let (observer, events) = recorder();

        let err = orch
            .execute_with_observer(
                TaskRequest::ImageEdit {
                    image: InputFile::new(vec![1, 2, 3], "image/png", "cat.png"),
                    prompt: "add a hat".to_string(),
                },
                Some(observer),
            )
            .await
            .unwrap_err();

        assert_eq!(err, TaskError::NoArtifactProduced("image"));
        assert!(err.provider_error().is_none());
        assert_eq!(states(&events), vec![TaskState::Processing, TaskState::Failed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_gen_polls_until_done() {
        let (orch, stub) = orchestrator(StubProvider {
            pending_polls: 3,
            ..Default::default()
        });
        let (observer, events) = recorder();

        let artifact = orch
            .execute_with_observer(video_request(), Some(observer))
            .await
            .unwrap();

        assert_eq!(stub.count("poll_video_operation"), 4);
        assert_eq!(stub.count("fetch_video_bytes"), 1);
        let Artifact::BlobUri(blob) = artifact else {
            panic!("expected blob artifact");
        };
        assert_eq!(blob.data, b"mp4 bytes");
        assert_eq!(blob.mime_type, "video/mp4");
        assert!(blob.uri.starts_with("blob:"));
        assert_eq!(
            states(&events),
            vec![TaskState::Polling, TaskState::Processing, TaskState::Done]
        );
        let labels: Vec<_> = events.lock().unwrap().iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![
                Some(PhaseLabel::Analyzing),
                Some(PhaseLabel::Analyzing),
                Some(PhaseLabel::Done)
            ]
        );
    }

    #[tokio::test]
    async fn test_video_entity_not_found_is_distinguishable() {
        let (orch, _) = orchestrator(StubProvider {
            video_start: Err(ProviderError::new("Requested entity was not found.")),
            ..Default::default()
        });
        let err = orch.execute(video_request()).await.unwrap_err();
        assert!(err.is_credential_invalid());
        assert_eq!(
            err.provider_error().map(|e| e.message.as_str()),
            Some("Requested entity was not found.")
        );

        let (orch, _) = orchestrator(StubProvider {
            video_start: Err(ProviderError::http(500, Some("INTERNAL".to_string()), "boom")),
            ..Default::default()
        });
        let err = orch.execute(video_request()).await.unwrap_err();
        assert!(matches!(err, TaskError::Provider(_)));
        assert!(!err.is_credential_invalid());
    }

    #[tokio::test]
    async fn test_video_operation_error_is_provider_error() {
        let mut failed = Operation::pending("operations/video-1");
        failed.done = true;
        failed.error = Some(OperationFailure {
            code: Some(3),
            message: "prompt rejected by safety filter".to_string(),
        });
        let (orch, stub) = orchestrator(StubProvider {
            finished_operation: Ok(failed),
            ..Default::default()
        });

        let err = orch.execute(video_request()).await.unwrap_err();
        assert_eq!(
            err,
            TaskError::Provider(ProviderError {
                status: None,
                code: Some("INVALID_ARGUMENT".to_string()),
                message: "prompt rejected by safety filter".to_string(),
            })
        );
        assert_eq!(stub.count("fetch_video_bytes"), 0);
    }

    #[tokio::test]
    async fn test_video_without_uri_is_no_artifact() {
        let mut empty = Operation::pending("operations/video-1");
        empty.done = true;
        let (orch, _) = orchestrator(StubProvider {
            finished_operation: Ok(empty),
            ..Default::default()
        });
        let err = orch.execute(video_request()).await.unwrap_err();
        assert_eq!(err, TaskError::NoArtifactProduced("video"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_deadline_race() {
        let (orch, _) = orchestrator(StubProvider {
            pending_polls: u32::MAX,
            ..Default::default()
        });
        let result = with_deadline(Duration::from_secs(30), orch.execute(video_request())).await;
        assert_eq!(
            result.unwrap_err(),
            TaskError::DeadlineExceeded(Duration::from_secs(30))
        );
    }

    #[tokio::test]
    async fn test_analysis_sequence_and_cleanup() {
        let (orch, stub) = orchestrator(StubProvider::default());
        let (observer, events) = recorder();

        let artifact = orch
            .execute_with_observer(
                TaskRequest::VideoAnalysis {
                    file: InputFile::new(vec![0; 64], "video/mp4", "clip.mp4"),
                    prompt: "what happens?".to_string(),
                },
                Some(observer),
            )
            .await
            .unwrap();
        orch.cleanups().drain().await;

        assert_eq!(artifact.as_text(), Some("a cat chases a laser"));
        let labels: Vec<_> = events.lock().unwrap().iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![
                Some(PhaseLabel::Uploading),
                Some(PhaseLabel::Analyzing),
                Some(PhaseLabel::Done)
            ]
        );
        assert_eq!(stub.count("delete_file"), 1);
    }

    #[tokio::test]
    async fn test_analysis_failure_surfaces_original_error() {
        let (orch, stub) = orchestrator(StubProvider {
            analysis: Err(ProviderError::new("analysis failed")),
            delete: Err(ProviderError::new("delete failed")),
            ..Default::default()
        });

        let err = orch
            .execute(TaskRequest::AudioAnalysis {
                file: InputFile::new(vec![0; 64], "audio/mpeg", "clip.mp3"),
                prompt: "transcribe".to_string(),
            })
            .await
            .unwrap_err();
        orch.cleanups().drain().await;

        assert_eq!(err, TaskError::Provider(ProviderError::new("analysis failed")));
        assert_eq!(stub.count("delete_file"), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_is_upload_error() {
        let (orch, stub) = orchestrator(StubProvider {
            upload: Err(ProviderError::new("connection reset")),
            ..Default::default()
        });
        let err = orch
            .execute(TaskRequest::VideoAnalysis {
                file: InputFile::new(vec![0; 64], "video/mp4", "clip.mp4"),
                prompt: "what happens?".to_string(),
            })
            .await
            .unwrap_err();
        orch.cleanups().drain().await;

        assert!(matches!(err, TaskError::Upload(_)));
        assert_eq!(stub.count("generate_content_from_file"), 0);
        assert_eq!(stub.count("delete_file"), 0);
    }

    #[tokio::test]
    async fn test_tts_returns_raw_audio() {
        let (orch, _) = orchestrator(StubProvider::default());
        let artifact = orch
            .execute(TaskRequest::Tts {
                text: "hello there".to_string(),
                voice: None,
            })
            .await
            .unwrap();
        assert_eq!(
            artifact,
            Artifact::RawAudioBase64 {
                mime_type: "audio/L16;rate=24000".to_string(),
                data: "AAABAA==".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_tts_without_audio_is_no_artifact() {
        let (orch, _) = orchestrator(StubProvider {
            speech_parts: Ok(Vec::new()),
            ..Default::default()
        });
        let err = orch
            .execute(TaskRequest::Tts {
                text: "hello there".to_string(),
                voice: Some("Puck".to_string()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, TaskError::NoArtifactProduced("audio"));
    }

    #[tokio::test]
    async fn test_failing_observer_does_not_abort_task() {
        let (orch, _) = orchestrator(StubProvider::default());
        let observer: Arc<dyn PhaseObserver> = Arc::new(|_: &PhaseEvent| -> anyhow::Result<()> {
            Err(anyhow::anyhow!("ui gone"))
        });
        let artifact = orch
            .execute_with_observer(text("hello"), Some(observer))
            .await
            .unwrap();
        assert_eq!(artifact.as_text(), Some("generated text"));
    }

    #[tokio::test]
    async fn test_every_kind_yields_exactly_one_outcome() {
        let (orch, _) = orchestrator(StubProvider::default());
        let conversation = orch.start_chat(Vec::new());
        let requests = vec![
            text("a"),
            TaskRequest::Chat {
                conversation,
                message: "hi".to_string(),
            },
            TaskRequest::Thinking {
                prompt: "b".to_string(),
                reasoning_budget: Some(128),
            },
            TaskRequest::ImageGen {
                prompt: "c".to_string(),
                aspect_ratio: AspectRatio::Portrait,
            },
            TaskRequest::ImageEdit {
                image: InputFile::new(vec![1], "image/png", "a.png"),
                prompt: "d".to_string(),
            },
            TaskRequest::Tts {
                text: "e".to_string(),
                voice: None,
            },
            TaskRequest::AudioAnalysis {
                file: InputFile::new(vec![1], "audio/wav", "a.wav"),
                prompt: "f".to_string(),
            },
        ];

        for request in requests {
            let (observer, events) = recorder();
            let outcome = orch.execute_with_observer(request, Some(observer)).await;
            let terminal: Vec<_> = states(&events)
                .into_iter()
                .filter(TaskState::is_terminal)
                .collect();
            assert_eq!(terminal.len(), 1);
            assert_eq!(outcome.is_ok(), terminal[0] == TaskState::Done);
        }
        orch.cleanups().drain().await;
    }
}
