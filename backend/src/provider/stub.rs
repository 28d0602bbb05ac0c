//! Scripted `ProviderClient` for unit tests

use super::{
    AspectRatio, ChatSession, ChatTurn, Operation, ProviderClient, ProviderError, ResponsePart,
    UploadedFileHandle, VideoAspectRatio,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned responses plus a log of every call made
pub(crate) struct StubProvider {
    pub text: Result<String, ProviderError>,
    pub image: Result<Option<String>, ProviderError>,
    pub video_start: Result<Operation, ProviderError>,
    pub pending_polls: u32,
    pub finished_operation: Result<Operation, ProviderError>,
    pub video_bytes: Result<Vec<u8>, ProviderError>,
    pub edit_parts: Result<Vec<ResponsePart>, ProviderError>,
    pub upload: Result<UploadedFileHandle, ProviderError>,
    pub delete: Result<(), ProviderError>,
    pub analysis: Result<String, ProviderError>,
    pub speech_parts: Result<Vec<ResponsePart>, ProviderError>,
    pub chat_delay: Duration,
    pub chat_stats: Arc<ChatStats>,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
    pub polls: AtomicU32,
}

/// How many chat turns overlapped
#[derive(Debug, Default)]
pub(crate) struct ChatStats {
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Default for StubProvider {
    fn default() -> Self {
        let mut finished = Operation::pending("operations/video-1");
        finished.done = true;
        finished.result_uri = Some("https://files.example/video-1.mp4".to_string());

        Self {
            text: Ok("generated text".to_string()),
            image: Ok(Some("aW1hZ2U=".to_string())),
            video_start: Ok(Operation::pending("operations/video-1")),
            pending_polls: 0,
            finished_operation: Ok(finished),
            video_bytes: Ok(b"mp4 bytes".to_vec()),
            edit_parts: Ok(vec![
                ResponsePart::text("here you go"),
                ResponsePart::inline("image/png", "ZWRpdGVk"),
            ]),
            upload: Ok(UploadedFileHandle {
                remote_name: "files/upload-1".to_string(),
                remote_uri: "https://files.example/files/upload-1".to_string(),
                mime_type: "video/mp4".to_string(),
            }),
            delete: Ok(()),
            analysis: Ok("a cat chases a laser".to_string()),
            speech_parts: Ok(vec![ResponsePart::inline("audio/L16;rate=24000", "AAABAA==")]),
            chat_delay: Duration::ZERO,
            chat_stats: Arc::new(ChatStats::default()),
            calls: Arc::new(Mutex::new(Vec::new())),
            polls: AtomicU32::new(0),
        }
    }
}

impl StubProvider {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    /// How many times `call` was made
    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }
}

#[async_trait]
impl ProviderClient for StubProvider {
    async fn generate_text(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.record("generate_text");
        self.text.clone()
    }

    fn create_chat(&self, history: Vec<ChatTurn>) -> Box<dyn ChatSession> {
        self.record("create_chat");
        Box::new(EchoSession {
            history,
            delay: self.chat_delay,
            stats: self.chat_stats.clone(),
        })
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _aspect_ratio: AspectRatio,
    ) -> Result<Option<String>, ProviderError> {
        self.record("generate_image");
        self.image.clone()
    }

    async fn generate_video(
        &self,
        _prompt: &str,
        _image: Option<(&[u8], &str)>,
        _aspect_ratio: VideoAspectRatio,
    ) -> Result<Operation, ProviderError> {
        self.record("generate_video");
        self.video_start.clone()
    }

    async fn poll_video_operation(
        &self,
        operation: &Operation,
    ) -> Result<Operation, ProviderError> {
        self.record("poll_video_operation");
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.pending_polls {
            return Ok(operation.clone());
        }
        self.finished_operation.clone()
    }

    async fn fetch_video_bytes(&self, _result_uri: &str) -> Result<Vec<u8>, ProviderError> {
        self.record("fetch_video_bytes");
        self.video_bytes.clone()
    }

    async fn edit_image(
        &self,
        _image: &[u8],
        _mime_type: &str,
        _prompt: &str,
    ) -> Result<Vec<ResponsePart>, ProviderError> {
        self.record("edit_image");
        self.edit_parts.clone()
    }

    async fn upload_file(
        &self,
        _bytes: &[u8],
        _mime_type: &str,
        _display_name: &str,
    ) -> Result<UploadedFileHandle, ProviderError> {
        self.record("upload_file");
        self.upload.clone()
    }

    async fn delete_file(&self, _remote_name: &str) -> Result<(), ProviderError> {
        self.record("delete_file");
        self.delete.clone()
    }

    async fn generate_content_from_file(
        &self,
        _file: &UploadedFileHandle,
        _prompt: &str,
    ) -> Result<String, ProviderError> {
        self.record("generate_content_from_file");
        self.analysis.clone()
    }

    async fn generate_with_reasoning(
        &self,
        _prompt: &str,
        _reasoning_budget: u32,
    ) -> Result<String, ProviderError> {
        self.record("generate_with_reasoning");
        self.text.clone()
    }

    async fn text_to_speech(
        &self,
        _text: &str,
        _voice: &str,
    ) -> Result<Vec<ResponsePart>, ProviderError> {
        self.record("text_to_speech");
        self.speech_parts.clone()
    }
}

/// Replies "echo: <message>"; the message "fail" is rejected
struct EchoSession {
    history: Vec<ChatTurn>,
    delay: Duration,
    stats: Arc<ChatStats>,
}

#[async_trait]
impl ChatSession for EchoSession {
    async fn send(&mut self, message: &str) -> Result<String, ProviderError> {
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        if message == "fail" {
            return Err(ProviderError::new("chat turn rejected"));
        }
        let reply = format!("echo: {}", message);
        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::model(&reply));
        Ok(reply)
    }

    fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}
