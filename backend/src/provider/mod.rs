//! Provider module
//!
//! The contract the orchestrator consumes (`ProviderClient`, `ChatSession`)
//! and the Gemini REST implementation of it.
//!
//! Clients are built with an explicit `Credential`; nothing in this module
//! reads keys from the environment.

pub mod gemini;
pub mod gemini_types;
#[cfg(test)]
pub(crate) mod stub;
pub mod types;

use async_trait::async_trait;

pub use gemini::GeminiClient;
pub use types::{
    AspectRatio, ChatRole, ChatTurn, Credential, InlineData, Operation, OperationFailure,
    ProviderError, ResponsePart, UploadedFileHandle, VideoAspectRatio,
};

/// Primitive generation operations offered by an AI provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Single-shot text generation
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Open a chat session seeded with `history`
    fn create_chat(&self, history: Vec<ChatTurn>) -> Box<dyn ChatSession>;

    /// Generate one image, returning its base64 JPEG payload
    ///
    /// `Ok(None)` means the call succeeded but no image came back.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<String>, ProviderError>;

    /// Submit a video generation job, optionally seeded with a still image
    async fn generate_video(
        &self,
        prompt: &str,
        image: Option<(&[u8], &str)>,
        aspect_ratio: VideoAspectRatio,
    ) -> Result<Operation, ProviderError>;

    /// Refresh a video generation job
    async fn poll_video_operation(&self, operation: &Operation)
        -> Result<Operation, ProviderError>;

    /// Download the bytes behind a finished job's result URI
    async fn fetch_video_bytes(&self, result_uri: &str) -> Result<Vec<u8>, ProviderError>;

    /// Edit an image according to `prompt`, returning every response part
    async fn edit_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<Vec<ResponsePart>, ProviderError>;

    /// Upload a file for later reference by generation calls
    async fn upload_file(
        &self,
        bytes: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFileHandle, ProviderError>;

    /// Delete an uploaded file
    async fn delete_file(&self, remote_name: &str) -> Result<(), ProviderError>;

    /// Generate text about a previously uploaded file
    async fn generate_content_from_file(
        &self,
        file: &UploadedFileHandle,
        prompt: &str,
    ) -> Result<String, ProviderError>;

    /// Text generation with an explicit reasoning budget (in tokens)
    async fn generate_with_reasoning(
        &self,
        prompt: &str,
        reasoning_budget: u32,
    ) -> Result<String, ProviderError>;

    /// Synthesize speech, returning every response part
    async fn text_to_speech(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<Vec<ResponsePart>, ProviderError>;
}

/// A conversation held against the provider
///
/// Implementations keep the history themselves and append a user/model
/// pair only once a reply has arrived.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Send one user message and return the model's reply
    async fn send(&mut self, message: &str) -> Result<String, ProviderError>;

    /// History so far, oldest first
    fn history(&self) -> &[ChatTurn];
}
