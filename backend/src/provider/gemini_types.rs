//! Gemini API wire types
//!
//! Structs that mirror the Gemini REST JSON format.
//! Used to serialize requests and deserialize responses into typed Rust structs.

use serde::{Deserialize, Serialize};

/// Top-level `generateContent` response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// List of candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Optional feedback about the prompt (e.g., if it was blocked)
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A single candidate response from the model
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of this candidate
    #[serde(default)]
    pub content: Option<Content>,
    /// Why the model stopped generating (if applicable)
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Content structure shared by requests and responses
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Content {
    /// `user` or `model`; omitted for single-shot requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// List of content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of content
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    /// Reference to an uploaded file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

impl Part {
    /// Text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Inline data part
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Default::default()
        }
    }

    /// Uploaded file reference part
    pub fn file(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type: mime_type.into(),
                file_uri: file_uri.into(),
            }),
            ..Default::default()
        }
    }
}

/// Base64 payload with its MIME type
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// MIME type of the payload
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Reference to a file uploaded through the Files API
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// MIME type of the file
    pub mime_type: String,
    /// URI returned by the upload
    pub file_uri: String,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked (if applicable)
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Request body for `generateContent`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation or single prompt
    pub contents: Vec<Content>,
    /// Optional generation configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Generation configuration for requests
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Output modalities, e.g. `["AUDIO"]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    /// Reasoning settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    /// Voice settings for speech output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

/// Reasoning budget settings
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// Maximum reasoning tokens
    pub thinking_budget: u32,
}

/// Speech output settings
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Voice selection
    pub voice_config: VoiceConfig,
}

/// Voice selection
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// One of the provider's prebuilt voices
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// Prebuilt voice by name
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    /// Voice name, e.g. `Kore`
    pub voice_name: String,
}

/// Response of the image `predict` endpoint
#[derive(Deserialize, Debug)]
pub struct PredictResponse {
    /// Generated images
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// One generated image
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Base64 image bytes
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    /// Image MIME type
    #[allow(dead_code)] // Part of API response format
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Long-running operation resource
#[derive(Deserialize, Debug)]
pub struct LongRunningOperation {
    /// Operation resource name
    pub name: String,
    /// Whether the job has finished
    #[serde(default)]
    pub done: bool,
    /// Result payload once finished
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    /// Failure once finished
    #[serde(default)]
    pub error: Option<OperationErrorBody>,
}

/// Error object inside a finished operation
#[derive(Deserialize, Debug)]
pub struct OperationErrorBody {
    /// Numeric RPC code
    #[serde(default)]
    pub code: Option<i32>,
    /// Message
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of a Files API upload
#[derive(Deserialize, Debug)]
pub struct UploadFileResponse {
    /// The stored file
    pub file: RemoteFile,
}

/// Stored file metadata
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name (e.g. `files/abc`)
    pub name: String,
    /// URI for `fileData` references
    pub uri: String,
    /// MIME type recorded by the provider
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Deserialize, Debug)]
pub struct ErrorEnvelope {
    /// The error
    pub error: ErrorBody,
}

/// Error details
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    /// HTTP-equivalent code
    #[allow(dead_code)] // Part of API response format
    #[serde(default)]
    pub code: Option<u16>,
    /// Message, e.g. "Requested entity was not found."
    #[serde(default)]
    pub message: Option<String>,
    /// RPC status, e.g. `NOT_FOUND`
    #[serde(default)]
    pub status: Option<String>,
}

/// Locations inside a finished video operation's `response` that carry the
/// download URI
pub const VIDEO_URI_POINTERS: [&str; 2] = [
    "/generateVideoResponse/generatedSamples/0/video/uri",
    "/generateVideoResponse/generatedSamples/0/videoUri",
];

/// Find the download URI inside a finished video operation's response
pub fn extract_video_uri(response: &serde_json::Value) -> Option<String> {
    VIDEO_URI_POINTERS
        .iter()
        .find_map(|pointer| response.pointer(pointer).and_then(|v| v.as_str()))
        .map(str::to_string)
}
