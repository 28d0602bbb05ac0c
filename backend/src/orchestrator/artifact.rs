//! Task artifacts
//!
//! The single output a successful task hands back to its caller.

use crate::orchestrator::encoder::LocalBlob;
use serde::Serialize;

/// Finalized output of a successful task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Artifact {
    /// Generated or analyzed text
    PlainText {
        /// The text
        text: String,
    },
    /// Image embedded as a `data:` URI
    DataUri {
        /// MIME type of the embedded payload
        mime_type: String,
        /// Full `data:<mime>;base64,<payload>` URI
        uri: String,
    },
    /// Bytes held in memory behind a session-local URI (video)
    BlobUri(LocalBlob),
    /// Base64 PCM audio exactly as the provider returned it (speech)
    RawAudioBase64 {
        /// MIME type reported by the provider
        mime_type: String,
        /// Base64 payload
        data: String,
    },
}

impl Artifact {
    /// Text artifact
    pub fn text(text: impl Into<String>) -> Self {
        Artifact::PlainText { text: text.into() }
    }

    /// Text content, if this is a text artifact
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Artifact::PlainText { text } => Some(text),
            _ => None,
        }
    }

    /// Short name of the variant, used in logs
    pub fn variant_name(&self) -> &'static str {
        match self {
            Artifact::PlainText { .. } => "plain_text",
            Artifact::DataUri { .. } => "data_uri",
            Artifact::BlobUri(_) => "blob_uri",
            Artifact::RawAudioBase64 { .. } => "raw_audio_base64",
        }
    }
}
