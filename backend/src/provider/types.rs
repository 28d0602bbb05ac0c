//! Provider value types
//!
//! Plain data exchanged between the orchestrator and a `ProviderClient`.
//! Nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message the provider uses when a key or model stops resolving mid-session
pub const ENTITY_NOT_FOUND_MESSAGE: &str = "Requested entity was not found.";

/// Structured RPC status paired with `ENTITY_NOT_FOUND_MESSAGE`
pub const ENTITY_NOT_FOUND_STATUS: &str = "NOT_FOUND";

/// Access credential handed to a provider client at construction
///
/// The key never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw API key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key, for placing on the wire
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the key is blank
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

/// Aspect ratios accepted by image generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 3:4
    #[serde(rename = "3:4")]
    Portrait,
    /// 4:3
    #[serde(rename = "4:3")]
    Landscape,
    /// 16:9
    #[serde(rename = "16:9")]
    Widescreen,
    /// 9:16
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Tall => "9:16",
        }
    }
}

/// Aspect ratios accepted by video generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoAspectRatio {
    /// 16:9
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16
    #[serde(rename = "9:16")]
    Portrait,
}

impl VideoAspectRatio {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoAspectRatio::Landscape => "16:9",
            VideoAspectRatio::Portrait => "9:16",
        }
    }
}

/// Error object attached to a finished long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Numeric RPC code, if reported
    pub code: Option<i32>,
    /// Human-readable message
    pub message: String,
}

impl From<OperationFailure> for ProviderError {
    fn from(failure: OperationFailure) -> Self {
        // google.rpc.Code numbering
        let code = failure.code.and_then(|code| match code {
            3 => Some("INVALID_ARGUMENT"),
            5 => Some(ENTITY_NOT_FOUND_STATUS),
            7 => Some("PERMISSION_DENIED"),
            8 => Some("RESOURCE_EXHAUSTED"),
            13 => Some("INTERNAL"),
            _ => None,
        });
        Self {
            status: None,
            code: code.map(str::to_string),
            message: failure.message,
        }
    }
}

/// Handle to a provider-side long-running job (video generation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Resource name used to refresh the operation (e.g. `operations/abc`)
    pub name: String,
    /// Whether the provider has finished the job
    pub done: bool,
    /// Download location of the result once `done`
    pub result_uri: Option<String>,
    /// Failure reported by the provider once `done`
    pub error: Option<OperationFailure>,
}

impl Operation {
    /// A freshly submitted, not yet finished operation
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            result_uri: None,
            error: None,
        }
    }
}

/// Inline binary payload inside a response part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    /// MIME type of the payload
    pub mime_type: String,
    /// Base64-encoded payload, as returned by the provider
    pub data: String,
}

/// One part of a multimodal model response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponsePart {
    /// Text carried by the part
    pub text: Option<String>,
    /// Binary payload carried by the part
    pub inline_data: Option<InlineData>,
}

impl ResponsePart {
    /// Text-only part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Inline-data-only part
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

/// Provider-side reference to an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFileHandle {
    /// Resource name used for deletion (e.g. `files/abc`)
    pub remote_name: String,
    /// URI used to reference the file from a generation request
    pub remote_uri: String,
    /// MIME type recorded by the provider
    pub mime_type: String,
}

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Message from the user
    User,
    /// Message from the model
    Model,
}

impl ChatRole {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// A single entry in a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who produced the turn
    pub role: ChatRole,
    /// Turn text
    pub text: String,
}

impl ChatTurn {
    /// User turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// Model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Failure returned by any provider call
///
/// The original status, RPC code, and message are kept intact so callers can
/// classify the failure themselves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status of the failed call, if one was received
    pub status: Option<u16>,
    /// Structured RPC status (e.g. `NOT_FOUND`), if the provider sent one
    pub code: Option<String>,
    /// Provider or transport message
    pub message: String,
}

impl ProviderError {
    /// Error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Error from an HTTP status response
    pub fn http(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code,
            message: message.into(),
        }
    }

    /// Request never produced a response
    pub fn transport(err: impl fmt::Display) -> Self {
        Self::new(format!("Failed to reach provider: {}", err))
    }

    /// Response arrived but could not be understood
    pub fn decode(err: impl fmt::Display) -> Self {
        Self::new(format!("Failed to decode provider response: {}", err))
    }

    /// Whether this is the "entity not found" failure signalling that the
    /// credential in use is no longer valid
    ///
    /// The structured status is checked first. Providers that omit it are
    /// matched on their message text.
    pub fn is_entity_not_found(&self) -> bool {
        if self.code.as_deref() == Some(ENTITY_NOT_FOUND_STATUS) {
            return true;
        }
        self.message.contains(ENTITY_NOT_FOUND_MESSAGE)
    }
}
