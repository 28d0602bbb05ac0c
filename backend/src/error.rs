//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::orchestrator::{PlaybackError, TaskError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// A task ended in an error
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Request body is malformed or missing required input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration update was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Neither the request nor the server supplies an API key
    #[error("No API key configured; send x-goog-api-key or set GEMINI_API_KEY")]
    MissingCredential,

    /// Conversation with the given ID was not found
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// Blob with the given ID was not found
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    /// Audio could not be prepared for playback
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status and optional machine-readable code
    fn classify(&self) -> (StatusCode, Option<&'static str>) {
        match self {
            AppError::Task(e) if e.is_credential_invalid() => {
                (StatusCode::UNAUTHORIZED, Some("credential_invalid"))
            }
            AppError::Task(TaskError::Validation(_)) => (StatusCode::BAD_REQUEST, None),
            AppError::Task(TaskError::NoArtifactProduced(_)) => {
                (StatusCode::BAD_GATEWAY, Some("no_artifact"))
            }
            AppError::Task(TaskError::DeadlineExceeded(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, Some("deadline_exceeded"))
            }
            AppError::Task(TaskError::Upload(_)) => (StatusCode::BAD_GATEWAY, Some("upload_failed")),
            AppError::Task(TaskError::Provider(_)) => {
                (StatusCode::BAD_GATEWAY, Some("provider_error"))
            }
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, None),
            AppError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, None),
            AppError::MissingCredential => (StatusCode::UNAUTHORIZED, Some("credential_missing")),
            AppError::ConversationNotFound(_) => (StatusCode::NOT_FOUND, None),
            AppError::BlobNotFound(_) => (StatusCode::NOT_FOUND, None),
            AppError::Playback(PlaybackError::NotAudio(_)) => (StatusCode::BAD_REQUEST, None),
            AppError::Playback(PlaybackError::Encode(_)) => (StatusCode::BAD_REQUEST, None),
            AppError::Playback(PlaybackError::Closed) => (StatusCode::SERVICE_UNAVAILABLE, None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "code": code,
        }));

        (status, body).into_response()
    }
}
