//! Task error types
//!
//! Errors a task can end in. The provider's own error value is carried
//! unchanged so callers can inspect it.

use crate::provider::ProviderError;
use std::time::Duration;
use thiserror::Error;

/// Ways a task can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Required input missing or malformed (checked before execution)
    #[error("Invalid task input: {0}")]
    Validation(String),

    /// The file never reached the provider
    #[error("File upload failed: {0}")]
    Upload(#[source] ProviderError),

    /// A generation, polling, or analysis call failed
    #[error("Provider call failed: {0}")]
    Provider(#[from] ProviderError),

    /// The provider answered but returned nothing usable
    #[error("Provider returned no {0} output")]
    NoArtifactProduced(&'static str),

    /// The caller's deadline fired before the task finished
    #[error("Task did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

impl TaskError {
    /// The provider error behind this failure, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            TaskError::Upload(e) | TaskError::Provider(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller should ask the user to pick a credential again
    pub fn is_credential_invalid(&self) -> bool {
        self.provider_error()
            .map(ProviderError::is_entity_not_found)
            .unwrap_or(false)
    }
}
