//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::orchestrator::config::OrchestratorConfig;
use crate::provider::Credential;
use crate::state::blobs::DEFAULT_BLOB_STORE_MAX_BYTES;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Provider endpoints, models, and default credential
    pub provider: ProviderConfig,
    /// Orchestration settings (tunable at runtime)
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Cap on bytes held by the session blob store
    pub blob_store_max_bytes: usize,
}

/// Provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the REST API (`.../v1beta`)
    pub api_base_url: String,
    /// Base URL of the upload endpoint (`.../upload/v1beta`)
    pub upload_base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Credential used when a request doesn't carry its own
    pub default_credential: Option<Credential>,
    /// Model ids per capability
    pub models: ModelConfig,
}

/// Model ids per capability
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Single-shot text
    pub text: String,
    /// Chat
    pub chat: String,
    /// Reasoning ("thinking")
    pub reasoning: String,
    /// Image generation
    pub image: String,
    /// Image editing
    pub image_edit: String,
    /// Video generation
    pub video: String,
    /// Text-to-speech
    pub tts: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: "gemini-2.5-flash".to_string(),
            chat: "gemini-2.5-flash".to_string(),
            reasoning: "gemini-2.5-pro".to_string(),
            image: "imagen-4.0-generate-001".to_string(),
            image_edit: "gemini-2.5-flash-image".to_string(),
            video: "veo-2.0-generate-001".to_string(),
            tts: "gemini-2.5-flash-preview-tts".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            upload_base_url: "https://generativelanguage.googleapis.com/upload/v1beta"
                .to_string(),
            timeout_secs: 120,
            default_credential: None,
            models: ModelConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Configuration pointing both endpoints at `base_url` (used by tests
    /// against a local mock server)
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            api_base_url: base.to_string(),
            upload_base_url: format!("{}/upload", base),
            ..Self::default()
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = ProviderConfig::default();
        let models = ModelConfig::default();

        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                blob_store_max_bytes: env::var("BLOB_STORE_MAX_BYTES")
                    .ok()
                    .and_then(|b| b.parse().ok())
                    .unwrap_or(DEFAULT_BLOB_STORE_MAX_BYTES),
            },
            provider: ProviderConfig {
                api_base_url: env_or("GEMINI_API_BASE_URL", defaults.api_base_url),
                upload_base_url: env_or("GEMINI_UPLOAD_BASE_URL", defaults.upload_base_url),
                timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(defaults.timeout_secs),
                default_credential: env::var("GEMINI_API_KEY")
                    .ok()
                    .map(Credential::new)
                    .filter(|c| !c.is_empty()),
                models: ModelConfig {
                    text: env_or("GEMINI_TEXT_MODEL", models.text),
                    chat: env_or("GEMINI_CHAT_MODEL", models.chat),
                    reasoning: env_or("GEMINI_REASONING_MODEL", models.reasoning),
                    image: env_or("GEMINI_IMAGE_MODEL", models.image),
                    image_edit: env_or("GEMINI_IMAGE_EDIT_MODEL", models.image_edit),
                    video: env_or("GEMINI_VIDEO_MODEL", models.video),
                    tts: env_or("GEMINI_TTS_MODEL", models.tts),
                },
            },
            orchestrator: OrchestratorConfig::from_env(),
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_url_derives_upload_endpoint() {
        let config = ProviderConfig::with_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.api_base_url, "http://127.0.0.1:1234");
        assert_eq!(config.upload_base_url, "http://127.0.0.1:1234/upload");
        assert!(config.default_credential.is_none());
    }

    #[test]
    fn test_server_addr() {
        let config = Config {
            server: ServerConfig {
                port: 9000,
                host: "127.0.0.1".to_string(),
                blob_store_max_bytes: DEFAULT_BLOB_STORE_MAX_BYTES,
            },
            provider: ProviderConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        };
        assert_eq!(config.server_addr(), "127.0.0.1:9000");
    }
}
