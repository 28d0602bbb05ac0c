//! Orchestrator configuration
//!
//! Settings that shape how tasks run. Readable and updatable at runtime
//! through `/api/config`.

use crate::error::AppError;
use crate::orchestrator::constants::{
    DEFAULT_MAX_PROMPT_LENGTH, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_THINKING_BUDGET,
    DEFAULT_VIDEO_DEADLINE_SECS, DEFAULT_VOICE,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestratorConfig {
    /// Wait between video operation polls, in seconds
    pub poll_interval_secs: u64,
    /// Hard deadline on video generation, in seconds (`None` disables it)
    pub video_deadline_secs: Option<u64>,
    /// Voice used when a speech request names none
    pub default_voice: String,
    /// Reasoning budget used when a thinking request names none
    pub thinking_budget: u32,
    /// Maximum prompt length in characters
    pub max_prompt_length: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            video_deadline_secs: Some(DEFAULT_VIDEO_DEADLINE_SECS),
            default_voice: DEFAULT_VOICE.to_string(),
            thinking_budget: DEFAULT_THINKING_BUDGET,
            max_prompt_length: DEFAULT_MAX_PROMPT_LENGTH,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl OrchestratorConfig {
    /// Defaults overridden by `POLL_INTERVAL_SECS`, `VIDEO_DEADLINE_SECS`,
    /// `DEFAULT_VOICE`, `THINKING_BUDGET` and `MAX_PROMPT_LENGTH`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.poll_interval_secs),
            video_deadline_secs: match env_parse::<u64>("VIDEO_DEADLINE_SECS") {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => defaults.video_deadline_secs,
            },
            default_voice: env::var("DEFAULT_VOICE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.default_voice),
            thinking_budget: env_parse("THINKING_BUDGET").unwrap_or(defaults.thinking_budget),
            max_prompt_length: env_parse("MAX_PROMPT_LENGTH")
                .filter(|l| *l > 0)
                .unwrap_or(defaults.max_prompt_length),
        }
    }

    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Video deadline as a `Duration`, if enabled
    pub fn video_deadline(&self) -> Option<Duration> {
        self.video_deadline_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

/// Request body for updating orchestrator configuration
#[derive(Debug, Default, Deserialize)]
pub struct ConfigUpdateRequest {
    /// Poll interval in seconds (optional)
    pub poll_interval_secs: Option<u64>,
    /// Video deadline in seconds; 0 disables it (optional)
    pub video_deadline_secs: Option<u64>,
    /// Default voice (optional)
    pub default_voice: Option<String>,
    /// Default reasoning budget (optional)
    pub thinking_budget: Option<u32>,
    /// Maximum prompt length (optional)
    pub max_prompt_length: Option<usize>,
}

/// Validate and apply configuration updates
///
/// Nothing is applied if any field is invalid.
///
/// # Arguments
/// * `config` - The current config to update
/// * `request` - The update request with optional fields
///
/// # Returns
/// * `Ok(OrchestratorConfig)` - The updated configuration
/// * `Err(AppError)` - If validation fails
pub fn validate_and_apply_config_update(
    mut config: OrchestratorConfig,
    request: ConfigUpdateRequest,
) -> Result<OrchestratorConfig, AppError> {
    if let Some(interval) = request.poll_interval_secs {
        if interval == 0 {
            return Err(AppError::InvalidConfig(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }
        config.poll_interval_secs = interval;
    }

    if let Some(deadline) = request.video_deadline_secs {
        config.video_deadline_secs = (deadline > 0).then_some(deadline);
    }

    if let Some(voice) = request.default_voice {
        if voice.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "default_voice cannot be empty".to_string(),
            ));
        }
        config.default_voice = voice;
    }

    if let Some(budget) = request.thinking_budget {
        config.thinking_budget = budget;
    }

    if let Some(max_len) = request.max_prompt_length {
        if max_len == 0 {
            return Err(AppError::InvalidConfig(
                "max_prompt_length must be > 0".to_string(),
            ));
        }
        config.max_prompt_length = max_len;
    }

    Ok(config)
}
