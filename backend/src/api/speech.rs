//! Speech API endpoint
//!
//! Synthesizes speech and returns it as a playable WAV file rendered
//! through the shared playback context.

use crate::api::utils::{prepare_task, TaskPayload};
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;

/// Speech request
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
    /// Prebuilt voice (server default when absent)
    #[serde(default)]
    pub voice: Option<String>,
}

/// POST /api/speech - Text to WAV
pub async fn synthesize(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<SpeechRequest>,
) -> Result<Response, AppError> {
    let payload = TaskPayload::Tts {
        text: request.text,
        voice: request.voice,
    };
    let artifact = prepare_task(&state, &headers, payload).await?.run(None).await?;

    let player = state.read().await.speech.clone();
    let wav = player.render_wav(&artifact)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/wav")
        .header(header::CONTENT_LENGTH, wav.len())
        .body(Body::from(wav))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build audio response: {}", e)))
}
