//! Multipart task submission
//!
//! File-based tasks (image edit, video or audio analysis) can send the file
//! as a multipart part instead of inline base64.
//!
//! Fields:
//! - `kind`: `image_edit`, `video_analysis` or `audio_analysis`
//! - `prompt`: instructions or question
//! - `file`: the file itself (its content type is used, or guessed from the
//!   file name)

use crate::api::tasks::TaskResponse;
use crate::api::utils::prepare_request;
use crate::error::AppError;
use crate::orchestrator::{InputFile, TaskKind, TaskRequest};
use crate::state::SharedState;
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use std::time::Instant;
use tracing::{info, warn};

/// Largest accepted file part
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

fn bad_request(what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::InvalidRequest(format!("Failed to read {}: {}", what, e))
}

fn parse_kind(kind: &str) -> Result<TaskKind, AppError> {
    match kind.trim() {
        "image_edit" => Ok(TaskKind::ImageEdit),
        "video_analysis" => Ok(TaskKind::VideoAnalysis),
        "audio_analysis" => Ok(TaskKind::AudioAnalysis),
        other => Err(AppError::InvalidRequest(format!(
            "Task kind '{}' does not take a file upload",
            other
        ))),
    }
}

fn build_request(kind: TaskKind, file: InputFile, prompt: String) -> TaskRequest {
    match kind {
        TaskKind::ImageEdit => TaskRequest::ImageEdit {
            image: file,
            prompt,
        },
        TaskKind::AudioAnalysis => TaskRequest::AudioAnalysis { file, prompt },
        _ => TaskRequest::VideoAnalysis { file, prompt },
    }
}

/// POST /api/tasks/upload - Run a file-based task from multipart form data
pub async fn run_upload_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<TaskResponse>, AppError> {
    let mut kind: Option<TaskKind> = None;
    let mut prompt = String::new();
    let mut file: Option<InputFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request("multipart field", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "kind" => {
                let text = field.text().await.map_err(|e| bad_request("kind", e))?;
                kind = Some(parse_kind(&text)?);
            }
            "prompt" => {
                prompt = field.text().await.map_err(|e| bad_request("prompt", e))?;
            }
            "file" => {
                let display_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .filter(|ct| *ct != "application/octet-stream")
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&display_name)
                            .first_or_octet_stream()
                            .essence_str()
                            .to_string()
                    });
                let data = field.bytes().await.map_err(|e| bad_request("file", e))?;

                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::InvalidRequest(format!(
                        "File too large: {} bytes (limit {})",
                        data.len(),
                        MAX_UPLOAD_BYTES
                    )));
                }

                info!(
                    file_name = %display_name,
                    mime_type = %mime_type,
                    bytes = data.len(),
                    "Received uploaded file"
                );
                file = Some(InputFile::new(data.to_vec(), mime_type, display_name));
            }
            _ => {
                warn!("Unknown multipart field: {}", field_name);
            }
        }
    }

    let kind = kind.ok_or_else(|| AppError::InvalidRequest("Missing 'kind' field".to_string()))?;
    let file = file.ok_or_else(|| AppError::InvalidRequest("Missing 'file' field".to_string()))?;

    let task = prepare_request(&state, &headers, build_request(kind, file, prompt)).await?;

    let start = Instant::now();
    let artifact = task.run(None).await?;

    Ok(Json(TaskResponse {
        kind,
        artifact,
        execution_time_ms: start.elapsed().as_millis() as u64,
    }))
}
