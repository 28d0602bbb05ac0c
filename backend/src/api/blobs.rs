//! Blob API endpoints
//!
//! Serves generated videos held in the session blob store.

use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use uuid::Uuid;

/// GET /api/blobs/:id - Raw blob bytes
pub async fn get_blob(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (mime_type, data) = {
        let state = state.read().await;
        let blob = state
            .blobs
            .get(&id)
            .ok_or_else(|| AppError::BlobNotFound(id.to_string()))?;
        (blob.mime_type.clone(), blob.data.clone())
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build blob response: {}", e)))
}

/// DELETE /api/blobs/:id - Drop a blob
pub async fn delete_blob(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .write()
        .await
        .blobs
        .remove(&id)
        .ok_or_else(|| AppError::BlobNotFound(id.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
