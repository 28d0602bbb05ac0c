//! Task execution API handlers
//!
//! Runs one generation or analysis task per request and returns its
//! artifact as JSON.

use crate::api::utils::{prepare_task, register_artifact, TaskPayload};
use crate::error::AppError;
use crate::orchestrator::{Artifact, TaskKind};
use crate::state::SharedState;
use axum::{extract::State, http::HeaderMap, response::Json};
use serde::Serialize;
use std::time::Instant;

/// Task response
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    /// Kind of the task that ran
    pub kind: TaskKind,
    /// Produced artifact
    pub artifact: Artifact,
    /// Wall-clock duration
    pub execution_time_ms: u64,
}

/// POST /api/tasks - Run a task and return its artifact
pub async fn run_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = prepare_task(&state, &headers, payload).await?;
    let kind = task.kind();

    let start = Instant::now();
    let artifact = task.run(None).await?;
    let execution_time_ms = start.elapsed().as_millis() as u64;

    register_artifact(&state, &artifact).await;

    Ok(Json(TaskResponse {
        kind,
        artifact,
        execution_time_ms,
    }))
}
