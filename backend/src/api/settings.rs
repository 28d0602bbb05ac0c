//! Settings API endpoints
//!
//! Reads and updates the runtime orchestration settings.

use crate::error::AppError;
use crate::orchestrator::config::{validate_and_apply_config_update, ConfigUpdateRequest};
use crate::orchestrator::OrchestratorConfig;
use crate::state::SharedState;
use axum::{extract::State, response::Json};

/// GET /api/config - Current orchestration settings
pub async fn get_config(State(state): State<SharedState>) -> Json<OrchestratorConfig> {
    Json(state.read().await.settings().clone())
}

/// POST /api/config - Update orchestration settings
///
/// Applies to tasks started after the update.
pub async fn update_config(
    State(state): State<SharedState>,
    Json(request): Json<ConfigUpdateRequest>,
) -> Result<Json<OrchestratorConfig>, AppError> {
    let mut state = state.write().await;
    let updated = validate_and_apply_config_update(state.settings().clone(), request)?;
    state.config.orchestrator = updated.clone();
    tracing::info!(config = ?updated, "Orchestrator configuration updated");
    Ok(Json(updated))
}
