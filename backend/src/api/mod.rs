//! API module
//!
//! Contains the HTTP request handlers and the router that mounts them.

pub mod blobs;
pub mod chat;
pub mod settings;
pub mod speech;
pub mod streaming;
pub mod tasks;
pub mod uploads;
pub mod utils;

use crate::state::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
    })
}

/// All API routes, without middleware
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Tasks
        .route("/api/tasks", post(tasks::run_task))
        .route("/api/tasks/stream", post(streaming::run_task_stream))
        .route("/api/tasks/upload", post(uploads::run_upload_task))
        // Conversations
        .route("/api/chats", post(chat::create_conversation))
        .route(
            "/api/chats/:id",
            get(chat::get_conversation).delete(chat::delete_conversation),
        )
        .route("/api/chats/:id/messages", post(chat::send_message))
        // Session blobs
        .route(
            "/api/blobs/:id",
            get(blobs::get_blob).delete(blobs::delete_blob),
        )
        // Speech
        .route("/api/speech", post(speech::synthesize))
        // Settings
        .route(
            "/api/config",
            get(settings::get_config).post(settings::update_config),
        )
        .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BYTES + 1024 * 1024))
        .with_state(state)
}
