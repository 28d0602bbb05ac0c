//! Chat API endpoints
//!
//! Handles HTTP requests for conversations and their messages. Each
//! conversation keeps its own history and processes turns in order.

use crate::api::utils::{prepare_task, supplied_api_key, TaskPayload};
use crate::error::AppError;
use crate::orchestrator::ChatConversation;
use crate::provider::{ChatRole, ChatTurn};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create a new conversation
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    /// Turns to seed the conversation with
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// Request to send a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Message content
    pub message: String,
}

/// Conversation response
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    /// Conversation unique identifier
    pub id: Uuid,
    /// Unix timestamp when conversation was created
    pub created_at: i64,
    /// History, oldest first
    pub history: Vec<ChatTurn>,
}

impl ConversationResponse {
    async fn from_conversation(conversation: &ChatConversation) -> Self {
        Self {
            id: conversation.id(),
            created_at: conversation.created_at().timestamp(),
            history: conversation.history().await,
        }
    }
}

/// Reply to a sent message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Conversation the message belongs to
    pub conversation_id: Uuid,
    /// Model reply
    pub reply: String,
    /// History length after this turn
    pub turns: usize,
}

fn is_alternating(history: &[ChatTurn]) -> bool {
    history.len() % 2 == 0
        && history
            .chunks(2)
            .all(|pair| pair[0].role == ChatRole::User && pair[1].role == ChatRole::Model)
}

/// POST /api/chats - Open a conversation
pub async fn create_conversation(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), AppError> {
    if !is_alternating(&request.history) {
        return Err(AppError::InvalidRequest(
            "History must be user/model pairs, starting with user".to_string(),
        ));
    }

    let mut state = state.write().await;
    let credential = state.resolve_credential(supplied_api_key(&headers))?;
    let conversation = state.orchestrator(credential)?.start_chat(request.history);
    state.chats.insert(conversation.id(), conversation.clone());
    drop(state);

    tracing::info!(conversation_id = %conversation.id(), "Conversation created");
    Ok((
        StatusCode::CREATED,
        Json(ConversationResponse::from_conversation(&conversation).await),
    ))
}

/// GET /api/chats/:id - Conversation with its history
pub async fn get_conversation(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>, AppError> {
    let conversation = state.read().await.conversation(id)?;
    Ok(Json(
        ConversationResponse::from_conversation(&conversation).await,
    ))
}

/// DELETE /api/chats/:id - Close a conversation
pub async fn delete_conversation(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .write()
        .await
        .chats
        .remove(&id)
        .ok_or_else(|| AppError::ConversationNotFound(id.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/chats/:id/messages - Send one turn
///
/// Waits behind any turn already in flight for the same conversation.
pub async fn send_message(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let conversation = state.read().await.conversation(id)?;
    let payload = TaskPayload::Chat {
        conversation_id: id,
        message: request.message,
    };
    let artifact = prepare_task(&state, &headers, payload).await?.run(None).await?;

    let reply = artifact
        .as_text()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Chat produced a non-text artifact")))?
        .to_string();

    Ok(Json(MessageResponse {
        conversation_id: id,
        reply,
        turns: conversation.history().await.len(),
    }))
}
