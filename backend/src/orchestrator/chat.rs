//! Ordered conversations
//!
//! A conversation owns its history and sends turns one at a time, in the
//! order they were submitted. Each turn goes through the client of the
//! request that carries it, so a rotated credential applies from the next
//! turn on.

use crate::provider::{ChatTurn, ProviderClient, ProviderError};
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A conversation private to one chat panel
///
/// `send` holds the history lock for the whole provider round trip, so a
/// second message waits until the first reply (or failure) has resolved.
/// The lock is FIFO, which keeps submission order.
pub struct ChatConversation {
    id: Uuid,
    created_at: DateTime<Utc>,
    history: Mutex<Vec<ChatTurn>>,
}

impl fmt::Debug for ChatConversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConversation")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl ChatConversation {
    /// Open a conversation seeded with `history`
    pub fn new(history: Vec<ChatTurn>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            history: Mutex::new(history),
        }
    }

    /// Conversation id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the conversation was opened
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Send one user message through `client` and wait for the reply
    ///
    /// The history only grows when the reply arrives.
    pub async fn send(
        &self,
        client: &dyn ProviderClient,
        message: &str,
    ) -> Result<String, ProviderError> {
        let mut history = self.history.lock().await;
        tracing::debug!(
            conversation_id = %self.id,
            turns = history.len(),
            message_len = message.len(),
            "Sending chat turn"
        );

        let mut session = client.create_chat(history.clone());
        let reply = session.send(message).await?;
        *history = session.history().to_vec();
        Ok(reply)
    }

    /// Snapshot of the history, oldest first
    pub async fn history(&self) -> Vec<ChatTurn> {
        self.history.lock().await.clone()
    }
}
