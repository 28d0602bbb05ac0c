// Application state management
// Holds configuration, open conversations, session blobs, and the shared
// speech player

use crate::config::Config;
use crate::error::AppError;
use crate::orchestrator::{
    ChatConversation, CleanupTracker, OrchestratorConfig, SpeechPlayer, TaskError,
    TaskOrchestrator,
};
use crate::provider::{Credential, GeminiClient};
use crate::state::blobs::BlobStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// State shared by every handler
pub type SharedState = Arc<RwLock<AppState>>;

/// Main application state
///
/// Handlers hold the lock only long enough to copy out what they need; no
/// provider call runs under it.
#[derive(Debug)]
pub struct AppState {
    /// Process configuration (orchestrator settings are updated at runtime)
    pub config: Config,
    /// Open conversations by id
    pub chats: HashMap<Uuid, Arc<ChatConversation>>,
    /// Generated videos for this session
    pub blobs: BlobStore,
    /// Shared speech playback context
    pub speech: Arc<SpeechPlayer>,
    /// Detached cleanup jobs of every orchestrator built from this state
    pub cleanups: CleanupTracker,
    http: reqwest::Client,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: Config) -> Self {
        Self {
            blobs: BlobStore::with_max_bytes(config.server.blob_store_max_bytes),
            config,
            chats: HashMap::new(),
            speech: Arc::new(SpeechPlayer::new()),
            cleanups: CleanupTracker::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Wrap in the shared handle used as router state
    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Current orchestration settings
    pub fn settings(&self) -> &OrchestratorConfig {
        &self.config.orchestrator
    }

    /// Pick the credential for a request
    ///
    /// A key supplied with the request wins over the configured default.
    pub fn resolve_credential(&self, supplied: Option<&str>) -> Result<Credential, AppError> {
        supplied
            .map(Credential::new)
            .filter(|c| !c.is_empty())
            .or_else(|| self.config.provider.default_credential.clone())
            .ok_or(AppError::MissingCredential)
    }

    /// Build an orchestrator whose provider client is bound to `credential`
    pub fn orchestrator(&self, credential: Credential) -> Result<TaskOrchestrator, AppError> {
        let client = GeminiClient::new(self.http.clone(), self.config.provider.clone(), credential)
            .map_err(TaskError::Provider)?;
        Ok(
            TaskOrchestrator::new(Arc::new(client), self.config.orchestrator.clone())
                .with_cleanup_tracker(self.cleanups.clone()),
        )
    }

    /// Look up an open conversation
    pub fn conversation(&self, id: Uuid) -> Result<Arc<ChatConversation>, AppError> {
        self.chats
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::ConversationNotFound(id.to_string()))
    }

    /// Release session resources: wait for pending cleanups, close playback
    pub async fn shutdown(&self) {
        self.cleanups.drain().await;
        self.speech.close();
    }
}
