//! SessionManager - the public API of the assistant.
//!
//! Wraps the orchestrator, the conversation store and the active intent
//! catalog. Each `send_message` persists the user message, produces a reply
//! and persists it. Turns in different conversations may run concurrently;
//! the catalog is snapshotted per turn so a reload never tears a turn.

use crate::error::StoreError;
use crate::fallback::Orchestrator;
use crate::id::ConversationId;
use crate::intent::IntentCatalog;
use crate::memory::ContextMemoryEntry;
use crate::message::{Conversation, Message, ReplyKind};
use crate::store::ConversationStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Title given to conversations created without one.
pub const DEFAULT_TITLE: &str = "Nova conversa";

/// Errors from SessionManager operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConversationNotFound(id) => SessionError::NotFound(id),
            other => SessionError::Store(other),
        }
    }
}

/// Owns conversations and runs turns through the orchestrator.
pub struct SessionManager {
    orchestrator: Orchestrator,
    store: Arc<dyn ConversationStore>,
    catalog: RwLock<Arc<IntentCatalog>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(orchestrator: Orchestrator, store: Arc<dyn ConversationStore>, catalog: IntentCatalog) -> Self {
        Self {
            orchestrator,
            store,
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// The catalog new turns will use.
    pub async fn catalog(&self) -> Arc<IntentCatalog> {
        self.catalog.read().await.clone()
    }

    /// Swap the catalog. Turns already running keep their snapshot.
    pub async fn replace_catalog(&self, catalog: IntentCatalog) {
        let count = catalog.len();
        *self.catalog.write().await = Arc::new(catalog);
        info!(intents = count, "intent catalog replaced");
    }

    pub async fn create_conversation(&self, title: &str) -> Result<Conversation, SessionError> {
        let title = match title.trim() {
            "" => DEFAULT_TITLE,
            t => t,
        };
        let conversation = Conversation::new(title);
        self.store.create(conversation.clone()).await?;
        debug!(conversation = %conversation.id, "conversation created");
        Ok(conversation)
    }

    /// Conversations, most recently updated first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, SessionError> {
        Ok(self.store.list().await?)
    }

    /// Messages of a conversation, oldest first.
    pub async fn list_messages(&self, id: ConversationId) -> Result<Vec<Message>, SessionError> {
        Ok(self.store.messages(id).await?)
    }

    /// Returns false if the conversation did not exist.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<bool, SessionError> {
        Ok(self.store.delete(id).await?)
    }

    /// Run one turn and return the persisted assistant message.
    pub async fn send_message(&self, id: ConversationId, text: &str) -> Result<Message, SessionError> {
        if self.store.get(id).await?.is_none() {
            return Err(SessionError::NotFound(id));
        }

        self.store.append(Message::user(id, text)).await?;

        let catalog = self.catalog().await;
        let reply = self.orchestrator.respond(text, &catalog).await;

        if reply.metadata.kind == ReplyKind::Intent {
            self.remember_intent(reply.intent().unwrap_or_default(), reply.metadata.parameter.as_deref())
                .await;
        }

        let message = Message::assistant(id, reply);
        self.store.append(message.clone()).await?;
        self.store.touch(id, message.created_at).await?;
        Ok(message)
    }

    async fn remember_intent(&self, intent: &str, parameter: Option<&str>) {
        let Some(memory) = self.orchestrator.memory() else {
            return;
        };

        let mut entries = vec![ContextMemoryEntry::new("last_intent", intent, "intent").with_importance(0.6)];
        if let Some(parameter) = parameter {
            entries.push(ContextMemoryEntry::new("last_parameter", parameter, "intent").with_importance(0.6));
        }
        for entry in entries {
            if let Err(err) = memory.remember(entry).await {
                warn!(error = %err, "could not record context memory");
            }
        }
    }
}
