//! Conversation persistence.
//!
//! Two stores share one in-memory ledger: [`InMemoryConversationStore`] for
//! tests and ephemeral sessions, and [`JsonFileConversationStore`], which
//! rewrites a versioned JSON file after every mutation.

use crate::error::{StoreError, StoreResult};
use crate::id::ConversationId;
use crate::message::{Conversation, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage for conversations and their messages.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Store a new conversation.
    async fn create(&self, conversation: Conversation) -> StoreResult<()>;

    async fn get(&self, id: ConversationId) -> StoreResult<Option<Conversation>>;

    /// All conversations, most recently updated first.
    async fn list(&self) -> StoreResult<Vec<Conversation>>;

    /// Append a message to its conversation.
    async fn append(&self, message: Message) -> StoreResult<()>;

    /// Messages of a conversation in chronological order.
    async fn messages(&self, id: ConversationId) -> StoreResult<Vec<Message>>;

    /// Bump the conversation's `updated_at`.
    async fn touch(&self, id: ConversationId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Remove a conversation and its messages. Returns false if it did not
    /// exist.
    async fn delete(&self, id: ConversationId) -> StoreResult<bool>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Thread {
    conversation: Conversation,
    messages: Vec<Message>,
}

#[derive(Debug, Default)]
struct Ledger {
    threads: HashMap<ConversationId, Thread>,
}

impl Ledger {
    fn thread_mut(&mut self, id: ConversationId) -> StoreResult<&mut Thread> {
        self.threads
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound(id))
    }

    fn create(&mut self, conversation: Conversation) -> StoreResult<()> {
        if self.threads.contains_key(&conversation.id) {
            return Err(StoreError::Backend(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }
        self.threads.insert(
            conversation.id,
            Thread {
                conversation,
                messages: Vec::new(),
            },
        );
        Ok(())
    }

    fn get(&self, id: ConversationId) -> Option<Conversation> {
        self.threads.get(&id).map(|t| t.conversation.clone())
    }

    fn list(&self) -> Vec<Conversation> {
        let mut conversations: Vec<_> = self.threads.values().map(|t| t.conversation.clone()).collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.created_at.cmp(&a.created_at)));
        conversations
    }

    fn append(&mut self, message: Message) -> StoreResult<()> {
        self.thread_mut(message.conversation_id)?.messages.push(message);
        Ok(())
    }

    fn messages(&self, id: ConversationId) -> StoreResult<Vec<Message>> {
        let thread = self.threads.get(&id).ok_or(StoreError::ConversationNotFound(id))?;
        let mut messages = thread.messages.clone();
        // Stable: equal timestamps keep insertion order.
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    fn touch(&mut self, id: ConversationId, at: DateTime<Utc>) -> StoreResult<()> {
        self.thread_mut(id)?.conversation.touch(at);
        Ok(())
    }

    fn delete(&mut self, id: ConversationId) -> bool {
        self.threads.remove(&id).is_some()
    }
}

/// Conversations kept in memory only.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    ledger: RwLock<Ledger>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(&self, conversation: Conversation) -> StoreResult<()> {
        self.ledger.write().await.create(conversation)
    }

    async fn get(&self, id: ConversationId) -> StoreResult<Option<Conversation>> {
        Ok(self.ledger.read().await.get(id))
    }

    async fn list(&self) -> StoreResult<Vec<Conversation>> {
        Ok(self.ledger.read().await.list())
    }

    async fn append(&self, message: Message) -> StoreResult<()> {
        self.ledger.write().await.append(message)
    }

    async fn messages(&self, id: ConversationId) -> StoreResult<Vec<Message>> {
        self.ledger.read().await.messages(id)
    }

    async fn touch(&self, id: ConversationId, at: DateTime<Utc>) -> StoreResult<()> {
        self.ledger.write().await.touch(id, at)
    }

    async fn delete(&self, id: ConversationId) -> StoreResult<bool> {
        Ok(self.ledger.write().await.delete(id))
    }
}

/// Current store file version.
const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    threads: Vec<Thread>,
}

/// Conversations persisted to a single JSON file.
///
/// The whole file is rewritten through a temporary sibling and a rename, so
/// a crash mid-write leaves the previous version intact.
#[derive(Debug)]
pub struct JsonFileConversationStore {
    path: PathBuf,
    ledger: RwLock<Ledger>,
}

impl JsonFileConversationStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut ledger = Ledger::default();

        if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            let file: StoreFile = serde_json::from_str(&content)?;
            if file.version != STORE_VERSION {
                return Err(StoreError::Backend(format!(
                    "store version mismatch: expected {STORE_VERSION}, found {}",
                    file.version
                )));
            }
            for thread in file.threads {
                ledger.threads.insert(thread.conversation.id, thread);
            }
            debug!(path = %path.display(), conversations = ledger.threads.len(), "conversation store loaded");
        }

        Ok(Self {
            path,
            ledger: RwLock::new(ledger),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, ledger: &Ledger) -> StoreResult<()> {
        let mut threads: Vec<Thread> = ledger.threads.values().cloned().collect();
        threads.sort_by_key(|t| t.conversation.created_at);
        let content = serde_json::to_string_pretty(&StoreFile {
            version: STORE_VERSION,
            threads,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for JsonFileConversationStore {
    async fn create(&self, conversation: Conversation) -> StoreResult<()> {
        let mut ledger = self.ledger.write().await;
        ledger.create(conversation)?;
        self.flush(&ledger).await
    }

    async fn get(&self, id: ConversationId) -> StoreResult<Option<Conversation>> {
        Ok(self.ledger.read().await.get(id))
    }

    async fn list(&self) -> StoreResult<Vec<Conversation>> {
        Ok(self.ledger.read().await.list())
    }

    async fn append(&self, message: Message) -> StoreResult<()> {
        let mut ledger = self.ledger.write().await;
        ledger.append(message)?;
        self.flush(&ledger).await
    }

    async fn messages(&self, id: ConversationId) -> StoreResult<Vec<Message>> {
        self.ledger.read().await.messages(id)
    }

    async fn touch(&self, id: ConversationId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut ledger = self.ledger.write().await;
        ledger.touch(id, at)?;
        self.flush(&ledger).await
    }

    async fn delete(&self, id: ConversationId) -> StoreResult<bool> {
        let mut ledger = self.ledger.write().await;
        if !ledger.delete(id) {
            return Ok(false);
        }
        self.flush(&ledger).await?;
        Ok(true)
    }
}
