//! Context memory: small key/value facts remembered across turns.
//!
//! Entries are append-only. Decay is a storage policy; the in-memory store
//! only caps how many entries it keeps.

use crate::error::CapabilityResult;
use crate::id::MemoryId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMemoryEntry {
    pub id: MemoryId,
    /// Optional user identity; `None` means shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub key: String,
    pub value: String,
    /// Free-form category, e.g. "intent".
    pub context_type: String,
    /// `[0, 1]`
    pub importance: f32,
    pub created_at: DateTime<Utc>,
}

impl ContextMemoryEntry {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        context_type: impl Into<String>,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            user: None,
            key: key.into(),
            value: value.into(),
            context_type: context_type.into(),
            importance: 0.5,
            created_at: Utc::now(),
        }
    }

    pub fn for_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    /// `key: value`
    pub fn as_fact(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

/// Storage for context memory.
#[async_trait]
pub trait ContextMemory: Send + Sync {
    /// Append an entry.
    async fn remember(&self, entry: ContextMemoryEntry) -> CapabilityResult<()>;

    /// Most recent entries visible to `user` (their own plus shared), newest
    /// first.
    async fn recall(&self, user: Option<&str>, limit: usize) -> CapabilityResult<Vec<ContextMemoryEntry>>;
}

/// Default number of entries kept by [`InMemoryContextMemory`].
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// Bounded in-memory context memory. The oldest entries are evicted first.
#[derive(Debug)]
pub struct InMemoryContextMemory {
    entries: RwLock<Vec<ContextMemoryEntry>>,
    capacity: usize,
}

impl Default for InMemoryContextMemory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }
}

impl InMemoryContextMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ContextMemory for InMemoryContextMemory {
    async fn remember(&self, entry: ContextMemoryEntry) -> CapabilityResult<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }
        Ok(())
    }

    async fn recall(&self, user: Option<&str>, limit: usize) -> CapabilityResult<Vec<ContextMemoryEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.user.is_none() || e.user.as_deref() == user)
            .take(limit)
            .cloned()
            .collect())
    }
}
