//! Intent resolution and response synthesis for the OpsDesk operations
//! assistant.
//!
//! This crate provides:
//! - Diacritic-insensitive intent matching over a declarative catalog
//! - Named query dispatch with filters, periods and aggregates
//! - Locale-aware reply rendering per intent
//! - A fallback ladder over knowledge, reasoning, web search and completion
//! - Conversation persistence and context memory
//!
//! # Quick Start
//!
//! ```ignore
//! use opsdesk_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data = StaticDataSource::load_json("data.json").await?;
//!     let orchestrator = Orchestrator::builder(Arc::new(data)).build();
//!     let session = SessionManager::new(
//!         orchestrator,
//!         Arc::new(InMemoryConversationStore::new()),
//!         IntentCatalog::builtin(),
//!     );
//!
//!     let conversation = session.create_conversation("Plantão").await?;
//!     let reply = session.send_message(conversation.id, "estoque baixo").await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

pub mod capabilities;
pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod format;
pub mod id;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod message;
pub mod session;
pub mod similarity;
pub mod store;
pub mod testing;
pub mod text;
pub mod web;

// Primary public API
pub use config::AssistantConfig;
pub use error::{Error, Result};
pub use fallback::{Orchestrator, OrchestratorBuilder};
pub use intent::{Intent, IntentCatalog};
pub use message::{Conversation, Message, MessageMetadata, Reply, Source};
pub use session::{SessionError, SessionManager};

/// Everything needed to wire up and drive an assistant.
pub mod prelude {
    pub use crate::capabilities::{Completion, KnowledgeEntry, KnowledgeStore, Reasoner, WebSearch};
    pub use crate::config::AssistantConfig;
    pub use crate::data::{DataAccess, StaticDataSource};
    pub use crate::fallback::Orchestrator;
    pub use crate::id::ConversationId;
    pub use crate::intent::{Intent, IntentCatalog};
    pub use crate::knowledge::InMemoryKnowledgeBase;
    pub use crate::llm::{ClaudeCompletion, ClaudeReasoner};
    pub use crate::memory::{ContextMemory, InMemoryContextMemory};
    pub use crate::message::{Conversation, Message, Reply, ReplyKind, Source};
    pub use crate::session::{SessionError, SessionManager};
    pub use crate::store::{ConversationStore, InMemoryConversationStore, JsonFileConversationStore};
    pub use crate::web::CachingWebSearch;
}
