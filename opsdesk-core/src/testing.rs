//! Testing utilities for the assistant engine.
//!
//! This module provides tools for integration testing:
//! - `RecordingDataSource` and `FailingDataSource` for the data layer
//! - scripted, failing and slow capability mocks
//! - `TestHarness` for running whole conversations without network access

use crate::capabilities::{
    Completion, CompletionContext, KnowledgeEntry, KnowledgeStore, Reasoner, ReasoningChain,
    ReasoningContext, ReasoningStep, SearchLog, WebResult, WebSearch,
};
use crate::config::AssistantConfig;
use crate::data::{DataAccess, Params, Row};
use crate::error::{CapabilityError, CapabilityResult, DataError, DataResult};
use crate::fallback::Orchestrator;
use crate::id::{ConversationId, KnowledgeId};
use crate::intent::IntentCatalog;
use crate::knowledge::InMemoryKnowledgeBase;
use crate::memory::InMemoryContextMemory;
use crate::message::Message;
use crate::session::{SessionError, SessionManager};
use crate::store::InMemoryConversationStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A data source that records every call and returns its tables unfiltered.
///
/// Unknown operations answer with no rows.
#[derive(Debug, Default)]
pub struct RecordingDataSource {
    tables: HashMap<String, Vec<Row>>,
    calls: Mutex<Vec<(String, Params)>>,
}

impl RecordingDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rows for an operation. Values that are not JSON objects are
    /// ignored.
    pub fn with_rows(mut self, operation: impl Into<String>, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.tables.insert(operation.into(), rows);
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Operation names received so far, in order.
    pub fn operations_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|(op, _)| op).collect()
    }
}

#[async_trait]
impl DataAccess for RecordingDataSource {
    async fn execute(&self, operation: &str, params: &Params) -> DataResult<Vec<Row>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((operation.to_string(), params.clone()));
        }
        Ok(self.tables.get(operation).cloned().unwrap_or_default())
    }
}

/// A data source whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDataSource;

#[async_trait]
impl DataAccess for FailingDataSource {
    async fn execute(&self, operation: &str, _params: &Params) -> DataResult<Vec<Row>> {
        Err(DataError::Unavailable(format!("scripted failure for {operation}")))
    }
}

/// A reasoner that always returns the same chain.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    chain: ReasoningChain,
    calls: AtomicUsize,
}

impl ScriptedReasoner {
    pub fn new(chain: ReasoningChain) -> Self {
        Self {
            chain,
            calls: AtomicUsize::new(0),
        }
    }

    /// A two-step chain ending in `conclusion`.
    pub fn concluding(conclusion: impl Into<String>, confidence: f32) -> Self {
        Self::new(ReasoningChain {
            steps: vec![
                ReasoningStep {
                    index: 1,
                    action: "analisar".to_string(),
                    description: "entender a pergunta".to_string(),
                    result: None,
                    sources: Vec::new(),
                },
                ReasoningStep {
                    index: 2,
                    action: "concluir".to_string(),
                    description: "responder com base no contexto".to_string(),
                    result: Some(conclusion.into()),
                    sources: Vec::new(),
                },
            ],
            confidence,
            elapsed_ms: 1,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn reason(&self, _query: &str, _context: &ReasoningContext) -> CapabilityResult<ReasoningChain> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.chain.clone())
    }
}

/// A web search that always returns the same results.
#[derive(Debug, Default)]
pub struct ScriptedWebSearch {
    results: Vec<WebResult>,
    queries: Mutex<Vec<(String, String)>>,
}

impl ScriptedWebSearch {
    pub fn new(results: Vec<WebResult>) -> Self {
        Self {
            results,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A search that finds nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single live result.
    pub fn result(title: &str, summary: &str, domain: &str, trust: f32) -> WebResult {
        WebResult {
            title: title.to_string(),
            summary: summary.to_string(),
            url: format!("https://{domain}/{}", title.to_lowercase().replace(' ', "-")),
            domain: domain.to_string(),
            trust_score: trust,
            cached: false,
        }
    }

    /// `(query, topic)` pairs searched so far.
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl WebSearch for ScriptedWebSearch {
    async fn search(&self, query: &str, topic: &str, max_results: usize) -> CapabilityResult<Vec<WebResult>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push((query.to_string(), topic.to_string()));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

/// A completion that always answers with the same text.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    text: String,
    prompts: Mutex<Vec<(String, CompletionContext)>>,
}

impl ScriptedCompletion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far with their grounding.
    pub fn prompts(&self) -> Vec<(String, CompletionContext)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, prompt: &str, context: &CompletionContext) -> CapabilityResult<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.to_string(), context.clone()));
        }
        Ok(self.text.clone())
    }
}

/// Fails every capability call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCapability;

impl FailingCapability {
    fn error(capability: &str) -> CapabilityError {
        CapabilityError::failed(capability, "scripted failure")
    }
}

#[async_trait]
impl Reasoner for FailingCapability {
    async fn reason(&self, _query: &str, _context: &ReasoningContext) -> CapabilityResult<ReasoningChain> {
        Err(Self::error("reasoning"))
    }
}

#[async_trait]
impl WebSearch for FailingCapability {
    async fn search(&self, _query: &str, _topic: &str, _max: usize) -> CapabilityResult<Vec<WebResult>> {
        Err(Self::error("web"))
    }
}

#[async_trait]
impl Completion for FailingCapability {
    async fn complete(&self, _prompt: &str, _context: &CompletionContext) -> CapabilityResult<String> {
        Err(Self::error("completion"))
    }
}

#[async_trait]
impl KnowledgeStore for FailingCapability {
    async fn search(&self, _query: &str, _limit: usize) -> CapabilityResult<Vec<KnowledgeEntry>> {
        Err(Self::error("knowledge"))
    }

    async fn record_view(&self, _id: KnowledgeId) -> CapabilityResult<()> {
        Err(Self::error("knowledge"))
    }

    async fn log_search(&self, _log: SearchLog) -> CapabilityResult<()> {
        Err(Self::error("knowledge"))
    }

    async fn log_reasoning(&self, _query: &str, _chain: &ReasoningChain) -> CapabilityResult<()> {
        Err(Self::error("knowledge"))
    }

    async fn save(&self, _entry: KnowledgeEntry) -> CapabilityResult<KnowledgeId> {
        Err(Self::error("knowledge"))
    }
}

/// Answers searches from an inner knowledge base but rejects every write.
#[derive(Debug, Clone)]
pub struct ReadOnlyKnowledge {
    inner: Arc<InMemoryKnowledgeBase>,
}

impl ReadOnlyKnowledge {
    pub fn new(inner: Arc<InMemoryKnowledgeBase>) -> Self {
        Self { inner }
    }

    fn rejected() -> CapabilityError {
        CapabilityError::unavailable("knowledge", "store is read-only")
    }
}

#[async_trait]
impl KnowledgeStore for ReadOnlyKnowledge {
    async fn search(&self, query: &str, limit: usize) -> CapabilityResult<Vec<KnowledgeEntry>> {
        self.inner.search(query, limit).await
    }

    async fn record_view(&self, _id: KnowledgeId) -> CapabilityResult<()> {
        Err(Self::rejected())
    }

    async fn log_search(&self, _log: SearchLog) -> CapabilityResult<()> {
        Err(Self::rejected())
    }

    async fn log_reasoning(&self, _query: &str, _chain: &ReasoningChain) -> CapabilityResult<()> {
        Err(Self::rejected())
    }

    async fn save(&self, _entry: KnowledgeEntry) -> CapabilityResult<KnowledgeId> {
        Err(Self::rejected())
    }
}

/// A completion that answers only after `delay`, for timeout tests.
#[derive(Debug, Clone, Copy)]
pub struct SlowCompletion {
    pub delay: Duration,
}

#[async_trait]
impl Completion for SlowCompletion {
    async fn complete(&self, _prompt: &str, _context: &CompletionContext) -> CapabilityResult<String> {
        tokio::time::sleep(self.delay).await;
        Ok("resposta atrasada".to_string())
    }
}

/// Builder for [`TestHarness`].
pub struct HarnessBuilder {
    data: RecordingDataSource,
    knowledge: Vec<KnowledgeEntry>,
    failing_knowledge: bool,
    read_only_knowledge: bool,
    reasoner: Option<Arc<dyn Reasoner>>,
    web: Option<Arc<dyn WebSearch>>,
    completion: Option<Arc<dyn Completion>>,
    config: AssistantConfig,
    catalog: IntentCatalog,
    today: Option<NaiveDate>,
}

impl HarnessBuilder {
    pub fn data(mut self, data: RecordingDataSource) -> Self {
        self.data = data;
        self
    }

    pub fn knowledge(mut self, entries: Vec<KnowledgeEntry>) -> Self {
        self.knowledge = entries;
        self
    }

    /// Use a knowledge store whose every call fails.
    pub fn failing_knowledge(mut self) -> Self {
        self.failing_knowledge = true;
        self
    }

    /// Searches succeed but logs, views and saves fail.
    pub fn read_only_knowledge(mut self) -> Self {
        self.read_only_knowledge = true;
        self
    }

    pub fn reasoner(mut self, reasoner: Arc<dyn Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn web(mut self, web: Arc<dyn WebSearch>) -> Self {
        self.web = Some(web);
        self
    }

    pub fn completion(mut self, completion: Arc<dyn Completion>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: IntentCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Assemble the session and open one conversation.
    pub async fn build(self) -> Result<TestHarness, SessionError> {
        let data = Arc::new(self.data);
        let knowledge = Arc::new(InMemoryKnowledgeBase::with_entries(self.knowledge));
        let memory = Arc::new(InMemoryContextMemory::new());

        let knowledge_store: Arc<dyn KnowledgeStore> = if self.failing_knowledge {
            Arc::new(FailingCapability)
        } else if self.read_only_knowledge {
            Arc::new(ReadOnlyKnowledge::new(knowledge.clone()))
        } else {
            knowledge.clone()
        };

        let mut builder = Orchestrator::builder(data.clone())
            .config(self.config)
            .knowledge(knowledge_store)
            .memory(memory.clone());
        if let Some(reasoner) = self.reasoner {
            builder = builder.reasoner(reasoner);
        }
        if let Some(web) = self.web {
            builder = builder.web(web);
        }
        if let Some(completion) = self.completion {
            builder = builder.completion(completion);
        }
        if let Some(today) = self.today {
            builder = builder.today(today);
        }

        let session = SessionManager::new(
            builder.build(),
            Arc::new(InMemoryConversationStore::new()),
            self.catalog,
        );
        let conversation = session.create_conversation("Teste").await?.id;

        Ok(TestHarness {
            session,
            conversation,
            data,
            knowledge,
            memory,
        })
    }
}

/// A session manager wired to mocks, with one open conversation.
pub struct TestHarness {
    pub session: SessionManager,
    pub conversation: ConversationId,
    pub data: Arc<RecordingDataSource>,
    pub knowledge: Arc<InMemoryKnowledgeBase>,
    pub memory: Arc<InMemoryContextMemory>,
}

impl TestHarness {
    /// Start configuring a harness. Defaults: built-in catalog, empty data,
    /// empty knowledge base, no reasoner, web search or completion.
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            data: RecordingDataSource::new(),
            knowledge: Vec::new(),
            failing_knowledge: false,
            read_only_knowledge: false,
            reasoner: None,
            web: None,
            completion: None,
            config: AssistantConfig::default(),
            catalog: IntentCatalog::builtin(),
            today: None,
        }
    }

    /// Send a line in the harness conversation.
    pub async fn say(&self, text: &str) -> Result<Message, SessionError> {
        self.session.send_message(self.conversation, text).await
    }

    /// Messages of the harness conversation.
    pub async fn history(&self) -> Result<Vec<Message>, SessionError> {
        self.session.list_messages(self.conversation).await
    }
}
