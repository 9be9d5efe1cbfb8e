//! External capabilities consumed by the fallback ladder.
//!
//! Each capability is a single request/response call. Implementations
//! handle their own transport concerns; the engine only sees a
//! [`CapabilityResult`] and moves on to the next stage on any error.

use crate::dispatch::BusinessSnapshot;
use crate::error::CapabilityResult;
use crate::id::KnowledgeId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached answer, authored locally or harvested from the web.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: KnowledgeId,
    pub topic: String,
    /// Query the entry was created for.
    pub query: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<String>,
    /// How far the source can be trusted, `[0, 1]`.
    #[serde(default = "default_trust")]
    pub trust_score: f32,
    /// Match quality for the current lookup, `[0, 1]`. Set by the store.
    #[serde(default)]
    pub relevance_score: f32,
    /// True if the entry was harvested from a web search.
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub views: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_trust() -> f32 {
    0.5
}

impl KnowledgeEntry {
    /// A locally authored entry.
    pub fn new(topic: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: KnowledgeId::new(),
            topic: topic.into(),
            query: title.clone(),
            title,
            body: body.into(),
            source_url: None,
            source_domain: None,
            trust_score: 1.0,
            relevance_score: 0.0,
            cached: false,
            views: 0,
            created_at: Utc::now(),
        }
    }

    /// Set the trust score, clamped to `[0, 1]`.
    pub fn with_trust(mut self, trust: f32) -> Self {
        self.trust_score = trust.clamp(0.0, 1.0);
        self
    }

    /// Set the source of the entry.
    pub fn with_source(mut self, url: impl Into<String>, domain: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self.source_domain = Some(domain.into());
        self
    }

    /// Cache a web result under the query that produced it.
    pub fn from_web(query: &str, topic: &str, result: &WebResult) -> Self {
        Self {
            id: KnowledgeId::new(),
            topic: topic.to_string(),
            query: query.to_string(),
            title: result.title.clone(),
            body: result.summary.clone(),
            source_url: Some(result.url.clone()),
            source_domain: Some(result.domain.clone()),
            trust_score: result.trust_score.clamp(0.0, 1.0),
            relevance_score: 0.0,
            cached: true,
            views: 0,
            created_at: Utc::now(),
        }
    }
}

/// One knowledge lookup, kept for quality analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLog {
    pub query: String,
    pub result_count: usize,
    pub surfaced: Option<KnowledgeId>,
    pub at: DateTime<Utc>,
}

impl SearchLog {
    pub fn new(query: impl Into<String>, result_count: usize, surfaced: Option<KnowledgeId>) -> Self {
        Self {
            query: query.into(),
            result_count,
            surfaced,
            at: Utc::now(),
        }
    }
}

/// Relevance-ranked answer cache.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Entries ranked by relevance to `query`, best first, with
    /// `relevance_score` filled in.
    async fn search(&self, query: &str, limit: usize) -> CapabilityResult<Vec<KnowledgeEntry>>;

    /// Increment the view counter of a surfaced entry.
    async fn record_view(&self, id: KnowledgeId) -> CapabilityResult<()>;

    /// Append a search log.
    async fn log_search(&self, log: SearchLog) -> CapabilityResult<()>;

    /// Append a reasoning chain produced for `query`.
    async fn log_reasoning(&self, query: &str, chain: &ReasoningChain) -> CapabilityResult<()>;

    /// Store a new entry.
    async fn save(&self, entry: KnowledgeEntry) -> CapabilityResult<KnowledgeId>;
}

/// One step of a reasoning chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub index: usize,
    /// Short label such as "analisar" or "concluir".
    pub action: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// An externally generated explanation trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    pub steps: Vec<ReasoningStep>,
    /// `[0, 1]`
    pub confidence: f32,
    pub elapsed_ms: u64,
}

impl ReasoningChain {
    /// Result of the last step that has one.
    pub fn conclusion(&self) -> Option<&str> {
        self.steps
            .iter()
            .rev()
            .find_map(|s| s.result.as_deref())
            .filter(|r| !r.trim().is_empty())
    }

    /// One line per step, e.g. `1. analisar: ...`.
    pub fn trace(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{}. {}: {}", s.index, s.action, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What the reasoner may look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningContext {
    /// Titles of knowledge entries found for the query.
    pub knowledge: Vec<String>,
    /// Recent context memory facts, `key: value`.
    pub facts: Vec<String>,
}

/// Produces reasoning chains.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, query: &str, context: &ReasoningContext) -> CapabilityResult<ReasoningChain>;
}

/// A web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub domain: String,
    /// `[0, 1]`
    pub trust_score: f32,
    /// True if served from a cache rather than a live search.
    #[serde(default)]
    pub cached: bool,
}

/// Web search.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, topic: &str, max_results: usize) -> CapabilityResult<Vec<WebResult>>;
}

/// Grounding for the generic completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionContext {
    pub snapshot: BusinessSnapshot,
    /// Recent context memory facts, `key: value`.
    pub facts: Vec<String>,
}

/// Generic text completion, the last resort before canned suggestions.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, context: &CompletionContext) -> CapabilityResult<String>;
}
