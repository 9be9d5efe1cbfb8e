//! Fallback ladder stages.
//!
//! Evidence stages (knowledge, reasoning, web) only gather into the
//! [`FallbackContext`]. Synthesis, completion and canned produce replies.

use super::canned::{APOLOGY_TEXT, SUGGESTIONS_TEXT};
use super::{FallbackContext, FallbackStage, StageOutcome};
use crate::capabilities::{
    Completion, CompletionContext, KnowledgeEntry, KnowledgeStore, Reasoner, ReasoningContext,
    SearchLog, WebSearch,
};
use crate::dispatch::QueryDispatcher;
use crate::error::CapabilityResult;
use crate::message::{MessageMetadata, Reply, Source};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Relevance-ranked lookup in the local knowledge store.
pub struct KnowledgeStage {
    store: Option<Arc<dyn KnowledgeStore>>,
}

impl KnowledgeStage {
    pub fn new(store: Option<Arc<dyn KnowledgeStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FallbackStage for KnowledgeStage {
    fn name(&self) -> &'static str {
        "knowledge"
    }

    async fn attempt(&self, query: &str, context: &mut FallbackContext) -> CapabilityResult<StageOutcome> {
        let Some(store) = &self.store else {
            return Ok(StageOutcome::Skipped);
        };

        let settings = context.settings();
        let (limit, min_relevance) = (settings.knowledge_limit, settings.knowledge_min_relevance);

        let hits: Vec<KnowledgeEntry> = store
            .search(query, limit)
            .await?
            .into_iter()
            .filter(|e| e.relevance_score >= min_relevance)
            .collect();

        // Bookkeeping only: the hits stand even if these writes fail.
        let surfaced = hits.first().map(|e| e.id);
        if let Err(err) = store.log_search(SearchLog::new(query, hits.len(), surfaced)).await {
            warn!(error = %err, "could not log knowledge search");
        }
        if let Some(id) = surfaced {
            if let Err(err) = store.record_view(id).await {
                warn!(error = %err, entry = %id, "could not record knowledge view");
            }
        }

        debug!(hits = hits.len(), surfaced = ?surfaced, "knowledge lookup");
        context.knowledge = hits;
        Ok(StageOutcome::Continue)
    }
}

/// Asks the reasoner for an explanation chain.
pub struct ReasoningStage {
    reasoner: Option<Arc<dyn Reasoner>>,
    store: Option<Arc<dyn KnowledgeStore>>,
}

impl ReasoningStage {
    pub fn new(reasoner: Option<Arc<dyn Reasoner>>, store: Option<Arc<dyn KnowledgeStore>>) -> Self {
        Self { reasoner, store }
    }
}

#[async_trait]
impl FallbackStage for ReasoningStage {
    fn name(&self) -> &'static str {
        "reasoning"
    }

    async fn attempt(&self, query: &str, context: &mut FallbackContext) -> CapabilityResult<StageOutcome> {
        let Some(reasoner) = &self.reasoner else {
            return Ok(StageOutcome::Skipped);
        };

        let reasoning_context = ReasoningContext {
            knowledge: context.knowledge.iter().map(|e| e.title.clone()).collect(),
            facts: context.facts.clone(),
        };
        let chain = reasoner.reason(query, &reasoning_context).await?;
        debug!(steps = chain.steps.len(), confidence = chain.confidence, "reasoning chain received");

        if let Some(store) = &self.store {
            if let Err(err) = store.log_reasoning(query, &chain).await {
                warn!(error = %err, "could not log reasoning chain");
            }
        }

        context.reasoning = Some(chain);
        Ok(StageOutcome::Continue)
    }
}

/// Web search, gated by trigger words. Fresh results are cached as
/// knowledge entries.
pub struct WebStage {
    web: Option<Arc<dyn WebSearch>>,
    store: Option<Arc<dyn KnowledgeStore>>,
}

impl WebStage {
    pub fn new(web: Option<Arc<dyn WebSearch>>, store: Option<Arc<dyn KnowledgeStore>>) -> Self {
        Self { web, store }
    }
}

#[async_trait]
impl FallbackStage for WebStage {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn attempt(&self, query: &str, context: &mut FallbackContext) -> CapabilityResult<StageOutcome> {
        let (Some(web), Some(topic)) = (&self.web, context.web_topic) else {
            return Ok(StageOutcome::Skipped);
        };

        let results = web.search(query, topic, context.settings().web_max_results).await?;
        debug!(topic, results = results.len(), "web search");

        if let Some(store) = &self.store {
            for result in results.iter().filter(|r| !r.cached) {
                if let Err(err) = store.save(KnowledgeEntry::from_web(query, topic, result)).await {
                    warn!(error = %err, url = %result.url, "could not cache web result");
                }
            }
        }

        context.web = results;
        Ok(StageOutcome::Continue)
    }
}

/// Composes a reply from the gathered evidence.
///
/// Local knowledge wins over web results, which win over a reasoning
/// conclusion. A conclusion alone answers only when its chain is confident
/// enough.
pub struct SynthesisStage;

impl SynthesisStage {
    fn compose(context: &FallbackContext) -> Option<(Source, String)> {
        if let Some(top) = context.knowledge.first() {
            let mut text = format!("📚 {}\n{}", top.title, top.body);
            let related: Vec<&str> = context.knowledge[1..].iter().map(|e| e.title.as_str()).collect();
            if !related.is_empty() {
                text.push_str(&format!("\n\nVeja também: {}", related.join(", ")));
            }
            if !context.web.is_empty() {
                text.push_str("\n\n🌐 Fontes na web:");
                for result in &context.web {
                    text.push_str(&format!("\n• {} ({})", result.title, result.domain));
                }
            }
            return Some((Source::KnowledgeBase, text));
        }

        if !context.web.is_empty() {
            let mut text = String::from("🌐 Encontrei isto na web:");
            for result in &context.web {
                text.push_str(&format!("\n• {}: {} ({})", result.title, result.summary, result.domain));
            }
            return Some((Source::Web, text));
        }

        let chain = context.reasoning.as_ref()?;
        if chain.confidence < context.settings().reasoning_answer_confidence {
            return None;
        }
        chain.conclusion().map(|c| (Source::Reasoning, format!("🧠 {c}")))
    }
}

#[async_trait]
impl FallbackStage for SynthesisStage {
    fn name(&self) -> &'static str {
        "synthesis"
    }

    async fn attempt(&self, _query: &str, context: &mut FallbackContext) -> CapabilityResult<StageOutcome> {
        match Self::compose(context) {
            Some((source, text)) => Ok(StageOutcome::Answer(context.reply(source, text))),
            None if context.reasoning.is_none() => Ok(StageOutcome::Skipped),
            None => Ok(StageOutcome::Continue),
        }
    }
}

/// Generic AI completion grounded on a business snapshot.
pub struct CompletionStage {
    completion: Option<Arc<dyn Completion>>,
    dispatcher: QueryDispatcher,
}

impl CompletionStage {
    pub fn new(completion: Option<Arc<dyn Completion>>, dispatcher: QueryDispatcher) -> Self {
        Self {
            completion,
            dispatcher,
        }
    }
}

#[async_trait]
impl FallbackStage for CompletionStage {
    fn name(&self) -> &'static str {
        "completion"
    }

    async fn attempt(&self, query: &str, context: &mut FallbackContext) -> CapabilityResult<StageOutcome> {
        let Some(completion) = &self.completion else {
            return Ok(StageOutcome::Skipped);
        };

        let grounding = CompletionContext {
            snapshot: self.dispatcher.business_snapshot().await,
            facts: context.facts.clone(),
        };
        let text = completion.complete(query, &grounding).await?;
        Ok(StageOutcome::Answer(context.reply(Source::Ai, format!("🤖 {text}"))))
    }
}

/// Always answers: suggestions, or an apology if every attempted stage
/// failed.
pub struct CannedStage;

#[async_trait]
impl FallbackStage for CannedStage {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn attempt(&self, _query: &str, context: &mut FallbackContext) -> CapabilityResult<StageOutcome> {
        let text = if context.all_attempts_failed() {
            APOLOGY_TEXT
        } else {
            SUGGESTIONS_TEXT
        };
        Ok(StageOutcome::Answer(Reply::new(text, MessageMetadata::fallback(Source::None))))
    }
}
