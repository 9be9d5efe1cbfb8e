//! Turn orchestration.
//!
//! Each utterance goes through greeting and help checks, then intent
//! matching. A hit is dispatched and formatted. Anything else walks the
//! fallback ladder:
//!
//! ```text
//! knowledge -> reasoning -> web -> synthesis -> completion -> canned
//! ```
//!
//! Every stage runs under a timeout. A failed or timed-out stage is recorded
//! and the ladder moves on, so a turn always ends in a reply.

pub mod canned;
mod stages;

pub use stages::{
    CannedStage, CompletionStage, KnowledgeStage, ReasoningStage, SynthesisStage, WebStage,
};

use crate::capabilities::{
    Completion, KnowledgeEntry, KnowledgeStore, Reasoner, ReasoningChain, WebResult, WebSearch,
};
use crate::config::{AssistantConfig, FallbackConfig};
use crate::data::DataAccess;
use crate::dispatch::QueryDispatcher;
use crate::error::CapabilityResult;
use crate::format::ResponseFormatter;
use crate::intent::{extract_parameter, IntentCatalog, IntentMatcher};
use crate::memory::ContextMemory;
use crate::message::{MessageMetadata, Reply, ReplyKind, Source, StageAttempt, StageStatus};
use crate::text::normalize;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one stage.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// The stage produced the final reply.
    Answer(Reply),
    /// Evidence (if any) was gathered; go on.
    Continue,
    /// The stage had nothing to do (capability absent or not triggered).
    Skipped,
}

/// One rung of the fallback ladder.
#[async_trait]
pub trait FallbackStage: Send + Sync {
    /// Short stable name, used in audit records and logs.
    fn name(&self) -> &'static str;

    /// Try to handle `query`. Errors are recorded and the ladder moves on.
    async fn attempt(&self, query: &str, context: &mut FallbackContext) -> CapabilityResult<StageOutcome>;
}

/// Evidence accumulated while walking the ladder.
#[derive(Debug, Clone)]
pub struct FallbackContext {
    /// Knowledge entries above the relevance floor, best first.
    pub knowledge: Vec<KnowledgeEntry>,
    pub reasoning: Option<ReasoningChain>,
    pub web: Vec<WebResult>,
    /// Topic of the web trigger present in the query, if any.
    pub web_topic: Option<&'static str>,
    /// Recent context memory facts.
    pub facts: Vec<String>,
    /// Stages run so far.
    pub attempts: Vec<StageAttempt>,
    settings: FallbackConfig,
}

impl FallbackContext {
    pub fn new(query: &str, settings: FallbackConfig) -> Self {
        Self {
            knowledge: Vec::new(),
            reasoning: None,
            web: Vec::new(),
            web_topic: canned::web_topic(&normalize(query)),
            facts: Vec::new(),
            attempts: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &FallbackConfig {
        &self.settings
    }

    /// Reasoning confidence, plus a bonus for local knowledge, plus the
    /// weighted mean web trust. Capped at 1.
    pub fn confidence(&self) -> f32 {
        let reasoning = self.reasoning.as_ref().map_or(0.0, |c| c.confidence);
        let knowledge = if self.knowledge.is_empty() {
            0.0
        } else {
            self.settings.knowledge_bonus
        };
        let web = if self.web.is_empty() {
            0.0
        } else {
            let mean = self.web.iter().map(|r| r.trust_score).sum::<f32>() / self.web.len() as f32;
            mean * self.settings.web_trust_weight
        };
        (reasoning + knowledge + web).min(1.0)
    }

    /// True if at least one stage was attempted and every attempt failed
    /// or timed out.
    pub fn all_attempts_failed(&self) -> bool {
        let mut attempted = self
            .attempts
            .iter()
            .filter(|a| a.status != StageStatus::Skipped)
            .peekable();
        attempted.peek().is_some()
            && attempted.all(|a| matches!(a.status, StageStatus::Failed | StageStatus::TimedOut))
    }

    /// A fallback reply carrying the evidence gathered so far.
    pub fn reply(&self, source: Source, text: String) -> Reply {
        let confidence = self.confidence();
        let mut metadata = MessageMetadata::fallback(source);
        metadata.confidence = confidence;
        metadata.verified = confidence > self.settings.verified_threshold;
        metadata.web_sources = self.web.iter().map(|r| r.url.clone()).collect();
        metadata.knowledge_entry = self.knowledge.first().map(|e| e.id);

        let mut text = text;
        if let Some(chain) = self.reasoning.as_ref().filter(|c| !c.steps.is_empty()) {
            let trace = chain.trace();
            if self.settings.show_reasoning_trace {
                text.push_str(&format!("\n\n🧠 Raciocínio:\n{trace}"));
            }
            metadata.reasoning = Some(trace);
        }
        Reply::new(text, metadata)
    }
}

/// Turns one utterance into one reply.
pub struct Orchestrator {
    matcher: IntentMatcher,
    dispatcher: QueryDispatcher,
    formatter: ResponseFormatter,
    stages: Vec<Box<dyn FallbackStage>>,
    settings: FallbackConfig,
    memory: Option<Arc<dyn ContextMemory>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("matcher", &self.matcher)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder(data: Arc<dyn DataAccess>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(data)
    }

    pub fn dispatcher(&self) -> &QueryDispatcher {
        &self.dispatcher
    }

    pub fn formatter(&self) -> &ResponseFormatter {
        &self.formatter
    }

    pub fn memory(&self) -> Option<&Arc<dyn ContextMemory>> {
        self.memory.as_ref()
    }

    /// Ladder stage names in run order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Produce the reply for `utterance` against a catalog snapshot.
    pub async fn respond(&self, utterance: &str, catalog: &IntentCatalog) -> Reply {
        let normalized = normalize(utterance);

        if canned::is_greeting(&normalized) {
            info!(kind = "greeting", "turn answered");
            return Reply::new(canned::pick_greeting(), MessageMetadata::canned(ReplyKind::Greeting));
        }

        if canned::is_help(&normalized) {
            info!(kind = "help", "turn answered");
            return Reply::new(canned::HELP_TEXT, MessageMetadata::canned(ReplyKind::Help));
        }

        if normalized.is_empty() {
            info!(kind = "fallback", source = %Source::None, "empty utterance");
            return Reply::new(canned::SUGGESTIONS_TEXT, MessageMetadata::fallback(Source::None));
        }

        if let Some(hit) = self.matcher.match_intent(utterance, catalog) {
            let parameter = extract_parameter(utterance, hit.intent);
            let rows = self.dispatcher.dispatch(hit.intent.query_key(), &parameter).await;
            let formatted = self.formatter.format_intent(hit.intent, rows);

            info!(
                kind = "intent",
                intent = %hit.intent.name,
                rule = ?hit.rule,
                keyword = hit.keyword,
                parameter = %parameter,
                rows = formatted.metadata.row_count,
                "turn answered"
            );
            let metadata = MessageMetadata::intent(&hit.intent.name, hit.rule, parameter, formatted.metadata.rows);
            return Reply::new(formatted.text, metadata);
        }

        self.fallback(utterance).await
    }

    async fn fallback(&self, query: &str) -> Reply {
        let mut context = FallbackContext::new(query, self.settings.clone());
        context.facts = self.recall_facts().await;
        let timeout = self.settings.stage_timeout();

        let mut answer = None;
        for stage in &self.stages {
            let name = stage.name();
            let status = match tokio::time::timeout(timeout, stage.attempt(query, &mut context)).await {
                Ok(Ok(StageOutcome::Answer(reply))) => {
                    answer = Some(reply);
                    StageStatus::Answered
                }
                Ok(Ok(StageOutcome::Continue)) => StageStatus::Continued,
                Ok(Ok(StageOutcome::Skipped)) => StageStatus::Skipped,
                Ok(Err(err)) => {
                    warn!(stage = name, error = %err, "fallback stage failed");
                    StageStatus::Failed
                }
                Err(_) => {
                    warn!(stage = name, timeout = ?timeout, "fallback stage timed out");
                    StageStatus::TimedOut
                }
            };
            debug!(stage = name, status = ?status, "fallback stage finished");
            context.attempts.push(StageAttempt {
                stage: name.to_string(),
                status,
            });
            if answer.is_some() {
                break;
            }
        }

        let mut reply = answer.unwrap_or_else(|| {
            let text = if context.all_attempts_failed() {
                canned::APOLOGY_TEXT
            } else {
                canned::SUGGESTIONS_TEXT
            };
            Reply::new(text, MessageMetadata::fallback(Source::None))
        });
        reply.metadata.stages = context.attempts;

        info!(
            kind = "fallback",
            source = %reply.source().unwrap_or(Source::None),
            confidence = reply.metadata.confidence,
            verified = reply.metadata.verified,
            "turn answered"
        );
        reply
    }

    async fn recall_facts(&self) -> Vec<String> {
        let Some(memory) = &self.memory else {
            return Vec::new();
        };
        match memory.recall(None, self.settings.memory_facts).await {
            Ok(entries) => entries.iter().map(|e| e.as_fact()).collect(),
            Err(err) => {
                warn!(error = %err, "context memory unavailable");
                Vec::new()
            }
        }
    }
}

/// Assembles an [`Orchestrator`]. Capabilities left unset make their stage
/// a no-op.
pub struct OrchestratorBuilder {
    data: Arc<dyn DataAccess>,
    config: AssistantConfig,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
    reasoner: Option<Arc<dyn Reasoner>>,
    web: Option<Arc<dyn WebSearch>>,
    completion: Option<Arc<dyn Completion>>,
    memory: Option<Arc<dyn ContextMemory>>,
    today: Option<NaiveDate>,
}

impl OrchestratorBuilder {
    pub fn new(data: Arc<dyn DataAccess>) -> Self {
        Self {
            data,
            config: AssistantConfig::default(),
            knowledge: None,
            reasoner: None,
            web: None,
            completion: None,
            memory: None,
            today: None,
        }
    }

    pub fn config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    pub fn knowledge(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(store);
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

    pub fn memory(mut self, memory: Arc<dyn ContextMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Pin the reference day used by date-bounded queries.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn build(self) -> Orchestrator {
        let mut dispatcher = QueryDispatcher::new(self.data);
        if let Some(today) = self.today {
            dispatcher = dispatcher.with_today(today);
        }

        let stages: Vec<Box<dyn FallbackStage>> = vec![
            Box::new(KnowledgeStage::new(self.knowledge.clone())),
            Box::new(ReasoningStage::new(self.reasoner, self.knowledge.clone())),
            Box::new(WebStage::new(self.web, self.knowledge)),
            Box::new(SynthesisStage),
            Box::new(CompletionStage::new(self.completion, dispatcher.clone())),
            Box::new(CannedStage),
        ];

        Orchestrator {
            matcher: IntentMatcher::new(
                self.config.matching.scorer(),
                self.config.matching.similarity_threshold,
            ),
            dispatcher,
            formatter: ResponseFormatter::new(self.config.locale.clone()),
            stages,
            settings: self.config.fallback,
            memory: self.memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ReasoningStep;

    fn web(trust: f32) -> WebResult {
        WebResult {
            title: "t".into(),
            summary: "s".into(),
            url: "https://t.example".into(),
            domain: "t.example".into(),
            trust_score: trust,
            cached: false,
        }
    }

    #[test]
    fn test_confidence_formula() {
        let mut ctx = FallbackContext::new("clima hoje", FallbackConfig::default());
        assert_eq!(ctx.confidence(), 0.0);
        assert_eq!(ctx.web_topic, Some("clima"));

        ctx.knowledge.push(KnowledgeEntry::new("x", "y", "z"));
        assert!((ctx.confidence() - 0.15).abs() < 1e-6);

        ctx.web = vec![web(0.6), web(1.0)];
        assert!((ctx.confidence() - (0.15 + 0.8 * 0.15)).abs() < 1e-6);

        ctx.reasoning = Some(ReasoningChain {
            steps: Vec::new(),
            confidence: 0.95,
            elapsed_ms: 0,
        });
        assert_eq!(ctx.confidence(), 1.0);
    }

    #[test]
    fn test_reply_carries_trace_and_verification() {
        let mut ctx = FallbackContext::new("pergunta", FallbackConfig::default());
        ctx.reasoning = Some(ReasoningChain {
            steps: vec![ReasoningStep {
                index: 1,
                action: "analisar".into(),
                description: "ler contrato".into(),
                result: Some("30 dias".into()),
                sources: Vec::new(),
            }],
            confidence: 0.9,
            elapsed_ms: 1,
        });
        let reply = ctx.reply(Source::Reasoning, "🧠 30 dias".into());
        assert!(reply.metadata.verified);
        assert!(reply.text.ends_with("1. analisar: ler contrato"));
        assert_eq!(reply.metadata.reasoning.as_deref(), Some("1. analisar: ler contrato"));

        let quiet = FallbackConfig {
            show_reasoning_trace: false,
            ..FallbackConfig::default()
        };
        let mut ctx = FallbackContext { settings: quiet, ..ctx };
        ctx.reasoning.as_mut().unwrap().confidence = 0.8;
        let reply = ctx.reply(Source::Reasoning, "🧠 30 dias".into());
        assert_eq!(reply.text, "🧠 30 dias");
        // strictly greater than the threshold
        assert!(!reply.metadata.verified);
    }

    #[test]
    fn test_all_attempts_failed_ignores_skips() {
        let mut ctx = FallbackContext::new("x", FallbackConfig::default());
        assert!(!ctx.all_attempts_failed());
        ctx.attempts.push(StageAttempt {
            stage: "web".into(),
            status: StageStatus::Skipped,
        });
        assert!(!ctx.all_attempts_failed());
        ctx.attempts.push(StageAttempt {
            stage: "knowledge".into(),
            status: StageStatus::Failed,
        });
        assert!(ctx.all_attempts_failed());
        ctx.attempts.push(StageAttempt {
            stage: "synthesis".into(),
            status: StageStatus::Continued,
        });
        assert!(!ctx.all_attempts_failed());
    }
}
