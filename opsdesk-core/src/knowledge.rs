//! In-memory knowledge base.

use crate::capabilities::{KnowledgeEntry, KnowledgeStore, ReasoningChain, SearchLog};
use crate::error::{CapabilityError, CapabilityResult, ConfigError, ConfigResult};
use crate::id::KnowledgeId;
use crate::similarity::SimilarityScorer;
use crate::text::tokenize;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use tokio::sync::RwLock;

/// Default number of search and reasoning logs kept, each.
pub const DEFAULT_LOG_CAPACITY: usize = 1_000;

/// Similarity-ranked knowledge store kept in memory.
///
/// Relevance is the best similarity between the query and the entry's
/// title, original query or topic. Search and reasoning logs keep only the
/// most recent `log_capacity` records.
#[derive(Debug)]
pub struct InMemoryKnowledgeBase {
    entries: RwLock<Vec<KnowledgeEntry>>,
    searches: RwLock<VecDeque<SearchLog>>,
    reasoning: RwLock<VecDeque<(String, ReasoningChain)>>,
    log_capacity: usize,
    scorer: SimilarityScorer,
}

impl Default for InMemoryKnowledgeBase {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            searches: RwLock::new(VecDeque::new()),
            reasoning: RwLock::new(VecDeque::new()),
            log_capacity: DEFAULT_LOG_CAPACITY,
            scorer: SimilarityScorer::default(),
        }
    }
}

fn push_capped<T>(log: &mut VecDeque<T>, item: T, capacity: usize) {
    log.push_back(item);
    while log.len() > capacity {
        log.pop_front();
    }
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` search logs and `capacity` reasoning logs.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Seed the store with entries.
    pub fn with_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            ..Self::default()
        }
    }

    /// Load a JSON array of entries.
    pub async fn load_json(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let entries: Vec<KnowledgeEntry> = serde_json::from_str(&source)?;
        Ok(Self::with_entries(entries))
    }

    /// Snapshot of an entry.
    pub async fn get(&self, id: KnowledgeId) -> Option<KnowledgeEntry> {
        self.entries.read().await.iter().find(|e| e.id == id).cloned()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Search logs in insertion order.
    pub async fn search_logs(&self) -> Vec<SearchLog> {
        self.searches.read().await.iter().cloned().collect()
    }

    /// Logged reasoning chains in insertion order.
    pub async fn reasoning_logs(&self) -> Vec<(String, ReasoningChain)> {
        self.reasoning.read().await.iter().cloned().collect()
    }

    fn relevance(&self, query: &[String], entry: &KnowledgeEntry) -> f32 {
        [&entry.title, &entry.query, &entry.topic]
            .into_iter()
            .map(|field| self.scorer.score(query, &tokenize(field)))
            .fold(0.0, f32::max)
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeBase {
    async fn search(&self, query: &str, limit: usize) -> CapabilityResult<Vec<KnowledgeEntry>> {
        let tokens = tokenize(query);
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let mut hits: Vec<KnowledgeEntry> = entries
            .iter()
            .filter_map(|entry| {
                let relevance = self.relevance(&tokens, entry);
                (relevance > 0.0).then(|| KnowledgeEntry {
                    relevance_score: relevance,
                    ..entry.clone()
                })
            })
            .collect();

        // Stable sort keeps insertion order between equal scores.
        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn record_view(&self, id: KnowledgeId) -> CapabilityResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CapabilityError::failed("knowledge", format!("no entry {id}")))?;
        entry.views += 1;
        Ok(())
    }

    async fn log_search(&self, log: SearchLog) -> CapabilityResult<()> {
        push_capped(&mut *self.searches.write().await, log, self.log_capacity);
        Ok(())
    }

    async fn log_reasoning(&self, query: &str, chain: &ReasoningChain) -> CapabilityResult<()> {
        push_capped(
            &mut *self.reasoning.write().await,
            (query.to_string(), chain.clone()),
            self.log_capacity,
        );
        Ok(())
    }

    async fn save(&self, entry: KnowledgeEntry) -> CapabilityResult<KnowledgeId> {
        let id = entry.id;
        self.entries.write().await.push(entry);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> InMemoryKnowledgeBase {
        InMemoryKnowledgeBase::with_entries(vec![
            KnowledgeEntry::new("garantia", "Prazo de garantia dos serviços", "90 dias após a conclusão."),
            KnowledgeEntry::new("horario", "Horário de atendimento", "Segunda a sexta, 8h às 18h."),
        ])
    }

    #[tokio::test]
    async fn test_search_ranks_by_relevance() {
        let kb = base();
        let hits = kb.search("qual o prazo de garantia", 3).await.unwrap();
        assert_eq!(hits[0].topic, "garantia");
        assert!((hits[0].relevance_score - 0.5).abs() < 1e-6);
        // only "de" is shared with the second entry
        assert!(hits.iter().skip(1).all(|h| h.relevance_score < 0.2));

        assert!(kb.search("cotação do dólar", 3).await.unwrap().is_empty());
        assert!(kb.search("", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_views_and_logs() {
        let kb = base();
        let hit = kb.search("horário de atendimento", 1).await.unwrap().remove(0);

        kb.record_view(hit.id).await.unwrap();
        kb.record_view(hit.id).await.unwrap();
        assert_eq!(kb.get(hit.id).await.unwrap().views, 2);
        assert!(kb.record_view(KnowledgeId::nil()).await.is_err());

        kb.log_search(SearchLog::new("horário", 1, Some(hit.id))).await.unwrap();
        kb.log_reasoning("horário", &ReasoningChain::default()).await.unwrap();
        assert_eq!(kb.search_logs().await[0].surfaced, Some(hit.id));
        assert_eq!(kb.reasoning_logs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_logs_keep_most_recent() {
        let kb = InMemoryKnowledgeBase::new().with_log_capacity(2);
        for query in ["a", "b", "c"] {
            kb.log_search(SearchLog::new(query, 0, None)).await.unwrap();
            kb.log_reasoning(query, &ReasoningChain::default()).await.unwrap();
        }

        let searched: Vec<_> = kb.search_logs().await.into_iter().map(|l| l.query).collect();
        assert_eq!(searched, vec!["b", "c"]);
        let reasoned: Vec<_> = kb.reasoning_logs().await.into_iter().map(|(q, _)| q).collect();
        assert_eq!(reasoned, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_save() {
        let kb = InMemoryKnowledgeBase::new();
        assert!(kb.is_empty().await);
        let id = kb
            .save(KnowledgeEntry::new("frota", "Revisão da frota", "A cada 10 mil km."))
            .await
            .unwrap();
        assert_eq!(kb.len().await, 1);
        assert!(kb.get(id).await.is_some());
    }
}
