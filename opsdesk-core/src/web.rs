//! Web search adapters.

use crate::capabilities::{WebResult, WebSearch};
use crate::error::CapabilityResult;
use crate::text::normalize;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Default lifetime of a cached search.
pub const DEFAULT_WEB_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// TTL cache in front of another [`WebSearch`].
///
/// Results served from the cache are marked `cached`. Failed searches are
/// never cached. Expired entries are dropped whenever a fresh result is
/// stored.
pub struct CachingWebSearch<W> {
    inner: W,
    ttl: Duration,
    cache: RwLock<HashMap<String, (Instant, Vec<WebResult>)>>,
}

impl<W: WebSearch> CachingWebSearch<W> {
    pub fn new(inner: W) -> Self {
        Self::with_ttl(inner, DEFAULT_WEB_CACHE_TTL)
    }

    pub fn with_ttl(inner: W, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn key(query: &str, topic: &str, max_results: usize) -> String {
        format!("{}|{}|{}", normalize(topic), normalize(query), max_results)
    }
}

#[async_trait]
impl<W: WebSearch> WebSearch for CachingWebSearch<W> {
    async fn search(&self, query: &str, topic: &str, max_results: usize) -> CapabilityResult<Vec<WebResult>> {
        let key = Self::key(query, topic, max_results);

        if let Some((stored, results)) = self.cache.read().await.get(&key) {
            if stored.elapsed() < self.ttl {
                debug!(query, "web search served from cache");
                return Ok(results
                    .iter()
                    .cloned()
                    .map(|r| WebResult { cached: true, ..r })
                    .collect());
            }
        }

        let results = self.inner.search(query, topic, max_results).await?;
        let ttl = self.ttl;
        let mut cache = self.cache.write().await;
        cache.retain(|_, (stored, _)| stored.elapsed() < ttl);
        cache.insert(key, (Instant::now(), results.clone()));
        Ok(results)
    }
}

/// A web search that never finds anything.
///
/// Used when no search provider is configured; the ladder then falls through
/// to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWebSearch;

#[async_trait]
impl WebSearch for NoWebSearch {
    async fn search(&self, _query: &str, _topic: &str, _max_results: usize) -> CapabilityResult<Vec<WebResult>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WebSearch for Counting {
        async fn search(&self, query: &str, _topic: &str, _max: usize) -> CapabilityResult<Vec<WebResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CapabilityError::failed("web", "offline"));
            }
            Ok(vec![WebResult {
                title: query.to_string(),
                summary: "resumo".into(),
                url: "https://example.com".into(),
                domain: "example.com".into(),
                trust_score: 0.8,
                cached: false,
            }])
        }
    }

    #[tokio::test]
    async fn test_second_search_is_cached() {
        let search = CachingWebSearch::new(Counting::default());
        let first = search.search("Clima hoje", "clima", 3).await.unwrap();
        let second = search.search("clima hoje!", "clima", 3).await.unwrap();

        assert!(!first[0].cached);
        assert!(second[0].cached);
        assert_eq!(search.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let search = CachingWebSearch::with_ttl(Counting::default(), Duration::ZERO);
        search.search("dolar", "cotacao", 3).await.unwrap();
        let again = search.search("dolar", "cotacao", 3).await.unwrap();

        assert!(!again[0].cached);
        assert_eq!(search.inner.calls.load(Ordering::SeqCst), 2);

        // Storing a new search drops the expired ones
        search.search("euro", "cotacao", 3).await.unwrap();
        let cache = search.cache.read().await;
        assert_eq!(cache.len(), 1);
        assert!(cache.keys().all(|k| k.contains("euro")));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let search = CachingWebSearch::new(Counting { fail: true, ..Default::default() });
        assert!(search.search("x", "y", 1).await.is_err());
        assert!(search.search("x", "y", 1).await.is_err());
        assert_eq!(search.inner.calls.load(Ordering::SeqCst), 2);
    }
}
