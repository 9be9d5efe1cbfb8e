//! Lexical intent matching.
//!
//! Rules, strongest first:
//! 1. exact equality of the normalized utterance and a keyword phrase
//! 2. the normalized utterance contains the normalized keyword phrase
//! 3. strong token overlap between the utterance and the keyword phrase
//! 4. best similarity score above a threshold
//!
//! Rule 1 is checked across the whole catalog before rules 2 and 3, so an
//! utterance that *is* a keyword always resolves to that keyword's intent.
//! Rules 2 and 3 then run intent by intent in declaration order and the
//! first hit wins. With overlapping keyword sets this makes catalog order the
//! tie-break. Rule 4 keeps the earliest intent on equal scores.

use super::{Intent, IntentCatalog};
use crate::similarity::SimilarityScorer;
use crate::text::{normalize, tokenize};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default minimum similarity for rule 4.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;

/// Which rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Utterance equals a keyword phrase
    Exact,
    /// Utterance contains a keyword phrase
    Contains,
    /// Enough significant keyword tokens appear in the utterance
    TokenOverlap,
    /// Best similarity score above the threshold
    Similarity,
}

/// A resolved intent.
#[derive(Debug, Clone, Copy)]
pub struct IntentMatch<'a> {
    /// The matched intent.
    pub intent: &'a Intent,
    /// Position of the intent in the catalog.
    pub index: usize,
    /// The keyword phrase that matched.
    pub keyword: &'a str,
    /// Rule that fired.
    pub rule: MatchRule,
    /// 1.0 for rules 1-3, the similarity score for rule 4.
    pub score: f32,
}

/// Matches utterances against an intent catalog snapshot.
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    scorer: SimilarityScorer,
    threshold: f32,
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new(SimilarityScorer::default(), DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl IntentMatcher {
    /// Create a matcher with a custom scorer and similarity threshold.
    pub fn new(scorer: SimilarityScorer, threshold: f32) -> Self {
        Self { scorer, threshold }
    }

    /// The rule-4 threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Find the intent for `utterance`, or `None` if nothing is close enough.
    pub fn match_intent<'a>(
        &self,
        utterance: &str,
        catalog: &'a IntentCatalog,
    ) -> Option<IntentMatch<'a>> {
        let normalized = normalize(utterance);
        if normalized.is_empty() {
            return None;
        }
        let utterance_tokens = tokenize(utterance);

        if let Some(hit) = exact_match(&normalized, catalog) {
            debug!(intent = %hit.intent.name, keyword = hit.keyword, "exact intent match");
            return Some(hit);
        }

        let mut best: Option<IntentMatch<'a>> = None;

        for (index, intent) in catalog.active() {
            for keyword in &intent.keywords {
                let normalized_keyword = normalize(keyword);
                if normalized_keyword.is_empty() {
                    continue;
                }

                if normalized.contains(&normalized_keyword) {
                    debug!(intent = %intent.name, keyword = keyword.as_str(), "containment intent match");
                    return Some(IntentMatch {
                        intent,
                        index,
                        keyword,
                        rule: MatchRule::Contains,
                        score: 1.0,
                    });
                }

                let keyword_tokens = tokenize(keyword);
                if strong_overlap(&keyword_tokens, &utterance_tokens) {
                    debug!(intent = %intent.name, keyword = keyword.as_str(), "token-overlap intent match");
                    return Some(IntentMatch {
                        intent,
                        index,
                        keyword,
                        rule: MatchRule::TokenOverlap,
                        score: 1.0,
                    });
                }

                let score = self.scorer.score(&utterance_tokens, &keyword_tokens);
                if best.map_or(true, |b| score > b.score) {
                    best = Some(IntentMatch {
                        intent,
                        index,
                        keyword,
                        rule: MatchRule::Similarity,
                        score,
                    });
                }
            }
        }

        match best {
            Some(hit) if hit.score > self.threshold => {
                debug!(intent = %hit.intent.name, score = hit.score, "similarity intent match");
                Some(hit)
            }
            Some(hit) => {
                debug!(best = %hit.intent.name, score = hit.score, "no intent above threshold");
                None
            }
            None => None,
        }
    }
}

/// Match with the default scorer and threshold.
pub fn match_intent<'a>(utterance: &str, catalog: &'a IntentCatalog) -> Option<IntentMatch<'a>> {
    IntentMatcher::default().match_intent(utterance, catalog)
}

fn exact_match<'a>(normalized: &str, catalog: &'a IntentCatalog) -> Option<IntentMatch<'a>> {
    catalog.active().find_map(|(index, intent)| {
        intent
            .keywords
            .iter()
            .find(|k| normalize(k) == normalized)
            .map(|keyword| IntentMatch {
                intent,
                index,
                keyword,
                rule: MatchRule::Exact,
                score: 1.0,
            })
    })
}

/// Rule 3: for phrases of up to three tokens at least two significant tokens
/// must appear in the utterance, for longer phrases at least three.
fn strong_overlap(keyword_tokens: &[String], utterance_tokens: &[String]) -> bool {
    let hits = keyword_tokens
        .iter()
        .filter(|t| t.chars().count() > 2 && utterance_tokens.contains(t))
        .count();

    if keyword_tokens.len() <= 3 {
        hits >= 2
    } else {
        hits >= 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> IntentCatalog {
        IntentCatalog::new(vec![
            Intent::new("os_abertas", ["os abertas", "ordens de servico abertas"]),
            Intent::new("estoque_baixo", ["estoque baixo", "produtos acabando"]),
            Intent::new("buscar_cliente", ["buscar cliente"]),
            Intent::new("faturamento_mes", ["faturamento do mes"]),
        ])
    }

    #[test]
    fn test_exact_match() {
        let catalog = catalog();
        let hit = match_intent("Estoque baixo!", &catalog).unwrap();
        assert_eq!(hit.intent.name, "estoque_baixo");
        assert_eq!(hit.rule, MatchRule::Exact);
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn test_containment_match() {
        let catalog = catalog();
        let hit = match_intent("quero buscar cliente Silva agora", &catalog).unwrap();
        assert_eq!(hit.intent.name, "buscar_cliente");
        assert_eq!(hit.rule, MatchRule::Contains);
        assert_eq!(hit.keyword, "buscar cliente");
    }

    #[test]
    fn test_token_overlap_match() {
        let catalog = catalog();
        // "ordens", "servico", "abertas" all appear; phrase has 4 tokens
        let hit = match_intent("ordens abertas de servico", &catalog).unwrap();
        assert_eq!(hit.intent.name, "os_abertas");
        assert_eq!(hit.rule, MatchRule::TokenOverlap);
    }

    #[test]
    fn test_short_tokens_do_not_count_for_overlap() {
        // Only "mes" (3 chars) counts; "do" is too short
        assert!(!strong_overlap(
            &tokenize("faturamento do mes"),
            &tokenize("do mes passado")
        ));
        assert!(strong_overlap(
            &tokenize("faturamento do mes"),
            &tokenize("mes de faturamento")
        ));
    }

    #[test]
    fn test_similarity_fallback_respects_threshold() {
        let catalog = IntentCatalog::new(vec![Intent::new("estoque", ["nivel estoque critico"])]);
        // {estoque, geral} vs {nivel, estoque, critico}: 1/4 + 0.1 = 0.35
        let hit = match_intent("estoque geral", &catalog).unwrap();
        assert_eq!(hit.rule, MatchRule::Similarity);
        assert!((hit.score - 0.35).abs() < 1e-6);

        // {vendas, geral} shares nothing
        assert!(match_intent("vendas geral", &catalog).is_none());
    }

    #[test]
    fn test_no_match_for_unrelated_text() {
        assert!(match_intent("qual o clima hoje", &catalog()).is_none());
        assert!(match_intent("", &catalog()).is_none());
        assert!(match_intent("?!", &catalog()).is_none());
    }

    #[test]
    fn test_declaration_order_breaks_containment_ties() {
        let first = IntentCatalog::new(vec![
            Intent::new("veiculos", ["veiculos"]),
            Intent::new("manutencoes", ["manutencao dos veiculos"]),
        ]);
        let hit = match_intent("agendar manutencao dos veiculos", &first).unwrap();
        assert_eq!(hit.intent.name, "veiculos");

        let second = IntentCatalog::new(vec![
            Intent::new("manutencoes", ["manutencao dos veiculos"]),
            Intent::new("veiculos", ["veiculos"]),
        ]);
        let hit = match_intent("agendar manutencao dos veiculos", &second).unwrap();
        assert_eq!(hit.intent.name, "manutencoes");
    }

    #[test]
    fn test_exact_match_beats_earlier_containment() {
        let catalog = IntentCatalog::new(vec![
            Intent::new("veiculos", ["veiculos"]),
            Intent::new("manutencoes", ["manutencao dos veiculos"]),
        ]);
        let hit = match_intent("Manutenção dos veículos", &catalog).unwrap();
        assert_eq!(hit.intent.name, "manutencoes");
        assert_eq!(hit.rule, MatchRule::Exact);
    }

    #[test]
    fn test_inactive_intents_are_skipped() {
        let catalog = IntentCatalog::new(vec![
            Intent::new("old", ["estoque baixo"]).inactive(),
            Intent::new("new", ["estoque baixo"]),
        ]);
        assert_eq!(match_intent("estoque baixo", &catalog).unwrap().intent.name, "new");
    }
}
