//! Token-set similarity with a domain-term bonus.
//!
//! Plain Jaccard under-weights short decisive nouns ("estoque", "cliente"),
//! so every domain term shared by both sides adds a fixed increment.

use std::collections::HashSet;

/// Bonus added per shared domain term.
pub const DEFAULT_DOMAIN_BONUS: f32 = 0.1;

/// Business nouns that earn the bonus when both sides contain them.
pub const DEFAULT_DOMAIN_TERMS: &[&str] = &[
    "ordem",
    "os",
    "cliente",
    "clientes",
    "estoque",
    "financeiro",
    "lucro",
    "faturamento",
    "receita",
    "produto",
    "contrato",
    "proposta",
    "funcionario",
    "tecnico",
];

/// Configurable scorer. [`similarity`] uses the defaults.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    domain_terms: HashSet<String>,
    bonus: f32,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN_TERMS.iter().copied(), DEFAULT_DOMAIN_BONUS)
    }
}

impl SimilarityScorer {
    /// Create a scorer with a custom domain vocabulary.
    pub fn new<I, S>(domain_terms: I, bonus: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domain_terms: domain_terms
                .into_iter()
                .map(|t| crate::text::normalize(t.as_ref()))
                .collect(),
            bonus: bonus.max(0.0),
        }
    }

    /// Jaccard overlap plus domain bonus, clamped to `[0, 1]`.
    pub fn score<A, B>(&self, a: &[A], b: &[B]) -> f32
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let set_a: HashSet<&str> = a.iter().map(AsRef::as_ref).collect();
        let set_b: HashSet<&str> = b.iter().map(AsRef::as_ref).collect();

        if set_a.is_empty() || set_b.is_empty() {
            return 0.0;
        }

        let intersection = set_a.intersection(&set_b).count();
        let union = set_a.union(&set_b).count();
        let mut score = intersection as f32 / union as f32;

        let shared_terms = set_a
            .intersection(&set_b)
            .filter(|t| self.domain_terms.contains(**t))
            .count();
        score += shared_terms as f32 * self.bonus;

        score.min(1.0)
    }
}

/// Score two token lists with the default domain vocabulary.
pub fn similarity<A, B>(a: &[A], b: &[B]) -> f32
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    SimilarityScorer::default().score(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    #[test]
    fn test_reflexive() {
        let tokens = tokenize("relatorio mensal de vendas");
        assert_eq!(similarity(&tokens, &tokens), 1.0);
    }

    #[test]
    fn test_empty_is_zero() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(similarity(&empty, &tokenize("estoque")), 0.0);
        assert_eq!(similarity(&tokenize("estoque"), &empty), 0.0);
    }

    #[test]
    fn test_plain_jaccard() {
        // {quais, vendas} vs {vendas, hoje}: 1 / 3
        let score = similarity(&["quais", "vendas"], &["vendas", "hoje"]);
        assert!((score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_domain_bonus_applies_per_shared_term() {
        // {produto, estoque, baixo} vs {estoque, critico}: 1/4 + 0.1
        let score = similarity(&["produto", "estoque", "baixo"], &["estoque", "critico"]);
        assert!((score - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_bonus_is_clamped() {
        let scorer = SimilarityScorer::new(["estoque", "cliente"], 0.9);
        let score = scorer.score(&["estoque", "cliente", "x1"], &["estoque", "cliente"]);
        assert_eq!(score, 1.0);
    }
}
