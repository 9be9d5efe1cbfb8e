//! Text normalization and tokenization.
//!
//! Every comparison in the engine goes through [`normalize`] so that
//! "Orçamento", "orcamento" and "ORÇAMENTO!" compare equal. Folding is
//! purely lexical: no stemming, no stop words.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Minimum token length kept by [`tokenize`]. Two keeps "os" (ordem de serviço).
pub const MIN_TOKEN_LEN: usize = 2;

/// Fold diacritics, lowercase, strip punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|c| match c {
            'ç' | 'Ç' => 'c',
            other => other,
        })
        .collect::<String>()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let stripped: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize and split on whitespace, keeping tokens of at least two chars.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// True if `phrase` occurs in `haystack` on token boundaries.
///
/// Both arguments must already be normalized.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let padded = format!(" {haystack} ");
    padded.contains(&format!(" {phrase} "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_diacritics_and_cedilla() {
        assert_eq!(normalize("Orçamento"), "orcamento");
        assert_eq!(normalize("AÇÃO"), "acao");
        assert_eq!(normalize("Olá, Técnico!"), "ola tecnico");
    }

    #[test]
    fn test_normalize_strips_punctuation_and_collapses() {
        assert_eq!(normalize("  estoque---baixo?? "), "estoque baixo");
        assert_eq!(normalize("R$ 1.500,00"), "r 1 500 00");
        assert_eq!(normalize("nota_fiscal"), "nota_fiscal");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!..."), "");
    }

    #[test]
    fn test_tokenize_keeps_two_letter_tokens() {
        assert_eq!(tokenize("Quais OS estão abertas?"), vec!["quais", "os", "estao", "abertas"]);
        assert_eq!(tokenize("a e o cliente"), vec!["cliente"]);
    }

    #[test]
    fn test_contains_phrase_respects_boundaries() {
        assert!(contains_phrase("bom dia equipe", "bom dia"));
        assert!(contains_phrase("oi", "oi"));
        assert!(!contains_phrase("boa noite", "oi"));
        assert!(!contains_phrase("qualquer", ""));
    }
}
