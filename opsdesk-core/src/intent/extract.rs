//! Single-token parameter extraction.
//!
//! "buscar cliente Silva" yields "Silva". Multi-word arguments are not
//! supported; only the first token after the keyword is returned.

use super::Intent;
use crate::text::{normalize, MIN_TOKEN_LEN};

/// Words skipped by the last-token fallback.
const STOP_WORDS: &[&str] = &[
    "para", "com", "dos", "das", "uma", "umas", "uns", "pelo", "pela", "pelos", "pelas", "sobre",
    "por", "que", "qual", "quais", "the", "and", "for", "como", "meu", "minha", "nos", "nas",
];

/// Extract the argument that follows the intent's keyword, or a best guess.
///
/// Keyword lookup is case and diacritic insensitive and works on whole
/// words. The returned token keeps the user's casing with surrounding
/// punctuation trimmed. If no keyword is followed by a usable token, the last
/// non-stop-word token of the utterance is returned, also with the user's
/// casing, or `""`.
pub fn extract_parameter(utterance: &str, intent: &Intent) -> String {
    let words: Vec<(&str, String)> = utterance
        .split_whitespace()
        .map(|w| (w, normalize(w)))
        .filter(|(_, n)| !n.is_empty())
        .collect();

    for keyword in &intent.keywords {
        let needle = normalize(keyword);
        if needle.is_empty() {
            continue;
        }
        let needle: Vec<&str> = needle.split(' ').collect();

        if let Some(end) = find_sequence(&words, &needle) {
            if let Some(param) = words.get(end).map(|(raw, _)| trim_token(raw)) {
                if !param.is_empty() {
                    return param.to_string();
                }
            }
        }
    }

    words
        .iter()
        .rev()
        .find(|(_, n)| n.chars().count() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(&n.as_str()))
        .map(|(raw, _)| trim_token(raw).to_string())
        .unwrap_or_default()
}

/// Index just past the first occurrence of `needle` in `words`.
fn find_sequence(words: &[(&str, String)], needle: &[&str]) -> Option<usize> {
    if needle.len() > words.len() {
        return None;
    }
    (0..=words.len() - needle.len())
        .find(|&start| {
            needle
                .iter()
                .zip(&words[start..])
                .all(|(n, (_, w))| w == n)
        })
        .map(|start| start + needle.len())
}

fn trim_token(raw: &str) -> &str {
    raw.trim_matches(|c: char| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buscar_cliente() -> Intent {
        Intent::new("buscar_cliente", ["buscar cliente", "dados do cliente"])
    }

    #[test]
    fn test_token_after_keyword() {
        assert_eq!(extract_parameter("buscar cliente Silva", &buscar_cliente()), "Silva");
        assert_eq!(
            extract_parameter("Buscar CLIENTE Souza, por favor", &buscar_cliente()),
            "Souza"
        );
    }

    #[test]
    fn test_diacritics_in_keyword_occurrence() {
        let intent = Intent::new("buscar_funcionario", ["buscar funcionario"]);
        assert_eq!(
            extract_parameter("buscar funcionário João!", &intent),
            "João"
        );
    }

    #[test]
    fn test_only_one_token_is_returned() {
        assert_eq!(
            extract_parameter("dados do cliente Maria Clara", &buscar_cliente()),
            "Maria"
        );
    }

    #[test]
    fn test_fallback_takes_last_non_stop_word() {
        // keyword present but nothing after it
        assert_eq!(
            extract_parameter("para o Pereira buscar cliente", &buscar_cliente()),
            "cliente"
        );
        assert_eq!(
            extract_parameter("procure por Oliveira", &buscar_cliente()),
            "Oliveira"
        );
        assert_eq!(
            extract_parameter("cadê o Conceição?", &buscar_cliente()),
            "Conceição"
        );
    }

    #[test]
    fn test_keyword_must_match_whole_words() {
        let intent = Intent::new("buscar_os", ["buscar os"]);
        // "buscar ossos" does not contain the keyword as words
        assert_eq!(extract_parameter("buscar ossos", &intent), "ossos");
    }

    #[test]
    fn test_empty_utterance() {
        assert_eq!(extract_parameter("", &buscar_cliente()), "");
        assert_eq!(extract_parameter("para com", &buscar_cliente()), "");
    }
}
