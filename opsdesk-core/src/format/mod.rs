//! Response formatting.
//!
//! A registry maps response keys to [`Renderer`] strategies. Adding an intent
//! means adding one registry entry. Every renderer owns its empty message, so
//! "no open orders" and "customer not found" stay distinct.

mod locale;
pub mod renderers;
pub mod template;

pub use locale::Locale;
pub use renderers::{
    BreakdownRenderer, FigureRenderer, GenericRenderer, ListRenderer, RankingRenderer, ValueKind,
};

use crate::data::Row;
use crate::intent::Intent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategy that turns rows into reply text.
pub trait Renderer: Send + Sync {
    /// Render a non-empty set of rows.
    fn render(&self, rows: &[Row], locale: &Locale) -> String;

    /// Text used when there are no rows.
    fn empty_message(&self) -> &str;
}

/// Audit data attached to every formatted reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatMetadata {
    pub intent: String,
    pub row_count: usize,
    pub rows: Vec<Row>,
}

/// Reply text plus the evidence it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedReply {
    pub text: String,
    pub metadata: FormatMetadata,
}

/// Renderer registry.
pub struct ResponseFormatter {
    renderers: HashMap<String, Box<dyn Renderer>>,
    generic: GenericRenderer,
    locale: Locale,
}

impl std::fmt::Debug for ResponseFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFormatter")
            .field("renderers", &self.renderers.len())
            .field("locale", &self.locale)
            .finish()
    }
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl ResponseFormatter {
    /// Registry with every built-in renderer.
    pub fn new(locale: Locale) -> Self {
        let mut formatter = Self::empty(locale);
        for (key, renderer) in renderers::builtin() {
            formatter.renderers.insert(key.to_string(), renderer);
        }
        formatter
    }

    /// Registry with no renderers; everything goes through the generic one.
    pub fn empty(locale: Locale) -> Self {
        Self {
            renderers: HashMap::new(),
            generic: GenericRenderer,
            locale,
        }
    }

    /// Add or replace the renderer for `key`.
    pub fn register(&mut self, key: impl Into<String>, renderer: Box<dyn Renderer>) {
        self.renderers.insert(key.into(), renderer);
    }

    /// True if `key` has a dedicated renderer.
    pub fn has_renderer(&self, key: &str) -> bool {
        self.renderers.contains_key(key)
    }

    /// The locale used for numbers and dates.
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Render `rows` with the renderer registered for `key`.
    pub fn format(&self, key: &str, rows: Vec<Row>) -> FormattedReply {
        self.render(key, key, rows)
    }

    /// Render through the intent's response key, recording the intent name.
    pub fn format_intent(&self, intent: &Intent, rows: Vec<Row>) -> FormattedReply {
        self.render(intent.response_key(), &intent.name, rows)
    }

    fn render(&self, key: &str, intent: &str, rows: Vec<Row>) -> FormattedReply {
        let renderer: &dyn Renderer = match self.renderers.get(key) {
            Some(r) => r.as_ref(),
            None => &self.generic,
        };

        let text = if rows.is_empty() {
            renderer.empty_message().to_string()
        } else {
            renderer.render(&rows, &self.locale)
        };

        FormattedReply {
            text,
            metadata: FormatMetadata {
                intent: intent.to_string(),
                row_count: rows.len(),
                rows,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentCatalog;
    use serde_json::json;
    use std::collections::HashSet;

    fn rows(values: Vec<serde_json::Value>) -> Vec<Row> {
        values.into_iter().map(|v| v.as_object().cloned().unwrap()).collect()
    }

    #[test]
    fn test_every_builtin_intent_has_its_own_empty_message() {
        let formatter = ResponseFormatter::default();
        let generic = GenericRenderer.empty_message().to_string();
        let mut seen = HashSet::new();

        for intent in IntentCatalog::builtin().intents() {
            assert!(formatter.has_renderer(intent.response_key()), "no renderer for {}", intent.name);
            let reply = formatter.format(intent.response_key(), Vec::new());
            assert_ne!(reply.text, generic, "{} uses the generic empty message", intent.name);
            assert!(seen.insert(reply.text.clone()), "{} shares an empty message", intent.name);
        }
    }

    #[test]
    fn test_low_stock_list() {
        let formatter = ResponseFormatter::default();
        let reply = formatter.format(
            "estoque_baixo",
            rows(vec![
                json!({"nome": "Cabo PP 2x1,5", "quantidade": 3, "estoque_minimo": 10}),
                json!({"nome": "Disjuntor 20A", "quantidade": 0, "estoque_minimo": 5}),
            ]),
        );

        let lines: Vec<_> = reply.text.lines().collect();
        assert_eq!(lines[0], "📦 Encontrei 2 produto(s) com estoque baixo:");
        assert_eq!(lines.iter().filter(|l| l.starts_with("⚠️")).count(), 2);
        assert_eq!(lines[1], "⚠️ Cabo PP 2x1,5: 3 un. (mínimo 10)");
        assert_eq!(reply.metadata.intent, "estoque_baixo");
        assert_eq!(reply.metadata.row_count, 2);
        assert_eq!(reply.metadata.rows.len(), 2);
    }

    #[test]
    fn test_customer_not_found() {
        let reply = ResponseFormatter::default().format("buscar_cliente", Vec::new());
        assert!(reply.text.contains("Cliente não encontrado"));
        assert_eq!(reply.metadata.row_count, 0);
    }

    #[test]
    fn test_figures_use_locale() {
        let formatter = ResponseFormatter::default();
        let reply = formatter.format(
            "faturamento_mes",
            rows(vec![json!({"total": 15234.9, "quantidade": 12})]),
        );
        assert_eq!(reply.text, "💰 Faturamento do mês: R$ 15.234,90 em 12 lançamento(s).");

        let reply = formatter.format(
            "lucro_mes",
            rows(vec![json!({"receitas": 1000.0, "despesas": 250.5, "saldo": 749.5})]),
        );
        assert!(reply.text.ends_with("• Lucro: R$ 749,50"));
    }

    #[test]
    fn test_ranking_and_breakdown() {
        let formatter = ResponseFormatter::default();
        let reply = formatter.format(
            "ranking_tecnicos",
            rows(vec![
                json!({"grupo": "Carlos", "quantidade": 8}),
                json!({"grupo": "Ana", "quantidade": 5}),
                json!({"grupo": "Rui", "quantidade": 2}),
                json!({"grupo": "Léo", "quantidade": 1}),
            ]),
        );
        let lines: Vec<_> = reply.text.lines().collect();
        assert_eq!(lines[1], "🥇 Carlos: 8");
        assert_eq!(lines[4], "4. Léo: 1");

        let reply = formatter.format(
            "despesas_por_categoria",
            rows(vec![json!({"grupo": "Aluguel", "total": 300}), json!({"grupo": "Frete", "total": 100})]),
        );
        assert!(reply.text.contains("• Aluguel: R$ 300,00 (75,0%)"));
        assert!(reply.text.ends_with("Total: R$ 400,00"));
    }

    #[test]
    fn test_unregistered_key_uses_generic_renderer() {
        let formatter = ResponseFormatter::default();
        let reply = formatter.format("relatorio_custom", rows(vec![json!({"a": 1})]));
        assert!(reply.text.starts_with("📋 Encontrei 1 resultado(s):"));
        assert_eq!(
            formatter.format("relatorio_custom", Vec::new()).text,
            "Não encontrei resultados para essa consulta."
        );
    }

    #[test]
    fn test_format_intent_uses_response_key() {
        let formatter = ResponseFormatter::default();
        let intent = crate::intent::Intent::new("estoque_critico", ["estoque critico"])
            .with_response_template("estoque_baixo");
        let reply = formatter.format_intent(&intent, Vec::new());
        assert_eq!(reply.metadata.intent, "estoque_critico");
        assert!(reply.text.contains("Nenhum produto com estoque baixo"));
    }
}
