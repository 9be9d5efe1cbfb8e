//! Completion and reasoning backed by the Claude API.
//!
//! Both adapters are optional. The engine runs without them and the ladder
//! simply skips their stages.

use crate::capabilities::{
    Completion, CompletionContext, Reasoner, ReasoningChain, ReasoningContext, ReasoningStep,
};
use crate::error::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use claude::{Claude, Message, Request};
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

const COMPLETION_SYSTEM: &str = "Você é o assistente de operações de uma empresa de serviços de campo. \
Responda em português do Brasil, de forma breve e objetiva. \
Use apenas os números fornecidos no contexto; se não souber, diga que não sabe.";

const REASONING_SYSTEM: &str = "Você decompõe perguntas de operadores em passos de raciocínio curtos. \
Responda SOMENTE com JSON no formato: \
{\"steps\": [{\"action\": \"...\", \"description\": \"...\", \"result\": \"...\", \"sources\": []}], \"confidence\": 0.0}. \
O campo result do último passo é a conclusão. confidence vai de 0 a 1.";

/// Generic completion through Claude.
#[derive(Clone)]
pub struct ClaudeCompletion {
    client: Claude,
    max_tokens: usize,
}

impl ClaudeCompletion {
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            max_tokens: 600,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl Completion for ClaudeCompletion {
    async fn complete(&self, prompt: &str, context: &CompletionContext) -> CapabilityResult<String> {
        let request = Request::new(vec![Message::user(completion_prompt(prompt, context))])
            .with_system(COMPLETION_SYSTEM)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.4);

        let response = self.client.complete(request).await?;
        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(CapabilityError::failed("completion", "empty response"));
        }
        Ok(text)
    }
}

/// Reasoning chains produced by Claude as JSON.
#[derive(Clone)]
pub struct ClaudeReasoner {
    client: Claude,
}

impl ClaudeReasoner {
    pub fn new(client: Claude) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Reasoner for ClaudeReasoner {
    async fn reason(&self, query: &str, context: &ReasoningContext) -> CapabilityResult<ReasoningChain> {
        let started = Instant::now();
        let request = Request::new(vec![Message::user(reasoning_prompt(query, context))])
            .with_system(REASONING_SYSTEM)
            .with_max_tokens(800)
            .with_temperature(0.0);

        let response = self.client.complete(request).await?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let chain = parse_chain(&response.text, elapsed_ms)?;
        debug!(steps = chain.steps.len(), confidence = chain.confidence, "reasoning chain parsed");
        Ok(chain)
    }
}

/// The user turn sent to the completion model.
pub fn completion_prompt(prompt: &str, context: &CompletionContext) -> String {
    let mut out = format!(
        "Contexto da empresa:\n- Ordens de serviço abertas: {}\n- Clientes cadastrados: {}\n",
        context.snapshot.open_orders, context.snapshot.customers
    );
    if !context.facts.is_empty() {
        out.push_str("Fatos recentes da conversa:\n");
        for fact in &context.facts {
            out.push_str(&format!("- {fact}\n"));
        }
    }
    out.push_str(&format!("\nPergunta: {prompt}"));
    out
}

fn reasoning_prompt(query: &str, context: &ReasoningContext) -> String {
    let mut out = format!("Pergunta: {query}\n");
    if !context.knowledge.is_empty() {
        out.push_str(&format!("Artigos relacionados: {}\n", context.knowledge.join("; ")));
    }
    if !context.facts.is_empty() {
        out.push_str(&format!("Fatos recentes: {}\n", context.facts.join("; ")));
    }
    out
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    #[serde(default)]
    steps: Vec<StepResponse>,
    #[serde(default)]
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct StepResponse {
    #[serde(default)]
    action: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
}

/// Parse a model reply into a chain. Steps are renumbered from 1.
pub fn parse_chain(text: &str, elapsed_ms: u64) -> CapabilityResult<ReasoningChain> {
    let json = extract_json(text);
    let parsed: ChainResponse = serde_json::from_str(json).map_err(|e| CapabilityError::Parse {
        capability: "reasoning".to_string(),
        reason: format!("{e}: {json}"),
    })?;

    Ok(ReasoningChain {
        steps: parsed
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, s)| ReasoningStep {
                index: i + 1,
                action: s.action,
                description: s.description,
                result: s.result.filter(|r| !r.trim().is_empty()),
                sources: s.sources,
            })
            .collect(),
        confidence: parsed.confidence.clamp(0.0, 1.0),
        elapsed_ms,
    })
}

/// Extract JSON from a response that might be wrapped in markdown fences.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // Prose around a bare object
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::BusinessSnapshot;

    #[test]
    fn test_extract_json_variants() {
        let plain = r#"{"steps": []}"#;
        assert_eq!(extract_json(plain), plain);
        assert_eq!(extract_json("```json\n{\"steps\": []}\n```"), plain);
        assert_eq!(extract_json("```\n{\"steps\": []}\n```"), plain);
        assert_eq!(extract_json("Aqui está: {\"steps\": []} pronto."), plain);
    }

    #[test]
    fn test_parse_chain() {
        let text = r#"```json
{"steps": [
  {"action": "identificar", "description": "pergunta sobre prazo", "result": ""},
  {"action": "concluir", "description": "consultar contrato", "result": "O prazo padrão é 30 dias.", "sources": ["contrato"]}
], "confidence": 1.7}
```"#;
        let chain = parse_chain(text, 42).unwrap();
        assert_eq!(chain.steps.len(), 2);
        assert_eq!(chain.steps[1].index, 2);
        assert_eq!(chain.steps[0].result, None);
        assert_eq!(chain.conclusion(), Some("O prazo padrão é 30 dias."));
        assert_eq!(chain.confidence, 1.0);
        assert_eq!(chain.elapsed_ms, 42);
    }

    #[test]
    fn test_parse_chain_rejects_garbage() {
        let err = parse_chain("não sei", 0).unwrap_err();
        assert!(matches!(err, CapabilityError::Parse { .. }));
    }

    #[test]
    fn test_completion_prompt_carries_snapshot_and_facts() {
        let context = CompletionContext {
            snapshot: BusinessSnapshot {
                open_orders: 7,
                customers: 120,
            },
            facts: vec!["last_intent: os_abertas".to_string()],
        };
        let prompt = completion_prompt("como melhorar o atendimento?", &context);
        assert!(prompt.contains("Ordens de serviço abertas: 7"));
        assert!(prompt.contains("Clientes cadastrados: 120"));
        assert!(prompt.contains("- last_intent: os_abertas"));
        assert!(prompt.ends_with("Pergunta: como melhorar o atendimento?"));
    }
}
