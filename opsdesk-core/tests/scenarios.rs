//! End-to-end conversations against the built-in catalog.
//!
//! Everything runs through `TestHarness`, so no network access is needed.

use opsdesk_core::fallback::canned::{GREETING_TEMPLATES, HELP_TEXT};
use opsdesk_core::message::{MessageMetadata, ReplyKind, Source, StageStatus};
use opsdesk_core::testing::{
    RecordingDataSource, ScriptedCompletion, ScriptedReasoner, ScriptedWebSearch, TestHarness,
};
use serde_json::json;
use std::sync::Arc;

fn metadata(message: &opsdesk_core::Message) -> &MessageMetadata {
    message.metadata.as_ref().expect("assistant messages carry metadata")
}

fn stage_status(metadata: &MessageMetadata, stage: &str) -> Option<StageStatus> {
    metadata.stages.iter().find(|a| a.stage == stage).map(|a| a.status)
}

#[tokio::test]
async fn test_greeting() {
    let harness = TestHarness::builder().build().await.unwrap();

    let reply = harness.say("oi").await.unwrap();

    assert!(GREETING_TEMPLATES.contains(&reply.content.as_str()));
    let meta = metadata(&reply);
    assert_eq!(meta.kind, ReplyKind::Greeting);
    assert_eq!(meta.source, Some(Source::None));
    assert!(meta.intent.is_none());
    // No data access for greetings
    assert!(harness.data.calls().is_empty());
}

#[tokio::test]
async fn test_help() {
    let harness = TestHarness::builder().build().await.unwrap();

    let reply = harness.say("ajuda").await.unwrap();

    assert_eq!(reply.content, HELP_TEXT);
    assert_eq!(metadata(&reply).kind, ReplyKind::Help);
    assert!(harness.data.calls().is_empty());
}

#[tokio::test]
async fn test_low_stock_listing() {
    let data = RecordingDataSource::new().with_rows(
        "produtos",
        vec![
            json!({"nome": "Cabo flexível 2,5mm", "quantidade": 3, "estoque_minimo": 20}),
            json!({"nome": "Disjuntor 20A", "quantidade": 40, "estoque_minimo": 10}),
            json!({"nome": "Fita isolante", "quantidade": 0, "estoque_minimo": 5}),
        ],
    );
    let harness = TestHarness::builder().data(data).build().await.unwrap();

    let reply = harness.say("Estoque baixo").await.unwrap();

    assert_eq!(
        reply.content,
        "📦 Encontrei 2 produto(s) com estoque baixo:\n\
         ⚠️ Cabo flexível 2,5mm: 3 un. (mínimo 20)\n\
         ⚠️ Fita isolante: 0 un. (mínimo 5)"
    );
    let meta = metadata(&reply);
    assert_eq!(meta.intent.as_deref(), Some("estoque_baixo"));
    assert_eq!(meta.row_count, Some(2));
    assert_eq!(meta.rows.len(), 2);
    assert_eq!(harness.data.operations_called(), vec!["produtos"]);
}

#[tokio::test]
async fn test_low_stock_empty_message() {
    let harness = TestHarness::builder().build().await.unwrap();

    let reply = harness.say("estoque baixo").await.unwrap();

    assert_eq!(reply.content, "✅ Nenhum produto com estoque baixo. Estoque em dia!");
    assert_eq!(metadata(&reply).row_count, Some(0));
}

#[tokio::test]
async fn test_overview_renders_every_figure() {
    let data = RecordingDataSource::new()
        .with_rows("clientes", vec![json!({"nome": "Silva"}), json!({"nome": "Souza"})])
        .with_rows(
            "ordens_servico",
            vec![json!({"numero": "OS-7", "cliente": "Silva", "status": "aberta"})],
        );
    let harness = TestHarness::builder().data(data).build().await.unwrap();

    let reply = harness.say("resumo geral").await.unwrap();

    assert_eq!(metadata(&reply).intent.as_deref(), Some("resumo_geral"));
    assert!(reply.content.starts_with("📊 Resumo geral:"), "{}", reply.content);
    assert!(reply.content.contains("• OS abertas: 1"), "{}", reply.content);
    assert!(reply.content.contains("• Clientes: 2"), "{}", reply.content);
    assert!(reply.content.contains("• Produtos com estoque baixo: 0"), "{}", reply.content);
    assert!(!reply.content.contains(": -"), "{}", reply.content);
}

#[tokio::test]
async fn test_customer_search_extracts_parameter() {
    let harness = TestHarness::builder().build().await.unwrap();

    let reply = harness.say("buscar cliente Silva").await.unwrap();

    let calls = harness.data.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "clientes");
    assert_eq!(calls[0].1["nome"], json!("Silva"));

    let meta = metadata(&reply);
    assert_eq!(meta.intent.as_deref(), Some("buscar_cliente"));
    assert_eq!(meta.parameter.as_deref(), Some("Silva"));
    assert_eq!(reply.content, "🔎 Cliente não encontrado. Confira o nome e tente novamente.");
}

#[tokio::test]
async fn test_weather_goes_to_web_then_completion() {
    let web = Arc::new(ScriptedWebSearch::empty());
    let completion = Arc::new(ScriptedCompletion::new("Não tenho a previsão do tempo, mas posso ajudar com a agenda."));
    let harness = TestHarness::builder()
        .web(web.clone())
        .completion(completion.clone())
        .build()
        .await
        .unwrap();

    let reply = harness.say("qual o clima hoje").await.unwrap();

    assert_eq!(web.queries(), vec![("qual o clima hoje".to_string(), "clima".to_string())]);
    assert_eq!(completion.prompts().len(), 1);

    let meta = metadata(&reply);
    assert!(meta.intent.is_none());
    assert_eq!(meta.kind, ReplyKind::Fallback);
    assert_eq!(meta.source, Some(Source::Ai));
    assert_eq!(stage_status(meta, "web"), Some(StageStatus::Continued));
    assert_eq!(stage_status(meta, "completion"), Some(StageStatus::Answered));
    assert!(reply.content.contains("previsão do tempo"));
}

#[tokio::test]
async fn test_weather_answered_from_web() {
    let web = Arc::new(ScriptedWebSearch::new(vec![ScriptedWebSearch::result(
        "Previsão São Paulo",
        "Sol com nuvens, máxima de 27°C",
        "clima.example",
        0.9,
    )]));
    let harness = TestHarness::builder().web(web).build().await.unwrap();

    let reply = harness.say("qual o clima hoje").await.unwrap();

    let meta = metadata(&reply);
    assert_eq!(meta.source, Some(Source::Web));
    assert_eq!(meta.web_sources.len(), 1);
    assert!((meta.confidence - 0.9 * 0.15).abs() < 1e-6);
    assert!(!meta.verified);
    assert!(reply.content.contains("Sol com nuvens"));

    // Fresh web results are cached in the knowledge base
    assert_eq!(harness.knowledge.len().await, 1);
}

#[tokio::test]
async fn test_repeated_low_confidence_input_is_reproducible() {
    let harness = TestHarness::builder()
        .reasoner(Arc::new(ScriptedReasoner::concluding("Talvez.", 0.3)))
        .completion(Arc::new(ScriptedCompletion::new("Não sei responder isso.")))
        .build()
        .await
        .unwrap();

    let first = harness.say("xyzzy plugh quux").await.unwrap();
    let second = harness.say("xyzzy plugh quux").await.unwrap();

    let (a, b) = (metadata(&first), metadata(&second));
    assert_eq!(a.source, Some(Source::Ai));
    assert_eq!(a.source, b.source);
    assert_eq!(a.intent, b.intent);
    assert_eq!(a.confidence, b.confidence);
    assert_eq!(a.stages, b.stages);
}

#[tokio::test]
async fn test_every_reply_is_auditable() {
    let harness = TestHarness::builder().build().await.unwrap();

    for line in ["oi", "ajuda", "os abertas", "resumo geral", "algo totalmente desconhecido", ""] {
        harness.say(line).await.unwrap();
    }

    let history = harness.history().await.unwrap();
    assert_eq!(history.len(), 12);
    for message in history.iter().filter(|m| m.metadata.is_some()) {
        let meta = metadata(message);
        assert!(meta.is_auditable(), "unauditable reply: {}", message.content);
        assert!(!message.content.is_empty());
    }
}
