//! Fallback ladder behavior: evidence priority, confidence, failures and
//! timeouts.

use opsdesk_core::capabilities::KnowledgeEntry;
use opsdesk_core::config::{AssistantConfig, FallbackConfig};
use opsdesk_core::fallback::canned::{APOLOGY_TEXT, SUGGESTIONS_TEXT};
use opsdesk_core::message::{MessageMetadata, Source, StageStatus};
use opsdesk_core::testing::{
    FailingCapability, RecordingDataSource, ScriptedCompletion, ScriptedReasoner, SlowCompletion,
    TestHarness,
};
use opsdesk_core::{Intent, IntentCatalog};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn small_catalog() -> IntentCatalog {
    IntentCatalog::new(vec![Intent::new("os_abertas", ["os abertas"])])
}

fn metadata(message: &opsdesk_core::Message) -> MessageMetadata {
    message.metadata.clone().expect("assistant messages carry metadata")
}

fn statuses(metadata: &MessageMetadata) -> Vec<(&str, StageStatus)> {
    metadata
        .stages
        .iter()
        .map(|a| (a.stage.as_str(), a.status))
        .collect()
}

fn warranty() -> KnowledgeEntry {
    KnowledgeEntry::new(
        "garantia",
        "Política de garantia",
        "Serviços têm garantia de 90 dias a partir da conclusão da OS.",
    )
}

#[tokio::test]
async fn test_no_capabilities_gives_suggestions() {
    let harness = TestHarness::builder().catalog(small_catalog()).build().await.unwrap();

    let reply = harness.say("quanto custa um elefante").await.unwrap();

    assert_eq!(reply.content, SUGGESTIONS_TEXT);
    let meta = metadata(&reply);
    assert_eq!(meta.source, Some(Source::None));
    assert_eq!(meta.confidence, 0.0);
    assert_eq!(
        statuses(&meta),
        vec![
            ("knowledge", StageStatus::Continued),
            ("reasoning", StageStatus::Skipped),
            ("web", StageStatus::Skipped),
            ("synthesis", StageStatus::Skipped),
            ("completion", StageStatus::Skipped),
            ("canned", StageStatus::Answered),
        ]
    );
}

#[tokio::test]
async fn test_everything_failing_gives_apology() {
    let failing = Arc::new(FailingCapability);
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .failing_knowledge()
        .reasoner(failing.clone())
        .web(failing.clone())
        .completion(failing)
        .build()
        .await
        .unwrap();

    let reply = harness.say("quando abre a loja").await.unwrap();

    assert_eq!(reply.content, APOLOGY_TEXT);
    let meta = metadata(&reply);
    assert_eq!(meta.source, Some(Source::None));
    assert_eq!(meta.confidence, 0.0);
    assert!(!meta.verified);
    assert_eq!(
        statuses(&meta),
        vec![
            ("knowledge", StageStatus::Failed),
            ("reasoning", StageStatus::Failed),
            ("web", StageStatus::Failed),
            ("synthesis", StageStatus::Skipped),
            ("completion", StageStatus::Failed),
            ("canned", StageStatus::Answered),
        ]
    );
}

#[tokio::test]
async fn test_knowledge_hit_is_surfaced_and_counted() {
    let entry = warranty();
    let id = entry.id;
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .knowledge(vec![entry])
        .build()
        .await
        .unwrap();

    let reply = harness.say("politica de garantia").await.unwrap();

    let meta = metadata(&reply);
    assert_eq!(meta.source, Some(Source::KnowledgeBase));
    assert_eq!(meta.knowledge_entry, Some(id));
    assert!((meta.confidence - 0.15).abs() < 1e-6);
    assert!(reply.content.starts_with("📚 Política de garantia"));

    assert_eq!(harness.knowledge.get(id).await.unwrap().views, 1);
    let logs = harness.knowledge.search_logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].surfaced, Some(id));
}

#[tokio::test]
async fn test_knowledge_answer_survives_failed_bookkeeping() {
    let entry = warranty();
    let id = entry.id;
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .knowledge(vec![entry])
        .read_only_knowledge()
        .build()
        .await
        .unwrap();

    let reply = harness.say("politica de garantia").await.unwrap();

    let meta = metadata(&reply);
    assert_eq!(meta.source, Some(Source::KnowledgeBase));
    assert_eq!(meta.knowledge_entry, Some(id));
    assert!(reply.content.starts_with("📚 Política de garantia"));
    assert_eq!(statuses(&meta)[0], ("knowledge", StageStatus::Continued));

    // Nothing was written through the read-only store
    assert_eq!(harness.knowledge.get(id).await.unwrap().views, 0);
    assert!(harness.knowledge.search_logs().await.is_empty());
}

#[tokio::test]
async fn test_knowledge_and_reasoning_are_verified() {
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .knowledge(vec![warranty()])
        .reasoner(Arc::new(ScriptedReasoner::concluding("A garantia é de 90 dias.", 0.7)))
        .build()
        .await
        .unwrap();

    let reply = harness.say("politica de garantia").await.unwrap();

    let meta = metadata(&reply);
    assert_eq!(meta.source, Some(Source::KnowledgeBase));
    assert!((meta.confidence - 0.85).abs() < 1e-6);
    assert!(meta.verified);
    assert!(reply.content.contains("🧠 Raciocínio:"));
    assert!(meta.reasoning.is_some());
    assert_eq!(harness.knowledge.reasoning_logs().await.len(), 1);
}

#[tokio::test]
async fn test_confident_reasoning_answers_alone() {
    let config = AssistantConfig {
        fallback: FallbackConfig {
            show_reasoning_trace: false,
            ..FallbackConfig::default()
        },
        ..AssistantConfig::default()
    };
    let completion = Arc::new(ScriptedCompletion::new("não deveria ser chamado"));
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .config(config)
        .reasoner(Arc::new(ScriptedReasoner::concluding("Recomendo revisar o contrato.", 0.6)))
        .completion(completion.clone())
        .build()
        .await
        .unwrap();

    let reply = harness.say("devo renovar o contrato da empresa").await.unwrap();

    assert_eq!(reply.content, "🧠 Recomendo revisar o contrato.");
    assert_eq!(metadata(&reply).source, Some(Source::Reasoning));
    assert!(completion.prompts().is_empty());
}

#[tokio::test]
async fn test_weak_reasoning_falls_through_to_completion() {
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .reasoner(Arc::new(ScriptedReasoner::concluding("Talvez.", 0.59)))
        .completion(Arc::new(ScriptedCompletion::new("Vale conversar com o comercial.")))
        .build()
        .await
        .unwrap();

    let reply = harness.say("devo renovar o contrato da empresa").await.unwrap();

    let meta = metadata(&reply);
    assert_eq!(meta.source, Some(Source::Ai));
    assert!((meta.confidence - 0.59).abs() < 1e-6);
    assert!(reply.content.starts_with("🤖 Vale conversar com o comercial."));
}

#[tokio::test]
async fn test_slow_stage_times_out() {
    let config = AssistantConfig {
        fallback: FallbackConfig {
            stage_timeout_secs: 1,
            ..FallbackConfig::default()
        },
        ..AssistantConfig::default()
    };
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .config(config)
        .failing_knowledge()
        .completion(Arc::new(SlowCompletion {
            delay: Duration::from_secs(3),
        }))
        .build()
        .await
        .unwrap();

    let reply = harness.say("pergunta demorada").await.unwrap();

    let meta = metadata(&reply);
    assert_eq!(reply.content, APOLOGY_TEXT);
    assert!(statuses(&meta).contains(&("completion", StageStatus::TimedOut)));
}

#[tokio::test]
async fn test_completion_is_grounded_on_snapshot_and_memory() {
    let data = RecordingDataSource::new()
        .with_rows(
            "ordens_servico",
            vec![
                json!({"numero": "OS-101", "status": "aberta", "cliente": "Silva"}),
                json!({"numero": "OS-102", "status": "aberta", "cliente": "Souza"}),
            ],
        )
        .with_rows("clientes", vec![json!({"nome": "Silva"}), json!({"nome": "Souza"}), json!({"nome": "Lima"})]);
    let completion = Arc::new(ScriptedCompletion::new("Priorize a OS-101."));
    let harness = TestHarness::builder()
        .catalog(small_catalog())
        .data(data)
        .completion(completion.clone())
        .build()
        .await
        .unwrap();

    harness.say("os abertas").await.unwrap();
    harness.say("qual atender primeiro").await.unwrap();

    let prompts = completion.prompts();
    assert_eq!(prompts.len(), 1);
    let (prompt, grounding) = &prompts[0];
    assert_eq!(prompt, "qual atender primeiro");
    assert_eq!(grounding.snapshot.open_orders, 2);
    assert_eq!(grounding.snapshot.customers, 3);
    assert!(grounding.facts.contains(&"last_intent: os_abertas".to_string()));
}
