//! OpsDesk operations assistant console.
//!
//! A line-oriented interface to the assistant engine, backed by JSON
//! fixtures. Suitable for operators and for scripted smoke tests:
//!
//! ```bash
//! cargo run -p opsdesk -- --data fixtures/data.json --knowledge fixtures/knowledge.json
//! ```
//!
//! Set `ANTHROPIC_API_KEY` (environment or `.env`) to enable the reasoning
//! and completion stages.

mod repl;

use opsdesk_core::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "opsdesk=info,opsdesk_core=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let options = ConsoleOptions::from_args(&args);
    let session = options.build_session().await?;
    repl::run(session).await?;
    Ok(())
}

/// Paths given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
struct ConsoleOptions {
    config: Option<PathBuf>,
    intents: Option<PathBuf>,
    data: Option<PathBuf>,
    knowledge: Option<PathBuf>,
    store: Option<PathBuf>,
}

impl ConsoleOptions {
    fn from_args(args: &[String]) -> Self {
        let mut options = Self::default();

        let mut i = 0;
        while i < args.len() {
            let slot = match args[i].as_str() {
                "--config" => Some(&mut options.config),
                "--intents" => Some(&mut options.intents),
                "--data" => Some(&mut options.data),
                "--knowledge" => Some(&mut options.knowledge),
                "--store" => Some(&mut options.store),
                _ => None,
            };
            if let (Some(slot), Some(value)) = (slot, args.get(i + 1)) {
                *slot = Some(PathBuf::from(value));
                i += 1;
            }
            i += 1;
        }

        options
    }

    async fn build_session(&self) -> Result<SessionManager, Box<dyn std::error::Error>> {
        let config = match &self.config {
            Some(path) => AssistantConfig::load(path)?,
            None => AssistantConfig::default(),
        };

        let catalog = match &self.intents {
            Some(path) => IntentCatalog::load(path)?,
            None => IntentCatalog::builtin(),
        };

        let data = match &self.data {
            Some(path) => StaticDataSource::load_json(path).await?,
            None => {
                warn!("no --data fixture given, every query will come back empty");
                StaticDataSource::new()
            }
        };

        let knowledge = match &self.knowledge {
            Some(path) => InMemoryKnowledgeBase::load_json(path).await?,
            None => InMemoryKnowledgeBase::new(),
        };

        let store: Arc<dyn ConversationStore> = match &self.store {
            Some(path) => Arc::new(JsonFileConversationStore::open(path).await?),
            None => Arc::new(InMemoryConversationStore::new()),
        };

        let mut builder = Orchestrator::builder(Arc::new(data))
            .config(config)
            .knowledge(Arc::new(knowledge))
            .memory(Arc::new(InMemoryContextMemory::new()));

        match claude::Claude::from_env() {
            Ok(client) => {
                info!(model = client.model(), "AI reasoning and completion enabled");
                builder = builder
                    .reasoner(Arc::new(ClaudeReasoner::new(client.clone())))
                    .completion(Arc::new(ClaudeCompletion::new(client)));
            }
            Err(err) => info!(reason = %err, "AI stages disabled"),
        }

        info!(intents = catalog.len(), "assistant ready");
        Ok(SessionManager::new(builder.build(), store, catalog))
    }
}

fn print_help() {
    println!("OpsDesk - operations assistant console");
    println!();
    println!("Usage: opsdesk [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>     Assistant configuration (TOML)");
    println!("  --intents <PATH>    Intent catalog (TOML or JSON), built-in if omitted");
    println!("  --data <PATH>       Data fixture: operation name -> rows (JSON)");
    println!("  --knowledge <PATH>  Knowledge base entries (JSON)");
    println!("  --store <PATH>      Persist conversations to this JSON file");
    println!("  -h, --help          Show this help");
    println!();
    println!("Environment:");
    println!("  ANTHROPIC_API_KEY   Enables the reasoning and completion stages");
    println!("  RUST_LOG            Log filter (default: {DEFAULT_LOG_FILTER})");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_all_paths() {
        let options = ConsoleOptions::from_args(&args(
            "opsdesk --config a.toml --intents i.toml --data d.json --knowledge k.json --store s.json",
        ));
        assert_eq!(options.config, Some(PathBuf::from("a.toml")));
        assert_eq!(options.intents, Some(PathBuf::from("i.toml")));
        assert_eq!(options.data, Some(PathBuf::from("d.json")));
        assert_eq!(options.knowledge, Some(PathBuf::from("k.json")));
        assert_eq!(options.store, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn test_missing_value_and_unknown_flags_are_ignored() {
        let options = ConsoleOptions::from_args(&args("opsdesk --verbose --data"));
        assert_eq!(options, ConsoleOptions::default());
    }
}
