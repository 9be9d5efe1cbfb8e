//! Intent catalog, matching and parameter extraction.
//!
//! A catalog is plain configuration data. The engine receives it as a
//! read-only snapshot per request and never mutates it. Declaration order is
//! significant: it is the tie-break whenever several intents could claim the
//! same utterance.

mod builtin;
pub mod extract;
pub mod matcher;

pub use extract::extract_parameter;
pub use matcher::{match_intent, IntentMatch, IntentMatcher, MatchRule};

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A keyword-triggered request category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Unique name, e.g. `buscar_cliente`.
    pub name: String,
    /// Trigger phrases. May overlap with other intents.
    pub keywords: Vec<String>,
    /// Dispatcher key. Defaults to the intent name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_template: Option<String>,
    /// Formatter key. Defaults to the intent name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_template: Option<String>,
    /// Inactive intents are ignored by the matcher.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Intent {
    /// Create an active intent with the given keywords.
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            query_template: None,
            response_template: None,
            active: true,
        }
    }

    /// Route dispatch through a different query key.
    pub fn with_query_template(mut self, key: impl Into<String>) -> Self {
        self.query_template = Some(key.into());
        self
    }

    /// Render through a different response key.
    pub fn with_response_template(mut self, key: impl Into<String>) -> Self {
        self.response_template = Some(key.into());
        self
    }

    /// Mark the intent inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Key used by the query dispatcher.
    pub fn query_key(&self) -> &str {
        self.query_template.as_deref().unwrap_or(&self.name)
    }

    /// Key used by the response formatter.
    pub fn response_key(&self) -> &str {
        self.response_template.as_deref().unwrap_or(&self.name)
    }
}

/// An ordered, read-only set of intents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentCatalog {
    #[serde(rename = "intent", default)]
    intents: Vec<Intent>,
}

impl IntentCatalog {
    /// Build a catalog preserving the given order.
    pub fn new(intents: Vec<Intent>) -> Self {
        Self { intents }
    }

    /// The catalog shipped with the engine.
    pub fn builtin() -> Self {
        Self::new(
            builtin::BUILTIN_INTENTS
                .iter()
                .map(|(name, keywords)| Intent::new(*name, keywords.iter().copied()))
                .collect(),
        )
    }

    /// Parse a catalog from TOML (`[[intent]]` tables).
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let catalog: Self = toml::from_str(source)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a catalog from a JSON array of intents.
    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        let intents: Vec<Intent> = serde_json::from_str(source)?;
        let catalog = Self::new(intents);
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file; `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }

    /// All intents in declaration order, active or not.
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    /// Active intents with their declaration index.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Intent)> {
        self.intents.iter().enumerate().filter(|(_, i)| i.active)
    }

    /// Look up an intent by name.
    pub fn get(&self, name: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.name == name)
    }

    /// Number of intents, active or not.
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// True if the catalog has no intents.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    fn validate(&self) -> ConfigResult<()> {
        let mut seen = std::collections::HashSet::new();
        for intent in &self.intents {
            if intent.name.trim().is_empty() {
                return Err(ConfigError::Invalid("intent with empty name".to_string()));
            }
            if !seen.insert(intent.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate intent name: {}",
                    intent.name
                )));
            }
            if intent.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "intent {} has no keywords",
                    intent.name
                )));
            }
        }
        Ok(())
    }
}
