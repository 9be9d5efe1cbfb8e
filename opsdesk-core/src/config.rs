//! Assistant configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! yields the stock configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::format::Locale;
use crate::intent::matcher::DEFAULT_SIMILARITY_THRESHOLD;
use crate::similarity::{SimilarityScorer, DEFAULT_DOMAIN_BONUS, DEFAULT_DOMAIN_TERMS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Intent matching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum similarity for the fuzzy rule (exclusive)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Bonus per shared domain term
    #[serde(default = "default_domain_bonus")]
    pub domain_bonus: f32,

    /// Business nouns that earn the bonus
    #[serde(default = "default_domain_terms")]
    pub domain_terms: Vec<String>,
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_domain_bonus() -> f32 {
    DEFAULT_DOMAIN_BONUS
}

fn default_domain_terms() -> Vec<String> {
    DEFAULT_DOMAIN_TERMS.iter().map(|t| t.to_string()).collect()
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            domain_bonus: default_domain_bonus(),
            domain_terms: default_domain_terms(),
        }
    }
}

impl MatchingConfig {
    /// Scorer built from these settings.
    pub fn scorer(&self) -> SimilarityScorer {
        SimilarityScorer::new(&self.domain_terms, self.domain_bonus)
    }
}

/// Fallback ladder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Knowledge entries fetched per lookup
    #[serde(default = "default_knowledge_limit")]
    pub knowledge_limit: usize,

    /// Entries below this relevance are ignored
    #[serde(default = "default_knowledge_min_relevance")]
    pub knowledge_min_relevance: f32,

    /// Web results requested per search
    #[serde(default = "default_web_max_results")]
    pub web_max_results: usize,

    /// Confidence added when local knowledge matched
    #[serde(default = "default_knowledge_bonus")]
    pub knowledge_bonus: f32,

    /// Weight of the mean web trust score in confidence
    #[serde(default = "default_web_trust_weight")]
    pub web_trust_weight: f32,

    /// Replies above this confidence are marked verified
    #[serde(default = "default_verified_threshold")]
    pub verified_threshold: f32,

    /// Minimum chain confidence for a reasoning-only answer
    #[serde(default = "default_reasoning_answer_confidence")]
    pub reasoning_answer_confidence: f32,

    /// Append the reasoning trace to fallback replies
    #[serde(default = "default_show_reasoning_trace")]
    pub show_reasoning_trace: bool,

    /// Upper bound for a single stage, in seconds
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Context memory facts passed to reasoning and completion
    #[serde(default = "default_memory_facts")]
    pub memory_facts: usize,
}

fn default_knowledge_limit() -> usize {
    3
}

fn default_knowledge_min_relevance() -> f32 {
    0.2
}

fn default_web_max_results() -> usize {
    3
}

fn default_knowledge_bonus() -> f32 {
    0.15
}

fn default_web_trust_weight() -> f32 {
    0.15
}

fn default_verified_threshold() -> f32 {
    0.8
}

fn default_reasoning_answer_confidence() -> f32 {
    0.6
}

fn default_show_reasoning_trace() -> bool {
    true
}

fn default_stage_timeout_secs() -> u64 {
    20
}

fn default_memory_facts() -> usize {
    5
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            knowledge_limit: default_knowledge_limit(),
            knowledge_min_relevance: default_knowledge_min_relevance(),
            web_max_results: default_web_max_results(),
            knowledge_bonus: default_knowledge_bonus(),
            web_trust_weight: default_web_trust_weight(),
            verified_threshold: default_verified_threshold(),
            reasoning_answer_confidence: default_reasoning_answer_confidence(),
            show_reasoning_trace: default_show_reasoning_trace(),
            stage_timeout_secs: default_stage_timeout_secs(),
            memory_facts: default_memory_facts(),
        }
    }
}

impl FallbackConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs.max(1))
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub locale: Locale,
}

impl AssistantConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values outside their meaningful range.
    pub fn validate(&self) -> ConfigResult<()> {
        let unit = |name: &str, value: f32| -> ConfigResult<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {value}")))
            }
        };

        unit("matching.similarity_threshold", self.matching.similarity_threshold)?;
        unit("matching.domain_bonus", self.matching.domain_bonus)?;
        unit("fallback.knowledge_min_relevance", self.fallback.knowledge_min_relevance)?;
        unit("fallback.knowledge_bonus", self.fallback.knowledge_bonus)?;
        unit("fallback.web_trust_weight", self.fallback.web_trust_weight)?;
        unit("fallback.verified_threshold", self.fallback.verified_threshold)?;
        unit("fallback.reasoning_answer_confidence", self.fallback.reasoning_answer_confidence)?;

        if self.fallback.knowledge_limit == 0 {
            return Err(ConfigError::Invalid("fallback.knowledge_limit must be at least 1".into()));
        }
        if self.locale.decimal_separator == self.locale.thousands_separator {
            return Err(ConfigError::Invalid(
                "locale decimal and thousands separators must differ".into(),
            ));
        }
        Ok(())
    }
}
