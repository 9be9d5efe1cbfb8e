//! Error types for the assistant engine.
//!
//! Only persistence errors ever reach the caller of a chat turn. Data and
//! capability errors are produced here so adapters have something typed to
//! return, and are then logged and absorbed by the dispatcher and the
//! fallback ladder.

use crate::id::ConversationId;
use std::path::PathBuf;
use std::time::Duration;

/// Main error type for the engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Data-access error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// External capability error
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    /// Conversation storage error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the external data-access capability
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The named operation failed in the data layer
    #[error("Operation '{operation}' failed: {reason}")]
    Operation { operation: String, reason: String },

    /// The data layer does not know this operation
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The data layer could not be reached
    #[error("Data layer unavailable: {0}")]
    Unavailable(String),
}

/// Errors from knowledge, reasoning, web-search and completion capabilities
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// Capability is not configured or not reachable
    #[error("{capability} unavailable: {reason}")]
    Unavailable { capability: String, reason: String },

    /// Capability call failed
    #[error("{capability} failed: {reason}")]
    Failed { capability: String, reason: String },

    /// Capability did not answer in time
    #[error("{capability} timed out after {duration:?}")]
    Timeout {
        capability: String,
        duration: Duration,
    },

    /// Capability answered with something we could not interpret
    #[error("Could not parse {capability} response: {reason}")]
    Parse { capability: String, reason: String },
}

impl CapabilityError {
    /// Shorthand for a failed call.
    pub fn failed(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an unreachable or unconfigured capability.
    pub fn unavailable(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            capability: capability.into(),
            reason: reason.into(),
        }
    }
}

impl From<claude::Error> for CapabilityError {
    fn from(err: claude::Error) -> Self {
        match err {
            claude::Error::NoApiKey => Self::unavailable("claude", "no API key configured"),
            claude::Error::Parse(reason) => Self::Parse {
                capability: "claude".to_string(),
                reason,
            },
            other => Self::failed("claude", other.to_string()),
        }
    }
}

/// Errors from conversation persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Conversation does not exist
    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors while loading configuration or intent catalogs
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON did not parse
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Values parsed but are inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for data-access operations
pub type DataResult<T> = std::result::Result<T, DataError>;

/// Result type for capability calls
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Result type for conversation storage
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataError::Operation {
            operation: "list_low_stock".to_string(),
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Operation 'list_low_stock' failed: connection reset"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = StoreError::ConversationNotFound(ConversationId::nil()).into();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_claude_error_mapping() {
        let err: CapabilityError = claude::Error::NoApiKey.into();
        assert!(matches!(err, CapabilityError::Unavailable { .. }));

        let err: CapabilityError = claude::Error::Network("reset".into()).into();
        assert!(matches!(err, CapabilityError::Failed { .. }));
    }
}
