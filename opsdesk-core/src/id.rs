//! Type-safe ID types.
//!
//! Newtypes over UUID so a conversation id can never be passed where a
//! message or knowledge entry id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around UUID
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// All-zeros ID for fixtures.
            #[cfg(test)]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.0.to_string()[..8])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(
    /// Unique identifier for a conversation
    ConversationId
);

define_id!(
    /// Unique identifier for a message
    MessageId
);

define_id!(
    /// Unique identifier for a knowledge base entry
    KnowledgeId
);

define_id!(
    /// Unique identifier for a context memory entry
    MemoryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        assert_ne!(ConversationId::new(), ConversationId::new());
    }

    #[test]
    fn test_id_nil_is_fixed() {
        assert_eq!(MessageId::nil(), MessageId::nil());
        assert_ne!(MessageId::nil(), MessageId::new());
    }

    #[test]
    fn test_id_from_str() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: ConversationId = uuid_str.parse().unwrap();
        assert_eq!(id.to_string(), uuid_str);
        assert!("not-a-uuid".parse::<ConversationId>().is_err());
    }

    #[test]
    fn test_id_debug_format() {
        let debug = format!("{:?}", KnowledgeId::nil());
        assert_eq!(debug, "KnowledgeId(00000000)");
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = MemoryId::nil();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let parsed: MemoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
