//! Conversations, messages and reply metadata.

use crate::data::Row;
use crate::id::{ConversationId, KnowledgeId, MessageId};
use crate::intent::MatchRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Message typed by the operator
    User,
    /// Reply produced by the engine
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at`, never moving it backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }
}

/// One immutable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A user message.
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::User,
            content: content.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// An assistant message built from a reply.
    pub fn assistant(conversation_id: ConversationId, reply: Reply) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::Assistant,
            content: reply.text,
            metadata: Some(reply.metadata),
            created_at: Utc::now(),
        }
    }
}

/// Which branch produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Greeting,
    Help,
    Intent,
    Fallback,
}

/// Evidence behind a non-intent reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    KnowledgeBase,
    Reasoning,
    Web,
    Ai,
    /// Canned text, no external evidence.
    None,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::KnowledgeBase => "knowledge_base",
            Source::Reasoning => "reasoning",
            Source::Web => "web",
            Source::Ai => "ai",
            Source::None => "none",
        };
        f.write_str(name)
    }
}

/// How one fallback stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Answered,
    Continued,
    Skipped,
    Failed,
    TimedOut,
}

/// Audit record for one fallback stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAttempt {
    pub stage: String,
    pub status: StageStatus,
}

/// Audit trail of an assistant reply.
///
/// Every assistant reply carries either `intent` or `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub kind: ReplyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_rule: Option<MatchRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub web_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_entry: Option<KnowledgeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageAttempt>,
}

impl MessageMetadata {
    fn base(kind: ReplyKind) -> Self {
        Self {
            kind,
            intent: None,
            match_rule: None,
            parameter: None,
            row_count: None,
            rows: Vec::new(),
            source: None,
            confidence: 0.0,
            verified: false,
            reasoning: None,
            web_sources: Vec::new(),
            knowledge_entry: None,
            stages: Vec::new(),
        }
    }

    /// Greeting and help replies: canned, no data source.
    pub fn canned(kind: ReplyKind) -> Self {
        Self {
            source: Some(Source::None),
            ..Self::base(kind)
        }
    }

    /// An intent hit with the rows it retrieved.
    pub fn intent(
        intent: impl Into<String>,
        rule: MatchRule,
        parameter: impl Into<String>,
        rows: Vec<Row>,
    ) -> Self {
        let parameter = parameter.into();
        Self {
            intent: Some(intent.into()),
            match_rule: Some(rule),
            parameter: (!parameter.is_empty()).then_some(parameter),
            row_count: Some(rows.len()),
            rows,
            confidence: 1.0,
            verified: true,
            ..Self::base(ReplyKind::Intent)
        }
    }

    /// A fallback reply tagged with its source.
    pub fn fallback(source: Source) -> Self {
        Self {
            source: Some(source),
            ..Self::base(ReplyKind::Fallback)
        }
    }

    /// True if the reply is traceable to an intent or a source tag.
    pub fn is_auditable(&self) -> bool {
        self.intent.is_some() || self.source.is_some()
    }

    /// One-line audit summary, e.g. `intent=os_abertas rows=3`.
    pub fn audit_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(intent) = &self.intent {
            parts.push(format!("intent={intent}"));
        }
        if let Some(param) = &self.parameter {
            parts.push(format!("param={param}"));
        }
        if let Some(rows) = self.row_count {
            parts.push(format!("rows={rows}"));
        }
        if let Some(source) = self.source {
            parts.push(format!("source={source}"));
        }
        if self.kind == ReplyKind::Fallback {
            parts.push(format!("confidence={:.2}", self.confidence));
            if self.verified {
                parts.push("verified".to_string());
            }
        }
        parts.join(" ")
    }
}

/// Orchestrator output: reply text plus its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub metadata: MessageMetadata,
}

impl Reply {
    pub fn new(text: impl Into<String>, metadata: MessageMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    pub fn source(&self) -> Option<Source> {
        self.metadata.source
    }

    pub fn intent(&self) -> Option<&str> {
        self.metadata.intent.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_constructors_are_auditable() {
        assert!(MessageMetadata::canned(ReplyKind::Greeting).is_auditable());
        assert!(MessageMetadata::fallback(Source::Web).is_auditable());
        let hit = MessageMetadata::intent("os_abertas", MatchRule::Exact, "", Vec::new());
        assert!(hit.is_auditable());
        assert_eq!(hit.parameter, None);
        assert_eq!(hit.row_count, Some(0));
    }

    #[test]
    fn test_source_serialization() {
        assert_eq!(serde_json::to_string(&Source::KnowledgeBase).unwrap(), "\"knowledge_base\"");
        assert_eq!(Source::None.to_string(), "none");
    }

    #[test]
    fn test_audit_line() {
        let hit = MessageMetadata::intent("buscar_cliente", MatchRule::Contains, "Silva", Vec::new());
        assert_eq!(hit.audit_line(), "intent=buscar_cliente param=Silva rows=0");

        let mut fallback = MessageMetadata::fallback(Source::Ai);
        fallback.confidence = 0.25;
        assert_eq!(fallback.audit_line(), "source=ai confidence=0.25");
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut conversation = Conversation::new("Suporte");
        let before = conversation.updated_at;
        conversation.touch(before - chrono::Duration::seconds(5));
        assert_eq!(conversation.updated_at, before);
        conversation.touch(before + chrono::Duration::seconds(5));
        assert!(conversation.updated_at > before);
    }

    #[test]
    fn test_message_roundtrip_keeps_metadata() {
        let conversation = ConversationId::new();
        let reply = Reply::new("oi", MessageMetadata::canned(ReplyKind::Greeting));
        let message = Message::assistant(conversation, reply);
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
        assert_eq!(back.role, Role::Assistant);
    }
}
