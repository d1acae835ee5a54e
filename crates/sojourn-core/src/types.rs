//! Shared domain types for retrieval, answering, and conversation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Source attribution
// =============================================================================

/// Where a retrieved passage came from.
///
/// Chosen from passage metadata in fixed priority order:
/// file name, then generic source field, then document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceId {
    FileName(String),
    Source(String),
    DocumentId(String),
    Unknown,
}

impl SourceId {
    /// Normalize arbitrary passage metadata into a source identifier.
    pub fn from_metadata(metadata: Option<&Map<String, Value>>) -> Self {
        let Some(md) = metadata else {
            return SourceId::Unknown;
        };

        let field = |key: &str| -> Option<String> {
            match md.get(key)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };

        if let Some(name) = field("file_name") {
            SourceId::FileName(name)
        } else if let Some(source) = field("source") {
            SourceId::Source(source)
        } else if let Some(doc) = field("document_id") {
            SourceId::DocumentId(doc)
        } else {
            SourceId::Unknown
        }
    }

    /// The raw identifier, or `"unknown"`.
    pub fn as_str(&self) -> &str {
        match self {
            SourceId::FileName(s) | SourceId::Source(s) | SourceId::DocumentId(s) => s,
            SourceId::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Retrieval
// =============================================================================

/// A single retrieved passage with its attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: SourceId,
}

impl Passage {
    pub fn new(text: impl Into<String>, source: SourceId) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// Ranked passages for one query. Produced fresh per query, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub passages: Vec<Passage>,
}

impl RetrievalResult {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Source identifiers in ranked order (one per passage, duplicates kept).
    pub fn sources(&self) -> Vec<String> {
        self.passages
            .iter()
            .map(|p| p.source.as_str().to_string())
            .collect()
    }
}

// =============================================================================
// Answering
// =============================================================================

/// Outcome of one answer engine call. Immutable, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub used_rag: bool,
    /// Sources of the original retrieval, before gating.
    pub sources: Vec<String>,
    pub fallback_used: bool,
}

impl AnswerResult {
    pub fn grounded(answer: String, sources: Vec<String>) -> Self {
        Self {
            answer,
            used_rag: true,
            sources,
            fallback_used: false,
        }
    }

    pub fn fallback(answer: String, sources: Vec<String>) -> Self {
        Self {
            answer,
            used_rag: false,
            sources,
            fallback_used: true,
        }
    }
}

/// Speaker of a message or conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role-tagged message sent to the text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// How an assistant turn was produced, shown next to the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingLabel {
    /// Answered from retrieved passages.
    Grounded,
    /// Answered from general knowledge.
    Fallback,
    /// A flow prompt; the answer engine was not called.
    Conversational,
}

impl GroundingLabel {
    pub fn for_answer(used_rag: bool) -> Self {
        if used_rag {
            GroundingLabel::Grounded
        } else {
            GroundingLabel::Fallback
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroundingLabel::Grounded => "Answer grounded in uploaded context ✅",
            GroundingLabel::Fallback => "General knowledge fallback ⚠️",
            GroundingLabel::Conversational => "",
        }
    }
}

impl fmt::Display for GroundingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub grounding_label: String,
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            grounding_label: String::new(),
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        label: GroundingLabel,
        sources: Vec<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            grounding_label: label.as_str().to_string(),
            sources,
            created_at: Utc::now(),
        }
    }
}
