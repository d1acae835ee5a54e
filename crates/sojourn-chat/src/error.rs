//! Error types for the conversation layer.

use sojourn_core::error::SojournError;
use sojourn_rag::RagError;

use crate::intent::FlowKind;

/// Errors from processing a user turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("answer failed: {0}")]
    Answer(#[from] RagError),
    #[error("flow mismatch: expected {expected}, found {found}")]
    FlowMismatch { expected: FlowKind, found: String },
}

impl ChatError {
    /// Whether the turn can be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::Answer(_))
    }
}

impl From<ChatError> for SojournError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Answer(rag) => rag.into(),
            other => SojournError::Conversation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );

        let err = ChatError::FlowMismatch {
            expected: FlowKind::Scam,
            found: "remittance".to_string(),
        };
        assert_eq!(err.to_string(), "flow mismatch: expected scam, found remittance");
    }

    #[test]
    fn test_answer_error_from_rag() {
        let err: ChatError = RagError::Transport("timeout".to_string()).into();
        assert!(matches!(err, ChatError::Answer(_)));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("timeout"));
        assert!(!ChatError::EmptyMessage.is_retryable());
    }

    #[test]
    fn test_into_sojourn_error() {
        let err: SojournError = ChatError::EmptyMessage.into();
        assert!(matches!(err, SojournError::Conversation(_)));

        let err: SojournError = ChatError::Answer(RagError::HttpStatus {
            status: 502,
            body: String::new(),
        })
        .into();
        assert!(matches!(err, SojournError::Completion(_)));
    }
}
