//! Error types for retrieval and completion.

use sojourn_core::error::SojournError;

/// Errors from the external index and text-generation services.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RagError::Transport(format!("request timed out: {}", err))
        } else if err.is_decode() {
            RagError::Decode(err.to_string())
        } else {
            RagError::Transport(err.to_string())
        }
    }
}

impl From<RagError> for SojournError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Retrieval(msg) => SojournError::Retrieval(msg),
            RagError::Config(msg) => SojournError::Config(msg),
            other => SojournError::Completion(other.to_string()),
        }
    }
}
