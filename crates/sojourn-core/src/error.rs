use thiserror::Error;

/// Top-level error type for the Sojourn assistant.
///
/// Subsystem crates define their own error types (`RagError`, `ChatError`)
/// and convert into this one at the binary boundary, so the `?` operator
/// works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SojournError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SojournError {
    fn from(err: toml::de::Error) -> Self {
        SojournError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SojournError {
    fn from(err: toml::ser::Error) -> Self {
        SojournError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SojournError {
    fn from(err: serde_json::Error) -> Self {
        SojournError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sojourn operations.
pub type Result<T> = std::result::Result<T, SojournError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SojournError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_missing_credential_display() {
        let err = SojournError::MissingCredential("SEA_LION_API_KEY".to_string());
        assert_eq!(err.to_string(), "Missing credential: SEA_LION_API_KEY");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SojournError = io_err.into();
        assert!(matches!(err, SojournError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let converted: SojournError = err.unwrap_err().into();
        assert!(matches!(converted, SojournError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let converted: SojournError = err.unwrap_err().into();
        assert!(matches!(converted, SojournError::Serialization(_)));
    }

    #[test]
    fn test_display_all_variants() {
        let cases: Vec<(SojournError, &str)> = vec![
            (
                SojournError::Retrieval("index down".to_string()),
                "Retrieval error: index down",
            ),
            (
                SojournError::Completion("HTTP 502".to_string()),
                "Completion error: HTTP 502",
            ),
            (
                SojournError::Conversation("empty".to_string()),
                "Conversation error: empty",
            ),
            (
                SojournError::Serialization("bad json".to_string()),
                "Serialization error: bad json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
