use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the search platform
#[derive(Error, Debug)]
pub enum SearchError {
    /// Search engine unreachable or overloaded; safe to retry with backoff
    #[error("Search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// An engine-facing call exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Document rejected by the index schema; retrying cannot succeed
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Reference to a nonexistent search, click, or subject id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed filter, sort, or pagination input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Index or store setup failed; fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Queue or history backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SearchError {
    /// Whether the indexer should retry the failed entry on a later tick
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SearchError::EngineUnavailable(_)
                | SearchError::Timeout(_)
                | SearchError::Storage(_)
                | SearchError::Io(_)
        )
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            SearchError::EngineUnavailable(_) => "ENGINE_UNAVAILABLE",
            SearchError::Timeout(_) => "TIMEOUT",
            SearchError::InvalidDocument(_) => "INVALID_DOCUMENT",
            SearchError::NotFound(_) => "NOT_FOUND",
            SearchError::Validation(_) => "VALIDATION_ERROR",
            SearchError::Configuration(_) => "CONFIGURATION_ERROR",
            SearchError::Storage(_) => "STORAGE_ERROR",
            SearchError::Io(_) => "IO_ERROR",
            SearchError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for SearchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SearchError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type SearchResult<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SearchError::EngineUnavailable("down".to_string()).is_transient());
        assert!(SearchError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(!SearchError::InvalidDocument("bad".to_string()).is_transient());
        assert!(!SearchError::NotFound("missing".to_string()).is_transient());
        assert!(!SearchError::Validation("bad input".to_string()).is_transient());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SearchError::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            SearchError::Validation("test".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            SearchError::EngineUnavailable("test".to_string()).error_code(),
            "ENGINE_UNAVAILABLE"
        );
    }
}
