use thiserror::Error;

/// Failures of a tagged cache backend.
///
/// Repositories surface these as `RepositoryError::Cache`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    /// The backend answered with an error.
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A tag would not round-trip through a tagged key.
    #[error("Invalid cache tag {0:?}: tags must be non-empty and contain no ':' or '|'")]
    InvalidTag(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_display() {
        let error = CacheError::ConnectionFailed("timeout".to_string());
        assert_eq!(error.to_string(), "Cache connection failed: timeout");
    }

    #[test]
    fn test_operation_failed_display() {
        let error = CacheError::OperationFailed("WRONGTYPE".to_string());
        assert_eq!(error.to_string(), "Cache operation failed: WRONGTYPE");
    }

    #[test]
    fn test_invalid_tag_display() {
        let error = CacheError::InvalidTag("a|b".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid cache tag \"a|b\": tags must be non-empty and contain no ':' or '|'"
        );
    }
}
