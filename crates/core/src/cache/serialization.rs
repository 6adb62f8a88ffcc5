//! Pure functions for converting repository results to and from cache bytes.
//!
//! Values are stored as JSON, which keeps cached entries readable when
//! inspecting the backend by hand.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::CacheError;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

impl From<SerializationError> for CacheError {
    fn from(error: SerializationError) -> Self {
        CacheError::Serialization(error.to_string())
    }
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes a value to JSON bytes, or `None` when it serializes to `null`.
///
/// Absent results are not worth caching: a later read must go back to
/// storage in case the row has appeared.
pub fn serialize_cacheable<T: Serialize>(value: &T) -> Result<Option<Vec<u8>>> {
    let json =
        serde_json::to_value(value).map_err(|e| SerializationError::SerializeFailed(e.to_string()))?;
    if json.is_null() {
        return Ok(None);
    }
    serde_json::to_vec(&json)
        .map(Some)
        .map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

/// Returns true if the bytes hold JSON `null`.
pub fn is_null(bytes: &[u8]) -> bool {
    matches!(serde_json::from_slice::<Value>(bytes), Ok(Value::Null))
}
