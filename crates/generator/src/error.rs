use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while generating repository files.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Invalid entity name: {0:?}")]
    InvalidEntity(String),

    #[error("Invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },

    #[error("Invalid namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("Failed to render {template}: {message}")]
    Render {
        template: &'static str,
        message: String,
    },

    #[error("Failed to write {}: {}", .path.display(), .message)]
    Io { path: PathBuf, message: String },
}

impl GeneratorError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
