/// Merger error types
use std::path::PathBuf;
use thiserror::Error;

pub type MergeResult<T> = Result<T, MergeError>;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("missing dependency '{item}'{}", .required_by.as_ref().map(|r| format!(" (required by '{}')", r)).unwrap_or_default())]
    MissingDependency {
        item: String,
        required_by: Option<String>,
    },

    #[error("circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("invalid merge config: {0}")]
    InvalidConfig(String),

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl MergeError {
    /// Create a missing dependency error naming the requiring item
    pub fn missing(item: impl Into<String>, required_by: impl Into<String>) -> Self {
        Self::MissingDependency {
            item: item.into(),
            required_by: Some(required_by.into()),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}
