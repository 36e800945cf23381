/// Build engine error types
use std::path::PathBuf;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("'{name}' matches multiple rules")]
    AmbiguousRule { name: String },

    #[error("duplicate target '{name}'")]
    DuplicateTarget { name: String },

    #[error("unknown target '{name}': no rule matches and no such file")]
    UnknownTarget { name: String },

    #[error("invalid rule pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("{target}: {message}")]
    Build { target: String, message: String },

    #[error("corrupt download from {url}: expected sha256 {expected}, got {actual}")]
    CorruptDownload {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("variable '{name}' is not set")]
    UnsetVariable { name: String },

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl EngineError {
    /// Create a build error carrying the failing target's name
    pub fn build(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Build {
            target: target.into(),
            message: message.to_string(),
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
