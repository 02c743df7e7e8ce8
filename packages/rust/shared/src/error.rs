//! Error types for the HtmlPage indexer.
//!
//! Library crates use [`IndexerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all indexer operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Markup could not be tokenized.
    #[error("parse error at line {line}: {message}")]
    Parse { message: String, line: u64 },

    /// A single search document could not be assembled.
    #[error("failed to build document for page {record_id}: {source}")]
    Build {
        record_id: i32,
        #[source]
        source: Box<IndexerError>,
    },

    /// Content store or index database error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Index sink rejected a document.
    #[error("sink error: {0}")]
    Sink(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad page fields, bad ids, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IndexerError>;

impl IndexerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error at the given (1-based) source line.
    pub fn parse(msg: impl Into<String>, line: u64) -> Self {
        Self::Parse {
            message: msg.into(),
            line,
        }
    }

    /// Wrap a failure that happened while building the document for `record_id`.
    pub fn build(record_id: i32, source: IndexerError) -> Self {
        Self::Build {
            record_id,
            source: Box::new(source),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
