//! Error types for dataset-sync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while deriving or preparing sync paths.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The object key has no usable final path segment.
    #[error("invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
