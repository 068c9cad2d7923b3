//! Errors surfaced by the fallible (`try_*`) index operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the index document.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to access index document {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse index document {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize index document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to lock index document {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("index is in read-only mode")]
    ReadOnly,
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
