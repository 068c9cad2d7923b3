//! Where an index document lives and whether it may be written.
//!
//! Default path: `./temp/content-metadata.json`. Layered file and
//! environment loading lives in `unlockconf`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a JSON index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Path of the JSON document holding every record.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Read-only mode - appends are refused.
    /// Useful for delivery-only processes.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            read_only: false,
        }
    }
}

/// Get the default index path (./temp/content-metadata.json).
pub fn default_index_path() -> PathBuf {
    PathBuf::from("temp").join("content-metadata.json")
}

impl IndexConfig {
    /// Create a writable config for a specific document.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: path.into(),
            read_only: false,
        }
    }

    /// Create a read-only config for a specific document.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: path.into(),
            read_only: true,
        }
    }

    /// Sidecar file used as the advisory writer lock.
    pub fn lock_path(&self) -> PathBuf {
        sibling_with_suffix(&self.index_path, ".lock")
    }

    /// Temporary file an append writes before renaming over the document.
    pub fn staging_path(&self) -> PathBuf {
        sibling_with_suffix(&self.index_path, ".tmp")
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
