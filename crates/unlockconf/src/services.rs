//! External service endpoints: decentralized storage and the summarizer.

use serde::{Deserialize, Serialize};

/// Decentralized storage indexer / relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage indexer.
    /// Default: https://indexer-storage-testnet-turbo.0g.ai
    #[serde(default = "StorageConfig::default_indexer_url")]
    pub indexer_url: String,

    /// Per-request timeout in milliseconds.
    /// Default: 30000
    #[serde(default = "StorageConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl StorageConfig {
    pub(crate) fn default_indexer_url() -> String {
        "https://indexer-storage-testnet-turbo.0g.ai".to_string()
    }

    pub(crate) fn default_timeout_ms() -> u64 {
        30_000
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            indexer_url: Self::default_indexer_url(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// OpenAI-compatible chat endpoint used to summarize uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Base URL (the part before `/chat/completions`). Empty disables summaries.
    #[serde(default)]
    pub base_url: String,

    /// Model name sent with each request.
    /// Default: deepseek-r1-70b
    #[serde(default = "SummarizerConfig::default_model")]
    pub model: String,

    /// Bearer token, if the endpoint wants one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in milliseconds. Summaries are slow.
    /// Default: 60000
    #[serde(default = "SummarizerConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl SummarizerConfig {
    pub(crate) fn default_model() -> String {
        "deepseek-r1-70b".to_string()
    }

    pub(crate) fn default_timeout_ms() -> u64 {
        60_000
    }

    pub fn enabled(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: Self::default_model(),
            api_key: None,
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,
}
