//! Minimal configuration loading for the unlock content gateway.
//!
//! Kept free of heavy dependencies so both the index library and the
//! daemon can import it.
//!
//! Configuration is split into two groups:
//!
//! - **Infrastructure** (`InfraConfig`): paths, bind address, telemetry.
//! - **Services** (`ServicesConfig`): the storage indexer and the
//!   summarizer endpoint the upload pipeline talks to.
//!
//! # Usage
//!
//! ```rust,no_run
//! use unlockconf::UnlockConfig;
//!
//! let config = UnlockConfig::load().expect("Failed to load config");
//!
//! println!("Index: {}", config.infra.paths.index_file.display());
//! println!("HTTP: {}", config.infra.bind.addr());
//! println!("Storage: {}", config.services.storage.indexer_url);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/unlockd/config.toml` (system)
//! 2. `~/.config/unlockd/config.toml` (user)
//! 3. `./unlockd.toml` (local override, or the `--config` path)
//! 4. Environment variables (`UNLOCK_*`, `INDEXER_RPC`, `RUST_LOG`, `OTEL_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! index_file = "~/.local/share/unlockd/content-metadata.json"
//!
//! [bind]
//! host = "0.0.0.0"
//! http_port = 3000
//!
//! [telemetry]
//! otlp_endpoint = ""
//! log_level = "info"
//!
//! [storage]
//! indexer_url = "https://indexer-storage-testnet-turbo.0g.ai"
//! timeout_ms = 30000
//!
//! [summarizer]
//! base_url = "http://127.0.0.1:8000/v1"
//! model = "deepseek-r1-70b"
//! ```

pub mod infra;
pub mod loader;
pub mod services;

pub use infra::{BindConfig, InfraConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use services::{ServicesConfig, StorageConfig, SummarizerConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnlockConfig {
    /// Infrastructure - cannot change at runtime.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Downstream services.
    #[serde(flatten)]
    pub services: ServicesConfig,
}

impl UnlockConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/unlockd/config.toml`
    /// 3. `~/.config/unlockd/config.toml`
    /// 4. `./unlockd.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` stand in for `./unlockd.toml`.
    ///
    /// System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = UnlockConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_from_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    ///
    /// The summarizer API key is never written out.
    pub fn to_toml(&self) -> String {
        let quote = |s: &str| toml::Value::String(s.to_string()).to_string();
        let quote_path = |p: &Path| quote(&p.display().to_string());

        let mut output = String::new();
        output.push_str("# unlockd configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "index_file = {}\n",
            quote_path(&self.infra.paths.index_file)
        ));

        output.push_str("\n[bind]\n");
        output.push_str(&format!("host = {}\n", quote(&self.infra.bind.host)));
        output.push_str(&format!("http_port = {}\n", self.infra.bind.http_port));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "otlp_endpoint = {}\n",
            quote(&self.infra.telemetry.otlp_endpoint)
        ));
        output.push_str(&format!(
            "log_level = {}\n",
            quote(&self.infra.telemetry.log_level)
        ));

        output.push_str("\n[storage]\n");
        output.push_str(&format!(
            "indexer_url = {}\n",
            quote(&self.services.storage.indexer_url)
        ));
        output.push_str(&format!(
            "timeout_ms = {}\n",
            self.services.storage.timeout_ms
        ));

        output.push_str("\n[summarizer]\n");
        output.push_str(&format!(
            "base_url = {}\n",
            quote(&self.services.summarizer.base_url)
        ));
        output.push_str(&format!(
            "model = {}\n",
            quote(&self.services.summarizer.model)
        ));
        if self.services.summarizer.api_key.is_some() {
            output.push_str("# api_key is set (hidden)\n");
        }
        output.push_str(&format!(
            "timeout_ms = {}\n",
            self.services.summarizer.timeout_ms
        ));

        output
    }
}
