//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, UnlockConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in load order (system, user, local).
///
/// Only returns files that exist. If `cli_path` is provided and exists, it
/// replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/unlockd/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("unlockd/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("unlockd.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file and overlay it onto `config`.
pub fn load_from_file(config: &mut UnlockConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Overlay the keys present in a TOML document; absent keys keep their value.
pub(crate) fn apply_toml(
    config: &mut UnlockConfig,
    contents: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let section = |name: &str| table.get(name).and_then(|v| v.as_table());

    if let Some(paths) = section("paths") {
        if let Some(v) = paths.get("index_file").and_then(|v| v.as_str()) {
            config.infra.paths.index_file = expand_path(v);
        }
    }

    if let Some(bind) = section("bind") {
        if let Some(v) = bind.get("host").and_then(|v| v.as_str()) {
            config.infra.bind.host = v.to_string();
        }
        if let Some(v) = bind.get("http_port").and_then(|v| v.as_integer()) {
            config.infra.bind.http_port = u16::try_from(v).map_err(|_| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("bind.http_port out of range: {v}"),
            })?;
        }
    }

    if let Some(telemetry) = section("telemetry") {
        if let Some(v) = telemetry.get("otlp_endpoint").and_then(|v| v.as_str()) {
            config.infra.telemetry.otlp_endpoint = v.to_string();
        }
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.infra.telemetry.log_level = v.to_string();
        }
    }

    if let Some(storage) = section("storage") {
        if let Some(v) = storage.get("indexer_url").and_then(|v| v.as_str()) {
            config.services.storage.indexer_url = v.to_string();
        }
        if let Some(v) = storage.get("timeout_ms").and_then(|v| v.as_integer()) {
            config.services.storage.timeout_ms = v.max(0) as u64;
        }
    }

    if let Some(summarizer) = section("summarizer") {
        if let Some(v) = summarizer.get("base_url").and_then(|v| v.as_str()) {
            config.services.summarizer.base_url = v.to_string();
        }
        if let Some(v) = summarizer.get("model").and_then(|v| v.as_str()) {
            config.services.summarizer.model = v.to_string();
        }
        if let Some(v) = summarizer.get("api_key").and_then(|v| v.as_str()) {
            config.services.summarizer.api_key = Some(v.to_string());
        }
        if let Some(v) = summarizer.get("timeout_ms").and_then(|v| v.as_integer()) {
            config.services.summarizer.timeout_ms = v.max(0) as u64;
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut UnlockConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any key lookup (the environment, or a map in tests).
pub fn apply_overrides_from(
    config: &mut UnlockConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let mut take = |key: &str| {
        let value = lookup(key)?;
        sources.env_overrides.push(key.to_string());
        Some(value)
    };

    // Paths
    if let Some(v) = take("UNLOCK_INDEX_PATH") {
        config.infra.paths.index_file = expand_path(&v);
    }

    // Bind
    if let Some(v) = take("UNLOCK_HOST") {
        config.infra.bind.host = v;
    }
    if let Some(port) = take("UNLOCK_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.infra.bind.http_port = port;
    }

    // Telemetry, standard OTEL and RUST_LOG names win over ours
    if let Some(v) = take("UNLOCK_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = v;
    }
    if let Some(v) = take("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = v;
    }
    if let Some(v) = take("UNLOCK_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
    }
    if let Some(v) = take("RUST_LOG") {
        config.infra.telemetry.log_level = v;
    }

    // Storage
    if let Some(v) = take("INDEXER_RPC") {
        config.services.storage.indexer_url = v;
    }
    if let Some(ms) = take("UNLOCK_STORAGE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.services.storage.timeout_ms = ms;
    }

    // Summarizer
    if let Some(v) = take("UNLOCK_SUMMARIZER_URL") {
        config.services.summarizer.base_url = v;
    }
    if let Some(v) = take("UNLOCK_SUMMARIZER_MODEL") {
        config.services.summarizer.model = v;
    }
    if let Some(v) = take("UNLOCK_SUMMARIZER_API_KEY") {
        config.services.summarizer.api_key = Some(v);
    }
    if let Some(ms) = take("UNLOCK_SUMMARIZER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.services.summarizer.timeout_ms = ms;
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
        return PathBuf::from(path);
    }

    if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        return match stripped.split_once('/') {
            Some((var_name, rest)) => env::var(var_name)
                .map(|value| PathBuf::from(value).join(rest))
                .unwrap_or_else(|_| PathBuf::from(path)),
            None => env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path)),
        };
    }

    PathBuf::from(path)
}
