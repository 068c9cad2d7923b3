//! unlockd - pay-to-read content gateway
//!
//! Subcommands:
//! - `unlockd serve` - Run the HTTP gateway
//! - `unlockd list` - Print every indexed record
//! - `unlockd search <query>` - Search summaries
//! - `unlockd lookup <root_hash>` - Print one record
//! - `unlockd stats` - Print index statistics
//! - `unlockd config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use contentindex::{JsonIndex, MetadataIndex};
use serde::Serialize;
use unlockconf::UnlockConfig;

use unlockd::{serve, telemetry};

#[derive(Parser)]
#[command(name = "unlockd")]
#[command(about = "Pay-to-read content gateway and index tools")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./unlockd.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index document path (overrides config and UNLOCK_INDEX_PATH)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// HTTP port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print every indexed record as JSON
    List,

    /// Search summaries (case-insensitive substring)
    Search {
        /// Text to look for
        query: String,
    },

    /// Print the record for a rootHash
    Lookup {
        /// Exact rootHash
        root_hash: String,
    },

    /// Print index statistics
    Stats,

    /// Print the effective configuration as TOML
    Config,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = UnlockConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(index) = cli.index {
        config.infra.paths.index_file = index;
    }

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.infra.bind.http_port = port;
            }
            telemetry::init(
                &config.infra.telemetry.log_level,
                &config.infra.telemetry.otlp_endpoint,
            )?;
            for file in &sources.files {
                tracing::info!("Loaded config from {}", file.display());
            }
            if !sources.env_overrides.is_empty() {
                tracing::debug!("Environment overrides: {}", sources.env_overrides.join(", "));
            }
            serve::run(config).await
        }
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
        query => {
            telemetry::init_console("warn")?;
            let index = JsonIndex::read_only_at(&config.infra.paths.index_file);
            run_query(&index, query)
        }
    }
}

fn run_query(index: &JsonIndex, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            let records = index
                .try_read_all()
                .with_context(|| format!("Failed to read {}", index.path().display()))?;
            print_json(&records)
        }
        Commands::Search { query } => print_json(&index.search(&query)),
        Commands::Lookup { root_hash } => match index.lookup(&root_hash) {
            Some(record) => print_json(&record),
            None => bail!("No content found with rootHash: {}", root_hash),
        },
        Commands::Stats => print_json(&index.statistics()),
        Commands::Serve { .. } | Commands::Config => Ok(()),
    }
}
