//! `svs-index` binary: build the registry artifacts, or poke at a
//! published registry from the command line.

mod config;
mod error;

use crate::config::BuildConfig;
use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use svs_compress::Compression;
use svs_model::Category;
use svs_sync::{HttpFetcher, SyncClient};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "svs-index", version, about = "Registry tooling for the svs-index catalog")]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./svs-index.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate every category artifact and the manifest.
    Build {
        /// Shard data directory (overrides configuration).
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Output directory (overrides configuration).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Look up one record in a published registry by id.
    Lookup {
        /// Base URL of the versioned registry root (".../registry/v1").
        #[arg(long)]
        base: String,
        /// Category to search (singers or softwares).
        category: String,
        /// Record id, e.g. `alice`.
        id: String,
        /// Transfer encoding to prefer (none, gz, br).
        #[arg(long, default_value = "br")]
        encoding: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        },
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Build { data_dir, out_dir } => {
            let config = BuildConfig::load(cli.config.as_deref())?.with_overrides(data_dir, out_dir);
            build(config).await
        },
        Commands::Lookup { base, category, id, encoding } => lookup(base, category, id, encoding).await,
    }
}

/// Build every category and print the per-category summary. Exits
/// non-zero if any category hard-failed; the others are still published.
async fn build(config: BuildConfig) -> Result<ExitCode> {
    let report =
        svs_registry::build_all(&config.data_dir, &config.out_dir).await.or_raise(|| ErrorKind::Build)?;

    for published in &report.published {
        println!(
            "{}: {} records -> {} (+.gz/.br)",
            published.category,
            published.count,
            published.path.display()
        );
    }
    for (category, err) in &report.failures {
        eprintln!("{category}: build failed: {err:?}");
    }

    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn lookup(base: String, category: String, id: String, encoding: String) -> Result<ExitCode> {
    let category: Category = category.parse::<Category>().or_raise(|| ErrorKind::Arguments)?;
    let encoding: Compression = encoding.parse::<Compression>().or_raise(|| ErrorKind::Arguments)?;

    let fetcher = HttpFetcher::new(base).or_raise(|| ErrorKind::Sync)?;
    let client = SyncClient::new(Arc::new(fetcher)).with_transfer_encoding(encoding);

    match client.get_by_id(category, &id).await.or_raise(|| ErrorKind::Sync)? {
        Some(record) => {
            let json = serde_json::to_string_pretty(&record).or_raise(|| ErrorKind::Serialize)?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        },
        None => {
            eprintln!("no record `{id}` in {category}");
            Ok(ExitCode::FAILURE)
        },
    }
}
