//! Driftsync CLI
//!
//! Command-line client for driftsync.
//!
//! # Commands
//!
//! - `run` - bulk sync, then watch the tree and reconcile continuously
//! - `inspect` - dump the metadata store for debugging

mod config;
mod watcher;

use clap::{Parser, Subcommand};
use config::ClientConfig;
use driftsync_engine::{LogNotifier, StaticToken, SyncContext, SyncEngine};
use driftsync_kv::{HttpAuthority, HttpTransport, KvClient};
use driftsync_proto::is_directory_key;
use driftsync_store::{FileBackend, MetaStore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Driftsync command-line client.
#[derive(Parser)]
#[command(name = "driftsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize continuously
    Run {
        /// Path to the JSON config file
        #[arg(short, long, default_value = "config/driftsync.json")]
        config: PathBuf,

        /// Run the bulk sync and exit without watching
        #[arg(long)]
        once: bool,
    },

    /// Dump the metadata store
    Inspect {
        /// Metadata store directory
        #[arg(short, long)]
        store_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run { config, once } => run(&config, once),
        Commands::Inspect { store_dir } => inspect(&store_dir),
    }
}

fn run(config_path: &Path, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::load(config_path)?;
    let device_id = config
        .device_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!(device = device_id.as_str(), root = %config.root.display(), "starting driftsync");

    let engine_config = config.engine_config(&device_id);
    let store = MetaStore::new(Box::new(FileBackend::open(&config.store_dir)?));
    let kv = KvClient::new(Box::new(HttpTransport::new()?), device_id.clone())
        .with_attempt_timeout(engine_config.attempt_timeout);
    let authority = HttpAuthority::new(config.authority_url.clone(), Duration::from_secs(5))?;

    let ctx = SyncContext::new(
        engine_config,
        store,
        kv,
        Box::new(authority),
        Box::new(LogNotifier),
        Box::new(StaticToken::new(config.token.clone())),
    );
    let mut engine = SyncEngine::new(ctx);

    let report = engine.bulk_sync()?;
    info!(
        uploaded = report.files_uploaded,
        downloaded = report.files_downloaded,
        "initial sync complete"
    );
    if once {
        engine.shutdown();
        return Ok(());
    }

    engine.start();
    let queue = engine.changes();
    let watch_config = engine.context().config.clone();
    watcher::watch(&config.root, &watch_config, queue)?;

    engine.shutdown();
    Ok(())
}

fn inspect(store_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = MetaStore::new(Box::new(FileBackend::open(store_dir)?));
    for key in store.keys()? {
        if is_directory_key(&key) {
            if let Some(record) = store.load_dir(&key)? {
                println!(
                    "dir  {key}  files={} dirs={}",
                    record.files.len(),
                    record.directories.len()
                );
            }
        } else if let Some(record) = store.load_file(&key)? {
            println!(
                "file {key}  v{} {}B {}",
                record.version,
                record.size,
                &record.content_hash[..record.content_hash.len().min(12)]
            );
        }
    }
    Ok(())
}
