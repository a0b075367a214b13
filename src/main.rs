//! Ecoledger main entry point

use anyhow::Context;
use clap::Parser;
use ecoledger_api::{start_server, AppState};
use ecoledger_config::Config;
use ecoledger_core::{build_port, LedgerSync, LocalStorage, PreferenceStore};
use std::path::PathBuf;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "ecoledger")]
#[command(author = "Ecoledger Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A small realtime cash ledger with a live-synced record store", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = Config::load(args.config.clone())
        .map_err(|e| anyhow::anyhow!("{}", e.to_details()))
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str())).init();

    log::info!(
        "Config loaded: storage={}, local file={}, fetch limit={}",
        config.storage.mode,
        config.local_path().display(),
        config.storage.fetch_limit
    );

    let rt = Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let storage = LocalStorage::open(config.local_path())
        .with_context(|| format!("Failed to open local storage at {}", config.local_path().display()))?;

    let port = build_port(&config, &storage)?;
    let ledger = LedgerSync::new(port, config.storage.fetch_limit);

    // The server stays up in the error state so the pages can report it
    if let Err(e) = ledger.mount().await {
        log::error!("Initial fetch failed: {}", e);
    }

    let preferences = PreferenceStore::new(storage.handle(), &config.preferences.default_accent);
    let state = AppState::new(config, ledger.clone(), preferences);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
        }
        log::info!("Shutdown signal received");
    };

    let result = start_server(state, shutdown).await;
    ledger.unmount();
    result
}
