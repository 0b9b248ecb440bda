//! pkgcache - package mirror cache inspector
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pkgcache::cli::{Cli, Commands};
use pkgcache::config::ConfigManager;
use pkgcache::error::CacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let mut config = config_manager.load_effective().await?;
    if let Some(dir) = cli.cache_dir {
        config.cache.root = dir;
    }

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("pkgcache=warn"),
        1 => EnvFilter::new("pkgcache=info"),
        _ => EnvFilter::new("pkgcache=debug"),
    });

    if config.general.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    debug!("Using cache root {}", config.cache.root.display());

    match cli.command {
        Commands::Key(args) => pkgcache::cli::commands::key(args, &config).await,
        Commands::Lookup(args) => pkgcache::cli::commands::lookup(args, &config).await,
        Commands::List(args) => pkgcache::cli::commands::list(args, &config).await,
        Commands::Config(args) => {
            pkgcache::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
