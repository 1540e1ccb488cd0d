//! Kiln - Content-addressable build artifact cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use kiln::cli::{Cli, Commands};
use kiln::config::ConfigManager;
use kiln::error::KilnResult;
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

async fn run() -> KilnResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| kiln::error::KilnError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let mut config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    // Logging: 0 = warn (spinners only), 1 = info, 2+ = debug
    let level = match (cli.verbose, config.general.verbose) {
        (0, false) => "warn",
        (0, true) | (1, _) => "info",
        _ => "debug",
    };
    let filter = EnvFilter::new(format!("kiln={}", level));
    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    }

    if let Some(ref path) = local_config_path {
        debug!("Using local config: {}", path.display());
    }

    // --cache-dir / KILN_CACHE_DIR overrides the configured cache root
    if let Some(dir) = cli.cache_dir {
        config.cache.root = Some(dir);
    }

    match cli.command {
        Commands::List(args) => kiln::cli::commands::list(args, &config).await,
        Commands::Stats(args) => kiln::cli::commands::stats(args, &config).await,
        Commands::Clean(args) => kiln::cli::commands::clean(args, &config).await,
        Commands::Info(args) => kiln::cli::commands::info(args, &config).await,
        Commands::Hash(args) => kiln::cli::commands::hash(args, &config).await,
        Commands::Config(args) => kiln::cli::commands::config(args, &config, &config_manager).await,
    }
}
