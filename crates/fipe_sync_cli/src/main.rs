//! fipe-sync CLI - keeps a local vehicle catalog in step with FIPE pricing data.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::cache::CacheAction;
use crate::commands::catalog::CatalogAction;
use crate::commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "fipe-sync")]
#[command(version)]
#[command(about = "Synchronize a vehicle catalog with the FIPE pricing table")]
#[command(
    long_about = "fipe-sync crawls the brand, model and year hierarchy of the FIPE vehicle \
pricing API, normalizes the model names it finds and compares them with a local catalog \
source file. Vehicles missing from the catalog are grouped into year ranges and written \
out as ready-to-merge catalog entries alongside a JSON report."
)]
#[command(after_long_help = r#"EXAMPLES
    Sync the priority brands of every vehicle type:
        $ fipe-sync sync

    Only motorcycles from two brands, without touching the catalog:
        $ fipe-sync sync --type motorcycle --brand Honda --brand Yamaha --dry-run

    Continue an interrupted run:
        $ fipe-sync sync --resume

    Inspect the local catalog:
        $ fipe-sync catalog stats src/data/vehicle-catalog.ts

    Generate shell completions:
        $ fipe-sync completions bash > ~/.local/share/bash-completion/completions/fipe-sync

CONFIGURATION
    fipe-sync reads configuration from:
      1. ~/.config/fipe-sync/config.toml (or $XDG_CONFIG_HOME/fipe-sync/config.toml)
      2. ./fipe-sync.toml
      3. Environment variables (FIPE_SYNC_* prefix, sections separated by __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    FIPE_SYNC_API__PRIMARY_URL        REST endpoint family
    FIPE_SYNC_API__FALLBACK_URL       Form-POST endpoint family used on failure
    FIPE_SYNC_API__MIN_INTERVAL_MS    Minimum spacing between requests (default: 1000)
    FIPE_SYNC_API__RETRY_ATTEMPTS     Attempts per request (default: 3)
    FIPE_SYNC_CACHE__DIR              Response cache directory
    FIPE_SYNC_CACHE__TTL_DAYS         Cache lifetime in days (default: 7)
    FIPE_SYNC_SYNC__BRAND_DELAY_MS    Pause between brands (default: 2000)
    RUST_LOG                          Log filter for non-interactive output
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the pricing API and reconcile it with the local catalog
    Sync(SyncArgs),
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Inspect the local catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a terminal.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("fipe_sync=info,fipe_sync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync(args) => {
            let shutdown = shutdown::setup_shutdown_handler();
            commands::sync::handle_sync(args, &config, shutdown).await?;
        }
        Commands::Cache { action } => commands::cache::handle_cache(action, &config)?,
        Commands::Catalog { action } => commands::catalog::handle_catalog(action, &config)?,
        Commands::Completions { shell } => commands::meta::handle_completions(shell)?,
        Commands::Man { output } => commands::meta::handle_man(output)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::try_parse_from(["fipe-sync", "cache", "stats", "--output", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Stats { .. }
            }
        ));

        let cli = Cli::try_parse_from(["fipe-sync", "sync", "-t", "truck", "-n"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync(_)));

        assert!(Cli::try_parse_from(["fipe-sync", "sync", "--type", "boat"]).is_err());
    }
}
