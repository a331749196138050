//! Response cache maintenance.

use clap::Subcommand;
use fipe_sync::{CacheStats, CacheStore};

use super::{OutputFormat, format_bytes, print_rows};
use crate::config::Config;

#[derive(Debug, Subcommand)]
pub(crate) enum CacheAction {
    /// Delete every cached response
    Clear,
    /// Delete only responses older than the configured TTL
    Prune,
    /// Show cache size and expiry
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(serde::Serialize, tabled::Tabled)]
struct CacheStatsRow {
    #[tabled(rename = "Directory")]
    directory: String,
    #[tabled(rename = "Entries")]
    files: usize,
    #[tabled(rename = "Expired")]
    expired: usize,
    #[tabled(rename = "Size")]
    #[serde(skip)]
    size: String,
    #[tabled(skip)]
    bytes: u64,
    #[tabled(rename = "TTL (days)")]
    ttl_days: u64,
}

impl CacheStatsRow {
    fn new(config: &Config, stats: &CacheStats) -> Self {
        Self {
            directory: config.cache_dir().display().to_string(),
            files: stats.files,
            expired: stats.expired,
            size: format_bytes(stats.bytes),
            bytes: stats.bytes,
            ttl_days: config.cache.ttl_days,
        }
    }
}

pub(crate) fn handle_cache(
    action: CacheAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = CacheStore::open(config.cache_dir(), config.cache_ttl())?;

    match action {
        CacheAction::Clear => {
            let removed = store.clear()?;
            println!("Removed {removed} cached responses from {}", config.cache_dir().display());
        }
        CacheAction::Prune => {
            let removed = store.prune_expired()?;
            println!("Removed {removed} expired responses");
        }
        CacheAction::Stats { output } => {
            let stats = store.stats()?;
            print_rows(vec![CacheStatsRow::new(config, &stats)], output)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_row_formats_size() {
        let mut config = Config::default();
        config.cache.dir = Some("/tmp/fipe-cache".into());
        let stats = CacheStats {
            files: 12,
            bytes: 2048,
            expired: 3,
        };

        let row = CacheStatsRow::new(&config, &stats);

        assert_eq!(row.directory, "/tmp/fipe-cache");
        assert_eq!(row.size, "2.0 KiB");
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["bytes"], 2048);
        assert_eq!(json["expired"], 3);
        assert!(json.get("size").is_none());
    }

    #[test]
    fn test_clear_and_prune_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.dir = Some(dir.path().to_path_buf());

        handle_cache(CacheAction::Prune, &config).unwrap();
        handle_cache(CacheAction::Clear, &config).unwrap();
        assert!(dir.path().is_dir());
    }
}
