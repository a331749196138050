//! Configuration file support for fipe-sync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `FIPE_SYNC_`, sections separated by
//!    `__`, e.g. `FIPE_SYNC_API__MIN_INTERVAL_MS=1500`)
//! 3. Config file (./fipe-sync.toml, then ~/.config/fipe-sync/config.toml)
//! 4. Built-in defaults
//!
//! The cache lives in the XDG cache directory and the checkpoint in the XDG
//! state directory unless configured otherwise.
//!
//! Example config file:
//! ```toml
//! [api]
//! primary_url = "https://parallelum.com.br/fipe/api/v1"
//! fallback_url = "https://veiculos.fipe.org.br/api/veiculos"
//! fallback = true
//! min_interval_ms = 1000
//! retry_attempts = 3
//!
//! [cache]
//! ttl_days = 7
//!
//! [catalog]
//! paths = ["src/data/vehicle-catalog.ts"]
//!
//! [output]
//! dir = "fipe-sync-output"
//!
//! [sync]
//! brand_delay_ms = 2000
//! vehicle_types = ["car", "motorcycle"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use fipe_sync::checkpoint::CHECKPOINT_FILE_NAME;
use fipe_sync::fetch::{DEFAULT_MAX_CONCURRENCY, DEFAULT_MIN_INTERVAL_MS, FetcherOptions};
use fipe_sync::retry::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS,
    DEFAULT_RETRY_ATTEMPTS, RetryPolicy,
};
use fipe_sync::sync::{DEFAULT_BRAND_DELAY_MS, DEFAULT_OUTPUT_DIR};
use fipe_sync::{FIPE_BASE_URL, PARALLELUM_BASE_URL};

const APP_NAME: &str = "fipe-sync";

/// Catalog locations tried when none are configured.
pub const DEFAULT_CATALOG_PATHS: &[&str] = &[
    "src/data/vehicle-catalog.ts",
    "data/vehicle-catalog.ts",
    "vehicle-catalog.ts",
];

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
    pub output: OutputConfig,
    pub sync: SyncConfig,
}

/// Upstream endpoints, pacing and retry.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST endpoint family, used first.
    pub primary_url: String,
    /// Form-POST endpoint family, used when the primary fails.
    pub fallback_url: String,
    /// Whether to consult the fallback at all.
    pub fallback: bool,
    /// Pin the fallback's reference table instead of resolving the latest.
    pub reference_table: Option<String>,
    pub min_interval_ms: u64,
    pub max_concurrency: usize,
    pub retry_attempts: usize,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f32,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            primary_url: PARALLELUM_BASE_URL.to_string(),
            fallback_url: FIPE_BASE_URL.to_string(),
            fallback: true,
            reference_table: None,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            timeout_secs: 30,
            user_agent: format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Response cache.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Defaults to the XDG cache directory.
    pub dir: Option<PathBuf>,
    pub ttl_days: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_days: 7,
        }
    }
}

/// Local catalog source.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Candidate locations, first existing wins.
    pub paths: Vec<PathBuf>,
    /// File receiving new entries, defaults to the loaded catalog.
    pub target: Option<PathBuf>,
}

/// Generated artifacts.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub brand_delay_ms: u64,
    /// Vehicle types crawled when `--type` is not given. Empty means all.
    pub vehicle_types: Vec<String>,
    /// Brand filter used when `--brand` is not given. Empty means the
    /// built-in priority list.
    pub brands: Vec<String>,
    /// Defaults to the XDG state directory.
    pub checkpoint: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            brand_delay_ms: DEFAULT_BRAND_DELAY_MS,
            vehicle_types: Vec::new(),
            brands: Vec::new(),
            checkpoint: None,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/fipe-sync/config.toml)
    /// 3. Local config file (./fipe-sync.toml)
    /// 4. Environment variables with FIPE_SYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = Self::project_dirs() {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from(format!("{APP_NAME}.toml"));
        if local_config.exists() {
            tracing::debug!("Loading config from ./{APP_NAME}.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // FIPE_SYNC_API__MIN_INTERVAL_MS -> api.min_interval_ms
        builder = builder.add_source(
            Environment::with_prefix("FIPE_SYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    /// Cache directory, falling back to the XDG cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(|| {
            Self::project_dirs()
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".fipe-sync-cache"))
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_days * 24 * 60 * 60)
    }

    /// Checkpoint file, falling back to the state directory.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.sync.checkpoint.clone().unwrap_or_else(|| {
            Self::default_state_dir()
                .map(|dir| dir.join(CHECKPOINT_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(CHECKPOINT_FILE_NAME))
        })
    }

    /// Catalog candidates, falling back to [`DEFAULT_CATALOG_PATHS`].
    pub fn catalog_candidates(&self) -> Vec<PathBuf> {
        if self.catalog.paths.is_empty() {
            DEFAULT_CATALOG_PATHS.iter().map(PathBuf::from).collect()
        } else {
            self.catalog.paths.clone()
        }
    }

    pub fn fetcher_options(&self) -> FetcherOptions {
        FetcherOptions {
            min_interval: Duration::from_millis(self.api.min_interval_ms),
            max_concurrency: self.api.max_concurrency.max(1),
            retry: RetryPolicy::new(
                self.api.retry_attempts.max(1),
                Duration::from_millis(self.api.base_delay_ms),
                self.api.backoff_multiplier,
                Duration::from_millis(self.api.max_delay_ms),
            ),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/fipe-sync` or `~/.local/state/fipe-sync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
