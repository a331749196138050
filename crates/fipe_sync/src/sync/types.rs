//! Options, results and errors of a sync run.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::checkpoint::{CHECKPOINT_FILE_NAME, CheckpointError};
use crate::crawl::CrawlFailure;
use crate::generate::{ArtifactPaths, ReportSummary};
use crate::names::name_key;
use crate::vehicle::VehicleType;

/// Default pause between two brands, on top of the per-request spacing.
pub const DEFAULT_BRAND_DELAY_MS: u64 = 2_000;

/// Default directory for generated code and the run report.
pub const DEFAULT_OUTPUT_DIR: &str = "fipe-sync-output";

/// Brands crawled when no explicit filter is given, most common first.
pub const PRIORITY_BRANDS: &[&str] = &[
    "Fiat",
    "Volkswagen",
    "Chevrolet",
    "Ford",
    "Toyota",
    "Honda",
    "Hyundai",
    "Renault",
    "Nissan",
    "Jeep",
    "Peugeot",
    "Citroën",
    "Mitsubishi",
    "Kia",
    "BMW",
    "Mercedes-Benz",
    "Audi",
    "Yamaha",
    "Suzuki",
    "Kawasaki",
    "Scania",
    "Volvo",
    "Iveco",
];

/// Which upstream brands a run visits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrandSelection {
    /// [`PRIORITY_BRANDS`], in that order.
    #[default]
    Priority,
    /// Every brand, in upstream order.
    All,
    /// Brands matching the given names, in the order given.
    Named(Vec<String>),
}

impl BrandSelection {
    /// Pick brands out of an upstream list.
    ///
    /// A filter name selects every upstream brand whose [`name_key`]
    /// contains the filter's key, so `"volkswagen"` picks
    /// `"VW - VolksWagen"`. Each brand is selected at most once.
    pub fn select<'a, T>(&self, brands: &'a [T], name: impl Fn(&T) -> &str) -> Vec<&'a T> {
        let filters: Vec<String> = match self {
            BrandSelection::All => return brands.iter().collect(),
            BrandSelection::Priority => PRIORITY_BRANDS.iter().map(|b| name_key(b)).collect(),
            BrandSelection::Named(names) => names.iter().map(|b| name_key(b)).collect(),
        };
        let keys: Vec<String> = brands.iter().map(|b| name_key(name(b))).collect();

        let mut taken = vec![false; brands.len()];
        let mut selected = Vec::new();
        for filter in filters.iter().filter(|f| !f.is_empty()) {
            for (i, key) in keys.iter().enumerate() {
                if !taken[i] && key.contains(filter.as_str()) {
                    taken[i] = true;
                    selected.push(&brands[i]);
                }
            }
        }
        selected
    }
}

/// Options for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Vehicle types to crawl, in order.
    pub vehicle_types: Vec<VehicleType>,
    pub brands: BrandSelection,
    /// Crawl, reconcile and generate, but leave the catalog source untouched.
    pub dry_run: bool,
    /// Continue from the checkpoint instead of starting clean.
    pub resume: bool,
    /// Pause between brands.
    pub brand_delay: Duration,
    /// Directory receiving generated code and the report.
    pub output_dir: PathBuf,
    /// Catalog locations tried in order; the first existing one is read.
    pub catalog_candidates: Vec<PathBuf>,
    /// File receiving new fragments. Defaults to the loaded catalog, else
    /// the first candidate.
    pub catalog_target: Option<PathBuf>,
    pub checkpoint_path: PathBuf,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            vehicle_types: VehicleType::ALL.to_vec(),
            brands: BrandSelection::default(),
            dry_run: false,
            resume: false,
            brand_delay: Duration::from_millis(DEFAULT_BRAND_DELAY_MS),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            catalog_candidates: Vec::new(),
            catalog_target: None,
            checkpoint_path: PathBuf::from(CHECKPOINT_FILE_NAME),
        }
    }
}

/// Outcome of a sync run.
#[derive(Debug, Default)]
pub struct SyncResult {
    pub run_id: String,
    /// Brands crawled during this run.
    pub brands_crawled: usize,
    /// Brands skipped because the checkpoint already had them.
    pub brands_resumed: usize,
    /// Brands whose model list could not be fetched.
    pub brands_failed: usize,
    /// Counts from reconciliation and generation. Zero when interrupted.
    pub summary: ReportSummary,
    /// Skipped branches and failed brands.
    pub errors: Vec<CrawlFailure>,
    /// Written artifacts, `None` when interrupted.
    pub artifacts: Option<ArtifactPaths>,
    /// Catalog file and number of inserted fragments.
    pub catalog_update: Option<(PathBuf, usize)>,
    /// Stopped by a shutdown request before every brand was crawled.
    pub interrupted: bool,
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// No brand list could be fetched for any selected vehicle type.
    /// `partial` holds the counts gathered before the run gave up.
    #[error("upstream unreachable: {message}")]
    UpstreamUnreachable {
        message: String,
        partial: Box<SyncResult>,
    },
}

impl SyncError {
    /// Counts of the aborted run, when the error carries them.
    #[must_use]
    pub fn partial_result(&self) -> Option<&SyncResult> {
        match self {
            SyncError::UpstreamUnreachable { partial, .. } => Some(partial),
            _ => None,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        SyncError::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_options_default() {
        let options = SyncOptions::default();
        assert_eq!(options.vehicle_types, VehicleType::ALL.to_vec());
        assert_eq!(options.brands, BrandSelection::Priority);
        assert!(!options.dry_run);
        assert!(!options.resume);
        assert_eq!(options.brand_delay, Duration::from_millis(DEFAULT_BRAND_DELAY_MS));
        assert!(options.catalog_target.is_none());
    }

    #[test]
    fn test_sync_result_default() {
        let result = SyncResult::default();
        assert_eq!(result.brands_crawled, 0);
        assert_eq!(result.summary.missing, 0);
        assert!(result.artifacts.is_none());
        assert!(!result.interrupted);
    }

    fn upstream() -> Vec<String> {
        ["Acura", "Citroën", "GM - Chevrolet", "Honda", "VW - VolksWagen", "Fiat"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_select_all_keeps_upstream_order() {
        let brands = upstream();
        let selected = BrandSelection::All.select(&brands, String::as_str);
        assert_eq!(selected.len(), brands.len());
        assert_eq!(selected[0], "Acura");
    }

    #[test]
    fn test_select_priority_follows_priority_order() {
        let brands = upstream();
        let selected: Vec<&str> = BrandSelection::Priority
            .select(&brands, String::as_str)
            .into_iter()
            .map(String::as_str)
            .collect();
        assert_eq!(
            selected,
            vec!["Fiat", "VW - VolksWagen", "GM - Chevrolet", "Honda", "Citroën"]
        );
    }

    #[test]
    fn test_select_named_is_accent_insensitive_and_deduplicated() {
        let brands = upstream();
        let selection = BrandSelection::Named(vec![
            "citroen".to_string(),
            "HONDA".to_string(),
            "Citroën".to_string(),
            "".to_string(),
            "Lada".to_string(),
        ]);
        let selected: Vec<&str> = selection
            .select(&brands, String::as_str)
            .into_iter()
            .map(String::as_str)
            .collect();
        assert_eq!(selected, vec!["Citroën", "Honda"]);
    }
}
