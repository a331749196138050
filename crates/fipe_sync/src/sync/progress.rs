//! Progress reporting types for sync runs.
//!
//! Every layer of the pipeline reports through the same event enum so the
//! CLI can render either progress bars or structured logs from one stream.

use std::path::PathBuf;

use crate::vehicle::VehicleType;

/// Progress events emitted during a sync run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Requesting the brand list for a vehicle type.
    ListingBrands { vehicle_type: VehicleType },

    /// Brand list received and filtered.
    BrandsListed {
        vehicle_type: VehicleType,
        /// Brands offered by the upstream.
        total: usize,
        /// Brands selected for this run.
        selected: usize,
    },

    /// The brand list for a vehicle type could not be fetched.
    VehicleTypeFailed {
        vehicle_type: VehicleType,
        error: String,
    },

    /// Starting to crawl a brand.
    BrandStarted {
        vehicle_type: VehicleType,
        brand: String,
        /// 1-based position among the selected brands.
        index: usize,
        total: usize,
    },

    /// Brand already completed according to the checkpoint.
    BrandSkipped {
        vehicle_type: VehicleType,
        brand: String,
    },

    /// Models for a brand were listed.
    ModelsListed { brand: String, total: usize },

    /// A model (with all of its years) finished crawling.
    ModelCrawled {
        brand: String,
        current: usize,
        total: usize,
        model: String,
    },

    /// A branch of the crawl failed after retries and was skipped.
    CrawlError { scope: String, error: String },

    /// Brand crawl finished.
    BrandComplete {
        vehicle_type: VehicleType,
        brand: String,
        records: usize,
        errors: usize,
    },

    /// Brand crawl failed entirely (model list unavailable).
    BrandFailed {
        vehicle_type: VehicleType,
        brand: String,
        error: String,
    },

    /// Checkpoint written to disk.
    CheckpointSaved {
        completed_brands: usize,
        vehicles: usize,
    },

    /// A request failed and will be retried after a delay.
    RetryBackoff {
        operation: String,
        retry_after_ms: u64,
        attempt: u32,
        error: String,
    },

    /// The primary source failed and the fallback answered instead.
    FallbackUsed { operation: String, error: String },

    /// Reconciliation against the local catalog started.
    Reconciling {
        records: usize,
        catalog_brands: usize,
    },

    /// Reconciliation finished.
    ReconcileComplete { existing: usize, missing: usize },

    /// Generated code and report were written.
    ArtifactsWritten {
        code_path: PathBuf,
        report_path: PathBuf,
        fragments: usize,
    },

    /// Generated fragments were applied to the catalog source.
    CatalogUpdated { path: PathBuf, fragments: usize },

    /// A shutdown was requested; the run stops before the next brand.
    ShutdownRequested { completed_brands: usize },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(callback: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = callback {
        cb(event);
    }
}
