//! Sync run driver.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncOptions`, `BrandSelection`, `SyncResult`, `SyncError`
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`orchestrator`] - `SyncOrchestrator`, which wires crawl, checkpoint,
//!   reconciliation and generation together

mod orchestrator;
mod progress;
mod types;

pub use orchestrator::SyncOrchestrator;
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use types::{
    BrandSelection, DEFAULT_BRAND_DELAY_MS, DEFAULT_OUTPUT_DIR, PRIORITY_BRANDS, SyncError,
    SyncOptions, SyncResult,
};
