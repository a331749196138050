//! fipe-sync - vehicle pricing catalog synchronization.
//!
//! This library crawls the brand → model → year → detail hierarchy of the
//! FIPE vehicle pricing API, normalizes the free-text model names it finds,
//! and reconciles them against a local catalog source file. Vehicles absent
//! from the catalog are grouped, compacted into contiguous year ranges and
//! emitted as catalog entries ready to be merged.
//!
//! # Pipeline
//!
//! - [`fetch`] - Cache-first, rate-limited, retrying request execution
//! - [`source`] - The two upstream endpoint families behind [`PricingSource`]
//! - [`crawl`] - Traversal of one brand with partial-failure isolation
//! - [`normalize`] - Engine, trim, transmission, body and base-model parsing
//! - [`catalog`] - Structural scan of the local catalog
//! - [`reconcile`] - Existing / missing classification
//! - [`compact`] - Grouping and year-range compaction
//! - [`generate`] - Catalog fragments and the JSON run report
//! - [`sync`] - The resumable driver tying it all together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fipe_sync::{CacheStore, Fetcher, FetcherOptions, ParallelumSource, ReqwestTransport};
//! use fipe_sync::sync::{SyncOptions, SyncOrchestrator};
//!
//! let transport = Arc::new(ReqwestTransport::with_timeout(timeout, "fipe-sync")?);
//! let cache = Arc::new(CacheStore::open(cache_dir, DEFAULT_CACHE_TTL)?);
//! let fetcher = Arc::new(Fetcher::new(transport, cache, FetcherOptions::default()));
//! let source = Arc::new(ParallelumSource::new(fetcher, PARALLELUM_BASE_URL));
//!
//! let result = SyncOrchestrator::new(source, SyncOptions::default()).run(None).await?;
//! println!("{} vehicles missing from the catalog", result.summary.missing);
//! ```

pub mod cache;
pub mod catalog;
pub mod checkpoint;
pub mod compact;
pub mod crawl;
pub mod fetch;
pub mod generate;
pub mod http;
pub mod names;
pub mod normalize;
pub mod reconcile;
pub mod retry;
pub mod source;
pub mod sync;
pub mod vehicle;

pub use cache::{CacheError, CacheStats, CacheStore, DEFAULT_CACHE_TTL};
pub use catalog::{CatalogError, CatalogIndex, LocalCatalogEntry};
pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
pub use compact::{GroupedMissing, MissingVehicleGroup, YearRange, compact, find_year_ranges};
pub use crawl::{BrandCrawl, CatalogCrawler, CrawlFailure};
pub use fetch::{FetchError, FetchStats, Fetcher, FetcherOptions, RequestDescriptor};
pub use generate::{Artifact, ReportSummary, RunReport, apply_to_catalog, generate};
pub use http::{HttpError, HttpTransport, ReqwestTransport};
pub use names::name_key;
pub use normalize::normalize;
pub use reconcile::{MissingReason, MissingVehicle, Reconciliation, reconcile};
pub use retry::RetryPolicy;
pub use source::{
    FIPE_BASE_URL, FallbackSource, FipeSource, PARALLELUM_BASE_URL, ParallelumSource,
    PricingSource, SourceError,
};
pub use vehicle::{
    BodyType, Fuel, NormalizedVehicleRecord, RawVehicleRecord, Transmission, VehicleType,
};
