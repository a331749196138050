//! Top-level driver of a sync run.
//!
//! A run walks the selected brands of every selected vehicle type, saving a
//! checkpoint after each brand, then reconciles everything collected against
//! the local catalog and writes the generated delta.
//!
//! # Example
//!
//! ```ignore
//! use fipe_sync::sync::{SyncOptions, SyncOrchestrator};
//!
//! let orchestrator = SyncOrchestrator::new(source, SyncOptions::default());
//! let result = orchestrator.run(Some(&progress)).await?;
//! println!("{} missing vehicles", result.summary.missing);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{SyncError, SyncOptions, SyncResult};
use crate::catalog::CatalogIndex;
use crate::checkpoint::{Checkpoint, CheckpointStore, brand_key};
use crate::compact::compact;
use crate::crawl::{CatalogCrawler, CrawlFailure};
use crate::generate::{ReportSummary, apply_to_catalog, generate, write_artifacts};
use crate::normalize::normalize;
use crate::reconcile::reconcile;
use crate::source::{BrandRef, PricingSource};
use crate::vehicle::VehicleType;

/// Brand-level bookkeeping of one run, beyond what the checkpoint holds.
#[derive(Default)]
struct CrawlTally {
    crawled: usize,
    resumed: usize,
    failed: usize,
    /// Whole-brand and whole-type failures. Not checkpointed, so a resumed
    /// run tries those brands again.
    failures: Vec<CrawlFailure>,
    interrupted: bool,
}

impl CrawlTally {
    /// Result of a run that stops after crawling. Collected vehicles and
    /// errors are counted, reconciliation counts stay zero.
    fn into_result(self, checkpoint: &Checkpoint) -> SyncResult {
        let mut errors = checkpoint.errors.clone();
        errors.extend(self.failures);
        SyncResult {
            run_id: checkpoint.run_id.clone(),
            brands_crawled: self.crawled,
            brands_resumed: self.resumed,
            brands_failed: self.failed,
            summary: ReportSummary {
                collected: checkpoint.vehicles.len(),
                errors: errors.len(),
                ..ReportSummary::default()
            },
            errors,
            interrupted: self.interrupted,
            ..SyncResult::default()
        }
    }
}

pub struct SyncOrchestrator {
    crawler: CatalogCrawler,
    store: CheckpointStore,
    options: SyncOptions,
    shutdown: Option<Arc<AtomicBool>>,
}

impl SyncOrchestrator {
    pub fn new(source: Arc<dyn PricingSource>, options: SyncOptions) -> Self {
        Self {
            crawler: CatalogCrawler::new(source),
            store: CheckpointStore::new(options.checkpoint_path.clone()),
            options,
            shutdown: None,
        }
    }

    /// Stop before the next brand once `flag` is set.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Execute the run.
    ///
    /// Fatal errors save the in-memory progress to the checkpoint before
    /// they are returned.
    pub async fn run(&self, on_progress: Option<&ProgressCallback>) -> Result<SyncResult, SyncError> {
        let mut checkpoint = self.start_checkpoint()?;
        match self.run_with(&mut checkpoint, on_progress).await {
            Ok(result) => Ok(result),
            Err(SyncError::Checkpoint(e)) => Err(SyncError::Checkpoint(e)),
            Err(e) => {
                if let Err(save_error) = self.store.save(&checkpoint) {
                    tracing::error!(error = %save_error, "Failed to save checkpoint after fatal error");
                }
                Err(e)
            }
        }
    }

    fn start_checkpoint(&self) -> Result<Checkpoint, SyncError> {
        if self.options.resume {
            if let Some(checkpoint) = self.store.load()? {
                tracing::info!(
                    run_id = %checkpoint.run_id,
                    completed_brands = checkpoint.completed_brands.len(),
                    "Resuming from checkpoint"
                );
                return Ok(checkpoint);
            }
            tracing::info!("No checkpoint found, starting a new run");
        }
        Ok(Checkpoint::new(uuid::Uuid::new_v4().to_string()))
    }

    async fn run_with(
        &self,
        checkpoint: &mut Checkpoint,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<SyncResult, SyncError> {
        let tally = self.crawl_all(checkpoint, on_progress).await?;
        let interrupted = tally.interrupted;
        let mut result = tally.into_result(checkpoint);

        if interrupted {
            self.save_checkpoint(checkpoint, on_progress)?;
            emit(
                on_progress,
                SyncProgress::ShutdownRequested {
                    completed_brands: checkpoint.completed_brands.len(),
                },
            );
            tracing::warn!(
                completed_brands = checkpoint.completed_brands.len(),
                "Run interrupted, resume to continue"
            );
            return Ok(result);
        }

        let index = CatalogIndex::load(&self.options.catalog_candidates)?;
        emit(
            on_progress,
            SyncProgress::Reconciling {
                records: checkpoint.vehicles.len(),
                catalog_brands: index.brand_count(),
            },
        );
        let reconciliation = reconcile(&checkpoint.vehicles, &index);
        emit(
            on_progress,
            SyncProgress::ReconcileComplete {
                existing: reconciliation.existing.len(),
                missing: reconciliation.missing.len(),
            },
        );

        let grouped = compact(&reconciliation.missing);
        let summary = ReportSummary::new(&reconciliation, &grouped, result.errors.len());
        let artifact = generate(&grouped, summary, &result.errors, &checkpoint.run_id, Utc::now());

        let paths = write_artifacts(&artifact, &self.options.output_dir).map_err(|e| {
            SyncError::io(
                format!("failed to write artifacts to {}", self.options.output_dir.display()),
                e,
            )
        })?;
        emit(
            on_progress,
            SyncProgress::ArtifactsWritten {
                code_path: paths.code.clone(),
                report_path: paths.report.clone(),
                fragments: artifact.fragments.len(),
            },
        );
        result.summary = summary;
        result.artifacts = Some(paths);

        if self.options.dry_run {
            tracing::info!(fragments = artifact.fragments.len(), "Dry run, catalog left untouched");
        } else if !artifact.fragments.is_empty() {
            match self.catalog_target(&index) {
                Some(target) => {
                    let inserted = apply_to_catalog(&target, &artifact.fragments).map_err(|e| {
                        SyncError::io(format!("failed to update catalog {}", target.display()), e)
                    })?;
                    emit(
                        on_progress,
                        SyncProgress::CatalogUpdated {
                            path: target.clone(),
                            fragments: inserted,
                        },
                    );
                    result.catalog_update = Some((target, inserted));
                }
                None => emit(
                    on_progress,
                    SyncProgress::Warning {
                        message: "No catalog location configured, fragments only written to the output directory".to_string(),
                    },
                ),
            }
        }

        if result.brands_failed == 0 {
            self.store.delete()?;
        } else {
            // Keep the checkpoint so a resumed run retries the failed brands.
            self.save_checkpoint(checkpoint, on_progress)?;
        }

        tracing::info!(
            run_id = %result.run_id,
            collected = summary.collected,
            missing = summary.missing,
            fragments = artifact.fragments.len(),
            errors = summary.errors,
            "Sync complete"
        );
        Ok(result)
    }

    fn catalog_target(&self, index: &CatalogIndex) -> Option<PathBuf> {
        self.options
            .catalog_target
            .clone()
            .or_else(|| index.path().map(Path::to_path_buf))
            .or_else(|| self.options.catalog_candidates.first().cloned())
    }

    async fn crawl_all(
        &self,
        checkpoint: &mut Checkpoint,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<CrawlTally, SyncError> {
        let mut tally = CrawlTally::default();
        let mut unreachable = Vec::new();
        let mut first_brand = true;

        for &vehicle_type in &self.options.vehicle_types {
            emit(on_progress, SyncProgress::ListingBrands { vehicle_type });
            let brands = match self.crawler.list_brands(vehicle_type, on_progress).await {
                Ok(brands) => brands,
                Err(e) => {
                    tracing::warn!(vehicle_type = %vehicle_type, error = %e, "Brand list unavailable");
                    emit(
                        on_progress,
                        SyncProgress::VehicleTypeFailed {
                            vehicle_type,
                            error: e.to_string(),
                        },
                    );
                    tally.failures.push(CrawlFailure {
                        scope: format!("{vehicle_type} brands"),
                        message: e.to_string(),
                    });
                    unreachable.push(format!("{vehicle_type}: {e}"));
                    continue;
                }
            };

            let selected = self.options.brands.select(&brands, |b| b.name.as_str());
            emit(
                on_progress,
                SyncProgress::BrandsListed {
                    vehicle_type,
                    total: brands.len(),
                    selected: selected.len(),
                },
            );

            let total = selected.len();
            for (position, brand) in selected.into_iter().enumerate() {
                if self.shutdown_requested() {
                    tally.interrupted = true;
                    return Ok(tally);
                }

                let key = brand_key(vehicle_type, &brand.code);
                if checkpoint.is_complete(&key) {
                    tally.resumed += 1;
                    emit(
                        on_progress,
                        SyncProgress::BrandSkipped {
                            vehicle_type,
                            brand: brand.name.clone(),
                        },
                    );
                    continue;
                }

                if !first_brand && !self.options.brand_delay.is_zero() {
                    tokio::time::sleep(self.options.brand_delay).await;
                }
                first_brand = false;

                emit(
                    on_progress,
                    SyncProgress::BrandStarted {
                        vehicle_type,
                        brand: brand.name.clone(),
                        index: position + 1,
                        total,
                    },
                );
                self.crawl_brand(vehicle_type, brand, key, checkpoint, &mut tally, on_progress)
                    .await?;
            }
        }

        if !self.options.vehicle_types.is_empty() && unreachable.len() == self.options.vehicle_types.len() {
            return Err(SyncError::UpstreamUnreachable {
                message: unreachable.join("; "),
                partial: Box::new(tally.into_result(checkpoint)),
            });
        }
        Ok(tally)
    }

    async fn crawl_brand(
        &self,
        vehicle_type: VehicleType,
        brand: &BrandRef,
        key: String,
        checkpoint: &mut Checkpoint,
        tally: &mut CrawlTally,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<(), SyncError> {
        match self
            .crawler
            .crawl_brand(vehicle_type, &brand.code, &brand.name, on_progress)
            .await
        {
            Ok(crawl) => {
                let vehicles: Vec<_> = crawl.records.iter().map(normalize).collect();
                emit(
                    on_progress,
                    SyncProgress::BrandComplete {
                        vehicle_type,
                        brand: brand.name.clone(),
                        records: vehicles.len(),
                        errors: crawl.errors.len(),
                    },
                );
                checkpoint.complete_brand(key, vehicles, crawl.errors);
                tally.crawled += 1;
                self.save_checkpoint(checkpoint, on_progress)
            }
            Err(e) => {
                tracing::warn!(
                    vehicle_type = %vehicle_type,
                    brand = %brand.name,
                    error = %e,
                    "Skipping brand"
                );
                emit(
                    on_progress,
                    SyncProgress::BrandFailed {
                        vehicle_type,
                        brand: brand.name.clone(),
                        error: e.to_string(),
                    },
                );
                tally.failed += 1;
                tally.failures.push(CrawlFailure {
                    scope: format!("{vehicle_type} / {}", brand.name),
                    message: e.to_string(),
                });
                Ok(())
            }
        }
    }

    fn save_checkpoint(
        &self,
        checkpoint: &Checkpoint,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<(), SyncError> {
        self.store.save(checkpoint)?;
        emit(
            on_progress,
            SyncProgress::CheckpointSaved {
                completed_brands: checkpoint.completed_brands.len(),
                vehicles: checkpoint.vehicles.len(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::checkpoint::CHECKPOINT_FILE_NAME;
    use crate::fetch::{Fetcher, FetcherOptions};
    use crate::generate::{CODE_FILE_NAME, INSERT_MARKER, REPORT_FILE_NAME};
    use crate::http::{HttpMethod, MockTransport};
    use crate::retry::RetryPolicy;
    use crate::source::{PARALLELUM_BASE_URL, ParallelumSource};
    use crate::sync::BrandSelection;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    const BASE: &str = PARALLELUM_BASE_URL;

    fn url(path: &str) -> String {
        format!("{BASE}/carros/{path}")
    }

    /// Honda with two models (Civic known to the catalog, Fit missing) and
    /// Fiat whose model list is down.
    fn upstream(transport: &MockTransport) {
        transport.always(
            HttpMethod::Get,
            url("marcas"),
            crate::http::json_response(
                200,
                &json!([{"codigo": "25", "nome": "Honda"}, {"codigo": "21", "nome": "Fiat"}]),
            ),
        );
        transport.always(
            HttpMethod::Get,
            url("marcas/25/modelos"),
            crate::http::json_response(
                200,
                &json!({"modelos": [
                    {"codigo": 1, "nome": "Civic 2.0 16V EXL CVT"},
                    {"codigo": 2, "nome": "Fit LX 1.5 Flex"}
                ]}),
            ),
        );
        transport.always_fail(HttpMethod::Get, url("marcas/21/modelos"), "connection reset");
        for (model, name) in [(1, "Civic 2.0 16V EXL CVT"), (2, "Fit LX 1.5 Flex")] {
            transport.always(
                HttpMethod::Get,
                url(&format!("marcas/25/modelos/{model}/anos")),
                crate::http::json_response(
                    200,
                    &json!([
                        {"codigo": "2020-1", "nome": "2020 Gasolina"},
                        {"codigo": "2021-1", "nome": "2021 Gasolina"}
                    ]),
                ),
            );
            for year in [2020, 2021] {
                transport.always(
                    HttpMethod::Get,
                    url(&format!("marcas/25/modelos/{model}/anos/{year}-1")),
                    crate::http::json_response(
                        200,
                        &json!({
                            "Valor": "R$ 100.000,00",
                            "Marca": "Honda",
                            "Modelo": name,
                            "AnoModelo": year,
                            "Combustivel": "Gasolina",
                            "CodigoFipe": "014095-3",
                            "MesReferencia": "outubro de 2026"
                        }),
                    ),
                );
            }
        }
    }

    fn orchestrator(
        transport: Arc<MockTransport>,
        dir: &Path,
        configure: impl FnOnce(&mut SyncOptions),
    ) -> SyncOrchestrator {
        let options = FetcherOptions {
            min_interval: Duration::ZERO,
            max_concurrency: 1,
            retry: RetryPolicy::no_retry(),
        };
        let fetcher = Arc::new(Fetcher::new(
            transport,
            Arc::new(CacheStore::in_memory(Duration::from_secs(60))),
            options,
        ));
        let source: Arc<dyn PricingSource> = Arc::new(ParallelumSource::new(fetcher, BASE));

        let catalog = dir.join("catalog.ts");
        std::fs::write(
            &catalog,
            format!(
                "export const vehicles = [\n  vehicleEntry({{ brand: \"Honda\", model: \"Civic\" }}, 2019, 2022),\n  {INSERT_MARKER}\n];\n"
            ),
        )
        .unwrap();

        let mut sync_options = SyncOptions {
            vehicle_types: vec![VehicleType::Car],
            brands: BrandSelection::All,
            brand_delay: Duration::ZERO,
            output_dir: dir.join("out"),
            catalog_candidates: vec![catalog],
            checkpoint_path: dir.join(CHECKPOINT_FILE_NAME),
            ..SyncOptions::default()
        };
        configure(&mut sync_options);
        SyncOrchestrator::new(source, sync_options)
    }

    fn recorder() -> (Arc<Mutex<Vec<SyncProgress>>>, ProgressCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&seen);
        let cb: ProgressCallback = Box::new(move |event| capture.lock().unwrap().push(event));
        (seen, cb)
    }

    #[tokio::test]
    async fn full_run_generates_missing_models_and_updates_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        upstream(&transport);
        let orchestrator = orchestrator(Arc::clone(&transport), dir.path(), |_| {});

        let (seen, cb) = recorder();
        let result = orchestrator.run(Some(&cb)).await.unwrap();

        assert_eq!(result.brands_crawled, 1);
        assert_eq!(result.brands_failed, 1);
        assert_eq!(result.summary.collected, 4);
        assert_eq!(result.summary.existing, 2);
        assert_eq!(result.summary.model_missing, 2);
        assert_eq!(result.summary.groups, 1);
        assert_eq!(result.summary.ranges, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].scope.contains("Fiat"));

        let out = dir.path().join("out");
        assert!(out.join(CODE_FILE_NAME).is_file());
        assert!(out.join(REPORT_FILE_NAME).is_file());

        let (catalog, inserted) = result.catalog_update.unwrap();
        assert_eq!(inserted, 1);
        let text = std::fs::read_to_string(catalog).unwrap();
        assert!(text.contains("model: \"Fit\""));
        assert!(text.find("model: \"Fit\"").unwrap() < text.find(INSERT_MARKER).unwrap());

        // Failed brand keeps the checkpoint for a resumed run.
        assert!(dir.path().join(CHECKPOINT_FILE_NAME).is_file());

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|e| matches!(e, SyncProgress::BrandFailed { .. })));
        assert!(seen.iter().any(|e| matches!(e, SyncProgress::CatalogUpdated { fragments: 1, .. })));
    }

    #[tokio::test]
    async fn dry_run_leaves_catalog_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        upstream(&transport);
        let orchestrator = orchestrator(transport, dir.path(), |o| {
            o.dry_run = true;
            o.brands = BrandSelection::Named(vec!["honda".to_string()]);
        });
        let before = std::fs::read_to_string(dir.path().join("catalog.ts")).unwrap();

        let result = orchestrator.run(None).await.unwrap();

        assert_eq!(result.summary.missing, 2);
        assert!(result.artifacts.is_some());
        assert!(result.catalog_update.is_none());
        assert_eq!(std::fs::read_to_string(dir.path().join("catalog.ts")).unwrap(), before);
        // Clean completion removes the checkpoint.
        assert!(!dir.path().join(CHECKPOINT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn resume_skips_completed_brands() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        upstream(&transport);

        let mut checkpoint = Checkpoint::new("earlier-run");
        checkpoint.complete_brand(brand_key(VehicleType::Car, "25"), Vec::new(), Vec::new());
        CheckpointStore::new(dir.path().join(CHECKPOINT_FILE_NAME))
            .save(&checkpoint)
            .unwrap();

        let orchestrator = orchestrator(Arc::clone(&transport), dir.path(), |o| {
            o.resume = true;
            o.brands = BrandSelection::Named(vec!["Honda".to_string()]);
        });
        let result = orchestrator.run(None).await.unwrap();

        assert_eq!(result.run_id, "earlier-run");
        assert_eq!(result.brands_resumed, 1);
        assert_eq!(result.brands_crawled, 0);
        // Only the brand list was requested.
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_fatal_and_checkpointed() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.always_fail(HttpMethod::Get, url("marcas"), "dns failure");
        let orchestrator = orchestrator(transport, dir.path(), |_| {});

        let error = orchestrator.run(None).await.unwrap_err();

        assert!(matches!(error, SyncError::UpstreamUnreachable { .. }));
        let partial = error.partial_result().unwrap();
        assert_eq!(partial.brands_crawled, 0);
        assert_eq!(partial.summary.collected, 0);
        assert_eq!(partial.errors.len(), VehicleType::ALL.len());
        assert_eq!(partial.summary.errors, partial.errors.len());
        assert!(partial.errors.iter().any(|f| f.scope == "car brands"));
        assert!(dir.path().join(CHECKPOINT_FILE_NAME).is_file());
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn shutdown_stops_before_next_brand() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        upstream(&transport);
        let flag = Arc::new(AtomicBool::new(true));
        let orchestrator = orchestrator(Arc::clone(&transport), dir.path(), |_| {})
            .with_shutdown(Arc::clone(&flag));

        let (seen, cb) = recorder();
        let result = orchestrator.run(Some(&cb)).await.unwrap();

        assert!(result.interrupted);
        assert_eq!(result.brands_crawled, 0);
        assert!(result.artifacts.is_none());
        assert!(dir.path().join(CHECKPOINT_FILE_NAME).is_file());
        assert!(
            seen.lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, SyncProgress::ShutdownRequested { .. }))
        );
    }
}
