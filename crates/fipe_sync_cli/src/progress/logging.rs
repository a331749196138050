use fipe_sync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::ListingBrands { vehicle_type } => {
                tracing::debug!(vehicle_type = %vehicle_type, "Listing brands");
            }

            SyncProgress::BrandsListed {
                vehicle_type,
                total,
                selected,
            } => {
                tracing::info!(vehicle_type = %vehicle_type, total, selected, "Brands listed");
            }

            SyncProgress::VehicleTypeFailed {
                vehicle_type,
                error,
            } => {
                tracing::error!(vehicle_type = %vehicle_type, error = %error, "Brand list unavailable");
            }

            SyncProgress::BrandStarted {
                vehicle_type,
                brand,
                index,
                total,
            } => {
                tracing::info!(vehicle_type = %vehicle_type, brand = %brand, index, total, "Crawling brand");
            }

            SyncProgress::BrandSkipped {
                vehicle_type,
                brand,
            } => {
                tracing::info!(vehicle_type = %vehicle_type, brand = %brand, "Already in checkpoint, skipping");
            }

            SyncProgress::ModelsListed { brand, total } => {
                tracing::debug!(brand = %brand, total, "Models listed");
            }

            SyncProgress::ModelCrawled {
                brand,
                current,
                total,
                model,
            } => {
                tracing::debug!(brand = %brand, current, total, model = %model, "Model crawled");
            }

            SyncProgress::CrawlError { scope, error } => {
                tracing::warn!(scope = %scope, error = %error, "Skipped after retries");
            }

            SyncProgress::BrandComplete {
                vehicle_type,
                brand,
                records,
                errors,
            } => {
                tracing::info!(vehicle_type = %vehicle_type, brand = %brand, records, errors, "Brand complete");
            }

            SyncProgress::BrandFailed {
                vehicle_type,
                brand,
                error,
            } => {
                tracing::error!(vehicle_type = %vehicle_type, brand = %brand, error = %error, "Brand failed");
            }

            SyncProgress::CheckpointSaved {
                completed_brands,
                vehicles,
            } => {
                tracing::debug!(completed_brands, vehicles, "Checkpoint saved");
            }

            SyncProgress::RetryBackoff {
                operation,
                retry_after_ms,
                attempt,
                error,
            } => {
                tracing::warn!(
                    operation = %operation,
                    retry_after_ms,
                    attempt,
                    error = %error,
                    "Request failed, backing off"
                );
            }

            SyncProgress::FallbackUsed { operation, error } => {
                tracing::warn!(operation = %operation, error = %error, "Primary source failed, used fallback");
            }

            SyncProgress::Reconciling {
                records,
                catalog_brands,
            } => {
                tracing::info!(records, catalog_brands, "Reconciling against local catalog");
            }

            SyncProgress::ReconcileComplete { existing, missing } => {
                tracing::info!(existing, missing, "Reconciliation complete");
            }

            SyncProgress::ArtifactsWritten {
                code_path,
                report_path,
                fragments,
            } => {
                tracing::info!(
                    code = %code_path.display(),
                    report = %report_path.display(),
                    fragments,
                    "Artifacts written"
                );
            }

            SyncProgress::CatalogUpdated { path, fragments } => {
                tracing::info!(path = %path.display(), fragments, "Catalog updated");
            }

            SyncProgress::ShutdownRequested { completed_brands } => {
                tracing::warn!(completed_brands, "Stopped early, run again with --resume to continue");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
