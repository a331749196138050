//! Brand → model → year → detail traversal.
//!
//! Failures below the model list are isolated: a model whose years cannot be
//! listed, or a year whose detail cannot be fetched, is recorded in
//! [`BrandCrawl::errors`] and the walk moves on to the next sibling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::source::{BrandRef, ModelRef, PricingSource, SourceError, YearRef};
use crate::sync::{ProgressCallback, SyncProgress, emit};
use crate::vehicle::{Fuel, RawVehicleRecord, VehicleType};

/// Years above this are upstream sentinels for "new, not yet registered".
pub const MAX_PLAUSIBLE_YEAR: i32 = 2030;

/// Year substituted for sentinel years.
pub const SENTINEL_MODEL_YEAR: i32 = 2025;

/// Years below this are invalid and dropped.
pub const MIN_VALID_YEAR: i32 = 1900;

/// A skipped branch of the crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlFailure {
    /// What was being fetched, e.g. `"Honda / Civic EXL 2.0 / 2021-1"`.
    pub scope: String,
    pub message: String,
}

/// Outcome of crawling one brand.
#[derive(Debug, Default)]
pub struct BrandCrawl {
    pub records: Vec<RawVehicleRecord>,
    pub errors: Vec<CrawlFailure>,
}

/// Parsed upstream year code such as `"2021-1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCode {
    pub year: i32,
    pub fuel_code: Option<u32>,
}

/// Parse a year code, clamping sentinel years and rejecting invalid ones.
///
/// `"32000-1"` becomes 2025, `"1899-1"` yields `None`.
#[must_use]
pub fn parse_year_code(code: &str) -> Option<YearCode> {
    let (year, fuel) = match code.trim().split_once('-') {
        Some((year, fuel)) => (year, Some(fuel)),
        None => (code.trim(), None),
    };
    let year = clamp_year(year.trim().parse::<i32>().ok()?)?;
    Some(YearCode {
        year,
        fuel_code: fuel.and_then(|f| f.trim().parse().ok()),
    })
}

/// Apply the sentinel and validity rules to a raw year.
#[must_use]
pub fn clamp_year(year: i32) -> Option<i32> {
    if year > MAX_PLAUSIBLE_YEAR {
        Some(SENTINEL_MODEL_YEAR)
    } else if year < MIN_VALID_YEAR {
        None
    } else {
        Some(year)
    }
}

/// Walks the upstream hierarchy through a [`PricingSource`].
pub struct CatalogCrawler {
    source: Arc<dyn PricingSource>,
}

impl CatalogCrawler {
    pub fn new(source: Arc<dyn PricingSource>) -> Self {
        Self { source }
    }

    /// Brands for a vehicle type, in upstream order.
    pub async fn list_brands(
        &self,
        vehicle_type: VehicleType,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<BrandRef>, SourceError> {
        self.source.list_brands(vehicle_type, on_progress).await
    }

    /// Crawl every model and year of one brand.
    ///
    /// Only a failure to list the brand's models is returned as an error.
    pub async fn crawl_brand(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        brand_name: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<BrandCrawl, SourceError> {
        let models = self
            .source
            .list_models(vehicle_type, brand_code, on_progress)
            .await?;
        let total = models.len();
        emit(
            on_progress,
            SyncProgress::ModelsListed {
                brand: brand_name.to_string(),
                total,
            },
        );
        tracing::debug!(brand = brand_name, models = total, "Crawling brand");

        let mut crawl = BrandCrawl::default();
        for (index, model) in models.iter().enumerate() {
            self.crawl_model(vehicle_type, brand_code, brand_name, model, &mut crawl, on_progress)
                .await;
            emit(
                on_progress,
                SyncProgress::ModelCrawled {
                    brand: brand_name.to_string(),
                    current: index + 1,
                    total,
                    model: model.name.clone(),
                },
            );
        }

        tracing::info!(
            brand = brand_name,
            vehicle_type = %vehicle_type,
            records = crawl.records.len(),
            errors = crawl.errors.len(),
            "Brand crawled"
        );
        Ok(crawl)
    }

    async fn crawl_model(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        brand_name: &str,
        model: &ModelRef,
        crawl: &mut BrandCrawl,
        on_progress: Option<&ProgressCallback>,
    ) {
        let years = match self
            .source
            .list_years(vehicle_type, brand_code, &model.code, on_progress)
            .await
        {
            Ok(years) => years,
            Err(e) => {
                record_failure(crawl, format!("{brand_name} / {}", model.name), &e, on_progress);
                return;
            }
        };

        for year in &years {
            let Some(year_code) = parse_year_code(&year.code) else {
                tracing::debug!(model = %model.name, code = %year.code, "Dropping invalid year");
                continue;
            };
            match self
                .source
                .fetch_detail(vehicle_type, brand_code, &model.code, year, on_progress)
                .await
            {
                Ok(detail) => {
                    let fuel_original = if detail.fuel.is_empty() {
                        fallback_fuel_label(year, year_code)
                    } else {
                        detail.fuel
                    };
                    let model_name = if detail.model.is_empty() {
                        model.name.clone()
                    } else {
                        detail.model
                    };
                    crawl.records.push(RawVehicleRecord {
                        brand: brand_name.to_string(),
                        model: model_name,
                        year: year_code.year,
                        fuel_original,
                        price: detail.price,
                        fipe_code: detail.fipe_code,
                        vehicle_type,
                        reference_month: detail.reference_month,
                    });
                }
                Err(e) => record_failure(
                    crawl,
                    format!("{brand_name} / {} / {}", model.name, year.code),
                    &e,
                    on_progress,
                ),
            }
        }
    }
}

/// Fuel label when the detail payload has none: the year label's suffix
/// (`"2021 Gasolina"`), else the fuel code.
fn fallback_fuel_label(year: &YearRef, code: YearCode) -> String {
    let suffix = year
        .label
        .split_once(' ')
        .map(|(_, rest)| rest.trim())
        .unwrap_or_default();
    if !suffix.is_empty() {
        return suffix.to_string();
    }
    match code.fuel_code.map(Fuel::from_code) {
        Some(fuel) if fuel != Fuel::Unknown => fuel.as_str().to_string(),
        _ => String::new(),
    }
}

fn record_failure(
    crawl: &mut BrandCrawl,
    scope: String,
    error: &SourceError,
    on_progress: Option<&ProgressCallback>,
) {
    tracing::warn!(scope = %scope, error = %error, "Skipping failed branch");
    emit(
        on_progress,
        SyncProgress::CrawlError {
            scope: scope.clone(),
            error: error.to_string(),
        },
    );
    crawl.errors.push(CrawlFailure {
        scope,
        message: error.to_string(),
    });
}
