use async_trait::async_trait;

use super::{BrandRef, ModelRef, PricingSource, Result, VehicleDetail, YearRef};
use crate::sync::{ProgressCallback, SyncProgress, emit};
use crate::vehicle::VehicleType;

/// Primary source with an optional fallback for each call.
///
/// Both sources must share brand, model and year codes. The fallback is
/// consulted only once the primary has spent its retry budget.
pub struct FallbackSource {
    primary: Box<dyn PricingSource>,
    fallback: Option<Box<dyn PricingSource>>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn PricingSource>, fallback: Option<Box<dyn PricingSource>>) -> Self {
        Self { primary, fallback }
    }
}

macro_rules! with_fallback {
    ($self:ident, $on_progress:ident, $operation:expr, |$source:ident| $call:expr) => {{
        let $source = &$self.primary;
        match $call.await {
            Ok(value) => Ok(value),
            Err(primary_error) => match &$self.fallback {
                None => Err(primary_error),
                Some($source) => {
                    let operation: String = $operation;
                    tracing::warn!(
                        operation = %operation,
                        error = %primary_error,
                        fallback = $source.name(),
                        "Primary source failed, trying fallback"
                    );
                    emit(
                        $on_progress,
                        SyncProgress::FallbackUsed {
                            operation,
                            error: primary_error.to_string(),
                        },
                    );
                    $call.await
                }
            },
        }
    }};
}

#[async_trait]
impl PricingSource for FallbackSource {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn list_brands(
        &self,
        vehicle_type: VehicleType,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<BrandRef>> {
        with_fallback!(self, on_progress, format!("list {vehicle_type} brands"), |source| {
            source.list_brands(vehicle_type, on_progress)
        })
    }

    async fn list_models(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<ModelRef>> {
        with_fallback!(
            self,
            on_progress,
            format!("list models of {vehicle_type} brand {brand_code}"),
            |source| source.list_models(vehicle_type, brand_code, on_progress)
        )
    }

    async fn list_years(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        model_code: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<YearRef>> {
        with_fallback!(
            self,
            on_progress,
            format!("list years of {vehicle_type} model {brand_code}/{model_code}"),
            |source| source.list_years(vehicle_type, brand_code, model_code, on_progress)
        )
    }

    async fn fetch_detail(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        model_code: &str,
        year: &YearRef,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<VehicleDetail> {
        with_fallback!(
            self,
            on_progress,
            format!(
                "fetch {vehicle_type} detail {brand_code}/{model_code}/{}",
                year.code
            ),
            |source| source.fetch_detail(vehicle_type, brand_code, model_code, year, on_progress)
        )
    }
}
