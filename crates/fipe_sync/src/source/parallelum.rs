//! REST-style endpoint family:
//! `GET {base}/{carros|motos|caminhoes}/marcas[/{brand}/modelos[/{model}/anos[/{year}]]]`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    BrandRef, ModelRef, PricingSource, Result, SourceError, VehicleDetail, YearRef, parse_detail,
    parse_listing,
};
use crate::fetch::{Fetcher, RequestDescriptor};
use crate::sync::ProgressCallback;
use crate::vehicle::VehicleType;

pub const PARALLELUM_BASE_URL: &str = "https://parallelum.com.br/fipe/api/v1";

/// Cache namespace for this endpoint family.
pub const PARALLELUM_NAMESPACE: &str = "parallelum";

pub struct ParallelumSource {
    fetcher: Arc<Fetcher>,
    base_url: String,
}

impl ParallelumSource {
    pub fn new(fetcher: Arc<Fetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn brands_url(&self, vehicle_type: VehicleType) -> String {
        format!("{}/{}/marcas", self.base_url, vehicle_type.path_segment())
    }

    /// GET and decode; payloads `decode` rejects are retried, never cached.
    async fn get<T>(
        &self,
        url: String,
        operation: String,
        on_progress: Option<&ProgressCallback>,
        decode: impl Fn(&Value, &str) -> Result<T>,
    ) -> Result<T> {
        let request = RequestDescriptor::get(PARALLELUM_NAMESPACE, url, operation);
        let operation = request.operation.as_str();
        Ok(self
            .fetcher
            .fetch_with(&request, on_progress, |value| decode(value, operation))
            .await?)
    }
}

#[async_trait]
impl PricingSource for ParallelumSource {
    fn name(&self) -> &'static str {
        PARALLELUM_NAMESPACE
    }

    async fn list_brands(
        &self,
        vehicle_type: VehicleType,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<BrandRef>> {
        let operation = format!("list {vehicle_type} brands");
        let brands = self
            .get(self.brands_url(vehicle_type), operation, on_progress, |value, op| {
                parse_listing(value, "codigo", "nome", op)
            })
            .await?;
        Ok(brands
            .into_iter()
            .map(|(code, name)| BrandRef { code, name })
            .collect())
    }

    async fn list_models(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<ModelRef>> {
        let operation = format!("list models of {vehicle_type} brand {brand_code}");
        let url = format!("{}/{brand_code}/modelos", self.brands_url(vehicle_type));
        let models = self
            .get(url, operation, on_progress, |value, op| {
                let models = value
                    .get("modelos")
                    .ok_or_else(|| SourceError::decode(op, "missing modelos"))?;
                parse_listing(models, "codigo", "nome", op)
            })
            .await?;
        Ok(models
            .into_iter()
            .map(|(code, name)| ModelRef { code, name })
            .collect())
    }

    async fn list_years(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        model_code: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<YearRef>> {
        let operation = format!("list years of {vehicle_type} model {brand_code}/{model_code}");
        let url = format!(
            "{}/{brand_code}/modelos/{model_code}/anos",
            self.brands_url(vehicle_type)
        );
        let years = self
            .get(url, operation, on_progress, |value, op| {
                parse_listing(value, "codigo", "nome", op)
            })
            .await?;
        Ok(years
            .into_iter()
            .map(|(code, label)| YearRef { code, label })
            .collect())
    }

    async fn fetch_detail(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        model_code: &str,
        year: &YearRef,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<VehicleDetail> {
        let operation = format!(
            "fetch {vehicle_type} detail {brand_code}/{model_code}/{}",
            year.code
        );
        let url = format!(
            "{}/{brand_code}/modelos/{model_code}/anos/{}",
            self.brands_url(vehicle_type),
            year.code
        );
        self.get(url, operation, on_progress, parse_detail).await
    }
}
