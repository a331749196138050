//! Form-POST endpoint family.
//!
//! Every call carries the reference-table code (the pricing month). The
//! latest code is looked up once per source and reused for the whole run,
//! unless one was configured explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use super::{
    BrandRef, ModelRef, PricingSource, Result, SourceError, VehicleDetail, YearRef, code_of,
    parse_detail, parse_listing,
};
use crate::fetch::{Fetcher, RequestDescriptor};
use crate::sync::ProgressCallback;
use crate::vehicle::VehicleType;

pub const FIPE_BASE_URL: &str = "https://veiculos.fipe.org.br/api/veiculos";

/// Cache namespace for this endpoint family.
pub const FIPE_NAMESPACE: &str = "fipe";

pub struct FipeSource {
    fetcher: Arc<Fetcher>,
    base_url: String,
    reference_table: OnceCell<String>,
}

impl FipeSource {
    pub fn new(fetcher: Arc<Fetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reference_table: OnceCell::new(),
        }
    }

    /// Pin the reference table instead of looking up the latest one.
    #[must_use]
    pub fn with_reference_table(self, code: impl Into<String>) -> Self {
        Self {
            reference_table: OnceCell::new_with(Some(code.into())),
            ..self
        }
    }

    /// POST and decode; payloads `decode` rejects are retried, never cached.
    async fn post<T>(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
        operation: String,
        on_progress: Option<&ProgressCallback>,
        decode: impl Fn(&Value, &str) -> Result<T>,
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let request = RequestDescriptor::post_form(FIPE_NAMESPACE, url, params, operation);
        let operation = request.operation.as_str();
        Ok(self
            .fetcher
            .fetch_with(&request, on_progress, |value| decode(value, operation))
            .await?)
    }

    async fn reference_table(&self, on_progress: Option<&ProgressCallback>) -> Result<&str> {
        let code = self
            .reference_table
            .get_or_try_init(|| async {
                let latest = self
                    .post(
                        "ConsultarTabelaDeReferencia",
                        Vec::new(),
                        "look up reference table".to_string(),
                        on_progress,
                        |value, op| {
                            value
                                .as_array()
                                .and_then(|tables| tables.first())
                                .and_then(|table| table.get("Codigo"))
                                .and_then(code_of)
                                .ok_or_else(|| SourceError::decode(op, "no reference table listed"))
                        },
                    )
                    .await?;
                tracing::info!(reference_table = %latest, "Using reference table");
                Ok::<_, SourceError>(latest)
            })
            .await?;
        Ok(code.as_str())
    }

    async fn base_params(
        &self,
        vehicle_type: VehicleType,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<(String, String)>> {
        let table = self.reference_table(on_progress).await?;
        Ok(vec![
            ("codigoTabelaReferencia".to_string(), table.to_string()),
            (
                "codigoTipoVeiculo".to_string(),
                vehicle_type.form_code().to_string(),
            ),
        ])
    }
}

#[async_trait]
impl PricingSource for FipeSource {
    fn name(&self) -> &'static str {
        FIPE_NAMESPACE
    }

    async fn list_brands(
        &self,
        vehicle_type: VehicleType,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<BrandRef>> {
        let operation = format!("list {vehicle_type} brands (form)");
        let params = self.base_params(vehicle_type, on_progress).await?;
        let brands = self
            .post("ConsultarMarcas", params, operation, on_progress, |value, op| {
                parse_listing(value, "Value", "Label", op)
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
        let operation = format!("list models of {vehicle_type} brand {brand_code} (form)");
        let mut params = self.base_params(vehicle_type, on_progress).await?;
        params.push(("codigoMarca".to_string(), brand_code.to_string()));
        let models = self
            .post("ConsultarModelos", params, operation, on_progress, |value, op| {
                let models = value
                    .get("Modelos")
                    .ok_or_else(|| SourceError::decode(op, "missing Modelos"))?;
                parse_listing(models, "Value", "Label", op)
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
        let operation =
            format!("list years of {vehicle_type} model {brand_code}/{model_code} (form)");
        let mut params = self.base_params(vehicle_type, on_progress).await?;
        params.push(("codigoMarca".to_string(), brand_code.to_string()));
        params.push(("codigoModelo".to_string(), model_code.to_string()));
        let years = self
            .post("ConsultarAnoModelo", params, operation, on_progress, |value, op| {
                parse_listing(value, "Value", "Label", op)
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
            "fetch {vehicle_type} detail {brand_code}/{model_code}/{} (form)",
            year.code
        );
        let (model_year, fuel_code) = year
            .code
            .split_once('-')
            .ok_or_else(|| SourceError::decode(&operation, "year code without fuel suffix"))?;

        let mut params = self.base_params(vehicle_type, on_progress).await?;
        params.extend(
            [
                ("codigoMarca", brand_code),
                ("codigoModelo", model_code),
                ("anoModelo", model_year),
                ("codigoTipoCombustivel", fuel_code),
                ("tipoVeiculo", vehicle_type.form_kind()),
                ("modeloCodigoExterno", ""),
                ("tipoConsulta", "tradicional"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        self.post(
            "ConsultarValorComTodosParametros",
            params,
            operation,
            on_progress,
            parse_detail,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, DEFAULT_CACHE_TTL};
    use crate::fetch::FetcherOptions;
    use crate::http::{HttpMethod, MockTransport};
    use crate::retry::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "https://form.test/api/veiculos";

    fn source(transport: &MockTransport) -> FipeSource {
        let fetcher = Fetcher::new(
            Arc::new(transport.clone()),
            Arc::new(CacheStore::in_memory(DEFAULT_CACHE_TTL)),
            FetcherOptions {
                min_interval: Duration::from_millis(1),
                max_concurrency: 1,
                retry: RetryPolicy::no_retry(),
            },
        );
        FipeSource::new(Arc::new(fetcher), BASE)
    }

    fn body_of(transport: &MockTransport, index: usize) -> String {
        String::from_utf8(transport.requests()[index].body.clone()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn reference_table_is_looked_up_once() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/ConsultarTabelaDeReferencia"),
            json!([{"Codigo": 315, "Mes": "outubro/2024 "}, {"Codigo": 314, "Mes": "setembro/2024 "}]),
        );
        transport.always(
            HttpMethod::Post,
            format!("{BASE}/ConsultarMarcas"),
            crate::http::json_response(200, &json!([{"Label": "Honda", "Value": "25"}])),
        );
        let source = source(&transport);

        let cars = source.list_brands(VehicleType::Car, None).await.unwrap();
        assert_eq!(cars, vec![BrandRef { code: "25".into(), name: "Honda".into() }]);
        source.list_brands(VehicleType::Truck, None).await.unwrap();

        // One table lookup, then one brand call per category.
        assert_eq!(transport.request_count(), 3);
        assert!(body_of(&transport, 1).contains("codigoTabelaReferencia=315"));
        assert!(body_of(&transport, 2).contains("codigoTipoVeiculo=3"));
    }

    #[tokio::test(start_paused = true)]
    async fn pinned_reference_table_skips_lookup() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/ConsultarModelos"),
            json!({"Modelos": [{"Label": "Civic EXL 2.0", "Value": 4403}], "Anos": []}),
        );
        let source = source(&transport).with_reference_table("300");

        let models = source.list_models(VehicleType::Car, "25", None).await.unwrap();
        assert_eq!(models, vec![ModelRef { code: "4403".into(), name: "Civic EXL 2.0".into() }]);
        assert_eq!(transport.request_count(), 1);
        assert!(body_of(&transport, 0).contains("codigoTabelaReferencia=300"));
    }

    #[tokio::test(start_paused = true)]
    async fn detail_sends_year_and_fuel_separately() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/ConsultarValorComTodosParametros"),
            json!({
                "Valor": "R$ 98.000,00",
                "Marca": "Honda",
                "Modelo": "Civic EXL 2.0",
                "AnoModelo": 2021,
                "Combustivel": "Flex",
                "CodigoFipe": "014095-3",
                "MesReferencia": "outubro de 2024"
            }),
        );
        let source = source(&transport).with_reference_table("315");
        let year = YearRef { code: "2021-5".into(), label: "2021 Flex".into() };

        let detail = source
            .fetch_detail(VehicleType::Car, "25", "4403", &year, None)
            .await
            .unwrap();
        assert_eq!(detail.price, Some(98000.0));

        let body = body_of(&transport, 0);
        assert!(body.contains("anoModelo=2021"));
        assert!(body.contains("codigoTipoCombustivel=5"));
        assert!(body.contains("tipoVeiculo=carro"));
        assert!(body.contains("tipoConsulta=tradicional"));
    }
}
