//! Upstream pricing sources.
//!
//! Two endpoint families expose the same brand → model → year → detail
//! hierarchy with the same codes:
//!
//! - [`ParallelumSource`]: a REST-style JSON API, used as primary;
//! - [`FipeSource`]: the stateful form-POST API that needs a reference-table
//!   code, used as fallback.
//!
//! [`FallbackSource`] composes them. Each family fetches through the shared
//! [`Fetcher`](crate::fetch::Fetcher) under its own cache namespace.

mod fallback;
mod fipe;
mod parallelum;

pub use fallback::FallbackSource;
pub use fipe::{FIPE_BASE_URL, FIPE_NAMESPACE, FipeSource};
pub use parallelum::{PARALLELUM_BASE_URL, PARALLELUM_NAMESPACE, ParallelumSource};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::sync::ProgressCallback;
use crate::vehicle::VehicleType;

/// Errors from a pricing source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be completed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response did not have the expected shape.
    #[error("unexpected response for {operation}: {message}")]
    Decode { operation: String, message: String },
}

impl SourceError {
    pub(crate) fn decode(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// A brand as listed by the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandRef {
    pub code: String,
    pub name: String,
}

/// A model as listed by the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub code: String,
    pub name: String,
}

/// A model-year entry, e.g. code `"2021-1"` labelled `"2021 Gasolina"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearRef {
    pub code: String,
    pub label: String,
}

/// Priced vehicle detail for one model-year.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDetail {
    pub brand: String,
    pub model: String,
    pub model_year: i32,
    pub fuel: String,
    pub price: Option<f64>,
    pub fipe_code: String,
    pub reference_month: Option<String>,
}

/// The brand → model → year → detail hierarchy of a pricing API.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn list_brands(
        &self,
        vehicle_type: VehicleType,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<BrandRef>>;

    async fn list_models(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<ModelRef>>;

    async fn list_years(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        model_code: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<YearRef>>;

    async fn fetch_detail(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
        model_code: &str,
        year: &YearRef,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<VehicleDetail>;
}

/// Codes arrive as JSON strings or numbers depending on the endpoint.
pub(crate) fn code_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn str_of(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a Brazilian currency string such as `"R$ 12.372,00"`.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.replace(',', ".").parse::<f64>().ok()
}

/// Parse `[{code, name}]` style listings into pairs, skipping incomplete items.
pub(crate) fn parse_listing(
    value: &Value,
    code_field: &str,
    name_field: &str,
    operation: &str,
) -> Result<Vec<(String, String)>> {
    let items = value
        .as_array()
        .ok_or_else(|| SourceError::decode(operation, "expected an array"))?;
    Ok(items
        .iter()
        .filter_map(|item| {
            let code = item.get(code_field).and_then(code_of)?;
            let name = str_of(item, name_field)?;
            Some((code, name))
        })
        .collect())
}

/// Parse the detail payload shared by both endpoint families.
pub(crate) fn parse_detail(value: &Value, operation: &str) -> Result<VehicleDetail> {
    let model = str_of(value, "Modelo")
        .ok_or_else(|| SourceError::decode(operation, "missing Modelo"))?;
    let model_year = value
        .get("AnoModelo")
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .ok_or_else(|| SourceError::decode(operation, "missing AnoModelo"))?;
    Ok(VehicleDetail {
        brand: str_of(value, "Marca").unwrap_or_default(),
        model,
        model_year: i32::try_from(model_year).unwrap_or(i32::MAX),
        fuel: str_of(value, "Combustivel").unwrap_or_default(),
        price: str_of(value, "Valor").as_deref().and_then(parse_price),
        fipe_code: str_of(value, "CodigoFipe").unwrap_or_default(),
        reference_month: str_of(value, "MesReferencia"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_price_handles_brazilian_format() {
        assert_eq!(parse_price("R$ 12.372,00"), Some(12372.0));
        assert_eq!(parse_price("R$ 1.234.567,89"), Some(1234567.89));
        assert_eq!(parse_price("R$ 0,50"), Some(0.5));
        assert_eq!(parse_price("indisponível"), None);
    }

    #[test]
    fn code_of_accepts_strings_and_numbers() {
        assert_eq!(code_of(&json!("25")), Some("25".to_string()));
        assert_eq!(code_of(&json!(4403)), Some("4403".to_string()));
        assert_eq!(code_of(&json!(" ")), None);
        assert_eq!(code_of(&json!(null)), None);
    }

    #[test]
    fn parse_listing_skips_incomplete_items() {
        let value = json!([
            {"codigo": "1", "nome": "Acura"},
            {"codigo": "2"},
            {"codigo": 3, "nome": "Audi"}
        ]);
        let pairs = parse_listing(&value, "codigo", "nome", "brands").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("1".to_string(), "Acura".to_string()),
                ("3".to_string(), "Audi".to_string())
            ]
        );
        assert!(parse_listing(&json!({}), "codigo", "nome", "brands").is_err());
    }

    #[test]
    fn parse_detail_reads_common_fields() {
        let value = json!({
            "Valor": "R$ 152.990,00",
            "Marca": "Honda",
            "Modelo": "Civic Sedan EXL 2.0 Flex 16V Aut.",
            "AnoModelo": 2021,
            "Combustivel": "Gasolina",
            "CodigoFipe": "014095-3",
            "MesReferencia": "outubro de 2024 "
        });
        let detail = parse_detail(&value, "detail").unwrap();
        assert_eq!(detail.brand, "Honda");
        assert_eq!(detail.model_year, 2021);
        assert_eq!(detail.price, Some(152990.0));
        assert_eq!(detail.reference_month.as_deref(), Some("outubro de 2024"));
        assert!(parse_detail(&json!({"Marca": "Honda"}), "detail").is_err());
    }
}
