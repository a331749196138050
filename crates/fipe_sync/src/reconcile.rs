//! Existing/missing classification of crawled records.
//!
//! Brands match on equal [`name_key`]s. Models match when either key
//! contains the other, so a catalog "Civic" covers a crawled
//! "Civic 2.0 16V EXL CVT".
//!
//! Known precision trade-off: very short catalog models produce false
//! positives (a model "S" covers every name containing an "s").

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogIndex;
use crate::names::name_key;
use crate::vehicle::NormalizedVehicleRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    BrandMissing,
    ModelMissing,
}

impl MissingReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MissingReason::BrandMissing => "brand_missing",
            MissingReason::ModelMissing => "model_missing",
        }
    }
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Existing,
    Missing {
        reason: MissingReason,
        message: String,
    },
}

/// A record absent from the catalog, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingVehicle {
    pub record: NormalizedVehicleRecord,
    pub reason: MissingReason,
    pub message: String,
}

/// Every input record lands in exactly one of the two lists, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub missing: Vec<MissingVehicle>,
    pub existing: Vec<NormalizedVehicleRecord>,
}

impl Reconciliation {
    #[must_use]
    pub fn count(&self, reason: MissingReason) -> usize {
        self.missing.iter().filter(|m| m.reason == reason).count()
    }
}

/// Classify a single record against the catalog.
#[must_use]
pub fn classify(record: &NormalizedVehicleRecord, index: &CatalogIndex) -> Classification {
    let brand_key = name_key(&record.brand);
    let Some(models) = index.model_keys(&brand_key).filter(|_| !brand_key.is_empty()) else {
        return Classification::Missing {
            reason: MissingReason::BrandMissing,
            message: format!("brand '{}' not in catalog", record.brand),
        };
    };

    let model_key = name_key(&record.full_model_name);
    let found = !model_key.is_empty()
        && models
            .iter()
            .any(|known| model_key.contains(known.as_str()) || known.contains(model_key.as_str()));
    if found {
        Classification::Existing
    } else {
        Classification::Missing {
            reason: MissingReason::ModelMissing,
            message: format!(
                "model '{}' not in catalog for brand '{}'",
                record.full_model_name, record.brand
            ),
        }
    }
}

/// Split records into existing and missing.
#[must_use]
pub fn reconcile(records: &[NormalizedVehicleRecord], index: &CatalogIndex) -> Reconciliation {
    let mut result = Reconciliation::default();
    for record in records {
        match classify(record, index) {
            Classification::Existing => result.existing.push(record.clone()),
            Classification::Missing { reason, message } => result.missing.push(MissingVehicle {
                record: record.clone(),
                reason,
                message,
            }),
        }
    }
    tracing::debug!(
        existing = result.existing.len(),
        missing = result.missing.len(),
        "Reconciled records"
    );
    result
}
