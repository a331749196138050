//! Resumable progress.
//!
//! The checkpoint is rewritten after every completed brand and removed once
//! a run finishes without interruption. Writes go to a temporary file that
//! is then renamed over the previous checkpoint, so a crash leaves either
//! the old or the new file, never a torn one.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::write_atomic;
use crate::crawl::CrawlFailure;
use crate::vehicle::{NormalizedVehicleRecord, VehicleType};

/// Schema version written by this build.
pub const CHECKPOINT_VERSION: u32 = 1;

pub const CHECKPOINT_FILE_NAME: &str = "checkpoint.json";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("checkpoint {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checkpoint {path} has version {found}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("failed to write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Identifier of a brand within a vehicle type, e.g. `"car:25"`.
#[must_use]
pub fn brand_key(vehicle_type: VehicleType, brand_code: &str) -> String {
    format!("{vehicle_type}:{brand_code}")
}

/// Progress of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub version: u32,
    pub run_id: String,
    /// Brand keys whose crawl finished, in completion order.
    pub completed_brands: Vec<String>,
    pub vehicles: Vec<NormalizedVehicleRecord>,
    #[serde(default)]
    pub errors: Vec<CrawlFailure>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            run_id: run_id.into(),
            completed_brands: Vec::new(),
            vehicles: Vec::new(),
            errors: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_complete(&self, brand_key: &str) -> bool {
        self.completed_brands.iter().any(|k| k == brand_key)
    }

    /// Record a finished brand with its records and skipped branches.
    pub fn complete_brand(
        &mut self,
        brand_key: String,
        vehicles: Vec<NormalizedVehicleRecord>,
        errors: Vec<CrawlFailure>,
    ) {
        if !self.is_complete(&brand_key) {
            self.completed_brands.push(brand_key);
        }
        self.vehicles.extend(vehicles);
        self.errors.extend(errors);
        self.updated_at = Utc::now();
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// Location of the checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the checkpoint, `None` when there is none.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let parse_error = |source| CheckpointError::Parse {
            path: self.path.clone(),
            source,
        };
        let header: VersionHeader = serde_json::from_slice(&bytes).map_err(parse_error)?;
        if header.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                path: self.path.clone(),
                found: header.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        let checkpoint: Checkpoint = serde_json::from_slice(&bytes).map_err(parse_error)?;
        tracing::info!(
            path = %self.path.display(),
            completed_brands = checkpoint.completed_brands.len(),
            vehicles = checkpoint.vehicles.len(),
            "Loaded checkpoint"
        );
        Ok(Some(checkpoint))
    }

    /// Atomically replace the checkpoint file.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let write_error = |source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let bytes = serde_json::to_vec(checkpoint).map_err(|e| write_error(io::Error::other(e)))?;
        write_atomic(&self.path, &bytes).map_err(write_error)?;
        tracing::debug!(
            path = %self.path.display(),
            completed_brands = checkpoint.completed_brands.len(),
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Remove the checkpoint. A missing file is not an error.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::vehicle::RawVehicleRecord;

    fn vehicle() -> NormalizedVehicleRecord {
        normalize(&RawVehicleRecord {
            brand: "Honda".into(),
            model: "Civic 2.0 16V EXL CVT".into(),
            year: 2021,
            fuel_original: "Gasolina".into(),
            price: Some(120_000.0),
            fipe_code: "014095-3".into(),
            vehicle_type: VehicleType::Car,
            reference_month: None,
        })
    }

    #[test]
    fn brand_keys_include_vehicle_type() {
        assert_eq!(brand_key(VehicleType::Car, "25"), "car:25");
        assert_ne!(
            brand_key(VehicleType::Car, "25"),
            brand_key(VehicleType::Motorcycle, "25")
        );
    }

    #[test]
    fn save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("state").join(CHECKPOINT_FILE_NAME));
        assert!(store.load().unwrap().is_none());

        let mut checkpoint = Checkpoint::new("run-1");
        checkpoint.complete_brand("car:25".into(), vec![vehicle()], Vec::new());
        checkpoint.complete_brand("car:25".into(), Vec::new(), Vec::new());
        store.save(&checkpoint).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.completed_brands, vec!["car:25".to_string()]);
        assert!(loaded.is_complete("car:25"));
        assert!(!loaded.is_complete("car:26"));

        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
        store.delete().unwrap();
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let mut checkpoint = Checkpoint::new("run-1");
        checkpoint.complete_brand("car:25".into(), vec![vehicle()], Vec::new());
        let json = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(json["completedBrands"][0], "car:25");
        assert_eq!(json["vehicles"][0]["baseModel"], "Civic");
        assert_eq!(json["version"], CHECKPOINT_VERSION);
    }

    #[test]
    fn rejects_other_versions_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE_NAME);
        let store = CheckpointStore::new(&path);

        std::fs::write(&path, r#"{"version": 99, "completedBrands": []}"#).unwrap();
        assert!(matches!(
            store.load(),
            Err(CheckpointError::UnsupportedVersion { found: 99, .. })
        ));

        std::fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(store.load(), Err(CheckpointError::Parse { .. })));
    }

    #[test]
    fn save_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join(CHECKPOINT_FILE_NAME));
        store.save(&Checkpoint::new("run")).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(CHECKPOINT_FILE_NAME)]);
    }
}
