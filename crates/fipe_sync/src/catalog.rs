//! Index of the vehicles already present in the local catalog source.
//!
//! The catalog is a source file made of entry constructor calls:
//!
//! ```text
//! vehicleEntry({ brand: "Honda", model: "Civic", fuel: "flex", sources: ["fipe"] }, 2019, 2021),
//! ```
//!
//! Only the leading `brand` and `model` string literals are read. This is a
//! structural scan, not a parser: anything that does not start with that
//! shape is ignored. Strings may be double- or single-quoted, with `\`
//! escaping the next character.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::names::name_key;

/// Constructor name shared by the generator and the scanner.
pub const ENTRY_CONSTRUCTOR: &str = "vehicleEntry";

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    let literal = r#"("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')"#;
    Regex::new(&format!(
        r"{ENTRY_CONSTRUCTOR}\(\s*\{{\s*brand\s*:\s*{literal}\s*,\s*model\s*:\s*{literal}"
    ))
    .expect("static regex")
});

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A `(brand, model)` pair found in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalCatalogEntry {
    pub brand: String,
    pub model: String,
}

/// Brands and models known to the catalog, keyed by [`name_key`].
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<LocalCatalogEntry>,
    /// Brand key → first display name seen.
    brands: BTreeMap<String, String>,
    /// Brand key → model keys. Empty model keys are never stored.
    models_by_brand: BTreeMap<String, BTreeSet<String>>,
    path: Option<PathBuf>,
}

impl CatalogIndex {
    /// Load the first existing candidate. No existing candidate yields an
    /// empty index: every record is then reported missing.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, CatalogError> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "Catalog candidate not found");
                continue;
            }
            let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let mut index = Self::parse(&text);
            index.path = Some(path.to_path_buf());
            tracing::info!(
                path = %path.display(),
                entries = index.entry_count(),
                brands = index.brand_count(),
                "Loaded local catalog"
            );
            return Ok(index);
        }
        tracing::warn!("No local catalog found, treating every vehicle as missing");
        Ok(Self::default())
    }

    /// Scan catalog source text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut index = Self::default();
        for caps in ENTRY.captures_iter(text) {
            let brand = unquote(&caps[1]);
            let model = unquote(&caps[2]);
            index.insert(LocalCatalogEntry { brand, model });
        }
        index
    }

    fn insert(&mut self, entry: LocalCatalogEntry) {
        let brand_key = name_key(&entry.brand);
        if !brand_key.is_empty() {
            self.brands
                .entry(brand_key.clone())
                .or_insert_with(|| entry.brand.clone());
            let models = self.models_by_brand.entry(brand_key).or_default();
            let model_key = name_key(&entry.model);
            if !model_key.is_empty() {
                models.insert(model_key);
            }
        }
        self.entries.push(entry);
    }

    /// Path the index was loaded from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn entries(&self) -> &[LocalCatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Brand display names, sorted by key.
    pub fn brand_names(&self) -> impl Iterator<Item = &str> {
        self.brands.values().map(String::as_str)
    }

    /// Normalized model keys of a brand, given the brand's [`name_key`].
    #[must_use]
    pub fn model_keys(&self, brand_key: &str) -> Option<&BTreeSet<String>> {
        self.models_by_brand.get(brand_key)
    }

    /// Distinct model keys per brand display name, for statistics.
    #[must_use]
    pub fn model_counts(&self) -> Vec<(&str, usize)> {
        self.brands
            .iter()
            .map(|(key, name)| {
                let count = self.models_by_brand.get(key).map_or(0, BTreeSet::len);
                (name.as_str(), count)
            })
            .collect()
    }
}

/// Strip the quotes of a string literal and resolve backslash escapes.
fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
