//! Local catalog inspection.

use std::path::PathBuf;

use clap::Subcommand;
use fipe_sync::CatalogIndex;

use super::{OutputFormat, print_rows};
use crate::config::Config;

#[derive(Debug, Subcommand)]
pub(crate) enum CatalogAction {
    /// Show brand and model counts of the local catalog
    Stats {
        /// Catalog file (default: first configured candidate that exists)
        path: Option<PathBuf>,

        /// Only list the N brands with the most models
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Debug, PartialEq, Eq, serde::Serialize, tabled::Tabled)]
struct BrandRow {
    #[tabled(rename = "Brand")]
    brand: String,
    #[tabled(rename = "Models")]
    models: usize,
}

/// Brands ordered by model count, largest first, ties by name.
fn brand_rows(index: &CatalogIndex, top: usize) -> Vec<BrandRow> {
    let mut counts = index.model_counts();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts
        .into_iter()
        .take(top)
        .map(|(brand, models)| BrandRow {
            brand: brand.to_string(),
            models,
        })
        .collect()
}

pub(crate) fn handle_catalog(
    action: CatalogAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CatalogAction::Stats { path, top, output } => {
            let candidates = match path {
                Some(path) => vec![path],
                None => config.catalog_candidates(),
            };
            let index = CatalogIndex::load(&candidates)?;
            let Some(source) = index.path() else {
                return Err(format!(
                    "no catalog found (tried: {})",
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
                .into());
            };

            if matches!(output, OutputFormat::Table) {
                println!(
                    "{}: {} entries, {} brands",
                    source.display(),
                    index.entry_count(),
                    index.brand_count()
                );
            }
            print_rows(brand_rows(&index, top), output)?;
        }
    }
    Ok(())
}
