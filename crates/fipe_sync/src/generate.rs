//! Code fragments and run report for missing vehicles.
//!
//! Each fragment is one catalog entry in the same shape the catalog scanner
//! reads, so applying the output and re-running the sync reports the same
//! vehicles as existing. Fragments depend only on the grouped input; the
//! generation date lives in the header comment alone.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::write_atomic;
use crate::catalog::ENTRY_CONSTRUCTOR;
use crate::compact::{GroupedMissing, MissingVehicleGroup, YearRange, group_count};
use crate::crawl::CrawlFailure;
use crate::reconcile::{MissingReason, Reconciliation};

/// Provenance tag carried by every generated entry.
pub const SOURCE_TAG: &str = "fipe";

/// Line in the catalog source before which fragments are inserted.
pub const INSERT_MARKER: &str = "// @fipe-sync:insert";

pub const CODE_FILE_NAME: &str = "missing-vehicles.generated.ts";
pub const REPORT_FILE_NAME: &str = "sync-report.json";

/// Counts by classification, plus output and error totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub collected: usize,
    pub existing: usize,
    pub missing: usize,
    pub brand_missing: usize,
    pub model_missing: usize,
    pub groups: usize,
    pub ranges: usize,
    pub errors: usize,
}

impl ReportSummary {
    #[must_use]
    pub fn new(reconciliation: &Reconciliation, grouped: &GroupedMissing, errors: usize) -> Self {
        Self {
            collected: reconciliation.existing.len() + reconciliation.missing.len(),
            existing: reconciliation.existing.len(),
            missing: reconciliation.missing.len(),
            brand_missing: reconciliation.count(MissingReason::BrandMissing),
            model_missing: reconciliation.count(MissingReason::ModelMissing),
            groups: group_count(grouped),
            ranges: grouped
                .values()
                .flat_map(|models| models.values())
                .map(|g| g.year_ranges().len())
                .sum(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroup {
    #[serde(flatten)]
    pub group: MissingVehicleGroup,
    pub year_ranges: Vec<YearRange>,
}

/// JSON run report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub summary: ReportSummary,
    pub missing: Vec<ReportGroup>,
    pub errors: Vec<CrawlFailure>,
}

/// Generated code plus report.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Header comment followed by every fragment, one per line.
    pub code: String,
    pub fragments: Vec<String>,
    pub report: RunReport,
}

/// Build fragments and the report.
#[must_use]
pub fn generate(
    grouped: &GroupedMissing,
    summary: ReportSummary,
    errors: &[CrawlFailure],
    run_id: &str,
    generated_at: DateTime<Utc>,
) -> Artifact {
    let mut fragments = Vec::new();
    let mut missing = Vec::new();
    for group in grouped.values().flat_map(|models| models.values()) {
        let ranges = group.year_ranges();
        fragments.extend(ranges.iter().map(|range| render_fragment(group, *range)));
        missing.push(ReportGroup {
            group: group.clone(),
            year_ranges: ranges,
        });
    }

    let mut code = format!(
        "// Generated by fipe-sync on {}. Review before merging into the catalog.\n",
        generated_at.date_naive()
    );
    for fragment in &fragments {
        code.push_str(fragment);
        code.push('\n');
    }

    Artifact {
        code,
        fragments,
        report: RunReport {
            generated_at,
            run_id: run_id.to_string(),
            summary,
            missing,
            errors: errors.to_vec(),
        },
    }
}

/// One catalog entry for a group's year range.
#[must_use]
pub fn render_fragment(group: &MissingVehicleGroup, range: YearRange) -> String {
    let mut fields = vec![
        format!("brand: {}", quote(&group.brand)),
        format!("model: {}", quote(&group.model)),
    ];
    if let Some(trim) = group.trim() {
        fields.push(format!("trim: {}", quote(trim)));
    }
    if let Some(engine) = group.engine_name() {
        fields.push(format!("engineName: {}", quote(engine)));
    }
    fields.push(format!("fuel: {}", quote(group.fuel().as_str())));
    if let Some(body) = group.body_type() {
        fields.push(format!("bodyType: {}", quote(body.as_str())));
    }
    if let Some(vehicle_type) = group.vehicle_type() {
        fields.push(format!("vehicleType: {}", quote(vehicle_type.as_str())));
    }
    fields.push(format!("sources: [{}]", quote(SOURCE_TAG)));

    format!(
        "{ENTRY_CONSTRUCTOR}({{ {} }}, {}, {}),",
        fields.join(", "),
        range.start,
        range.end
    )
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Where [`write_artifacts`] put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub code: PathBuf,
    pub report: PathBuf,
}

/// Write the code and report files into `dir`.
pub fn write_artifacts(artifact: &Artifact, dir: &Path) -> io::Result<ArtifactPaths> {
    std::fs::create_dir_all(dir)?;
    let paths = ArtifactPaths {
        code: dir.join(CODE_FILE_NAME),
        report: dir.join(REPORT_FILE_NAME),
    };
    write_atomic(&paths.code, artifact.code.as_bytes())?;
    let report = serde_json::to_vec_pretty(&artifact.report).map_err(io::Error::other)?;
    write_atomic(&paths.report, &report)?;
    Ok(paths)
}

/// Insert fragments into the catalog source.
///
/// Fragments go before the [`INSERT_MARKER`] line, indented like it, or at
/// the end of the file when there is no marker. A missing file is created.
/// Fragments already present verbatim are skipped, so applying the same
/// output twice changes nothing. Returns how many fragments were inserted.
pub fn apply_to_catalog(path: &Path, fragments: &[String]) -> io::Result<usize> {
    let existing = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    let new: Vec<&String> = fragments
        .iter()
        .filter(|f| !existing.contains(f.as_str()))
        .collect();
    if new.is_empty() {
        return Ok(0);
    }

    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
    match lines.iter().position(|l| l.trim() == INSERT_MARKER) {
        Some(at) => {
            let marker = &lines[at];
            let indent = marker[..marker.len() - marker.trim_start().len()].to_string();
            let tail = lines.split_off(at);
            lines.extend(new.iter().map(|f| format!("{indent}{f}")));
            lines.extend(tail);
        }
        None => lines.extend(new.iter().map(|f| (*f).clone())),
    }

    let mut text = lines.join("\n");
    text.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_atomic(path, text.as_bytes())?;
    tracing::info!(path = %path.display(), inserted = new.len(), "Catalog updated");
    Ok(new.len())
}
