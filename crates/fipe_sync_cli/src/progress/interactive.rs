use std::sync::Mutex;
use std::time::Duration;

use console::style;
use fipe_sync::sync::SyncProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Spinner while a brand list is requested.
    listing: Option<ProgressBar>,
    /// Brands of the current vehicle type.
    brands_bar: Option<ProgressBar>,
    /// Models of the brand being crawled.
    models_bar: Option<ProgressBar>,
    /// Spinner while reconciling.
    reconcile_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn spinner(&self, prefix: &str, message: String) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_prefix(format!("{prefix:12}"));
        bar.set_message(message);
        bar
    }

    fn println(&self, line: String) {
        // Printing above the bars keeps them intact.
        self.multi.println(line).ok();
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::ListingBrands { vehicle_type } => {
                let bar = self.spinner(vehicle_type.as_str(), "Listing brands...".to_string());
                state.listing = Some(bar);
            }

            SyncProgress::BrandsListed {
                vehicle_type,
                total,
                selected,
            } => {
                if let Some(bar) = state.listing.take() {
                    bar.finish_and_clear();
                }
                if let Some(bar) = state.brands_bar.take()
                    && !bar.is_finished()
                {
                    bar.finish();
                }
                let bar = self.multi.add(ProgressBar::new(selected as u64));
                bar.set_style(Self::bar_style());
                bar.set_prefix(format!("{:12}", vehicle_type.as_str()));
                bar.set_message(format!("{selected} of {total} brands"));
                state.brands_bar = Some(bar);
            }

            SyncProgress::VehicleTypeFailed {
                vehicle_type,
                error,
            } => {
                if let Some(bar) = state.listing.take() {
                    bar.finish_and_clear();
                }
                self.println(format!(
                    "{} {vehicle_type}: brand list unavailable: {error}",
                    style("✗").red().bold()
                ));
            }

            SyncProgress::BrandStarted { brand, .. } => {
                if let Some(bar) = &state.brands_bar {
                    bar.set_message(brand.clone());
                }
                let bar = match &state.brands_bar {
                    Some(brands) => self.multi.insert_after(brands, ProgressBar::new_spinner()),
                    None => self.multi.add(ProgressBar::new_spinner()),
                };
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_prefix(format!("{:12}", truncate(&brand, 12)));
                bar.set_message("Listing models...");
                state.models_bar = Some(bar);
            }

            SyncProgress::ModelsListed { total, .. } => {
                if let Some(bar) = &state.models_bar {
                    bar.disable_steady_tick();
                    bar.set_style(Self::bar_style());
                    bar.set_length(total as u64);
                    bar.set_position(0);
                }
            }

            SyncProgress::ModelCrawled { current, model, .. } => {
                if let Some(bar) = &state.models_bar {
                    bar.set_position(current as u64);
                    bar.set_message(model);
                }
            }

            SyncProgress::CrawlError { scope, error } => {
                self.println(format!(
                    "  {} {scope}: {}",
                    style("!").yellow(),
                    style(error).dim()
                ));
            }

            SyncProgress::RetryBackoff {
                retry_after_ms,
                attempt,
                ..
            } => {
                if let Some(bar) = &state.models_bar {
                    bar.set_message(format!(
                        "retry {attempt} in {:.1}s",
                        retry_after_ms as f64 / 1000.0
                    ));
                }
            }

            SyncProgress::FallbackUsed { operation, .. } => {
                if let Some(bar) = &state.models_bar {
                    bar.set_message(format!("fallback: {operation}"));
                }
            }

            SyncProgress::BrandComplete {
                brand,
                records,
                errors,
                ..
            } => {
                if let Some(bar) = state.models_bar.take() {
                    bar.finish_and_clear();
                }
                if let Some(bar) = &state.brands_bar {
                    bar.inc(1);
                }
                let errors = if errors > 0 {
                    format!(", {}", style(format!("{errors} skipped")).yellow())
                } else {
                    String::new()
                };
                self.println(format!(
                    "{} {brand}: {records} vehicles{errors}",
                    style("✓").green().bold()
                ));
            }

            SyncProgress::BrandSkipped { brand, .. } => {
                if let Some(bar) = &state.brands_bar {
                    bar.inc(1);
                }
                self.println(format!("{} {brand}: from checkpoint", style("↷").dim()));
            }

            SyncProgress::BrandFailed { brand, error, .. } => {
                if let Some(bar) = state.models_bar.take() {
                    bar.finish_and_clear();
                }
                if let Some(bar) = &state.brands_bar {
                    bar.inc(1);
                }
                self.println(format!("{} {brand}: {error}", style("✗").red().bold()));
            }

            SyncProgress::Reconciling {
                records,
                catalog_brands,
            } => {
                if let Some(bar) = state.brands_bar.take() {
                    bar.finish();
                }
                let bar = self.spinner(
                    "reconcile",
                    format!("{records} vehicles against {catalog_brands} catalog brands"),
                );
                state.reconcile_bar = Some(bar);
            }

            SyncProgress::ReconcileComplete { existing, missing } => {
                if let Some(bar) = state.reconcile_bar.take() {
                    bar.finish_with_message(format!("{existing} existing, {missing} missing"));
                }
            }

            SyncProgress::ArtifactsWritten {
                code_path,
                report_path,
                fragments,
            } => {
                self.println(format!(
                    "{} {fragments} entries written to {}",
                    style("✓").green().bold(),
                    code_path.display()
                ));
                self.println(format!("  report: {}", report_path.display()));
            }

            SyncProgress::CatalogUpdated { path, fragments } => {
                self.println(format!(
                    "{} {fragments} entries inserted into {}",
                    style("✓").green().bold(),
                    path.display()
                ));
            }

            SyncProgress::ShutdownRequested { completed_brands } => {
                self.println(format!(
                    "{} Stopped after {completed_brands} brands. Run again with --resume to continue.",
                    style("!").yellow().bold()
                ));
            }

            SyncProgress::Warning { message } => {
                self.println(format!("{} {message}", style("!").yellow()));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for bar in [
            &state.listing,
            &state.brands_bar,
            &state.models_bar,
            &state.reconcile_bar,
        ]
        .into_iter()
        .flatten()
        {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fipe_sync::VehicleType;

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("Honda", 12), "Honda");
        assert_eq!(truncate("Mercedes-Benz Trucks", 12).chars().count(), 12);
        assert!(truncate("Mercedes-Benz Trucks", 12).ends_with('…'));
    }

    #[test]
    fn handles_a_brand_lifecycle_without_panicking() {
        let reporter = InteractiveReporter::new();
        reporter.handle(SyncProgress::ListingBrands {
            vehicle_type: VehicleType::Car,
        });
        reporter.handle(SyncProgress::BrandsListed {
            vehicle_type: VehicleType::Car,
            total: 90,
            selected: 2,
        });
        reporter.handle(SyncProgress::BrandStarted {
            vehicle_type: VehicleType::Car,
            brand: "Honda".to_string(),
            index: 1,
            total: 2,
        });
        reporter.handle(SyncProgress::ModelsListed {
            brand: "Honda".to_string(),
            total: 3,
        });
        reporter.handle(SyncProgress::ModelCrawled {
            brand: "Honda".to_string(),
            current: 1,
            total: 3,
            model: "Civic".to_string(),
        });
        reporter.handle(SyncProgress::BrandComplete {
            vehicle_type: VehicleType::Car,
            brand: "Honda".to_string(),
            records: 10,
            errors: 1,
        });
        reporter.finish();

        let state = reporter.state.lock().unwrap();
        assert!(state.models_bar.is_none());
        assert_eq!(state.brands_bar.as_ref().map(ProgressBar::position), Some(1));
    }
}
