//! The `sync` command: crawl, reconcile and generate.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::ValueEnum;
use console::style;

use fipe_sync::sync::{BrandSelection, SyncError, SyncOptions, SyncOrchestrator, SyncResult};
use fipe_sync::{
    CacheStore, FallbackSource, FetchStats, Fetcher, FipeSource, ParallelumSource,
    PricingSource, ReqwestTransport, VehicleType,
};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Errors listed after the summary before the rest is elided.
const MAX_LISTED_ERRORS: usize = 10;

/// Vehicle type selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TypeArg {
    Car,
    Motorcycle,
    Truck,
    All,
}

impl TypeArg {
    fn vehicle_types(self) -> Vec<VehicleType> {
        match self {
            TypeArg::Car => vec![VehicleType::Car],
            TypeArg::Motorcycle => vec![VehicleType::Motorcycle],
            TypeArg::Truck => vec![VehicleType::Truck],
            TypeArg::All => VehicleType::ALL.to_vec(),
        }
    }
}

/// Options of the sync command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SyncArgs {
    /// Vehicle type to crawl (default from config, else all)
    #[arg(short = 't', long = "type", value_enum)]
    vehicle_type: Option<TypeArg>,

    /// Only crawl brands matching this name - can specify multiple
    #[arg(short = 'b', long = "brand", conflicts_with = "all_brands")]
    brands: Vec<String>,

    /// Crawl every brand instead of the priority list
    #[arg(short = 'A', long)]
    all_brands: bool,

    /// Dry run - write the report and generated code, leave the catalog alone
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Continue from the last checkpoint instead of starting clean
    #[arg(short = 'r', long)]
    resume: bool,

    /// Catalog file to read and update (overrides the configured candidates)
    #[arg(short = 'c', long)]
    catalog: Option<PathBuf>,

    /// Directory for the generated code and report
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Never consult the fallback endpoints
    #[arg(long)]
    no_fallback: bool,
}

impl SyncArgs {
    fn to_options(&self, config: &Config) -> Result<SyncOptions, Box<dyn std::error::Error>> {
        let vehicle_types = match self.vehicle_type {
            Some(arg) => arg.vehicle_types(),
            None if config.sync.vehicle_types.is_empty() => VehicleType::ALL.to_vec(),
            None => config
                .sync
                .vehicle_types
                .iter()
                .map(|name| name.parse::<VehicleType>())
                .collect::<Result<_, _>>()?,
        };

        let brands = if self.all_brands {
            BrandSelection::All
        } else if !self.brands.is_empty() {
            BrandSelection::Named(self.brands.clone())
        } else if !config.sync.brands.is_empty() {
            BrandSelection::Named(config.sync.brands.clone())
        } else {
            BrandSelection::Priority
        };

        let (catalog_candidates, catalog_target) = match &self.catalog {
            Some(path) => (vec![path.clone()], Some(path.clone())),
            None => (config.catalog_candidates(), config.catalog.target.clone()),
        };

        Ok(SyncOptions {
            vehicle_types,
            brands,
            dry_run: self.dry_run,
            resume: self.resume,
            brand_delay: Duration::from_millis(config.sync.brand_delay_ms),
            output_dir: self.output.clone().unwrap_or_else(|| config.output.dir.clone()),
            catalog_candidates,
            catalog_target,
            checkpoint_path: config.checkpoint_path(),
        })
    }
}

/// Wire the transport, cache and sources from configuration.
fn build_source(
    config: &Config,
    no_fallback: bool,
) -> Result<(Arc<dyn PricingSource>, Arc<Fetcher>), Box<dyn std::error::Error>> {
    let transport = Arc::new(ReqwestTransport::with_timeout(
        config.request_timeout(),
        &config.api.user_agent,
    )?);
    let cache = Arc::new(CacheStore::open(config.cache_dir(), config.cache_ttl())?);
    let fetcher = Arc::new(Fetcher::new(transport, cache, config.fetcher_options()));

    let primary = ParallelumSource::new(Arc::clone(&fetcher), config.api.primary_url.as_str());
    let fallback: Option<Box<dyn PricingSource>> = if config.api.fallback && !no_fallback {
        let mut fipe = FipeSource::new(Arc::clone(&fetcher), config.api.fallback_url.as_str());
        if let Some(table) = &config.api.reference_table {
            fipe = fipe.with_reference_table(table.as_str());
        }
        Some(Box::new(fipe))
    } else {
        None
    };

    let source: Arc<dyn PricingSource> = Arc::new(FallbackSource::new(Box::new(primary), fallback));
    Ok((source, fetcher))
}

/// Handle the sync command.
pub(crate) async fn handle_sync(
    args: SyncArgs,
    config: &Config,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options(config)?;
    let (source, fetcher) = build_source(config, args.no_fallback)?;

    tracing::info!(
        vehicle_types = ?options.vehicle_types,
        brands = ?options.brands,
        dry_run = options.dry_run,
        resume = options.resume,
        "Starting sync"
    );

    let started = chrono::Utc::now();
    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let orchestrator = SyncOrchestrator::new(source, options).with_shutdown(shutdown);

    let outcome = orchestrator.run(Some(callback.as_ref())).await;
    reporter.finish();
    let elapsed = chrono::Utc::now() - started;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            let stats = fetcher.stats();
            if let Some(partial) = e.partial_result() {
                print_summary(partial, stats, orchestrator.options(), elapsed);
            }
            eprintln!(
                "\n{} Sync failed after {} requests ({} cache hits): {e}",
                style("✗").red().bold(),
                stats.network_requests,
                stats.cache_hits
            );
            if !matches!(e, SyncError::Checkpoint(_)) {
                eprintln!("Completed brands were checkpointed. Continue with: fipe-sync sync --resume");
            }
            return Err(e.into());
        }
    };
    print_summary(&result, fetcher.stats(), orchestrator.options(), elapsed);
    Ok(())
}

#[derive(serde::Serialize, tabled::Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn format_elapsed(elapsed: chrono::TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, s) => format!("{h}h {m:02}m {s:02}s"),
    }
}

fn summary_rows(result: &SyncResult, stats: FetchStats, elapsed: chrono::TimeDelta) -> Vec<SummaryRow> {
    let summary = result.summary;
    let row = |metric, value: usize| SummaryRow {
        metric,
        value: value.to_string(),
    };
    let mut rows = vec![
        row("Brands crawled", result.brands_crawled),
        row("Brands from checkpoint", result.brands_resumed),
        row("Brands failed", result.brands_failed),
        row("Vehicles collected", summary.collected),
        row("Already in catalog", summary.existing),
        row("Missing", summary.missing),
        row("  brand missing", summary.brand_missing),
        row("  model missing", summary.model_missing),
        row("Groups", summary.groups),
        row("Year ranges", summary.ranges),
        row("Skipped branches", summary.errors),
        row("Requests", stats.network_requests),
        row("Cache hits", stats.cache_hits),
    ];
    rows.push(SummaryRow {
        metric: "Elapsed",
        value: format_elapsed(elapsed),
    });
    rows
}

fn print_summary(
    result: &SyncResult,
    stats: FetchStats,
    options: &SyncOptions,
    elapsed: chrono::TimeDelta,
) {
    println!();
    if result.interrupted {
        println!(
            "{} Run {} interrupted. Continue with: fipe-sync sync --resume",
            style("!").yellow().bold(),
            result.run_id
        );
    }

    let mut table = tabled::Table::new(summary_rows(result, stats, elapsed));
    table.with(tabled::settings::Style::rounded());
    println!("{table}");

    if let Some(paths) = &result.artifacts {
        println!("Generated code: {}", paths.code.display());
        println!("Report:         {}", paths.report.display());
    }
    match (&result.catalog_update, options.dry_run) {
        (Some((path, inserted)), _) => {
            println!("Catalog:        {inserted} entries inserted into {}", path.display())
        }
        (None, true) if !result.interrupted => {
            println!("Catalog:        unchanged (dry run)")
        }
        _ => {}
    }

    if !result.errors.is_empty() {
        eprintln!(
            "\n{} {} branches skipped:",
            style("!").yellow().bold(),
            result.errors.len()
        );
        for failure in result.errors.iter().take(MAX_LISTED_ERRORS) {
            eprintln!("  - {}: {}", failure.scope, failure.message);
        }
        if result.errors.len() > MAX_LISTED_ERRORS {
            eprintln!("  ... and {} more", result.errors.len() - MAX_LISTED_ERRORS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SyncArgs,
    }

    fn parse(argv: &[&str]) -> SyncArgs {
        let mut full = vec!["fipe-sync"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_defaults_use_priority_brands_and_all_types() {
        let options = parse(&[]).to_options(&Config::default()).unwrap();
        assert_eq!(options.vehicle_types, VehicleType::ALL.to_vec());
        assert_eq!(options.brands, BrandSelection::Priority);
        assert!(!options.dry_run);
        assert!(!options.resume);
    }

    #[test]
    fn test_flags_map_to_options() {
        let args = parse(&[
            "--type",
            "motorcycle",
            "--brand",
            "Honda",
            "-b",
            "Yamaha",
            "--dry-run",
            "--resume",
            "--catalog",
            "catalog.ts",
            "--output",
            "out",
        ]);
        let options = args.to_options(&Config::default()).unwrap();
        assert_eq!(options.vehicle_types, vec![VehicleType::Motorcycle]);
        assert_eq!(
            options.brands,
            BrandSelection::Named(vec!["Honda".to_string(), "Yamaha".to_string()])
        );
        assert!(options.dry_run && options.resume);
        assert_eq!(options.catalog_candidates, vec![PathBuf::from("catalog.ts")]);
        assert_eq!(options.catalog_target, Some(PathBuf::from("catalog.ts")));
        assert_eq!(options.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_all_brands_conflicts_with_brand_filter() {
        let argv = ["fipe-sync", "--all-brands", "--brand", "Fiat"];
        assert!(Harness::try_parse_from(argv).is_err());
        let options = parse(&["--all-brands"]).to_options(&Config::default()).unwrap();
        assert_eq!(options.brands, BrandSelection::All);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(chrono::TimeDelta::seconds(42)), "42s");
        assert_eq!(format_elapsed(chrono::TimeDelta::seconds(125)), "2m 05s");
        assert_eq!(format_elapsed(chrono::TimeDelta::seconds(3723)), "1h 02m 03s");
    }

    fn row<'a>(rows: &'a [SummaryRow], metric: &str) -> &'a str {
        rows.iter()
            .find(|r| r.metric == metric)
            .map(|r| r.value.as_str())
            .unwrap()
    }

    #[test]
    fn test_failed_run_still_reports_counts() {
        let mut partial = SyncResult::default();
        partial.summary.collected = 12;
        partial.summary.errors = 3;
        partial.brands_failed = 1;
        let error = SyncError::UpstreamUnreachable {
            message: "car: dns failure".to_string(),
            partial: Box::new(partial),
        };
        let stats = FetchStats {
            network_requests: 9,
            cache_hits: 4,
            ..FetchStats::default()
        };

        let rows = summary_rows(
            error.partial_result().unwrap(),
            stats,
            chrono::TimeDelta::seconds(5),
        );

        assert_eq!(row(&rows, "Vehicles collected"), "12");
        assert_eq!(row(&rows, "Already in catalog"), "0");
        assert_eq!(row(&rows, "Missing"), "0");
        assert_eq!(row(&rows, "Skipped branches"), "3");
        assert_eq!(row(&rows, "Brands failed"), "1");
        assert_eq!(row(&rows, "Requests"), "9");
        assert_eq!(row(&rows, "Elapsed"), "5s");
        let io = SyncError::Io {
            context: "write".to_string(),
            source: std::io::Error::other("disk full"),
        };
        assert!(io.partial_result().is_none());
    }

    #[test]
    fn test_config_supplies_types_and_brands() {
        let mut config = Config::default();
        config.sync.vehicle_types = vec!["truck".to_string(), "carros".to_string()];
        config.sync.brands = vec!["Scania".to_string()];
        let options = parse(&[]).to_options(&config).unwrap();
        assert_eq!(options.vehicle_types, vec![VehicleType::Truck, VehicleType::Car]);
        assert_eq!(options.brands, BrandSelection::Named(vec!["Scania".to_string()]));

        config.sync.vehicle_types = vec!["boat".to_string()];
        assert!(parse(&[]).to_options(&config).is_err());
    }
}
