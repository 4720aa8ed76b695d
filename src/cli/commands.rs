//! Command implementations for the ledger ETL CLI
//!
//! Sets up logging and layered configuration, then drives the pipeline
//! (`run`, `watch`) or the loader (`inspect`) and prints a summary.

use crate::cli::args::{Args, Commands, InspectArgs};
use crate::config::LedgerConfig;
use crate::loader::DataLoader;
use crate::models::{DataSnapshot, RunStats};
use crate::pipeline::Pipeline;
use crate::query::{self, SnapshotFilter};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Dispatch the parsed command line.
///
/// Returns `false` when a pipeline run failed, so the binary can exit
/// with a non-zero status.
pub async fn run(args: Args) -> Result<bool> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    let config = load_configuration(&args)?;
    debug!("Loaded configuration: {:?}", config);

    match &args.command {
        Some(Commands::Run(_)) => run_once(&args, &config).await,
        Some(Commands::Inspect(inspect_args)) => {
            inspect(&config, inspect_args).await?;
            Ok(true)
        }
        Some(Commands::Watch) => {
            watch(&config).await?;
            Ok(true)
        }
        None => Ok(true),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ledger_etl={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

/// Load configuration using layered approach (defaults -> file -> env -> args)
fn load_configuration(args: &Args) -> Result<LedgerConfig> {
    let config_file = args
        .config_file
        .clone()
        .or_else(|| LedgerConfig::default_config_path().filter(|path| path.exists()));

    let config = LedgerConfig::load_layered(config_file.as_deref())
        .context("Failed to load configuration")?;
    let config = args
        .apply_to(config)
        .context("Invalid command line options")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_once(args: &Args, config: &LedgerConfig) -> Result<bool> {
    let progress_bar = if args.show_progress() {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Processing {}", config.source_path.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    match with_spinner(progress_bar, run_pipeline(config)).await? {
        Ok(stats) => {
            print_run_report(&stats);
            Ok(true)
        }
        Err(message) => {
            eprintln!("{} {}", "Pipeline run failed:".red().bold(), message);
            Ok(false)
        }
    }
}

/// Await `task`, clearing the spinner whatever the outcome
async fn with_spinner<T>(spinner: Option<ProgressBar>, task: impl Future<Output = T>) -> T {
    let output = task.await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    output
}

/// Run the pipeline on the blocking pool; the inner error is the run failure
async fn run_pipeline(config: &LedgerConfig) -> Result<std::result::Result<RunStats, String>> {
    let pipeline = Pipeline::from_config(config);
    let outcome = tokio::task::spawn_blocking(move || pipeline.try_run())
        .await
        .context("Pipeline task failed to complete")?;

    Ok(outcome.map_err(|e| {
        error!("Pipeline run failed: {}", e);
        e.to_string()
    }))
}

fn print_run_report(stats: &RunStats) {
    println!("\n{}", "Ledger model updated".green().bold());
    println!("   • Rows ingested: {}", stats.rows_ingested);
    println!(
        "   • Dimensions: {} customers, {} projects, {} SMs, {} months, {} PO refs, {} regions",
        stats.customers, stats.projects, stats.sms, stats.dates, stats.po_refs, stats.regions
    );
    println!("   • Container: {}", stats.container_path.display());
    println!("   • Processing time: {}ms", stats.processing_time_ms);
    println!();
}

async fn inspect(config: &LedgerConfig, args: &InspectArgs) -> Result<()> {
    let period = args.period().context("Invalid --period")?;
    let loader = DataLoader::from_config(config);
    let snapshot = loader.load().await;

    if snapshot.is_empty() {
        println!(
            "{} {}",
            "No data available in".yellow(),
            loader.container_path().display()
        );
        return Ok(());
    }

    print_overview(&snapshot)?;

    let filter = match args.year {
        Some(year) => SnapshotFilter::new().with_year(year),
        None => SnapshotFilter::new(),
    };

    let totals = query::measure_totals(&snapshot, &filter)?;
    println!("\n{}", "Totals".bold());
    println!("   • Orders:  {:>14.2}", totals.order);
    println!("   • Revenue: {:>14.2}", totals.revenue);
    println!("   • Cash:    {:>14.2}", totals.cash);
    println!("   • Backlog: {:>14.2}", totals.backlog);
    println!("   • Pending: {:>14.2}", totals.pending);
    println!("   • Distinct POs: {}", totals.po_count);

    let breakdown = query::breakdown(&snapshot, &args.dimension, &args.measure, &filter)
        .with_context(|| format!("Cannot break {} down by {}", args.measure, args.dimension))?;
    println!(
        "\n{}",
        format!("{} by {}", args.measure, args.dimension).bold()
    );
    println!("{}", breakdown.head(Some(args.top)));

    let series = query::period_breakdown(&snapshot, period, &args.measure, &filter)
        .with_context(|| format!("Cannot build {} series", args.measure))?;
    println!("\n{}", format!("{} per period", args.measure).bold());
    println!("{}", series);

    Ok(())
}

fn print_overview(snapshot: &DataSnapshot) -> Result<()> {
    println!("{}", "Loaded tables".bold());
    for (name, df) in [
        ("Orders", &snapshot.orders),
        ("Revenues", &snapshot.revenues),
        ("Cash", &snapshot.cash),
        ("Merged", &snapshot.merged),
    ] {
        println!("   • {:<9} {} rows x {} columns", name, df.height(), df.width());
    }

    println!("\n{}", "Measure columns".bold());
    for (measure, column) in snapshot.measures.iter() {
        println!("   • {} -> {}", measure, column.cyan());
    }

    let years = query::available_years(snapshot)?;
    let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
    println!("\nYears: {}", years.join(", "));
    if let Some((first, last)) = query::month_range(snapshot)? {
        println!("Months: {} to {}", first.format("%Y-%m"), last.format("%Y-%m"));
    }
    Ok(())
}

fn source_modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Re-run the pipeline whenever the source file's modification time advances
async fn watch(config: &LedgerConfig) -> Result<()> {
    let poll_interval = Duration::from_millis(config.watch.poll_interval_ms);
    let missing_delay = Duration::from_millis(config.watch.missing_source_delay_ms);
    let mut last_seen: Option<SystemTime> = None;

    info!(
        "Watching {} every {}ms",
        config.source_path.display(),
        config.watch.poll_interval_ms
    );
    println!(
        "{} {} (Ctrl+C to stop)",
        "Watching".green().bold(),
        config.source_path.display()
    );

    loop {
        let delay = match source_modified(&config.source_path) {
            None => {
                warn!(
                    "Source {} not found, checking again in {}ms",
                    config.source_path.display(),
                    missing_delay.as_millis()
                );
                missing_delay
            }
            Some(modified) => {
                if last_seen.is_none_or(|seen| modified > seen) {
                    last_seen = Some(modified);
                    match run_pipeline(config).await? {
                        Ok(stats) => println!(
                            "{} {} rows at {}",
                            "Updated:".green(),
                            stats.rows_ingested,
                            chrono::Local::now().format("%H:%M:%S")
                        ),
                        Err(message) => eprintln!("{} {}", "Run failed:".red(), message),
                    }
                }
                poll_interval
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                println!("\n{}", "Stopping watch".yellow());
                return Ok(());
            }
        }
    }
}
