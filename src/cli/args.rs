//! Command-line argument definitions for the ledger ETL
//!
//! Global flags locate the files and tune logging; each subcommand is one
//! way of driving the pipeline or the loader.

use crate::config::{CompressionAlgorithm, LedgerConfig};
use crate::error::Result;
use crate::query::Period;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the sales ledger ETL
///
/// Reshapes a flat sales ledger export into a star schema container and
/// reconciles the fact tables back into one reporting view.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ledger_etl",
    version,
    about = "Reshape a flat sales ledger into a star schema container",
    long_about = "Reads the sales ledger CSV export, builds Customer/Project/SM/Date/PO REF/Region \
                  dimensions and Orders/Revenues/Cash facts, and writes them as one container of \
                  Parquet tables. The inspect command reloads the container and reports on the \
                  reconciled view."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a JSON configuration file
    ///
    /// If not specified, ~/.config/ledger_etl/config.json is used when it exists.
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Ledger CSV export to read
    #[arg(long = "source", value_name = "PATH", global = true)]
    pub source_path: Option<PathBuf>,

    /// Container file to write and read
    #[arg(long = "container", value_name = "PATH", global = true)]
    pub container_path: Option<PathBuf>,

    /// Freshness marker file
    #[arg(long = "marker", value_name = "PATH", global = true)]
    pub marker_path: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the pipeline once
    Run(RunArgs),
    /// Load the container and report on the reconciled view
    Inspect(InspectArgs),
    /// Run the pipeline whenever the source file changes
    Watch,
}

#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// Parquet compression for the container entries (snappy, zstd, lz4, none)
    #[arg(long, value_name = "ALGORITHM")]
    pub compression: Option<String>,
}

#[derive(Debug, Clone, Parser)]
pub struct InspectArgs {
    /// Dimension column to break the measure down by
    #[arg(long = "by", value_name = "COLUMN", default_value = "Customer")]
    pub dimension: String,

    /// Measure to report, logical or materialized name
    #[arg(long, value_name = "MEASURE", default_value = "Order Amount")]
    pub measure: String,

    /// Time series granularity (monthly, quarterly)
    #[arg(long, value_name = "PERIOD", default_value = "monthly")]
    pub period: String,

    /// Restrict the report to one year
    #[arg(long)]
    pub year: Option<i32>,

    /// Number of breakdown rows to show
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress spinners (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Apply the path flags over a loaded configuration
    pub fn apply_to(&self, mut config: LedgerConfig) -> Result<LedgerConfig> {
        if let Some(path) = &self.source_path {
            config.source_path = path.clone();
        }
        if let Some(path) = &self.container_path {
            config.container_path = path.clone();
        }
        if let Some(path) = &self.marker_path {
            config.marker_path = path.clone();
        }
        if let Some(Commands::Run(RunArgs {
            compression: Some(compression),
        })) = &self.command
        {
            config.compression = compression.parse::<CompressionAlgorithm>()?;
        }
        Ok(config)
    }
}

impl InspectArgs {
    pub fn period(&self) -> Result<Period> {
        self.period.parse()
    }
}
