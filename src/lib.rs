//! Sales Ledger Star Schema Library
//!
//! Turns a flat sales ledger export into a star schema and back into an
//! analysis-ready view.
//!
//! This library provides tools for:
//! - Ingesting the ledger with tolerant month and amount parsing
//! - Building sorted dimensions with dense surrogate keys
//! - Building Orders, Revenues and Cash fact tables with safe key lookups
//! - Writing all tables to one atomically replaced container
//! - Reloading the container with retry and reconciling the facts into
//!   a merged view with a measure resolution map
//! - Querying the loaded snapshot for reporting

pub mod config;
pub mod constants;
pub mod error;
pub mod freshness;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod source;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{LedgerConfig, RetryPolicy};
pub use error::{ErrorKind, LedgerError, Result};
pub use freshness::{FreshnessSignal, MarkerFile, VersionCounter};
pub use loader::DataLoader;
pub use models::{DataSnapshot, FactTables, Measure, MeasureMap, RawRow, RawTable, RunStats};
pub use pipeline::Pipeline;
pub use source::{CsvFileSource, InMemorySource, RowSource};
