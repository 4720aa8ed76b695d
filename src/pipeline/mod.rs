//! Star schema pipeline.
//!
//! Fetches the flat ledger from a [`RowSource`], builds the six dimensions
//! and three fact tables, replaces the container and publishes the
//! freshness signal. Every run is a full recompute.

pub mod dimensions;
pub mod facts;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{dimensions::DimensionSet, writer::ContainerWriter};

use crate::config::LedgerConfig;
use crate::constants;
use crate::error::Result;
use crate::freshness::{FreshnessSignal, MarkerFile};
use crate::ingest::parse_ledger;
use crate::models::{FactTables, RawTable, RunStats};
use crate::source::{CsvFileSource, RowSource};

use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Dimensions and facts produced from one ledger snapshot
#[derive(Debug, Clone)]
pub struct StarSchema {
    pub dimensions: DimensionSet,
    pub facts: FactTables,
    pub rows_ingested: usize,
}

impl StarSchema {
    /// All nine tables in container order
    pub fn tables(&self) -> Result<Vec<(&'static str, DataFrame)>> {
        let mut tables = self.dimensions.to_frames()?;
        tables.push((constants::ORDERS_FACT, self.facts.orders.clone()));
        tables.push((constants::REVENUES_FACT, self.facts.revenues.clone()));
        tables.push((constants::CASH_FACT, self.facts.cash.clone()));
        Ok(tables)
    }
}

/// Pure transformation of a raw ledger table into the star schema
pub fn transform(table: &RawTable) -> Result<StarSchema> {
    let rows = parse_ledger(table)?;
    let dimensions = DimensionSet::build(&rows);
    debug!(
        "Dimensions: customers={}, projects={}, sms={}, dates={}, po_refs={}, regions={}",
        dimensions.customer.len(),
        dimensions.project.len(),
        dimensions.sm.len(),
        dimensions.date.len(),
        dimensions.po_ref.len(),
        dimensions.region.len()
    );
    let facts = facts::build_facts(&rows, &dimensions)?;

    Ok(StarSchema {
        dimensions,
        facts,
        rows_ingested: rows.len(),
    })
}

pub struct Pipeline {
    source: Arc<dyn RowSource>,
    writer: ContainerWriter,
    signal: Arc<dyn FreshnessSignal>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn RowSource>,
        writer: ContainerWriter,
        signal: Arc<dyn FreshnessSignal>,
    ) -> Self {
        Self {
            source,
            writer,
            signal,
        }
    }

    /// CSV source, configured container and marker file
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            Arc::new(CsvFileSource::new(&config.source_path)),
            ContainerWriter::new(&config.container_path, config.compression),
            Arc::new(MarkerFile::new(&config.marker_path)),
        )
    }

    /// Run once, reporting the outcome as a boolean.
    ///
    /// Failures are logged; the previous container stays in place.
    pub fn run(&self) -> bool {
        match self.try_run() {
            Ok(stats) => {
                info!(
                    "Pipeline run complete: {} rows -> {} in {}ms",
                    stats.rows_ingested,
                    stats.container_path.display(),
                    stats.processing_time_ms
                );
                true
            }
            Err(e) => {
                error!("Pipeline run failed: {}", e);
                false
            }
        }
    }

    pub fn try_run(&self) -> Result<RunStats> {
        let start_time = Instant::now();

        info!("Fetching ledger from {}", self.source.name());
        let table = self.source.fetch()?;
        let schema = transform(&table)?;

        let bytes = self.writer.write(&schema.tables()?)?;
        self.signal.publish()?;
        info!(
            "Wrote container {} ({} bytes)",
            self.writer.container_path().display(),
            bytes
        );

        let dims = &schema.dimensions;
        Ok(RunStats {
            rows_ingested: schema.rows_ingested,
            customers: dims.customer.len(),
            projects: dims.project.len(),
            sms: dims.sm.len(),
            dates: dims.date.len(),
            po_refs: dims.po_ref.len(),
            regions: dims.region.len(),
            container_path: self.writer.container_path().to_path_buf(),
            processing_time_ms: start_time.elapsed().as_millis(),
        })
    }
}
