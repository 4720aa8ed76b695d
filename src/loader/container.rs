//! Container reading.
//!
//! Decoding failures (truncated archive, unreadable Parquet payload) are
//! reported as [`LedgerError::ContainerCorrupt`] so the loader retries
//! them; a table missing from an intact archive is fatal.

use crate::constants;
use crate::error::{LedgerError, Result};
use crate::ingest::parse_month;
use crate::models::FactTables;
use crate::pipeline::dimensions::days_since_epoch;
use ::zip::ZipArchive;
use ::zip::result::ZipError;
use polars::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, warn};

/// Read one table from the container without any normalization
pub fn read_table(path: &Path, table: &str) -> Result<DataFrame> {
    let mut archive = open_archive(path)?;
    read_entry(&mut archive, path, table)
}

/// Read the three fact tables with `Month` as a Date and a derived `Year`
pub fn read_fact_tables(path: &Path) -> Result<FactTables> {
    let mut archive = open_archive(path)?;

    let orders = read_entry(&mut archive, path, constants::ORDERS_FACT)?;
    let revenues = read_entry(&mut archive, path, constants::REVENUES_FACT)?;
    let cash = read_entry(&mut archive, path, constants::CASH_FACT)?;

    Ok(FactTables {
        orders: with_year(orders, constants::ORDERS_FACT)?,
        revenues: with_year(revenues, constants::REVENUES_FACT)?,
        cash: with_year(cash, constants::CASH_FACT)?,
    })
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| corrupt(path, format!("unreadable archive: {}", e)))
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
    table: &str,
) -> Result<DataFrame> {
    let entry_name = constants::table_entry_name(table);
    let mut entry = match archive.by_name(&entry_name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(LedgerError::MissingTable {
                table: table.to_string(),
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(corrupt(path, format!("entry {}: {}", entry_name, e))),
    };

    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| corrupt(path, format!("entry {}: {}", entry_name, e)))?;

    let df = ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| corrupt(path, format!("entry {}: {}", entry_name, e)))?;

    debug!("Read {} ({} rows)", table, df.height());
    Ok(df)
}

fn corrupt(path: &Path, reason: String) -> LedgerError {
    LedgerError::ContainerCorrupt {
        path: path.to_path_buf(),
        reason,
    }
}

/// Coerce `Month` to a Date column and derive `Year`, 0 where Month is null
pub fn with_year(mut df: DataFrame, table: &str) -> Result<DataFrame> {
    let Some(month) = df.column(constants::MONTH).ok().cloned() else {
        warn!("{} has no {} column, Year defaults to 0", table, constants::MONTH);
        let height = df.height();
        df.with_column(Column::new(constants::YEAR.into(), vec![0i32; height]))?;
        return Ok(df);
    };

    let normalized = match month.dtype() {
        DataType::Date => None,
        DataType::Datetime(_, _) => Some(month.cast(&DataType::Date)?),
        DataType::String => {
            let days: Vec<Option<i32>> = month
                .str()?
                .into_iter()
                .map(|value| value.and_then(parse_month).map(days_since_epoch))
                .collect();
            Some(Column::new(constants::MONTH.into(), days).cast(&DataType::Date)?)
        }
        DataType::Null => Some(month.cast(&DataType::Date)?),
        other => {
            return Err(LedgerError::SchemaMismatch {
                table: table.to_string(),
                reason: format!("{} has unsupported type {}", constants::MONTH, other),
            });
        }
    };
    if let Some(column) = normalized {
        df.with_column(column)?;
    }

    let df = df
        .lazy()
        .with_column(
            col(constants::MONTH)
                .dt()
                .year()
                .fill_null(lit(0))
                .alias(constants::YEAR),
        )
        .collect()?;
    Ok(df)
}
