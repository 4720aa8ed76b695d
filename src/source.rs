//! Row source adapters.
//!
//! A row source hands the pipeline the raw ledger as a rectangular table of
//! strings. Typed coercion happens later in [`crate::ingest`]; adapters only
//! fetch. Any failure to deliver at least one data row is reported as
//! [`LedgerError::SourceUnavailable`].

use crate::error::{LedgerError, Result};
use crate::models::RawTable;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Provider of the raw ledger table
pub trait RowSource: Send + Sync {
    /// Human readable identifier used in logs and errors
    fn name(&self) -> String;

    /// Fetch the full ledger, header row plus data rows
    fn fetch(&self) -> Result<RawTable>;
}

/// Reads a CSV export of the ledger spreadsheet
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, reason: impl Into<String>) -> LedgerError {
        LedgerError::SourceUnavailable {
            source_name: self.name(),
            reason: reason.into(),
        }
    }
}

impl RowSource for CsvFileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<RawTable> {
        if !self.path.exists() {
            return Err(self.unavailable("file does not exist"));
        }

        // Every column as String: coercion is the ingest step's job
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .and_then(|reader| reader.finish())
            .map_err(|e| self.unavailable(format!("failed to read CSV: {}", e)))?;

        let table = dataframe_to_raw_table(&df)?;
        if table.is_empty() {
            return Err(self.unavailable("no data rows"));
        }

        info!(
            "Loaded {} rows ({} columns) from {}",
            table.rows.len(),
            table.header.len(),
            self.path.display()
        );
        Ok(table)
    }
}

/// A fixed table held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    table: RawTable,
}

impl InMemorySource {
    pub fn new(table: RawTable) -> Self {
        Self { table }
    }

    /// Build from string slices, convenient for fixtures
    pub fn from_rows(header: &[&str], rows: &[Vec<&str>]) -> Self {
        Self::new(RawTable::new(
            header.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect(),
        ))
    }
}

impl RowSource for InMemorySource {
    fn name(&self) -> String {
        "in-memory".to_string()
    }

    fn fetch(&self) -> Result<RawTable> {
        if self.table.is_empty() {
            return Err(LedgerError::SourceUnavailable {
                source_name: self.name(),
                reason: "no data rows".to_string(),
            });
        }
        Ok(self.table.clone())
    }
}

/// Flatten an all-String frame into header + rows; nulls become empty cells
fn dataframe_to_raw_table(df: &DataFrame) -> Result<RawTable> {
    let header: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = vec![Vec::with_capacity(header.len()); df.height()];
    for column in df.get_columns() {
        let values = column.cast(&DataType::String)?;
        for (row, value) in rows.iter_mut().zip(values.str()?.into_iter()) {
            row.push(value.unwrap_or_default().to_string());
        }
    }

    debug!("Flattened {}x{} frame", df.height(), header.len());
    Ok(RawTable::new(header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_csv_source_reads_all_columns_as_strings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.csv");
        std::fs::write(
            &path,
            "Customer,Month,Order Amount\nAcme,1/22/2024,100\nGlobex,,\n",
        )
        .unwrap();

        let table = CsvFileSource::new(&path).fetch().unwrap();
        assert_eq!(table.header, vec!["Customer", "Month", "Order Amount"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["Acme", "1/22/2024", "100"]);
        assert_eq!(table.rows[1], vec!["Globex", "", ""]);
    }

    #[test]
    fn test_csv_source_missing_file_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let source = CsvFileSource::new(temp_dir.path().join("missing.csv"));

        match source.fetch() {
            Err(LedgerError::SourceUnavailable { reason, .. }) => {
                assert!(reason.contains("does not exist"));
            }
            other => panic!("Expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_source_header_only_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.csv");
        std::fs::write(&path, "Customer,Month\n").unwrap();

        let result = CsvFileSource::new(&path).fetch();
        assert!(matches!(result, Err(LedgerError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_in_memory_source() {
        let source = InMemorySource::from_rows(&["Customer"], &[vec!["Acme"]]);
        let table = source.fetch().unwrap();
        assert_eq!(table.rows, vec![vec!["Acme".to_string()]]);

        let empty = InMemorySource::default();
        assert!(empty.fetch().is_err());
    }
}
