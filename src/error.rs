//! Error handling for ledger ETL operations.
//!
//! Provides the error type shared by ingestion, persistence and loading,
//! plus the transient/fatal classification the resilient reader retries on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Container archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Row source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Required column '{column}' is missing from the ledger header")]
    MissingColumn { column: String },

    #[error("Table '{table}' is missing from container: {path}")]
    MissingTable { table: String, path: PathBuf },

    #[error("Schema mismatch in table {table}: {reason}")]
    SchemaMismatch { table: String, reason: String },

    #[error("Container is corrupt or incomplete: {path} - {reason}")]
    ContainerCorrupt { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Retry classification for read failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Consistent with a concurrent write in progress; worth retrying
    Transient,
    /// Retrying cannot help
    Fatal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Io(_) | LedgerError::ContainerCorrupt { .. } => ErrorKind::Transient,
            // A missing entry inside a complete archive is a schema problem, not a torn write
            LedgerError::Zip(zip::result::ZipError::FileNotFound) => ErrorKind::Fatal,
            LedgerError::Zip(_) => ErrorKind::Transient,
            LedgerError::Polars(_)
            | LedgerError::SourceUnavailable { .. }
            | LedgerError::MissingColumn { .. }
            | LedgerError::MissingTable { .. }
            | LedgerError::SchemaMismatch { .. }
            | LedgerError::Configuration { .. }
            | LedgerError::Task(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_transient() {
        let error = LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "container missing",
        ));
        assert_eq!(error.kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_truncated_archive_is_transient() {
        let error = LedgerError::Zip(zip::result::ZipError::InvalidArchive(
            "Could not find central directory end".into(),
        ));
        assert!(error.is_transient());
    }

    #[test]
    fn test_schema_problems_are_fatal() {
        let missing_entry = LedgerError::Zip(zip::result::ZipError::FileNotFound);
        assert_eq!(missing_entry.kind(), ErrorKind::Fatal);

        let mismatch = LedgerError::SchemaMismatch {
            table: "Orders_Fact".to_string(),
            reason: "Month has type Boolean".to_string(),
        };
        assert_eq!(mismatch.kind(), ErrorKind::Fatal);

        let missing_column = LedgerError::MissingColumn {
            column: "Region".to_string(),
        };
        assert!(!missing_column.is_transient());
    }

    #[tokio::test]
    async fn test_failed_background_task_is_fatal() {
        let join_error = tokio::task::spawn_blocking(|| -> () { panic!("reader crashed") })
            .await
            .unwrap_err();
        let error = LedgerError::from(join_error);
        assert!(matches!(error, LedgerError::Task(_)));
        assert!(!error.is_transient());
    }
}
