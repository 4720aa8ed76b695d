//! Container writing.
//!
//! All nine tables go into one ZIP archive, one Parquet entry per table.
//! The archive is assembled in a temporary file beside the destination and
//! renamed over it only once complete, so readers see either the previous
//! container or the new one.

use crate::config::CompressionAlgorithm;
use crate::constants;
use crate::error::{LedgerError, Result};
use polars::prelude::{DataFrame, ParquetWriter};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone)]
pub struct ContainerWriter {
    container_path: PathBuf,
    compression: CompressionAlgorithm,
}

impl ContainerWriter {
    pub fn new(container_path: impl Into<PathBuf>, compression: CompressionAlgorithm) -> Self {
        Self {
            container_path: container_path.into(),
            compression,
        }
    }

    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Write the named tables and atomically replace the container.
    ///
    /// Returns the size of the written archive in bytes. On error the
    /// temporary file is discarded and the existing container is untouched.
    pub fn write(&self, tables: &[(&str, DataFrame)]) -> Result<u64> {
        let parent = self
            .container_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut archive = ZipWriter::new(temp.as_file());
            // Parquet pages are already compressed
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

            for (table, df) in tables {
                let payload = self.encode_table(table, df)?;
                archive.start_file(constants::table_entry_name(table), options)?;
                archive.write_all(&payload)?;
                debug!("Wrote entry {} ({} bytes)", table, payload.len());
            }
            archive.finish()?;
        }
        temp.as_file().sync_all()?;

        let size = temp.as_file().metadata()?.len();
        temp.persist(&self.container_path)
            .map_err(|e| LedgerError::Io(e.error))?;

        debug!(
            "Replaced container {} ({} bytes)",
            self.container_path.display(),
            size
        );
        Ok(size)
    }

    fn encode_table(&self, table: &str, df: &DataFrame) -> Result<Vec<u8>> {
        let mut df = df.clone();
        let mut buffer = Vec::new();
        ParquetWriter::new(&mut buffer)
            .with_compression(self.compression.to_polars_compression())
            .finish(&mut df)
            .map_err(|e| LedgerError::SchemaMismatch {
                table: table.to_string(),
                reason: format!("Failed to encode parquet: {}", e),
            })?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn sample() -> DataFrame {
        df! {
            "Customer" => ["Acme", "Globex"],
            "CustomerID" => [1u32, 2],
        }
        .unwrap()
    }

    #[test]
    fn test_write_creates_one_entry_per_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.zip");
        let writer = ContainerWriter::new(&path, CompressionAlgorithm::Snappy);

        let size = writer
            .write(&[("Customer_Dim", sample()), ("Region_Dim", sample())])
            .unwrap();
        assert!(size > 0);

        let archive = ::zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Customer_Dim.parquet", "Region_Dim.parquet"]);
    }

    #[test]
    fn test_write_creates_missing_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("model.zip");
        let writer = ContainerWriter::new(&path, CompressionAlgorithm::Uncompressed);

        writer.write(&[("Customer_Dim", sample())]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.zip");
        let writer = ContainerWriter::new(&path, CompressionAlgorithm::Zstd);

        writer.write(&[("Customer_Dim", sample())]).unwrap();
        writer.write(&[("Customer_Dim", sample())]).unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
