//! Freshness signalling between the pipeline and the loader.
//!
//! The pipeline publishes after each successful container write; the loader
//! polls [`FreshnessSignal::has_update`] and consumes the signal once it has
//! reloaded. Publishing is idempotent: several publishes before a consume
//! still mean a single pending update.

use crate::error::{LedgerError, Result};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

pub trait FreshnessSignal: Send + Sync {
    /// Mark the container as updated
    fn publish(&self) -> Result<()>;

    /// True when an update has been published and not yet consumed
    fn has_update(&self) -> bool;

    /// Acknowledge the pending update
    fn mark_consumed(&self) -> Result<()>;
}

/// Marker file next to the container; its presence means "updated".
///
/// The file holds the RFC 3339 timestamp of the last publish for humans.
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FreshnessSignal for MarkerFile {
    fn publish(&self) -> Result<()> {
        let stamp = chrono::Utc::now().to_rfc3339();
        std::fs::write(&self.path, format!("Data updated at {}\n", stamp))?;
        debug!("Published freshness marker {}", self.path.display());
        Ok(())
    }

    fn has_update(&self) -> bool {
        self.path.exists()
    }

    fn mark_consumed(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::Io(e)),
        }
    }
}

/// In-process signal for embedding pipeline and loader in one program
#[derive(Debug, Default)]
pub struct VersionCounter {
    published: AtomicU64,
    consumed: AtomicU64,
}

impl VersionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publishes so far
    pub fn version(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}

impl FreshnessSignal for VersionCounter {
    fn publish(&self) -> Result<()> {
        self.published.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn has_update(&self) -> bool {
        self.published.load(Ordering::Acquire) > self.consumed.load(Ordering::Acquire)
    }

    fn mark_consumed(&self) -> Result<()> {
        let current = self.published.load(Ordering::Acquire);
        self.consumed.fetch_max(current, Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_marker_file_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let marker = MarkerFile::new(temp_dir.path().join("data_updated.txt"));

        assert!(!marker.has_update());
        marker.publish().unwrap();
        assert!(marker.has_update());

        let content = std::fs::read_to_string(marker.path()).unwrap();
        assert!(content.starts_with("Data updated at "));

        marker.mark_consumed().unwrap();
        assert!(!marker.has_update());
    }

    #[test]
    fn test_marker_file_consume_without_publish() {
        let temp_dir = TempDir::new().unwrap();
        let marker = MarkerFile::new(temp_dir.path().join("data_updated.txt"));

        assert!(marker.mark_consumed().is_ok());
    }

    #[test]
    fn test_repeated_publish_is_one_update() {
        let temp_dir = TempDir::new().unwrap();
        let marker = MarkerFile::new(temp_dir.path().join("data_updated.txt"));

        marker.publish().unwrap();
        marker.publish().unwrap();
        marker.mark_consumed().unwrap();
        assert!(!marker.has_update());
    }

    #[test]
    fn test_version_counter() {
        let counter = VersionCounter::new();
        assert!(!counter.has_update());

        counter.publish().unwrap();
        counter.publish().unwrap();
        assert!(counter.has_update());
        assert_eq!(counter.version(), 2);

        counter.mark_consumed().unwrap();
        assert!(!counter.has_update());

        counter.publish().unwrap();
        assert!(counter.has_update());
    }
}
