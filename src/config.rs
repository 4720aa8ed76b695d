//! Configuration management and validation.
//!
//! Provides the pipeline configuration (file locations, container
//! compression, reader retry policy, watch polling) and its layered
//! loading: defaults, then a JSON file, then environment variables.

use crate::constants;
use crate::error::{LedgerError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Supported compression algorithms for the container's table entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

impl std::str::FromStr for CompressionAlgorithm {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "snappy" => Ok(CompressionAlgorithm::Snappy),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "none" | "uncompressed" => Ok(CompressionAlgorithm::Uncompressed),
            other => Err(LedgerError::Configuration {
                message: format!("Unknown compression algorithm: {}", other),
            }),
        }
    }
}

/// Exponential backoff for container reads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total read attempts, including the first
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub initial_delay_ms: u64,

    /// Growth factor applied after every further failure
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: constants::DEFAULT_INITIAL_DELAY_MS,
            multiplier: constants::DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Upper bound on time spent sleeping across one retry sequence
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_after(a)).sum()
    }
}

/// Polling behaviour of the `watch` trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Interval between source modification checks
    pub poll_interval_ms: u64,

    /// Wait used while the source file does not exist
    pub missing_source_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            missing_source_delay_ms: constants::DEFAULT_MISSING_SOURCE_DELAY_MS,
        }
    }
}

/// Global configuration for the ledger pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// CSV export of the sales ledger
    pub source_path: PathBuf,

    /// Multi-table container written by the pipeline
    pub container_path: PathBuf,

    /// Freshness marker written after each successful run
    pub marker_path: PathBuf,

    /// Compression of the container's table entries
    pub compression: CompressionAlgorithm,

    /// Reader retry policy
    pub retry: RetryPolicy,

    /// Source polling for the watch command
    pub watch: WatchConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(constants::DEFAULT_SOURCE_PATH),
            container_path: PathBuf::from(constants::DEFAULT_CONTAINER_PATH),
            marker_path: PathBuf::from(constants::DEFAULT_MARKER_PATH),
            compression: CompressionAlgorithm::Snappy,
            retry: RetryPolicy::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Set the source ledger path
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Set the container path
    pub fn with_container_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.container_path = path.into();
        self
    }

    /// Set the freshness marker path
    pub fn with_marker_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.marker_path = path.into();
        self
    }

    /// Set the container compression
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Set the reader retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Place container and marker inside one directory
    pub fn in_directory(self, dir: &Path) -> Self {
        let container = dir.join(constants::DEFAULT_CONTAINER_PATH);
        let marker = dir.join(constants::DEFAULT_MARKER_PATH);
        self.with_container_path(container).with_marker_path(marker)
    }

    /// Default location of the configuration file, if a config dir exists
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ledger_etl").join("config.json"))
    }

    /// Read a JSON configuration file; absent keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| LedgerError::Configuration {
            message: format!("Invalid config file {}: {}", path.display(), e),
        })
    }

    /// Defaults, then the optional file, then environment overrides
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `LEDGER_*` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(constants::ENV_SOURCE) {
            debug!("{} overrides source path", constants::ENV_SOURCE);
            self.source_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(constants::ENV_CONTAINER) {
            debug!("{} overrides container path", constants::ENV_CONTAINER);
            self.container_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(constants::ENV_MARKER) {
            debug!("{} overrides marker path", constants::ENV_MARKER);
            self.marker_path = PathBuf::from(value);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.container_path.as_os_str().is_empty() {
            return Err(LedgerError::Configuration {
                message: "container_path must not be empty".to_string(),
            });
        }
        if self.marker_path.as_os_str().is_empty() {
            return Err(LedgerError::Configuration {
                message: "marker_path must not be empty".to_string(),
            });
        }
        if self.container_path == self.marker_path {
            return Err(LedgerError::Configuration {
                message: format!(
                    "container and marker must be different files: {}",
                    self.container_path.display()
                ),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(LedgerError::Configuration {
                message: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        if !(self.retry.multiplier >= 1.0) {
            return Err(LedgerError::Configuration {
                message: format!(
                    "retry.multiplier must be >= 1.0, got {}",
                    self.retry.multiplier
                ),
            });
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(LedgerError::Configuration {
                message: "watch.poll_interval_ms must be positive".to_string(),
            });
        }
        Ok(())
    }
}
