//! Resilient container loading.
//!
//! Reads the fact tables from the container, retrying transient failures
//! with exponential backoff, and reconciles them into a [`DataSnapshot`].
//! Loading never fails: when the container cannot be read the empty
//! snapshot is returned and the failure is logged.

pub mod container;
pub mod reconcile;
pub mod retry;

#[cfg(test)]
pub mod tests;

use crate::config::{LedgerConfig, RetryPolicy};
use crate::error::Result;
use crate::freshness::{FreshnessSignal, MarkerFile};
use crate::models::{DataSnapshot, FactTables};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct DataLoader {
    container_path: PathBuf,
    retry: RetryPolicy,
    signal: Arc<dyn FreshnessSignal>,
}

impl DataLoader {
    pub fn new(
        container_path: impl Into<PathBuf>,
        retry: RetryPolicy,
        signal: Arc<dyn FreshnessSignal>,
    ) -> Self {
        Self {
            container_path: container_path.into(),
            retry,
            signal,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            &config.container_path,
            config.retry.clone(),
            Arc::new(MarkerFile::new(&config.marker_path)),
        )
    }

    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Load and reconcile the current container.
    ///
    /// Each read attempt runs on the blocking pool.
    pub async fn load(&self) -> DataSnapshot {
        self.load_from(|| {
            let path = self.container_path.clone();
            async move {
                tokio::task::spawn_blocking(move || container::read_fact_tables(&path)).await?
            }
        })
        .await
    }

    /// Reload only when the freshness signal is set, then consume it
    pub async fn load_if_updated(&self) -> Option<DataSnapshot> {
        if !self.signal.has_update() {
            return None;
        }

        info!("Container updated, reloading");
        let snapshot = self.load().await;
        if let Err(e) = self.signal.mark_consumed() {
            warn!("Failed to consume freshness signal: {}", e);
        }
        Some(snapshot)
    }

    /// Load with a custom fact table reader
    pub(crate) async fn load_from<F, Fut>(&self, read: F) -> DataSnapshot
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<FactTables>>,
    {
        let facts = match retry::retry_with_backoff(&self.retry, read).await {
            Ok(facts) => facts,
            Err(e) => {
                error!(
                    "Failed to load {}: {}. Serving empty data",
                    self.container_path.display(),
                    e
                );
                return DataSnapshot::empty();
            }
        };

        match reconcile::reconcile(&facts) {
            Ok((merged, measures)) => {
                info!(
                    "Loaded snapshot: orders={}, revenues={}, cash={}, merged={}",
                    facts.orders.height(),
                    facts.revenues.height(),
                    facts.cash.height(),
                    merged.height()
                );
                DataSnapshot {
                    orders: facts.orders,
                    revenues: facts.revenues,
                    cash: facts.cash,
                    merged,
                    measures,
                }
            }
            Err(e) => {
                error!("Failed to reconcile fact tables: {}. Serving empty data", e);
                DataSnapshot::empty()
            }
        }
    }
}
