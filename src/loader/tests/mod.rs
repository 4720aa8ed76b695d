//! Loader tests: retry behaviour and snapshots from real containers

pub mod resilience;

use crate::config::CompressionAlgorithm;
use crate::freshness::VersionCounter;
use crate::pipeline::{Pipeline, writer::ContainerWriter};
use crate::source::InMemorySource;
use std::path::Path;
use std::sync::Arc;

/// Run the pipeline over `rows` into `container`
pub fn write_container(container: &Path, rows: &[Vec<&str>]) {
    let source = InMemorySource::from_rows(&crate::constants::REQUIRED_COLUMNS, rows);
    let pipeline = Pipeline::new(
        Arc::new(source),
        ContainerWriter::new(container, CompressionAlgorithm::Snappy),
        Arc::new(VersionCounter::new()),
    );
    assert!(pipeline.run());
}
