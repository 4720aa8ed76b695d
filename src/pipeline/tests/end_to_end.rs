//! Full runs: source to container to reload

use super::sample_source;
use crate::config::CompressionAlgorithm;
use crate::constants;
use crate::freshness::{FreshnessSignal, MarkerFile, VersionCounter};
use crate::loader::container::read_table;
use crate::pipeline::{Pipeline, transform, writer::ContainerWriter};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_run_writes_all_tables_and_publishes() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("ledger_model.zip");
    let marker = Arc::new(MarkerFile::new(temp_dir.path().join("data_updated.txt")));

    let pipeline = Pipeline::new(
        Arc::new(sample_source()),
        ContainerWriter::new(&container, CompressionAlgorithm::Snappy),
        marker.clone(),
    );

    let stats = pipeline.try_run().unwrap();
    assert_eq!(stats.rows_ingested, 3);
    assert_eq!(stats.customers, 2);
    assert_eq!(stats.projects, 2);
    assert_eq!(stats.sms, 1);
    assert_eq!(stats.dates, 3);
    assert_eq!(stats.po_refs, 2);
    assert_eq!(stats.regions, 2);
    assert_eq!(stats.container_path, container);
    assert!(marker.has_update());

    for table in constants::TABLE_NAMES {
        let df = read_table(&container, table).unwrap();
        assert!(df.width() > 0, "{} has no columns", table);
    }
}

#[test]
fn test_persisted_dimensions_and_foreign_keys() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("ledger_model.zip");

    let pipeline = Pipeline::new(
        Arc::new(sample_source()),
        ContainerWriter::new(&container, CompressionAlgorithm::Zstd),
        Arc::new(VersionCounter::new()),
    );
    assert!(pipeline.run());

    let customers = read_table(&container, constants::CUSTOMER_DIM).unwrap();
    let names: Vec<Option<&str>> = customers
        .column(constants::CUSTOMER)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(names, vec![Some("Acme"), Some("Globex")]);

    let orders = read_table(&container, constants::ORDERS_FACT).unwrap();
    assert_eq!(orders.height(), 3);

    let sm_ids: Vec<Option<u32>> = orders
        .column(constants::SM_ID)
        .unwrap()
        .u32()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(sm_ids, vec![Some(1), None, Some(1)]);

    let date_ids: Vec<Option<u32>> = orders
        .column(constants::DATE_ID)
        .unwrap()
        .u32()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(date_ids, vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn test_transform_is_deterministic() {
    let table = crate::source::RowSource::fetch(&sample_source()).unwrap();

    let first = transform(&table).unwrap();
    let second = transform(&table).unwrap();

    let first_tables = first.tables().unwrap();
    let second_tables = second.tables().unwrap();
    assert_eq!(first_tables.len(), 9);
    for ((name_a, a), (name_b, b)) in first_tables.iter().zip(second_tables.iter()) {
        assert_eq!(name_a, name_b);
        assert!(a.equals_missing(b), "{} differs between runs", name_a);
    }
}

#[test]
fn test_rerun_replaces_container() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("ledger_model.zip");
    let counter = Arc::new(VersionCounter::new());

    let pipeline = Pipeline::new(
        Arc::new(sample_source()),
        ContainerWriter::new(&container, CompressionAlgorithm::Snappy),
        counter.clone(),
    );
    assert!(pipeline.run());
    assert!(pipeline.run());
    assert_eq!(counter.version(), 2);

    let region = read_table(&container, constants::REGION_DIM).unwrap();
    assert_eq!(region.height(), 2);
}
