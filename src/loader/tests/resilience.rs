//! Retry and degradation behaviour of the loader

use super::write_container;
use crate::config::RetryPolicy;
use crate::constants;
use crate::error::LedgerError;
use crate::freshness::VersionCounter;
use crate::loader::{DataLoader, container};
use polars::prelude::DataFrame;
use std::future::ready;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

fn corrupt(path: &std::path::Path) -> LedgerError {
    LedgerError::ContainerCorrupt {
        path: path.to_path_buf(),
        reason: "truncated archive".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_five_transient_failures() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger_model.zip");
    write_container(
        &path,
        &[vec![
            "Acme", "P1", "Jane", "1/15/2024", "PO-1", "100", "80", "", "", "", "EU",
        ]],
    );

    let loader = DataLoader::new(&path, RetryPolicy::default(), Arc::new(VersionCounter::new()));
    let mut attempts = 0;
    let start = Instant::now();

    let snapshot = loader
        .load_from(|| {
            attempts += 1;
            ready(if attempts <= 5 {
                Err(corrupt(&path))
            } else {
                container::read_fact_tables(&path)
            })
        })
        .await;

    let elapsed = start.elapsed();
    assert_eq!(attempts, 6);
    assert!(elapsed >= Duration::from_millis(6200));
    assert!(elapsed < Duration::from_millis(6250));
    assert_eq!(snapshot.orders.height(), 1);
    assert_eq!(snapshot.merged.height(), 1);
    assert!(!snapshot.measures.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_all_attempts_failing_yields_empty_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger_model.zip");
    std::fs::write(&path, b"definitely not a zip archive").unwrap();

    let loader = DataLoader::new(&path, RetryPolicy::default(), Arc::new(VersionCounter::new()));
    let snapshot = loader.load().await;

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.orders.width(), 0);
    assert!(snapshot.measures.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_container_yields_empty_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let loader = DataLoader::new(
        temp_dir.path().join("absent.zip"),
        RetryPolicy::default(),
        Arc::new(VersionCounter::new()),
    );

    assert!(loader.load().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_stops_after_one_attempt() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger_model.zip");
    let loader = DataLoader::new(&path, RetryPolicy::default(), Arc::new(VersionCounter::new()));

    let mut attempts = 0;
    let start = Instant::now();
    let snapshot = loader
        .load_from(|| {
            attempts += 1;
            ready(Err(LedgerError::MissingTable {
                table: "Cash_Fact".to_string(),
                path: path.clone(),
            }))
        })
        .await;

    assert_eq!(attempts, 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(snapshot.is_empty());
}

fn small_ledger() -> Vec<Vec<&'static str>> {
    vec![vec![
        "Acme", "P1", "Jane", "1/15/2024", "PO-1", "100", "80", "", "", "", "EU",
    ]]
}

fn large_ledger() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Globex", "P2", "", "2/1/2025", "", "300", "", "", "", "", "APAC"],
        vec!["Initech", "P3", "Bob", "3/1/2025", "PO-9", "", "120", "", "", "", "EU"],
        vec!["Umbrella", "P4", "Bob", "4/1/2025", "PO-7", "", "", "60", "", "", "US"],
    ]
}

fn customers(df: &DataFrame) -> Vec<String> {
    df.column(constants::CUSTOMER)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_reads_during_rewrites_see_whole_containers() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger_model.zip");
    write_container(&path, &small_ledger());

    let writer = {
        let path = path.clone();
        thread::spawn(move || {
            for i in 0..30 {
                let rows = if i % 2 == 0 { large_ledger() } else { small_ledger() };
                write_container(&path, &rows);
            }
        })
    };

    let small = vec!["Acme".to_string()];
    let large = vec![
        "Globex".to_string(),
        "Initech".to_string(),
        "Umbrella".to_string(),
    ];
    let mut reads = 0;
    while !writer.is_finished() || reads < 5 {
        match container::read_fact_tables(&path) {
            Ok(facts) => {
                let orders = customers(&facts.orders);
                assert!(orders == small || orders == large, "unexpected rows {:?}", orders);
                assert_eq!(customers(&facts.revenues), orders);
                assert_eq!(customers(&facts.cash), orders);
                reads += 1;
            }
            Err(e) => assert!(e.is_transient(), "non-transient failure: {}", e),
        }
    }

    writer.join().unwrap();
    assert!(reads >= 5);
}
