//! Integration tests for the ledger pipeline and loader
//!
//! Drives the public API end to end: CSV export on disk, pipeline run,
//! freshness marker, reload and reporting queries.

use ledger_etl::query::{self, Period, SnapshotFilter};
use ledger_etl::{DataLoader, FreshnessSignal, LedgerConfig, MarkerFile, Measure, Pipeline};
use std::fs;
use tempfile::TempDir;

const LEDGER_CSV: &str = "\
Customer,Project,SM,Month,PO_REF,Order_Amount,Revenue Amount,Cash Amount,Pending Amount,Backlog Amount,Region
Acme,P1,Jane,1/15/2024,PO-1,\"1,000\",800,,50,200,EU
Acme,P1,Jane,2/10/2024,PO-1,,200,600,,,EU
Globex,P2,,4/2/2024,,300,,,,,APAC
Initech,P3,Bob,Jan/25,PO-9,120,,,,,EU
";

fn setup(temp_dir: &TempDir) -> LedgerConfig {
    let source = temp_dir.path().join("data from db.csv");
    fs::write(&source, LEDGER_CSV).unwrap();
    LedgerConfig::default()
        .with_source_path(source)
        .in_directory(temp_dir.path())
}

#[tokio::test]
async fn test_csv_to_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let config = setup(&temp_dir);

    let pipeline = Pipeline::from_config(&config);
    let stats = pipeline.try_run().unwrap();
    assert_eq!(stats.rows_ingested, 4);
    assert_eq!(stats.customers, 3);
    assert_eq!(stats.sms, 2);
    assert!(config.container_path.exists());
    assert!(config.marker_path.exists());

    let loader = DataLoader::from_config(&config);
    let snapshot = loader.load_if_updated().await.unwrap();
    assert!(!config.marker_path.exists());

    assert_eq!(snapshot.orders.height(), 4);
    assert_eq!(snapshot.merged.height(), 4);
    assert_eq!(
        snapshot.measures.get(Measure::Revenue),
        Some("Revenue Amount_revenue")
    );
    assert_eq!(snapshot.measures.get(Measure::Cash), Some("Cash Amount_cash"));

    let totals = query::measure_totals(&snapshot, &SnapshotFilter::new()).unwrap();
    assert_eq!(totals.order, 1420.0);
    assert_eq!(totals.revenue, 1000.0);
    assert_eq!(totals.cash, 600.0);
    assert_eq!(totals.backlog, 200.0);
    assert_eq!(totals.pending, 50.0);
    assert_eq!(totals.po_count, 2);

    assert_eq!(query::available_years(&snapshot).unwrap(), vec![2024, 2025]);

    let quarterly = query::period_breakdown(
        &snapshot,
        Period::Quarterly,
        "Revenue Amount",
        &SnapshotFilter::new().with_customer("Acme"),
    )
    .unwrap();
    assert_eq!(quarterly.height(), 1);
}

#[tokio::test]
async fn test_failed_run_keeps_previous_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let config = setup(&temp_dir);

    assert!(Pipeline::from_config(&config).run());
    let before = fs::read(&config.container_path).unwrap();
    MarkerFile::new(&config.marker_path).mark_consumed().unwrap();

    // Export truncated to four columns
    fs::write(
        &config.source_path,
        "Customer,Project,SM,Month\nAcme,P1,Jane,1/15/2024\n",
    )
    .unwrap();
    assert!(!Pipeline::from_config(&config).run());

    assert_eq!(fs::read(&config.container_path).unwrap(), before);
    assert!(!config.marker_path.exists());

    let snapshot = DataLoader::from_config(&config).load().await;
    assert_eq!(snapshot.merged.height(), 4);
}

#[tokio::test]
async fn test_load_without_container_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = setup(&temp_dir);
    config.retry.max_attempts = 2;
    config.retry.initial_delay_ms = 1;

    let snapshot = DataLoader::from_config(&config).load().await;
    assert!(snapshot.is_empty());
    assert!(snapshot.measures.is_empty());
}
