//! Core data structures and types for the sales ledger model.
//!
//! Defines the raw ledger rows, the measure vocabulary with its resolution
//! map, the loaded snapshot handed to reporting code and run statistics.

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::constants;

/// Rectangular table of strings as delivered by a row source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// True when there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One typed ledger record; any field may be absent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub customer: Option<String>,
    pub project: Option<String>,
    pub sm: Option<String>,
    /// First day of the ledger month
    pub month: Option<NaiveDate>,
    pub po_ref: Option<String>,
    pub order_amount: Option<f64>,
    pub revenue_amount: Option<f64>,
    pub cash_amount: Option<f64>,
    pub pending_amount: Option<f64>,
    pub backlog_amount: Option<f64>,
    pub region: Option<String>,
}

/// Numeric quantities tracked per ledger event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Measure {
    Order,
    Revenue,
    Cash,
    Backlog,
    Pending,
}

impl Measure {
    pub const ALL: [Measure; 5] = [
        Measure::Order,
        Measure::Revenue,
        Measure::Cash,
        Measure::Backlog,
        Measure::Pending,
    ];

    /// Column name of the measure in the source ledger
    pub fn logical_name(&self) -> &'static str {
        match self {
            Measure::Order => constants::ORDER_AMOUNT,
            Measure::Revenue => constants::REVENUE_AMOUNT,
            Measure::Cash => constants::CASH_AMOUNT,
            Measure::Backlog => constants::BACKLOG_AMOUNT,
            Measure::Pending => constants::PENDING_AMOUNT,
        }
    }

    pub fn from_logical_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.logical_name() == name)
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.logical_name())
    }
}

/// Logical measure → column materialized in the merged view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureMap {
    columns: BTreeMap<Measure, String>,
}

impl MeasureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, measure: Measure, column: impl Into<String>) {
        self.columns.insert(measure, column.into());
    }

    pub fn get(&self, measure: Measure) -> Option<&str> {
        self.columns.get(&measure).map(String::as_str)
    }

    /// Accepts either a logical measure name or an already materialized
    /// column name; unknown names pass through unchanged.
    pub fn column_for<'a>(&'a self, name: &'a str) -> &'a str {
        if self.columns.values().any(|column| column == name) {
            return name;
        }
        Measure::from_logical_name(name)
            .and_then(|measure| self.get(measure))
            .unwrap_or(name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Measure, &str)> {
        self.columns.iter().map(|(m, c)| (*m, c.as_str()))
    }
}

/// The three fact tables as persisted or loaded
#[derive(Debug, Clone, Default)]
pub struct FactTables {
    pub orders: DataFrame,
    pub revenues: DataFrame,
    pub cash: DataFrame,
}

/// Everything the reporting layer reads, produced by one load
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    pub orders: DataFrame,
    pub revenues: DataFrame,
    pub cash: DataFrame,
    pub merged: DataFrame,
    pub measures: MeasureMap,
}

impl DataSnapshot {
    /// The "no data yet" snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.height() == 0
            && self.orders.height() == 0
            && self.revenues.height() == 0
            && self.cash.height() == 0
    }
}

/// Statistics for a single pipeline run
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub rows_ingested: usize,
    pub customers: usize,
    pub projects: usize,
    pub sms: usize,
    pub dates: usize,
    pub po_refs: usize,
    pub regions: usize,
    pub container_path: PathBuf,
    pub processing_time_ms: u128,
}
