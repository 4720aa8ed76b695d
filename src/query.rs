//! Read-only queries over a loaded snapshot.
//!
//! These are the building blocks of the reporting layer: filter options,
//! KPI totals and grouped breakdowns. All of them read the merged view and
//! address measures through the snapshot's measure map, so callers may use
//! either logical measure names or materialized column names.

use crate::constants;
use crate::error::{LedgerError, Result};
use crate::models::{DataSnapshot, Measure};
use crate::pipeline::dimensions::{date_from_days, quarter_of};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeSet;

/// Row filter over the merged view; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub customer: Option<String>,
    pub project: Option<String>,
    pub sm: Option<String>,
    pub po_ref: Option<String>,
    pub region: Option<String>,
    pub year: Option<i32>,
}

impl SnapshotFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_sm(mut self, sm: impl Into<String>) -> Self {
        self.sm = Some(sm.into());
        self
    }

    pub fn with_po_ref(mut self, po_ref: impl Into<String>) -> Self {
        self.po_ref = Some(po_ref.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Conjunction of the set fields; a field naming an absent column
    /// matches no rows.
    fn predicate(&self, df: &DataFrame) -> Option<Expr> {
        let text_fields = [
            (constants::CUSTOMER, &self.customer),
            (constants::PROJECT, &self.project),
            (constants::SM, &self.sm),
            (constants::PO_REF, &self.po_ref),
            (constants::REGION, &self.region),
        ];

        let mut conditions: Vec<Expr> = text_fields
            .into_iter()
            .filter_map(|(column, value)| {
                value.as_ref().map(|v| equals(df, column, lit(v.clone())))
            })
            .collect();
        if let Some(year) = self.year {
            conditions.push(equals(df, constants::YEAR, lit(year)));
        }

        conditions.into_iter().reduce(|acc, condition| acc.and(condition))
    }
}

fn equals(df: &DataFrame, column: &str, value: Expr) -> Expr {
    if has_column(df, column) {
        col(column).eq(value)
    } else {
        lit(false)
    }
}

fn has_column(df: &DataFrame, column: &str) -> bool {
    df.get_column_index(column).is_some()
}

fn require_column(df: &DataFrame, column: &str) -> Result<()> {
    if has_column(df, column) {
        Ok(())
    } else {
        Err(LedgerError::MissingColumn {
            column: column.to_string(),
        })
    }
}

/// Merged view restricted to `filter`
pub fn filtered(snapshot: &DataSnapshot, filter: &SnapshotFilter) -> Result<DataFrame> {
    let df = &snapshot.merged;
    match filter.predicate(df) {
        Some(predicate) => Ok(df.clone().lazy().filter(predicate).collect()?),
        None => Ok(df.clone()),
    }
}

/// Sorted distinct non-null values of a merged view column
pub fn distinct_values(snapshot: &DataSnapshot, column: &str) -> Result<Vec<String>> {
    let df = &snapshot.merged;
    if !has_column(df, column) {
        return Ok(Vec::new());
    }

    let values = df.column(column)?.cast(&DataType::String)?;
    let distinct: BTreeSet<String> = values
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    Ok(distinct.into_iter().collect())
}

/// Years with data, ascending; the 0 placeholder for unknown months is excluded
pub fn available_years(snapshot: &DataSnapshot) -> Result<Vec<i32>> {
    let df = &snapshot.merged;
    if !has_column(df, constants::YEAR) {
        return Ok(Vec::new());
    }

    let years = df.column(constants::YEAR)?.cast(&DataType::Int32)?;
    let distinct: BTreeSet<i32> = years.i32()?.into_iter().flatten().filter(|y| *y > 0).collect();
    Ok(distinct.into_iter().collect())
}

/// Earliest and latest month in the merged view
pub fn month_range(snapshot: &DataSnapshot) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let df = &snapshot.merged;
    if !has_column(df, constants::MONTH) {
        return Ok(None);
    }

    let days = df.column(constants::MONTH)?.cast(&DataType::Int32)?;
    let days = days.i32()?;
    let range = match (days.min(), days.max()) {
        (Some(min), Some(max)) => date_from_days(min).zip(date_from_days(max)),
        _ => None,
    };
    Ok(range)
}

/// KPI totals for a filtered snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureTotals {
    pub order: f64,
    pub revenue: f64,
    pub cash: f64,
    pub backlog: f64,
    pub pending: f64,
    /// Distinct non-null PO references
    pub po_count: usize,
}

impl MeasureTotals {
    pub fn get(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Order => self.order,
            Measure::Revenue => self.revenue,
            Measure::Cash => self.cash,
            Measure::Backlog => self.backlog,
            Measure::Pending => self.pending,
        }
    }
}

pub fn measure_totals(snapshot: &DataSnapshot, filter: &SnapshotFilter) -> Result<MeasureTotals> {
    let df = filtered(snapshot, filter)?;

    let total = |measure: Measure| -> Result<f64> {
        let column = snapshot.measures.column_for(measure.logical_name());
        if !has_column(&df, column) {
            return Ok(0.0);
        }
        let values = df.column(column)?.cast(&DataType::Float64)?;
        Ok(values.f64()?.sum().unwrap_or(0.0))
    };

    let po_count = if has_column(&df, constants::PO_REF) {
        let values = df.column(constants::PO_REF)?.cast(&DataType::String)?;
        values
            .str()?
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len()
    } else {
        0
    };

    Ok(MeasureTotals {
        order: total(Measure::Order)?,
        revenue: total(Measure::Revenue)?,
        cash: total(Measure::Cash)?,
        backlog: total(Measure::Backlog)?,
        pending: total(Measure::Pending)?,
        po_count,
    })
}

/// Sum of `measure` per value of `dimension`, largest first.
///
/// The result has two columns: the dimension and the measure under the
/// name the caller used. Rows with a null dimension value are dropped.
pub fn breakdown(
    snapshot: &DataSnapshot,
    dimension: &str,
    measure: &str,
    filter: &SnapshotFilter,
) -> Result<DataFrame> {
    let df = filtered(snapshot, filter)?;
    let measure_column = snapshot.measures.column_for(measure);
    require_column(&df, dimension)?;
    require_column(&df, measure_column)?;

    let grouped = df
        .lazy()
        .filter(col(dimension).is_not_null())
        .group_by([col(dimension)])
        .agg([col(measure_column).sum().alias(measure)])
        .sort_by_exprs(
            [col(measure), col(dimension)],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false])
                .with_nulls_last(true),
        )
        .collect()?;
    Ok(grouped)
}

/// Reporting granularity for time series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Monthly,
    Quarterly,
}

impl Period {
    /// `2024-03` for monthly, `2024Q1` for quarterly
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Period::Monthly => date.format("%Y-%m").to_string(),
            Period::Quarterly => format!("{}Q{}", date.year(), quarter_of(date)),
        }
    }
}

impl std::str::FromStr for Period {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "monthly" | "month" => Ok(Period::Monthly),
            "quarterly" | "quarter" => Ok(Period::Quarterly),
            other => Err(LedgerError::Configuration {
                message: format!("Unknown period: {}", other),
            }),
        }
    }
}

/// Sum of `measure` per period label, in chronological order
pub fn period_breakdown(
    snapshot: &DataSnapshot,
    period: Period,
    measure: &str,
    filter: &SnapshotFilter,
) -> Result<DataFrame> {
    let mut df = filtered(snapshot, filter)?;
    let measure_column = snapshot.measures.column_for(measure);
    require_column(&df, constants::MONTH)?;
    require_column(&df, measure_column)?;

    let days = df.column(constants::MONTH)?.cast(&DataType::Int32)?;
    let labels: Vec<Option<String>> = days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(date_from_days).map(|date| period.label(date)))
        .collect();
    df.with_column(Column::new(constants::PERIOD.into(), labels))?;

    let grouped = df
        .lazy()
        .filter(col(constants::PERIOD).is_not_null())
        .group_by([col(constants::PERIOD)])
        .agg([col(measure_column).sum().alias(measure)])
        .sort_by_exprs([col(constants::PERIOD)], SortMultipleOptions::default())
        .collect()?;
    Ok(grouped)
}
