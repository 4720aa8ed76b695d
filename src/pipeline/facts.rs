//! Fact table construction.
//!
//! Each fact table carries one row per ledger row: the business columns
//! verbatim, a foreign key per dimension and a synthetic identifier.

use super::dimensions::{Dimension, DimensionSet, SurrogateKey, days_since_epoch, safe_lookup};
use crate::constants;
use crate::error::Result;
use crate::models::{FactTables, RawRow};
use polars::prelude::*;
use std::hash::Hash;
use tracing::debug;

/// Build the Orders, Revenues and Cash fact tables
pub fn build_facts(rows: &[RawRow], dims: &DimensionSet) -> Result<FactTables> {
    let facts = FactTables {
        orders: build_orders(rows, dims)?,
        revenues: build_revenues(rows, dims)?,
        cash: build_cash(rows, dims)?,
    };
    debug!(
        "Built fact tables: orders={}, revenues={}, cash={}",
        facts.orders.height(),
        facts.revenues.height(),
        facts.cash.height()
    );
    Ok(facts)
}

pub fn build_orders(rows: &[RawRow], dims: &DimensionSet) -> Result<DataFrame> {
    let mut columns = vec![
        text_column(constants::SM, rows, |r| r.sm.as_deref()),
        month_column(rows)?,
        text_column(constants::CUSTOMER, rows, |r| r.customer.as_deref()),
        text_column(constants::PROJECT, rows, |r| r.project.as_deref()),
        text_column(constants::PO_REF, rows, |r| r.po_ref.as_deref()),
        amount_column(constants::ORDER_AMOUNT, rows, |r| r.order_amount),
        amount_column(constants::REVENUE_AMOUNT, rows, |r| r.revenue_amount),
        amount_column(constants::CASH_AMOUNT, rows, |r| r.cash_amount),
        amount_column(constants::PENDING_AMOUNT, rows, |r| r.pending_amount),
        amount_column(constants::BACKLOG_AMOUNT, rows, |r| r.backlog_amount),
        text_column(constants::REGION, rows, |r| r.region.as_deref()),
    ];
    columns.extend(foreign_keys(rows, dims));
    columns.push(sequence_column(constants::ORDER_DATE_ID, rows.len(), 1));

    Ok(DataFrame::new(columns)?)
}

pub fn build_revenues(rows: &[RawRow], dims: &DimensionSet) -> Result<DataFrame> {
    let mut columns = vec![
        text_column(constants::CUSTOMER, rows, |r| r.customer.as_deref()),
        month_column(rows)?,
        text_column(constants::PROJECT, rows, |r| r.project.as_deref()),
        text_column(constants::SM, rows, |r| r.sm.as_deref()),
        text_column(constants::PO_REF, rows, |r| r.po_ref.as_deref()),
        amount_column(constants::REVENUE_AMOUNT, rows, |r| r.revenue_amount),
        text_column(constants::REGION, rows, |r| r.region.as_deref()),
    ];
    columns.extend(foreign_keys(rows, dims));
    columns.push(sequence_column(
        constants::USER_ID,
        rows.len(),
        constants::REVENUE_ID_OFFSET,
    ));
    columns.push(sequence_column(constants::REVENUE_DATE_ID, rows.len(), 1));

    Ok(DataFrame::new(columns)?)
}

pub fn build_cash(rows: &[RawRow], dims: &DimensionSet) -> Result<DataFrame> {
    let mut columns = vec![
        text_column(constants::CUSTOMER, rows, |r| r.customer.as_deref()),
        month_column(rows)?,
        text_column(constants::PROJECT, rows, |r| r.project.as_deref()),
        text_column(constants::SM, rows, |r| r.sm.as_deref()),
        text_column(constants::PO_REF, rows, |r| r.po_ref.as_deref()),
        amount_column(constants::CASH_AMOUNT, rows, |r| r.cash_amount),
        text_column(constants::REGION, rows, |r| r.region.as_deref()),
    ];
    columns.extend(foreign_keys(rows, dims));
    columns.push(sequence_column(
        constants::USER_ID,
        rows.len(),
        constants::CASH_ID_OFFSET,
    ));
    columns.push(sequence_column(constants::CASH_DATE_ID, rows.len(), 1));

    Ok(DataFrame::new(columns)?)
}

fn foreign_keys(rows: &[RawRow], dims: &DimensionSet) -> Vec<Column> {
    vec![
        key_column(constants::CUSTOMER_ID, &dims.customer, rows, |r| {
            r.customer.as_ref()
        }),
        key_column(constants::PROJECT_ID, &dims.project, rows, |r| {
            r.project.as_ref()
        }),
        key_column(constants::SM_ID, &dims.sm, rows, |r| r.sm.as_ref()),
        key_column(constants::DATE_ID, &dims.date, rows, |r| r.month.as_ref()),
        key_column(constants::PO_REF_ID, &dims.po_ref, rows, |r| {
            r.po_ref.as_ref()
        }),
        key_column(constants::REGION_ID, &dims.region, rows, |r| {
            r.region.as_ref()
        }),
    ]
}

fn key_column<T, F>(name: &str, dimension: &Dimension<T>, rows: &[RawRow], field: F) -> Column
where
    T: Ord + Hash + Clone,
    F: Fn(&RawRow) -> Option<&T>,
{
    let keys: Vec<Option<SurrogateKey>> = rows
        .iter()
        .map(|row| safe_lookup(dimension, field(row)))
        .collect();
    Column::new(name.into(), keys)
}

fn text_column<F>(name: &str, rows: &[RawRow], field: F) -> Column
where
    F: Fn(&RawRow) -> Option<&str>,
{
    let values: Vec<Option<&str>> = rows.iter().map(field).collect();
    Column::new(name.into(), values)
}

fn amount_column<F>(name: &str, rows: &[RawRow], field: F) -> Column
where
    F: Fn(&RawRow) -> Option<f64>,
{
    let values: Vec<Option<f64>> = rows.iter().map(field).collect();
    Column::new(name.into(), values)
}

fn month_column(rows: &[RawRow]) -> Result<Column> {
    let days: Vec<Option<i32>> = rows
        .iter()
        .map(|row| row.month.map(days_since_epoch))
        .collect();
    Ok(Column::new(constants::MONTH.into(), days).cast(&DataType::Date)?)
}

/// `start, start + 1, ...` for `len` rows
fn sequence_column(name: &str, len: usize, start: u32) -> Column {
    let values: Vec<u32> = (0..len as u32).map(|i| start + i).collect();
    Column::new(name.into(), values)
}
