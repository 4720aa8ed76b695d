//! Dimension extraction and surrogate key assignment.
//!
//! Each dimension is the sorted set of distinct non-null values of one
//! ledger column, keyed densely from 1 in that order. Sorting makes the
//! mapping a pure function of the value set.

use crate::constants;
use crate::error::Result;
use crate::models::RawRow;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

/// Surrogate key type shared by dimensions and facts
pub type SurrogateKey = u32;

/// Sorted distinct values with their 1-based surrogate keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension<T: Ord + Hash + Clone> {
    values: Vec<T>,
    keys: HashMap<T, SurrogateKey>,
}

impl<T: Ord + Hash + Clone> Dimension<T> {
    /// Build from a column's values; nulls never receive a key
    pub fn build<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<T>>,
    {
        let distinct: BTreeSet<T> = values.into_iter().flatten().collect();
        let values: Vec<T> = distinct.into_iter().collect();
        let keys = values
            .iter()
            .enumerate()
            .map(|(i, value)| (value.clone(), i as SurrogateKey + 1))
            .collect();
        Self { values, keys }
    }

    /// Distinct values in key order
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn key_for(&self, value: &T) -> Option<SurrogateKey> {
        self.keys.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(value, key)` pairs in key order
    pub fn entries(&self) -> impl Iterator<Item = (&T, SurrogateKey)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| (value, i as SurrogateKey + 1))
    }

    fn key_column(&self, name: &str) -> Column {
        let keys: Vec<SurrogateKey> = (1..=self.values.len() as SurrogateKey).collect();
        Column::new(name.into(), keys)
    }
}

/// Key lookup that treats null and unmapped values alike: both yield `None`
pub fn safe_lookup<T: Ord + Hash + Clone>(
    dimension: &Dimension<T>,
    value: Option<&T>,
) -> Option<SurrogateKey> {
    value.and_then(|v| dimension.key_for(v))
}

impl Dimension<String> {
    /// Two-column frame: the value column and its key column
    pub fn to_frame(&self, value_column: &str, key_column: &str) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Column::new(value_column.into(), self.values.clone()),
            self.key_column(key_column),
        ])?;
        Ok(df)
    }
}

impl Dimension<NaiveDate> {
    /// Date dimension frame with calendar attributes
    pub fn to_frame(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self.values.iter().map(|d| days_since_epoch(*d)).collect();
        let years: Vec<i32> = self.values.iter().map(|d| d.year()).collect();
        let months: Vec<u32> = self.values.iter().map(|d| d.month()).collect();
        let quarters: Vec<u32> = self.values.iter().map(|d| quarter_of(*d)).collect();
        let labels: Vec<String> = self
            .values
            .iter()
            .map(|d| d.format("%Y-%m").to_string())
            .collect();

        let df = DataFrame::new(vec![
            Column::new(constants::DATE.into(), days).cast(&DataType::Date)?,
            self.key_column(constants::DATE_ID),
            Column::new(constants::YEAR.into(), years),
            Column::new(constants::MONTH.into(), months),
            Column::new(constants::QUARTER.into(), quarters),
            Column::new(constants::YEAR_MONTH.into(), labels),
        ])?;
        Ok(df)
    }
}

/// Calendar quarter, 1 to 4
pub fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Days since 1970-01-01, the physical representation of a Date column
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}

/// Inverse of [`days_since_epoch`]
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(chrono::Duration::days(days as i64))
}

/// The six ledger dimensions
#[derive(Debug, Clone)]
pub struct DimensionSet {
    pub customer: Dimension<String>,
    pub project: Dimension<String>,
    pub sm: Dimension<String>,
    pub date: Dimension<NaiveDate>,
    pub po_ref: Dimension<String>,
    pub region: Dimension<String>,
}

impl DimensionSet {
    pub fn build(rows: &[RawRow]) -> Self {
        Self {
            customer: Dimension::build(rows.iter().map(|r| r.customer.clone())),
            project: Dimension::build(rows.iter().map(|r| r.project.clone())),
            sm: Dimension::build(rows.iter().map(|r| r.sm.clone())),
            date: Dimension::build(rows.iter().map(|r| r.month)),
            po_ref: Dimension::build(rows.iter().map(|r| r.po_ref.clone())),
            region: Dimension::build(rows.iter().map(|r| r.region.clone())),
        }
    }

    /// Container table name paired with each dimension frame
    pub fn to_frames(&self) -> Result<Vec<(&'static str, DataFrame)>> {
        Ok(vec![
            (
                constants::CUSTOMER_DIM,
                self.customer
                    .to_frame(constants::CUSTOMER, constants::CUSTOMER_ID)?,
            ),
            (
                constants::PROJECT_DIM,
                self.project.to_frame(constants::PROJECT, constants::PROJECT_ID)?,
            ),
            (
                constants::SM_DIM,
                self.sm.to_frame(constants::SM, constants::SM_ID)?,
            ),
            (constants::DATE_DIM, self.date.to_frame()?),
            (
                constants::PO_REF_DIM,
                self.po_ref.to_frame(constants::PO_REF, constants::PO_REF_ID)?,
            ),
            (
                constants::REGION_DIM,
                self.region.to_frame(constants::REGION, constants::REGION_ID)?,
            ),
        ])
    }
}
