//! Reconciliation of the three fact tables into one merged view.
//!
//! Orders, revenues and cash are full-outer-joined on the natural key
//! columns they share. Each fact is first collapsed to one row per key,
//! otherwise ledger rows sharing a key would multiply across the joins.
//! Overlapping non-key columns are renamed before each join so that the
//! merged names are fixed:
//!
//! - orders ⋈ revenues: `<col>_order` / `<col>_revenue`
//! - (orders ⋈ revenues) ⋈ cash: `<col>` / `<col>_cash`
//!
//! The measure map then records which materialized column carries each
//! logical measure.

use super::container::with_year;
use crate::constants;
use crate::error::Result;
use crate::models::{FactTables, Measure, MeasureMap};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Pick the materialized column for a measure among `columns`.
///
/// Falls back to the logical name when no candidate is present.
pub fn resolve_measure(measure: Measure, columns: &[String]) -> String {
    let name = measure.logical_name();
    let order_suffixed = format!("{}{}", name, constants::ORDER_SUFFIX);
    let candidates = match measure {
        Measure::Revenue => vec![
            format!("{}{}", name, constants::REVENUE_SUFFIX),
            name.to_string(),
            order_suffixed,
        ],
        Measure::Cash => vec![
            format!("{}{}", name, constants::CASH_SUFFIX),
            name.to_string(),
            order_suffixed,
        ],
        Measure::Order | Measure::Backlog | Measure::Pending => {
            vec![name.to_string(), order_suffixed]
        }
    };

    candidates
        .into_iter()
        .find(|candidate| columns.iter().any(|c| c == candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Measure map over the given column set
pub fn resolve_measures(columns: &[String]) -> MeasureMap {
    let mut map = MeasureMap::new();
    for measure in Measure::ALL {
        map.insert(measure, resolve_measure(measure, columns));
    }
    map
}

/// Join key candidates present in every one of the frames
pub fn shared_join_keys(frames: &[&DataFrame]) -> Vec<&'static str> {
    constants::JOIN_KEY_CANDIDATES
        .into_iter()
        .filter(|key| {
            frames
                .iter()
                .all(|df| df.get_column_index(key).is_some())
        })
        .collect()
}

/// Build the merged view and its measure map
pub fn reconcile(facts: &FactTables) -> Result<(DataFrame, MeasureMap)> {
    let orders = without_year(&facts.orders)?;
    let revenues = without_year(&facts.revenues)?;
    let cash = without_year(&facts.cash)?;

    let keys = shared_join_keys(&[&orders, &revenues, &cash]);
    if keys.len() < constants::JOIN_KEY_CANDIDATES.len() {
        let dropped: Vec<&str> = constants::JOIN_KEY_CANDIDATES
            .into_iter()
            .filter(|k| !keys.contains(k))
            .collect();
        warn!(
            "Join key narrowed to {:?}; not shared by all fact tables: {:?}",
            keys, dropped
        );
    }

    let merged = if keys.is_empty() {
        warn!("No shared join key, concatenating fact tables instead");
        concat_lf_diagonal(
            [orders.lazy(), revenues.lazy(), cash.lazy()],
            UnionArgs::default(),
        )?
        .collect()?
    } else {
        let orders = collapse_by_keys(orders, &keys)?;
        let revenues = collapse_by_keys(revenues, &keys)?;
        let cash = collapse_by_keys(cash, &keys)?;
        let first = full_join(
            orders,
            revenues,
            &keys,
            constants::ORDER_SUFFIX,
            constants::REVENUE_SUFFIX,
        )?;
        let merged = full_join(first, cash, &keys, "", constants::CASH_SUFFIX)?;
        let sort_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
        merged
            .lazy()
            .sort_by_exprs(sort_exprs, SortMultipleOptions::default())
            .collect()?
    };

    let merged = with_year(merged, "merged view")?;
    let columns: Vec<String> = merged
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let measures = resolve_measures(&columns);

    debug!(
        "Merged view: {} rows x {} columns, keys {:?}",
        merged.height(),
        merged.width(),
        keys
    );
    Ok((merged, measures))
}

fn without_year(df: &DataFrame) -> Result<DataFrame> {
    if df.get_column_index(constants::YEAR).is_some() {
        Ok(df.drop(constants::YEAR)?)
    } else {
        Ok(df.clone())
    }
}

/// One row per join key.
///
/// Float measures are summed, staying null when no row carries a value;
/// every other column keeps its first value.
fn collapse_by_keys(df: DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let key_set: HashSet<&str> = keys.iter().copied().collect();
    let aggregations: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|column| !key_set.contains(column.name().as_str()))
        .map(|column| {
            let name = column.name().as_str();
            if column.dtype().is_float() {
                when(col(name).count().gt(lit(0)))
                    .then(col(name).sum())
                    .otherwise(lit(NULL).cast(column.dtype().clone()))
                    .alias(name)
            } else {
                col(name).first()
            }
        })
        .collect();

    let rows = df.height();
    let key_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    let collapsed = df.lazy().group_by_stable(key_exprs).agg(aggregations).collect()?;
    if collapsed.height() < rows {
        debug!("Collapsed {} fact rows to {} keys", rows, collapsed.height());
    }
    Ok(collapsed)
}

/// Full outer join with explicit renaming of overlapping non-key columns.
///
/// Null key values compare equal and key columns are coalesced.
fn full_join(
    mut left: DataFrame,
    mut right: DataFrame,
    keys: &[&str],
    left_suffix: &str,
    right_suffix: &str,
) -> Result<DataFrame> {
    let key_set: HashSet<&str> = keys.iter().copied().collect();
    let left_columns: HashSet<String> = left
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let overlapping: Vec<String> = right
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| !key_set.contains(name.as_str()) && left_columns.contains(name))
        .collect();

    for name in &overlapping {
        if !left_suffix.is_empty() {
            left.rename(name, format!("{}{}", name, left_suffix).into())?;
        }
        right.rename(name, format!("{}{}", name, right_suffix).into())?;
    }

    let key_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    let args = JoinArgs {
        nulls_equal: true,
        coalesce: JoinCoalesce::CoalesceColumns,
        ..JoinArgs::new(JoinType::Full)
    };

    let joined = left
        .lazy()
        .join(right.lazy(), key_exprs.clone(), key_exprs, args)
        .collect()?;
    Ok(joined)
}
