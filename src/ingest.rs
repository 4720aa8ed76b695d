//! Raw ledger ingestion and field coercion.
//!
//! Validates the header of a [`RawTable`] against the fixed ledger columns
//! and converts each string row into a typed [`RawRow`]. Spreadsheet exports
//! are loose about formatting, so month and amount cells go through tolerant
//! parsers; anything that still does not parse becomes null.

use crate::constants;
use crate::error::{LedgerError, Result};
use crate::models::{RawRow, RawTable};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Currency symbols, whitespace and thousands separators
static AMOUNT_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,$€£¥]").expect("static regex"));

/// Column positions of the required ledger fields within a header
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    customer: usize,
    project: usize,
    sm: usize,
    month: usize,
    po_ref: usize,
    order_amount: usize,
    revenue_amount: usize,
    cash_amount: usize,
    pending_amount: usize,
    backlog_amount: usize,
    region: usize,
}

impl ColumnIndex {
    fn resolve(header: &[String]) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            let wanted = normalize_header(name);
            header
                .iter()
                .position(|h| normalize_header(h) == wanted)
                .ok_or_else(|| LedgerError::MissingColumn {
                    column: name.to_string(),
                })
        };

        Ok(Self {
            customer: find(constants::CUSTOMER)?,
            project: find(constants::PROJECT)?,
            sm: find(constants::SM)?,
            month: find(constants::MONTH)?,
            po_ref: find(constants::PO_REF)?,
            order_amount: find(constants::ORDER_AMOUNT)?,
            revenue_amount: find(constants::REVENUE_AMOUNT)?,
            cash_amount: find(constants::CASH_AMOUNT)?,
            pending_amount: find(constants::PENDING_AMOUNT)?,
            backlog_amount: find(constants::BACKLOG_AMOUNT)?,
            region: find(constants::REGION)?,
        })
    }
}

/// Header comparison key: trimmed, lower-case, `_` read as a space
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Convert a raw string table into typed ledger rows.
///
/// Fails with [`LedgerError::MissingColumn`] when any required column is
/// absent from the header. Rows shorter than the header are padded with
/// nulls.
pub fn parse_ledger(table: &RawTable) -> Result<Vec<RawRow>> {
    let index = ColumnIndex::resolve(&table.header)?;

    let mut unparsed_months = 0usize;
    let rows: Vec<RawRow> = table
        .rows
        .iter()
        .map(|row| {
            let cell = |i: usize| row.get(i).map(String::as_str).and_then(non_empty);

            let month_cell = cell(index.month);
            let month = month_cell.and_then(parse_month);
            if month_cell.is_some() && month.is_none() {
                unparsed_months += 1;
            }

            RawRow {
                customer: cell(index.customer).map(str::to_string),
                project: cell(index.project).map(str::to_string),
                sm: cell(index.sm).map(str::to_string),
                month,
                po_ref: cell(index.po_ref).map(str::to_string),
                order_amount: cell(index.order_amount).and_then(parse_amount),
                revenue_amount: cell(index.revenue_amount).and_then(parse_amount),
                cash_amount: cell(index.cash_amount).and_then(parse_amount),
                pending_amount: cell(index.pending_amount).and_then(parse_amount),
                backlog_amount: cell(index.backlog_amount).and_then(parse_amount),
                region: cell(index.region).map(str::to_string),
            }
        })
        .collect();

    if unparsed_months > 0 {
        warn!(
            "{} of {} rows have a Month value that could not be parsed",
            unparsed_months,
            rows.len()
        );
    }
    debug!("Parsed {} ledger rows", rows.len());

    Ok(rows)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed)
    }
}

/// Parse a ledger month cell, normalized to the first day of the month.
///
/// Accepts the formats spreadsheets produce for this column: `1/22/2026`,
/// `1/22/26`, `22/1/2026`, `2026/01/22`, `January/22`, `Jan/22`, `1/2026`, `2026-01-22`,
/// `2026-01` and ISO date-times.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let parts: Vec<&str> = value.split('/').map(str::trim).collect();
    let parsed = match parts.as_slice() {
        [year, month, day] if year.len() == 4 => {
            let normalized = format!("{}/{}/{}", year, month, day);
            NaiveDate::parse_from_str(&normalized, "%Y/%m/%d")
                .ok()
                .and_then(first_of_month)
        }
        [first, second, year] => {
            let year_format = year_format(year);
            let normalized = format!("{}/{}/{}", first, second, year);
            [format!("%m/%d/{}", year_format), format!("%d/%m/{}", year_format)]
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(&normalized, format).ok())
                .and_then(first_of_month)
        }
        [month, year] => {
            // Month-only forms carry no day; anchor them to the 1st
            let anchored = format!("01/{}/{}", month, year);
            let year_format = year_format(year);
            let month_formats: &[&str] = if month.chars().all(|c| c.is_ascii_digit()) {
                &["%m"]
            } else {
                &["%B", "%b"]
            };
            month_formats.iter().find_map(|month_format| {
                let format = format!("%d/{}/{}", month_format, year_format);
                NaiveDate::parse_from_str(&anchored, &format).ok()
            })
        }
        _ => parse_iso_month(value),
    };

    if parsed.is_none() {
        debug!("Unparseable month value: {:?}", value);
    }
    parsed
}

fn year_format(year: &str) -> &'static str {
    if year.len() <= 2 { "%y" } else { "%Y" }
}

fn parse_iso_month(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return first_of_month(date);
    }

    const DATETIME_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return first_of_month(datetime.date());
        }
    }
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value) {
        return first_of_month(datetime.date_naive());
    }

    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok()
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

/// Parse a currency amount such as `€1,234.50`, `$ 80`, `(200)` or `1.5E+06`.
///
/// Anything left over once the currency noise is stripped must be a plain
/// number, otherwise the cell is null.
pub fn parse_amount(value: &str) -> Option<f64> {
    let value = value.trim();
    let (negative, body) = match value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, value),
    };

    let cleaned = AMOUNT_NOISE.replace_all(body, "");
    if cleaned.is_empty() {
        return None;
    }

    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Some(if negative { -amount } else { amount }),
        _ => {
            debug!("Unparseable amount value: {:?}", value);
            None
        }
    }
}
