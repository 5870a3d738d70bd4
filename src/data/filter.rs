use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::{CellValue, Record, Table};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("required column '{0}' is missing")]
    MissingColumn(String),
    #[error("column '{column}' row {row}: '{value}' is not numeric")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Bounding box
// ---------------------------------------------------------------------------

/// Inclusive rectangle over a longitude and a latitude column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

/// Listings outside this box are outside New York City.
pub const NYC_BOUNDS: BoundingBox = BoundingBox {
    min_longitude: -74.25,
    max_longitude: -73.50,
    min_latitude: 40.5,
    max_latitude: 41.2,
};

impl BoundingBox {
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        between(longitude, self.min_longitude, self.max_longitude)
            && between(latitude, self.min_latitude, self.max_latitude)
    }
}

/// Inclusive on both ends. NaN never passes.
fn between(v: f64, lo: f64, hi: f64) -> bool {
    lo <= v && v <= hi
}

fn require_column(table: &Table, name: &str) -> Result<usize, FilterError> {
    table
        .column_index(name)
        .ok_or_else(|| FilterError::MissingColumn(name.to_string()))
}

/// Numeric view of a column: `None` for nulls, error on anything non-numeric.
/// Text cells count when they read as a number, so the error names the
/// offending value rather than the first cell of a text column.
fn numeric_column(table: &Table, name: &str) -> Result<Vec<Option<f64>>, FilterError> {
    let idx = require_column(table, name)?;
    table
        .column(idx)
        .enumerate()
        .map(|(row, cell)| match cell {
            CellValue::Null => Ok(None),
            CellValue::Text(s) if CellValue::guess(s).as_f64().is_some() => {
                Ok(CellValue::guess(s).as_f64())
            }
            other => other.as_f64().map(Some).ok_or_else(|| FilterError::NonNumeric {
                column: name.to_string(),
                row,
                value: other.to_string(),
            }),
        })
        .collect()
}

/// Keep rows whose mask entry is true, preserving order.
fn retain_by_mask(table: &mut Table, mask: &[bool]) -> usize {
    let before = table.rows.len();
    let mut keep = mask.iter();
    table.rows.retain(|_| keep.next().copied().unwrap_or(false));
    before - table.rows.len()
}

// ---------------------------------------------------------------------------
// Whole-table transformations
// ---------------------------------------------------------------------------

/// Remove rows equal in every column to an earlier row.
/// Returns the number of rows removed.
pub fn drop_duplicates(table: &mut Table) -> usize {
    let before = table.rows.len();
    let mut seen: HashSet<Record> = HashSet::with_capacity(before);
    table.rows.retain(|row| seen.insert(row.clone()));
    before - table.rows.len()
}

/// Keep rows whose `column` value lies in `[min, max]`. Null values fail the
/// test. With `min > max` every row is dropped.
pub fn filter_between(
    table: &mut Table,
    column: &str,
    min: f64,
    max: f64,
) -> Result<usize, FilterError> {
    let mask: Vec<bool> = numeric_column(table, column)?
        .into_iter()
        .map(|v| v.is_some_and(|v| between(v, min, max)))
        .collect();
    Ok(retain_by_mask(table, &mask))
}

/// Keep rows whose `(longitude, latitude)` pair lies inside `bounds`.
pub fn filter_bounding_box(
    table: &mut Table,
    longitude: &str,
    latitude: &str,
    bounds: &BoundingBox,
) -> Result<usize, FilterError> {
    let lon = numeric_column(table, longitude)?;
    let lat = numeric_column(table, latitude)?;
    let mask: Vec<bool> = lon
        .into_iter()
        .zip(lat)
        .map(|pair| match pair {
            (Some(x), Some(y)) => bounds.contains(x, y),
            _ => false,
        })
        .collect();
    Ok(retain_by_mask(table, &mask))
}

/// Convert `column` to [`CellValue::DateTime`] in place. Values that do not
/// parse become null; no row is dropped. Returns how many non-null values
/// failed to parse.
pub fn parse_dates(table: &mut Table, column: &str) -> Result<usize, FilterError> {
    let idx = require_column(table, column)?;
    let mut unparsed = 0;
    for row in &mut table.rows {
        let cell = &mut row.cells[idx];
        let parsed = match cell {
            CellValue::Null => continue,
            CellValue::DateTime(_) => continue,
            CellValue::Text(s) => parse_datetime(s),
            _ => None,
        };
        if parsed.is_none() {
            unparsed += 1;
        }
        *cell = parsed.map_or(CellValue::Null, CellValue::DateTime);
    }
    Ok(unparsed)
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse the date shapes commonly found in exported listings data.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}
