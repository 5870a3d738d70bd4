use std::io::Write;
use std::path::Path;

use chrono::Timelike;

use crate::error::{CleanError, Result};

use super::model::{CellValue, Table};

/// How a column of dates is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateStyle {
    /// Every value falls on midnight: `YYYY-MM-DD`.
    DateOnly,
    /// `YYYY-MM-DD HH:MM:SS`.
    Full,
}

fn date_style(table: &Table, idx: usize) -> DateStyle {
    let all_midnight = table.column(idx).all(|v| match v {
        CellValue::DateTime(dt) => {
            dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 && dt.nanosecond() == 0
        }
        _ => true,
    });
    if all_midnight {
        DateStyle::DateOnly
    } else {
        DateStyle::Full
    }
}

fn render(value: &CellValue, style: DateStyle) -> String {
    match (value, style) {
        (CellValue::DateTime(dt), DateStyle::DateOnly) => dt.format("%Y-%m-%d").to_string(),
        _ => value.to_string(),
    }
}

/// Serialise a table as comma-delimited text with a header row and no index.
pub fn write_csv_to<W: Write>(table: &Table, out: W) -> csv::Result<()> {
    let styles: Vec<DateStyle> = (0..table.columns.len())
        .map(|idx| date_style(table, idx))
        .collect();

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(
            row.cells
                .iter()
                .zip(&styles)
                .map(|(cell, style)| render(cell, *style)),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a table to `path`, replacing any existing file.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| CleanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv_to(table, file).map_err(|e| CleanError::Io {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::Record;

    fn to_string(table: &Table) -> String {
        let mut buf = Vec::new();
        write_csv_to(table, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::DateTime(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn midnight_dates_written_as_plain_dates() {
        let table = Table::new(
            vec!["name".into(), "price".into(), "last_review".into()],
            vec![
                Record::new(vec![CellValue::Text("a, b".into()), CellValue::Integer(100), date(2019, 5, 21)]),
                Record::new(vec![CellValue::Null, CellValue::Integer(80), CellValue::Null]),
            ],
        )
        .unwrap();
        assert_eq!(
            to_string(&table),
            "name,price,last_review\n\"a, b\",100,2019-05-21\n,80,\n"
        );
    }

    #[test]
    fn time_of_day_forces_full_timestamps() {
        let noon = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap().and_hms_opt(12, 30, 0).unwrap();
        let table = Table::new(
            vec!["last_review".into()],
            vec![
                Record::new(vec![date(2019, 5, 21)]),
                Record::new(vec![CellValue::DateTime(noon)]),
            ],
        )
        .unwrap();
        assert_eq!(
            to_string(&table),
            "last_review\n2019-05-21 00:00:00\n2020-01-02 12:30:00\n"
        );
    }

    #[test]
    fn floats_and_bools_follow_pandas_rendering() {
        let table = Table::new(
            vec!["x".into(), "flag".into()],
            vec![Record::new(vec![CellValue::Float(-73.5), CellValue::Bool(false)])],
        )
        .unwrap();
        assert_eq!(to_string(&table), "x,flag\n-73.5,False\n");
    }
}
