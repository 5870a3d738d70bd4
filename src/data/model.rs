use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the common Pandas dtypes.
/// Rows are hashed for duplicate detection, so `CellValue` must be `Eq + Hash`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

/// Markers read as missing values, same set Pandas uses by default.
pub const NA_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

// -- Manual Eq/Ord: floats are compared by total order, consistent with Hash --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                DateTime(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::DateTime(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => f.write_str(&format_float(*v)),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Render a float the way Pandas writes it: shortest round-trip digits,
/// a trailing `.0` on whole numbers, and `1e+16` / `1e-05` style exponents
/// outside `[1e-4, 1e16)`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return String::new();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    let sci = format!("{v:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if v == 0.0 || (-4..16).contains(&exp) {
        let plain = v.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

impl CellValue {
    /// Guess the type of a raw text field.
    pub fn guess(s: &str) -> CellValue {
        if NA_MARKERS.contains(&s) {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        // Rust accepts "inf"/"infinity" as floats; those stay text.
        if s.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = s.parse::<f64>() {
                return CellValue::Float(f);
            }
        }
        match s {
            "true" | "True" | "TRUE" => CellValue::Bool(true),
            "false" | "False" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::Text(s.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Interpret the value as an `f64` for range tests.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// A single row. Cells are positional, aligned with [`Table::columns`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub cells: Vec<CellValue>,
}

impl Record {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// An ordered sequence of records sharing one column schema.
///
/// The row position is the index: every whole-table operation leaves the
/// surviving rows numbered contiguously from zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Ordered, unique column names.
    pub columns: Vec<String>,
    /// All rows, in input order.
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("row {row} has {found} fields but the header has {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

impl Table {
    /// Build a table, checking the header is unique and every row matches it.
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(SchemaError::DuplicateColumn(col.clone()));
            }
        }
        for (row, record) in rows.iter().enumerate() {
            if record.cells.len() != columns.len() {
                return Err(SchemaError::RaggedRow {
                    row,
                    found: record.cells.len(),
                    expected: columns.len(),
                });
            }
        }
        let mut table = Table { columns, rows };
        table.promote_mixed_numeric();
        Ok(table)
    }

    /// Build a table from raw text fields, inferring one type per column.
    ///
    /// A column is typed only when every non-missing field guesses as a
    /// number, or every one as a boolean. Otherwise it is a text column and
    /// each field is kept exactly as read, so `1` and `1.0` stay distinct.
    pub fn from_fields(columns: Vec<String>, fields: Vec<Vec<String>>) -> Result<Self, SchemaError> {
        let mut rows: Vec<Record> = fields
            .iter()
            .map(|row| Record::new(row.iter().map(|s| CellValue::guess(s)).collect()))
            .collect();

        let width = columns.len();
        for idx in 0..width {
            let mut numeric = false;
            let mut boolean = false;
            let mut text = false;
            for row in rows.iter().filter(|r| r.cells.len() == width) {
                match row.cells[idx] {
                    CellValue::Integer(_) | CellValue::Float(_) => numeric = true,
                    CellValue::Bool(_) => boolean = true,
                    CellValue::Text(_) => text = true,
                    CellValue::Null | CellValue::DateTime(_) => {}
                }
            }
            if !(text || (numeric && boolean)) {
                continue;
            }
            for (row, raw) in rows.iter_mut().zip(&fields) {
                if row.cells.len() != width || row.cells[idx].is_null() {
                    continue;
                }
                row.cells[idx] = CellValue::Text(raw[idx].clone());
            }
        }

        Table::new(columns, rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over one column's cells in row order.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().map(move |r| &r.cells[idx])
    }

    /// A column holding only integers and floats becomes all floats, so that
    /// `1` and `1.0` compare equal. Columns that also hold text or booleans
    /// are left alone.
    fn promote_mixed_numeric(&mut self) {
        for idx in 0..self.columns.len() {
            let has_float = self.column(idx).any(|v| matches!(v, CellValue::Float(_)));
            let has_int = self.column(idx).any(|v| matches!(v, CellValue::Integer(_)));
            let has_other = self
                .column(idx)
                .any(|v| matches!(v, CellValue::Text(_) | CellValue::Bool(_)));
            if !(has_float && has_int) || has_other {
                continue;
            }
            for row in &mut self.rows {
                if let CellValue::Integer(i) = row.cells[idx] {
                    row.cells[idx] = CellValue::Float(i as f64);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn guess_recognises_pandas_types() {
        assert_eq!(CellValue::guess(""), CellValue::Null);
        assert_eq!(CellValue::guess("NaN"), CellValue::Null);
        assert_eq!(CellValue::guess("42"), CellValue::Integer(42));
        assert_eq!(CellValue::guess("-73.95"), CellValue::Float(-73.95));
        assert_eq!(CellValue::guess("True"), CellValue::Bool(true));
        assert_eq!(CellValue::guess("inf"), CellValue::Text("inf".into()));
        assert_eq!(
            CellValue::guess("Entire home/apt"),
            CellValue::Text("Entire home/apt".into())
        );
    }

    #[test]
    fn float_display_keeps_decimal_point() {
        assert_eq!(CellValue::Float(150.0).to_string(), "150.0");
        assert_eq!(CellValue::Float(40.7128).to_string(), "40.7128");
        assert_eq!(CellValue::Null.to_string(), "");
    }

    #[test]
    fn mixed_numeric_column_is_promoted() {
        let table = Table::new(
            cols(&["a", "b"]),
            vec![
                Record::new(vec![CellValue::Integer(1), CellValue::Integer(7)]),
                Record::new(vec![CellValue::Float(1.5), CellValue::Null]),
            ],
        )
        .unwrap();
        assert_eq!(table.rows[0].cells[0], CellValue::Float(1.0));
        // Integer-only column untouched.
        assert_eq!(table.rows[0].cells[1], CellValue::Integer(7));
    }

    #[test]
    fn text_column_is_not_promoted() {
        let table = Table::new(
            cols(&["code"]),
            vec![
                Record::new(vec![CellValue::Integer(1)]),
                Record::new(vec![CellValue::Float(1.0)]),
                Record::new(vec![CellValue::Text("abc".into())]),
            ],
        )
        .unwrap();
        assert_eq!(table.rows[0].cells[0], CellValue::Integer(1));
        assert_eq!(table.rows[1].cells[0], CellValue::Float(1.0));
    }

    fn fields(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn from_fields_keeps_mixed_columns_as_read() {
        let table = Table::from_fields(
            cols(&["code", "price", "flag"]),
            fields(&[&["1", "10", "True"], &["1.0", "12.5", "1"], &["abc", "", ""]]),
        )
        .unwrap();
        let code: Vec<_> = table.column(0).cloned().collect();
        assert_eq!(
            code,
            vec![
                CellValue::Text("1".into()),
                CellValue::Text("1.0".into()),
                CellValue::Text("abc".into())
            ]
        );
        // Numeric-only column is typed and promoted.
        assert_eq!(table.rows[0].cells[1], CellValue::Float(10.0));
        assert_eq!(table.rows[2].cells[1], CellValue::Null);
        // Booleans mixed with numbers are kept as text.
        assert_eq!(table.rows[0].cells[2], CellValue::Text("True".into()));
        assert_eq!(table.rows[1].cells[2], CellValue::Text("1".into()));
    }

    #[test]
    fn float_display_matches_pandas_exponents() {
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1e-7), "1e-07");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(-2.5e20), "-2.5e+20");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn new_rejects_bad_schema() {
        let err = Table::new(cols(&["a", "a"]), vec![]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("a".into()));

        let err = Table::new(
            cols(&["a", "b"]),
            vec![Record::new(vec![CellValue::Integer(1)])],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::RaggedRow { row: 0, found: 1, expected: 2 }));
    }
}
