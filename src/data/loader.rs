use std::io::Read;
use std::path::Path;

use crate::error::{CleanError, Result};

use super::model::Table;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a comma-delimited table with a header row from a file.
pub fn load_csv(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).map_err(|source| CleanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file, path)
}

/// Parse a comma-delimited table from any reader.
///
/// `origin` only labels errors. Column types are inferred by
/// [`Table::from_fields`]; dates stay text until they are normalised.
pub fn read_csv<R: Read>(input: R, origin: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CleanError::malformed(origin, format!("reading header: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CleanError::malformed(origin, "missing header row"));
    }

    let mut fields: Vec<Vec<String>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| CleanError::malformed(origin, format!("row {row_no}: {e}")))?;
        fields.push(record.iter().map(str::to_string).collect());
    }

    Table::from_fields(headers, fields).map_err(|e| CleanError::malformed(origin, e))
}
