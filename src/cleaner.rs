use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::data::filter::{self, BoundingBox, FilterError, NYC_BOUNDS};
use crate::data::model::Table;
use crate::data::{loader, writer};
use crate::error::{CleanError, Result};
use crate::store::{ArtifactStore, LoggedArtifact};

pub const JOB_TYPE: &str = "basic_cleaning";
/// Name of the serialised table inside the output artifact.
pub const OUTPUT_FILE: &str = "clean_sample.csv";

pub const PRICE_COLUMN: &str = "price";
pub const LAST_REVIEW_COLUMN: &str = "last_review";
pub const LONGITUDE_COLUMN: &str = "longitude";
pub const LATITUDE_COLUMN: &str = "latitude";

// ---------------------------------------------------------------------------
// Run configuration and outcome
// ---------------------------------------------------------------------------

/// Everything a run needs. Also stored verbatim on the output artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningConfig {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// Row counts after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub rows_in: usize,
    pub rows_after_dedup: usize,
    pub rows_after_price: usize,
    pub rows_out: usize,
    pub unparsed_dates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleaningReport {
    pub output: LoggedArtifact,
    pub stats: CleaningStats,
}

// ---------------------------------------------------------------------------
// Table transformation
// ---------------------------------------------------------------------------

/// Apply the cleaning filters in order: duplicates, price range, date
/// normalisation, then the geographic box.
pub fn clean_table(
    table: &mut Table,
    min_price: f64,
    max_price: f64,
    bounds: &BoundingBox,
) -> std::result::Result<CleaningStats, FilterError> {
    let mut stats = CleaningStats {
        rows_in: table.len(),
        ..Default::default()
    };

    info!("Dropping duplicates");
    let removed = filter::drop_duplicates(table);
    stats.rows_after_dedup = table.len();
    debug!("{removed} duplicate rows removed");

    info!("Dropping outliers");
    let removed = filter::filter_between(table, PRICE_COLUMN, min_price, max_price)?;
    stats.rows_after_price = table.len();
    debug!("{removed} rows outside price range [{min_price}, {max_price}]");

    stats.unparsed_dates = filter::parse_dates(table, LAST_REVIEW_COLUMN)?;
    if stats.unparsed_dates > 0 {
        debug!("{} {LAST_REVIEW_COLUMN} values did not parse", stats.unparsed_dates);
    }

    let removed = filter::filter_bounding_box(table, LONGITUDE_COLUMN, LATITUDE_COLUMN, bounds)?;
    stats.rows_out = table.len();
    debug!("{removed} rows outside the bounding box");

    Ok(stats)
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Removes the wrapped file when dropped, whatever the outcome of the run.
struct LocalFile(PathBuf);

impl Drop for LocalFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {e}", self.0.display()),
        }
    }
}

/// Download the input artifact, clean it, and log the result as a new
/// artifact. The serialised table is written to `work_dir` and removed
/// afterwards. Nothing is registered unless every step succeeds.
pub fn clean<S: ArtifactStore>(
    store: &mut S,
    config: &CleaningConfig,
    work_dir: &Path,
) -> Result<CleaningReport> {
    info!("Downloading artifact");
    let input_path = store.resolve_and_download(&config.input_artifact)?;
    let mut table = loader::load_csv(&input_path)?;

    let stats = clean_table(&mut table, config.min_price, config.max_price, &NYC_BOUNDS)
        .map_err(|e| CleanError::malformed(&input_path, e))?;

    let local = LocalFile(work_dir.join(OUTPUT_FILE));
    writer::write_csv(&table, &local.0)?;

    let mut artifact = store.create_artifact(
        &config.output_artifact,
        &config.output_type,
        &config.output_description,
    )?;
    store.attach_file(&mut artifact, &local.0)?;
    artifact.derived_from.push(config.input_artifact.clone());
    let metadata = |value: serde_json::Result<serde_json::Value>| {
        value.map_err(|e| CleanError::Upload {
            name: config.output_artifact.clone(),
            reason: format!("serialising run metadata: {e}"),
        })
    };
    artifact.set_metadata("job_type", JOB_TYPE);
    artifact.set_metadata("config", metadata(serde_json::to_value(config))?);
    artifact.set_metadata("stats", metadata(serde_json::to_value(stats))?);

    info!("Logging artifact");
    let output = store.register(artifact)?;
    info!(
        "Logged {output}: {} of {} rows kept",
        stats.rows_out, stats.rows_in
    );

    Ok(CleaningReport { output, stats })
}
