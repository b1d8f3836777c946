//! Configuration table loading.
//!
//! A configuration file is a CSV whose header row names the configuration
//! columns (`TransformFunction`, `TransformInputs`, `DataSetName`, ...).
//! Each data row becomes one [`ConfigRow`], in file order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tabflow_model::ConfigRow;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Header that every configuration file must carry.
pub const FUNCTION_COLUMN: &str = "TransformFunction";

/// Read configuration rows from a CSV file.
pub fn read_config(path: &Path) -> Result<Vec<ConfigRow>> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    let rows = parse_config(file, path)?;
    debug!(path = %path.display(), rows = rows.len(), "configuration loaded");
    Ok(rows)
}

/// Parse configuration rows from any reader. `path` is only used in errors.
///
/// Rows with a blank `TransformFunction` are skipped.
pub fn parse_config<R: Read>(reader: R, path: &Path) -> Result<Vec<ConfigRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, &e))?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::EmptyConfig {
            path: path.to_path_buf(),
        });
    }
    let headers: StringRecord = headers
        .iter()
        .map(|h| h.trim_matches('\u{feff}').trim())
        .collect();
    if !headers.iter().any(|h| h == FUNCTION_COLUMN) {
        return Err(IngestError::MissingColumn {
            column: FUNCTION_COLUMN.to_string(),
            path: path.to_path_buf(),
        });
    }
    reader.set_headers(headers);

    let mut rows = Vec::new();
    for result in reader.deserialize::<ConfigRow>() {
        let row = result.map_err(|e| csv_error(path, &e))?;
        if row.transform_function.trim().is_empty() {
            debug!(row = rows.len(), "skipping row without function");
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

fn csv_error(path: &Path, err: &csv::Error) -> IngestError {
    IngestError::ConfigRow {
        path: path.to_path_buf(),
        line: err.position().map_or(0, csv::Position::line),
        message: err.to_string(),
    }
}
