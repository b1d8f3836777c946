//! Data table loading.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use polars::prelude::*;
use tabflow_transform::Table;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};
use crate::json::read_table_json;

/// Rows sampled when inferring CSV column types.
pub const INFER_SCHEMA_ROWS: usize = 100;

/// Supported input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown input format `{other}`")),
        }
    }
}

/// Read a data file, using `format` or the file extension.
pub fn read_table(path: &Path, format: Option<InputFormat>) -> Result<Table> {
    let format = format
        .or_else(|| InputFormat::from_path(path))
        .ok_or_else(|| IngestError::UnknownFormat {
            path: path.to_path_buf(),
        })?;
    let table = match format {
        InputFormat::Csv => read_table_csv(path)?,
        InputFormat::Json => read_table_json(path)?,
    };
    debug!(
        path = %path.display(),
        %format,
        rows = table.height(),
        columns = table.width(),
        "input loaded"
    );
    Ok(table)
}

/// Read a headed CSV file into a [`Table`].
pub fn read_table_csv(path: &Path) -> Result<Table> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if df.height() == 0 {
        warn!(path = %path.display(), "input has no data rows");
    }
    Ok(Table::new(df))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tabflow_model::Value;
    use tempfile::Builder;

    fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a/b.CSV")), Some(InputFormat::Csv));
        assert_eq!(InputFormat::from_path(Path::new("a/b.csv")), Some(InputFormat::Csv));
        assert_eq!(InputFormat::from_path(Path::new("b.json")), Some(InputFormat::Json));
        assert_eq!(InputFormat::from_path(Path::new("b")), None);
        assert_eq!("JSON".parse::<InputFormat>(), Ok(InputFormat::Json));
    }

    #[test]
    fn test_read_csv_infers_types() {
        let file = temp_file(".csv", "A,B,Name\n1,2.5,x\n3,,y\n");
        let table = read_table(file.path(), None).unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.column_names(), vec!["A", "B", "Name"]);
        assert_eq!(table.value(0, "A"), Value::Int(1));
        assert_eq!(table.value(1, "B"), Value::Null);
        assert_eq!(table.value(1, "Name"), Value::from("y"));
    }

    #[test]
    fn test_unknown_format() {
        let file = temp_file(".txt", "A\n1\n");
        let err = read_table(file.path(), None).unwrap_err();
        assert!(matches!(err, IngestError::UnknownFormat { .. }));
        assert_eq!(read_table(file.path(), Some(InputFormat::Csv)).unwrap().height(), 1);
    }

    #[test]
    fn test_missing_csv() {
        let err = read_table_csv(Path::new("/nonexistent/data.csv")).unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound { .. }));
    }
}
