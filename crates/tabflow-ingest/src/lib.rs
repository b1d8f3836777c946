//! File ingestion for tabflow.
//!
//! # Features
//!
//! - **Configuration**: read the operation table into [`ConfigRow`]s
//! - **Data**: load CSV or nested JSON input into a [`Table`]
//! - **Calendars**: serve holiday lists from a directory of date files
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use tabflow_ingest::{CalendarDirectory, read_config, read_table};
//!
//! let rows = read_config(Path::new("config.csv"))?;
//! let table = read_table(Path::new("input.json"), None)?;
//! let calendars = CalendarDirectory::open("calendars")?;
//! ```
//!
//! [`ConfigRow`]: tabflow_model::ConfigRow
//! [`Table`]: tabflow_transform::Table

mod calendar;
mod config;
mod error;
mod json;
mod table;

// === Error Types ===
pub use error::{IngestError, Result};

// === Configuration ===
pub use config::{FUNCTION_COLUMN, parse_config, read_config};

// === Data Tables ===
pub use json::{KEY_SEPARATOR, flatten_json, parse_table_json, read_table_json};
pub use table::{INFER_SCHEMA_ROWS, InputFormat, read_table, read_table_csv};

// === Calendars ===
pub use calendar::{CALENDAR_EXTENSIONS, CalendarDirectory};
