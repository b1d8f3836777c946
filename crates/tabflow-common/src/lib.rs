//! Shared utilities for tabflow crates.
//!
//! This crate provides the Polars glue used across the workspace: reading
//! cells as [`tabflow_model::Value`] and rebuilding typed columns.

pub mod polars;

pub use crate::polars::{
    ColumnKind, any_to_value, column_values, date_from_epoch_days, date_to_epoch_days,
    parse_f64, parse_i64, unify_kind, values_to_column,
};
pub use tabflow_model::format_numeric;
