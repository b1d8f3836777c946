//! Polars AnyValue utility functions.
//!
//! This module converts between Polars cells and [`Value`], and rebuilds
//! typed columns from value slices.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tabflow_model::Value;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Converts a Polars `AnyValue` into a [`Value`].
///
/// Integer widths collapse to `Int`, float widths to `Float`. Types the
/// engine has no variant for are rendered through their display form.
pub fn any_to_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(v) => Value::Int(i64::from(v)),
        AnyValue::Int16(v) => Value::Int(i64::from(v)),
        AnyValue::Int32(v) => Value::Int(i64::from(v)),
        AnyValue::Int64(v) => Value::Int(v),
        AnyValue::UInt8(v) => Value::Int(i64::from(v)),
        AnyValue::UInt16(v) => Value::Int(i64::from(v)),
        AnyValue::UInt32(v) => Value::Int(i64::from(v)),
        AnyValue::UInt64(v) => i64::try_from(v).map_or(Value::Float(v as f64), Value::Int),
        AnyValue::Float32(v) => Value::Float(f64::from(v)),
        AnyValue::Float64(v) => Value::Float(v),
        AnyValue::String(s) => Value::Str(s.to_string()),
        AnyValue::StringOwned(s) => Value::Str(s.to_string()),
        AnyValue::Date(days) => date_from_epoch_days(days).map_or(Value::Null, Value::Date),
        other => Value::Str(other.to_string()),
    }
}

/// Converts a Polars date (days since the Unix epoch) to a `NaiveDate`.
pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Converts a `NaiveDate` to days since the Unix epoch.
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Read every cell of a column as [`Value`]s.
pub fn column_values(column: &Column) -> Vec<Value> {
    (0..column.len())
        .map(|idx| any_to_value(column.get(idx).unwrap_or(AnyValue::Null)))
        .collect()
}

/// Storage type chosen for a rebuilt column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every value is null.
    Empty,
    Bool,
    Int,
    Float,
    Date,
    /// Only strings, or a mix that can only be stored as text.
    Text,
}

impl ColumnKind {
    /// Polars dtype for the kind. `None` for an all-null column.
    pub fn dtype(self) -> Option<DataType> {
        match self {
            Self::Empty => None,
            Self::Bool => Some(DataType::Boolean),
            Self::Int => Some(DataType::Int64),
            Self::Float => Some(DataType::Float64),
            Self::Date => Some(DataType::Date),
            Self::Text => Some(DataType::String),
        }
    }
}

/// Pick the narrowest storage type that holds every non-null value.
///
/// Ints and floats unify to `Float`; any other mix falls back to `Text`.
pub fn unify_kind(values: &[Value]) -> ColumnKind {
    let mut kind = ColumnKind::Empty;
    for value in values {
        let next = match value {
            Value::Null => continue,
            Value::Bool(_) => ColumnKind::Bool,
            Value::Int(_) => ColumnKind::Int,
            Value::Float(_) => ColumnKind::Float,
            Value::Date(_) => ColumnKind::Date,
            Value::Str(_) => ColumnKind::Text,
        };
        kind = match (kind, next) {
            (ColumnKind::Empty, next) => next,
            (current, next) if current == next => current,
            (ColumnKind::Int, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Text,
        };
    }
    kind
}

/// Build a typed column from values.
///
/// `fallback` is the dtype used when every value is null (normally the dtype
/// of the column being replaced); without it an all-null column is a String
/// column.
pub fn values_to_column(
    name: &str,
    values: &[Value],
    fallback: Option<&DataType>,
) -> PolarsResult<Column> {
    let name = PlSmallStr::from(name);
    let series = match unify_kind(values) {
        ColumnKind::Empty => Series::full_null(
            name,
            values.len(),
            fallback.unwrap_or(&DataType::String),
        ),
        ColumnKind::Bool => {
            let data: Vec<Option<bool>> = values
                .iter()
                .map(|value| match value {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name, data)
        }
        ColumnKind::Int => {
            let data: Vec<Option<i64>> = values
                .iter()
                .map(|value| match value {
                    Value::Int(v) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name, data)
        }
        ColumnKind::Float => {
            let data: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
            Series::new(name, data)
        }
        ColumnKind::Date => {
            let days: Vec<Option<i32>> = values
                .iter()
                .map(|value| match value {
                    Value::Date(d) => Some(date_to_epoch_days(*d)),
                    _ => None,
                })
                .collect();
            Series::new(name, days).cast(&DataType::Date)?
        }
        ColumnKind::Text => {
            let data: Vec<Option<String>> = values.iter().map(Value::to_text).collect();
            Series::new(name, data)
        }
    };
    Ok(series.into_column())
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Parses a string as `i64`, returning `None` for invalid or empty strings.
pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}
