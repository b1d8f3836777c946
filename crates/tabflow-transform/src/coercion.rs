//! Conversion of cell values to declared type tags.
//!
//! Null always coerces to null. Blank strings count as null for every tag
//! except `str`.

use tabflow_common::{format_numeric, parse_f64, parse_i64};
use tabflow_model::{TypeTag, Value};

use crate::dates::parse_date_any;
use crate::error::CoercionError;

/// Convert `value` to `tag`. `date_formats` are tried in order when a
/// string must become a date.
pub fn coerce<S: AsRef<str>>(
    value: &Value,
    tag: TypeTag,
    date_formats: &[S],
) -> Result<Value, CoercionError> {
    if let Value::Str(text) = value
        && tag != TypeTag::Str
        && text.trim().is_empty()
    {
        return Ok(Value::Null);
    }
    match tag {
        TypeTag::Int => to_int(value),
        TypeTag::Float => to_float(value),
        TypeTag::Str => Ok(match value {
            Value::Null => Value::Null,
            Value::Str(_) => value.clone(),
            other => Value::Str(other.to_string()),
        }),
        TypeTag::Date => to_date(value, date_formats),
    }
}

fn float_to_int(v: f64, original: &Value) -> Result<Value, CoercionError> {
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Ok(Value::Int(v as i64))
    } else {
        Err(CoercionError::NotInteger(original.to_string()))
    }
}

fn to_int(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(v) => float_to_int(*v, value),
        Value::Str(text) => match parse_i64(text) {
            Some(v) => Ok(Value::Int(v)),
            None => match parse_f64(text) {
                Some(v) => float_to_int(v, value),
                None => Err(CoercionError::NotNumeric(text.clone())),
            },
        },
        Value::Date(_) => Err(CoercionError::Unsupported {
            from: value.type_name(),
            to: TypeTag::Int,
        }),
    }
}

fn to_float(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Float(_) => Ok(value.clone()),
        Value::Int(v) => Ok(Value::Float(*v as f64)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(text) => parse_f64(text)
            .map(Value::Float)
            .ok_or_else(|| CoercionError::NotNumeric(text.clone())),
        Value::Date(_) => Err(CoercionError::Unsupported {
            from: value.type_name(),
            to: TypeTag::Float,
        }),
    }
}

fn to_date<S: AsRef<str>>(value: &Value, date_formats: &[S]) -> Result<Value, CoercionError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Date(_) => Ok(value.clone()),
        Value::Str(text) => parse_date_any(text, date_formats)
            .map(Value::Date)
            .ok_or_else(|| CoercionError::InvalidDate(text.clone())),
        // Numeric cells such as 20240101 come from CSV type inference.
        Value::Int(v) => parse_date_any(&v.to_string(), &["%Y%m%d"])
            .map(Value::Date)
            .ok_or_else(|| CoercionError::InvalidDate(v.to_string())),
        Value::Float(v) if v.fract() == 0.0 => {
            let text = format_numeric(*v);
            parse_date_any(&text, &["%Y%m%d"])
                .map(Value::Date)
                .ok_or(CoercionError::InvalidDate(text))
        }
        other => Err(CoercionError::Unsupported {
            from: other.type_name(),
            to: TypeTag::Date,
        }),
    }
}
