//! Value-level operations: constants, copies, rounding, mapping and
//! concatenation.

use std::cmp::Ordering;
use std::collections::HashMap;

use tabflow_common::parse_f64;
use tabflow_model::{OperationSpec, TypeTag, Value, keys};
use tracing::debug;

use super::args::{Args, ConcatToken, split_concat_tokens, split_values};
use super::write_scoped;
use crate::coercion::coerce;
use crate::error::TransformError;
use crate::options::{DEFAULT_DATE_FORMATS, RunContext};
use crate::table::{Scope, Table};

/// Assign one constant to the target field.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValue {
    pub scope: Scope,
    pub target: String,
    pub value: Value,
}

impl SetValue {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, "SetValue");
        let target = args.target()?;
        let text = args.raw(keys::TO_VALUE_OR_FORMULA);
        let tag = args.parse::<TypeTag>(keys::FROM_VALUE_OR_TYPES, "type tag")?;
        let value = match (text, tag) {
            (None, _) => Value::Null,
            (Some(text), None) => Value::from(text),
            (Some(text), Some(tag)) => coerce(&Value::from(text.trim()), tag, DEFAULT_DATE_FORMATS)
                .map_err(|err| args.error(format!("constant does not match its type: {err}")))?,
        };
        Ok(Self {
            scope: args.scope(),
            target,
            value,
        })
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let mask = table.scope_mask(&self.scope, &ctx.options.dataset_column);
        write_scoped(table, &self.target, &mask, |_| self.value.clone())
    }
}

/// Copy a source field into the target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyField {
    pub scope: Scope,
    pub source: String,
    pub target: String,
}

impl CopyField {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, "CopyField");
        Ok(Self {
            scope: args.scope(),
            source: args.require(keys::INPUTS, "source field")?.to_string(),
            target: args.target()?,
        })
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let mask = table.scope_mask(&self.scope, &ctx.options.dataset_column);
        let source = table.values_or_null(&self.source);
        write_scoped(table, &self.target, &mask, |row| source[row].clone())
    }
}

/// Round a numeric field to a number of decimal places, halves to even.
/// Negative precision rounds to tens, hundreds, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub scope: Scope,
    pub source: String,
    pub target: String,
    pub precision: i32,
}

/// Round `v` to `precision` decimal places, halves to even.
///
/// # Examples
/// ```
/// use tabflow_transform::operations::round_half_even;
///
/// assert_eq!(round_half_even(2.5, 0), 2.0);
/// assert_eq!(round_half_even(3.5, 0), 4.0);
/// assert_eq!(round_half_even(1.2345, 2), 1.23);
/// assert_eq!(round_half_even(1250.0, -2), 1200.0);
/// ```
pub fn round_half_even(v: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    let scaled = v * factor;
    if !scaled.is_finite() {
        return v;
    }
    scaled.round_ties_even() / factor
}

fn round_int(v: i64, precision: i32) -> Option<i64> {
    if precision >= 0 {
        return Some(v);
    }
    let Some(factor) = 10i64.checked_pow(precision.unsigned_abs()) else {
        return Some(0);
    };
    let quotient = v.div_euclid(factor);
    let twice_remainder = v.rem_euclid(factor) * 2;
    let rounded = match twice_remainder.cmp(&factor) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 == 0 => quotient,
        Ordering::Equal => quotient + 1,
    };
    rounded.checked_mul(factor)
}

impl Round {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, "Round");
        let source = args.require(keys::INPUTS, "source field")?.to_string();
        let precision = args
            .parse::<i32>(keys::TO_VALUE_OR_FORMULA, "precision")?
            .ok_or_else(|| args.error(format!("missing precision ({})", keys::TO_VALUE_OR_FORMULA)))?;
        Ok(Self {
            scope: args.scope(),
            target: args.target_or(&source),
            source,
            precision,
        })
    }

    fn round_value(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null => Some(Value::Null),
            Value::Int(v) => round_int(*v, self.precision).map(Value::Int),
            Value::Float(v) => Some(Value::Float(round_half_even(*v, self.precision))),
            Value::Str(text) => {
                parse_f64(text).map(|v| Value::Float(round_half_even(v, self.precision)))
            }
            Value::Bool(_) | Value::Date(_) => None,
        }
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let mask = table.scope_mask(&self.scope, &ctx.options.dataset_column);
        let source = table.values_or_null(&self.source);
        let mut recovered = 0usize;
        let rows = write_scoped(table, &self.target, &mask, |row| {
            self.round_value(&source[row]).unwrap_or_else(|| {
                recovered += 1;
                Value::Null
            })
        })?;
        if recovered > 0 {
            debug!(recovered, field = %self.source, "non-numeric values rounded to null");
        }
        Ok(rows)
    }
}

/// Replace values through a from-list/to-list lookup.
///
/// Values without an entry pass through unchanged, or become null when
/// `default_null` is set. The first occurrence of a duplicate key wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapValues {
    pub scope: Scope,
    pub source: String,
    pub target: String,
    pub mapping: HashMap<String, String>,
    pub default_null: bool,
}

impl MapValues {
    pub fn from_spec(spec: &OperationSpec, default_null: bool) -> Result<Self, TransformError> {
        let name = if default_null {
            "MapValuesDefaultNull"
        } else {
            "MapValues"
        };
        let args = Args::new(spec, name);
        let source = args.require(keys::INPUTS, "source field")?.to_string();
        let separator = args.get(keys::COMPARATOR).unwrap_or(";");
        let from = split_values(args.raw(keys::FROM_VALUE_OR_TYPES), separator);
        let to = split_values(args.raw(keys::TO_VALUE_OR_FORMULA), separator);

        let mut mapping = HashMap::new();
        if !(default_null && to.is_empty()) {
            if from.len() != to.len() {
                return Err(args.error(format!(
                    "from-list has {} entries but to-list has {}",
                    from.len(),
                    to.len()
                )));
            }
            for (key, value) in from.into_iter().zip(to) {
                mapping.entry(key).or_insert(value);
            }
        }

        Ok(Self {
            scope: args.scope(),
            target: args.target_or(&source),
            source,
            mapping,
            default_null,
        })
    }

    pub fn map_value(&self, value: &Value) -> Value {
        let mapped = value
            .to_text()
            .and_then(|text| self.mapping.get(text.trim()))
            .map(|to| Value::from(to.as_str()));
        match mapped {
            Some(value) => value,
            None if self.default_null => Value::Null,
            None => value.clone(),
        }
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let mask = table.scope_mask(&self.scope, &ctx.options.dataset_column);
        let source = table.values_or_null(&self.source);
        write_scoped(table, &self.target, &mask, |row| self.map_value(&source[row]))
    }
}

enum Part<'a> {
    Column(Vec<Value>),
    Text(&'a str),
}

/// Join field values and literal text into a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concatenate {
    pub scope: Scope,
    pub target: String,
    pub tokens: Vec<ConcatToken>,
}

impl Concatenate {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, "Concatenate");
        let raw = args
            .raw(keys::INPUTS)
            .ok_or_else(|| args.error(format!("missing tokens ({})", keys::INPUTS)))?;
        let tokens = split_concat_tokens(raw);
        if tokens.is_empty() {
            return Err(args.error("nothing to concatenate"));
        }
        Ok(Self {
            scope: args.scope(),
            target: args.target()?,
            tokens,
        })
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let mask = table.scope_mask(&self.scope, &ctx.options.dataset_column);
        let parts: Vec<Part<'_>> = self
            .tokens
            .iter()
            .map(|token| match token {
                ConcatToken::Field(name) => table.values(name).map_or_else(
                    || {
                        debug!(field = %name, "concatenate field missing; reading as empty");
                        Part::Text("")
                    },
                    Part::Column,
                ),
                ConcatToken::Literal(text) => Part::Text(text.as_str()),
            })
            .collect();
        write_scoped(table, &self.target, &mask, |row| {
            let mut out = String::new();
            for part in &parts {
                match part {
                    Part::Column(values) => out.push_str(&values[row].to_string()),
                    Part::Text(text) => out.push_str(text),
                }
            }
            Value::Str(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_coerces_typed_constant() {
        let spec = OperationSpec::new("SetValue")
            .with_arg(keys::NEW_FIELD, "n")
            .with_arg(keys::TO_VALUE_OR_FORMULA, " 42 ")
            .with_arg(keys::FROM_VALUE_OR_TYPES, "int");
        assert_eq!(SetValue::from_spec(&spec).unwrap().value, Value::Int(42));

        let bad = spec.clone().with_arg(keys::TO_VALUE_OR_FORMULA, "forty");
        assert!(matches!(
            SetValue::from_spec(&bad),
            Err(TransformError::Configuration { .. })
        ));

        let untyped = OperationSpec::new("SetValue")
            .with_arg(keys::NEW_FIELD, "s")
            .with_arg(keys::TO_VALUE_OR_FORMULA, "42");
        assert_eq!(SetValue::from_spec(&untyped).unwrap().value, Value::from("42"));
    }

    #[test]
    fn round_int_halves_to_even() {
        assert_eq!(round_int(1250, -2), Some(1200));
        assert_eq!(round_int(1350, -2), Some(1400));
        assert_eq!(round_int(1351, -2), Some(1400));
        assert_eq!(round_int(-1250, -2), Some(-1200));
        assert_eq!(round_int(7, 2), Some(7));
        assert_eq!(round_int(7, -30), Some(0));
    }

    #[test]
    fn round_requires_precision() {
        let spec = OperationSpec::new("Round").with_arg(keys::INPUTS, "x");
        assert!(Round::from_spec(&spec).is_err());
        let spec = spec.with_arg(keys::TO_VALUE_OR_FORMULA, "2");
        let round = Round::from_spec(&spec).unwrap();
        assert_eq!(round.target, "x");
        assert_eq!(round.round_value(&Value::from("1.005")), Some(Value::Float(1.0)));
        assert_eq!(round.round_value(&Value::from("abc")), None);
    }

    #[test]
    fn map_values_lists_must_line_up() {
        let spec = OperationSpec::new("MapValues")
            .with_arg(keys::INPUTS, "code")
            .with_arg(keys::FROM_VALUE_OR_TYPES, "A;B")
            .with_arg(keys::TO_VALUE_OR_FORMULA, "Alpha");
        assert!(MapValues::from_spec(&spec, false).is_err());
    }

    #[test]
    fn map_values_first_duplicate_wins() {
        let spec = OperationSpec::new("MapValues")
            .with_arg(keys::INPUTS, "code")
            .with_arg(keys::FROM_VALUE_OR_TYPES, "A|A|B")
            .with_arg(keys::TO_VALUE_OR_FORMULA, "first|second|Beta")
            .with_arg(keys::COMPARATOR, "|");
        let map = MapValues::from_spec(&spec, false).unwrap();
        assert_eq!(map.map_value(&Value::from("A")), Value::from("first"));
        assert_eq!(map.map_value(&Value::from("C")), Value::from("C"));
        assert_eq!(map.map_value(&Value::Null), Value::Null);
    }

    #[test]
    fn map_values_default_null_with_empty_to_list() {
        let spec = OperationSpec::new("MapValuesDefaultNull")
            .with_arg(keys::INPUTS, "code")
            .with_arg(keys::FROM_VALUE_OR_TYPES, "A;B");
        let map = MapValues::from_spec(&spec, true).unwrap();
        assert!(map.mapping.is_empty());
        assert_eq!(map.map_value(&Value::from("A")), Value::Null);
    }
}
