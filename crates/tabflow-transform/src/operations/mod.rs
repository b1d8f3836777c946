//! The operation catalog.
//!
//! Every configurable transformation is one variant of [`Operation`],
//! built from an [`OperationSpec`] by [`Operation::from_spec`]. Building
//! validates every argument, so a pipeline that builds can only fail at run
//! time on things that depend on the data (a start date that is neither a
//! column nor a date, a calendar that cannot be loaded).
//!
//! Each operation returns the number of rows it wrote.

mod args;
mod dates;
mod formula;
mod values;

use std::fmt;
use std::str::FromStr;

use tabflow_model::{OperationSpec, Value};

pub use args::ConcatToken;
pub use dates::{BusinessDayCount, ConvertDateFormat, NextBusinessDay, NthDayOfNextMonth};
pub use formula::{Formula, FormulaArray};
pub use values::{Concatenate, CopyField, MapValues, Round, SetValue, round_half_even};

use crate::error::TransformError;
use crate::options::RunContext;
use crate::table::{Scope, Table};

/// Names of the operations the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    SetValue,
    CopyField,
    Round,
    MapValues,
    MapValuesDefaultNull,
    ConvertDateFormat,
    Concatenate,
    Formula,
    FormulaArray,
    SetNthDayOfNextMonth,
    SetNextBusinessDay,
    CalculateBusinessDays,
}

impl OperationKind {
    pub const ALL: [OperationKind; 12] = [
        Self::SetValue,
        Self::CopyField,
        Self::Round,
        Self::MapValues,
        Self::MapValuesDefaultNull,
        Self::ConvertDateFormat,
        Self::Concatenate,
        Self::Formula,
        Self::FormulaArray,
        Self::SetNthDayOfNextMonth,
        Self::SetNextBusinessDay,
        Self::CalculateBusinessDays,
    ];

    /// Configuration name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::SetValue => "SetValue",
            Self::CopyField => "CopyField",
            Self::Round => "Round",
            Self::MapValues => "MapValues",
            Self::MapValuesDefaultNull => "MapValuesDefaultNull",
            Self::ConvertDateFormat => "ConvertDateFormat",
            Self::Concatenate => "Concatenate",
            Self::Formula => "Formula",
            Self::FormulaArray => "FormulaArray",
            Self::SetNthDayOfNextMonth => "SetNthDayOfNextMonth",
            Self::SetNextBusinessDay => "SetNextBusinessDay",
            Self::CalculateBusinessDays => "CalculateBusinessDays",
        }
    }

    /// One-line description for listings.
    pub fn description(self) -> &'static str {
        match self {
            Self::SetValue => "Assign a constant, optionally typed",
            Self::CopyField => "Copy one field into another",
            Self::Round => "Round a numeric field, halves to even",
            Self::MapValues => "Map values through a lookup, keeping unmapped values",
            Self::MapValuesDefaultNull => "Map values through a lookup, nulling unmapped values",
            Self::ConvertDateFormat => "Parse a date with one format and render it with another",
            Self::Concatenate => "Join fields and literal text",
            Self::Formula => "Evaluate an expression per row",
            Self::FormulaArray => "Evaluate an expression over all data, per row on failure",
            Self::SetNthDayOfNextMonth => "Date of the n-th weekday of the following month",
            Self::SetNextBusinessDay => "First business day after a date",
            Self::CalculateBusinessDays => "Business days between two dates",
        }
    }

    /// Case-insensitive lookup by configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| TransformError::UnknownOperation(s.trim().to_string()))
    }
}

/// A built, validated operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    SetValue(SetValue),
    CopyField(CopyField),
    Round(Round),
    MapValues(MapValues),
    ConvertDateFormat(ConvertDateFormat),
    Concatenate(Concatenate),
    Formula(Formula),
    FormulaArray(FormulaArray),
    SetNthDayOfNextMonth(NthDayOfNextMonth),
    SetNextBusinessDay(NextBusinessDay),
    CalculateBusinessDays(BusinessDayCount),
}

impl Operation {
    /// Resolve the operation name and validate its arguments.
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let kind: OperationKind = spec.function_name.parse()?;
        Ok(match kind {
            OperationKind::SetValue => Self::SetValue(SetValue::from_spec(spec)?),
            OperationKind::CopyField => Self::CopyField(CopyField::from_spec(spec)?),
            OperationKind::Round => Self::Round(Round::from_spec(spec)?),
            OperationKind::MapValues => Self::MapValues(MapValues::from_spec(spec, false)?),
            OperationKind::MapValuesDefaultNull => {
                Self::MapValues(MapValues::from_spec(spec, true)?)
            }
            OperationKind::ConvertDateFormat => {
                Self::ConvertDateFormat(ConvertDateFormat::from_spec(spec)?)
            }
            OperationKind::Concatenate => Self::Concatenate(Concatenate::from_spec(spec)?),
            OperationKind::Formula => Self::Formula(Formula::from_spec(spec)?),
            OperationKind::FormulaArray => Self::FormulaArray(FormulaArray::from_spec(spec)?),
            OperationKind::SetNthDayOfNextMonth => {
                Self::SetNthDayOfNextMonth(NthDayOfNextMonth::from_spec(spec)?)
            }
            OperationKind::SetNextBusinessDay => {
                Self::SetNextBusinessDay(NextBusinessDay::from_spec(spec)?)
            }
            OperationKind::CalculateBusinessDays => {
                Self::CalculateBusinessDays(BusinessDayCount::from_spec(spec)?)
            }
        })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::SetValue(_) => OperationKind::SetValue,
            Self::CopyField(_) => OperationKind::CopyField,
            Self::Round(_) => OperationKind::Round,
            Self::MapValues(op) if op.default_null => OperationKind::MapValuesDefaultNull,
            Self::MapValues(_) => OperationKind::MapValues,
            Self::ConvertDateFormat(_) => OperationKind::ConvertDateFormat,
            Self::Concatenate(_) => OperationKind::Concatenate,
            Self::Formula(_) => OperationKind::Formula,
            Self::FormulaArray(_) => OperationKind::FormulaArray,
            Self::SetNthDayOfNextMonth(_) => OperationKind::SetNthDayOfNextMonth,
            Self::SetNextBusinessDay(_) => OperationKind::SetNextBusinessDay,
            Self::CalculateBusinessDays(_) => OperationKind::CalculateBusinessDays,
        }
    }

    /// Rows the operation is restricted to.
    pub fn scope(&self) -> &Scope {
        match self {
            Self::SetValue(op) => &op.scope,
            Self::CopyField(op) => &op.scope,
            Self::Round(op) => &op.scope,
            Self::MapValues(op) => &op.scope,
            Self::ConvertDateFormat(op) => &op.scope,
            Self::Concatenate(op) => &op.scope,
            Self::Formula(op) => &op.scope,
            Self::FormulaArray(op) => op.scope(),
            Self::SetNthDayOfNextMonth(op) => &op.scope,
            Self::SetNextBusinessDay(op) => &op.scope,
            Self::CalculateBusinessDays(op) => &op.scope,
        }
    }

    /// Field the operation writes.
    pub fn target(&self) -> &str {
        match self {
            Self::SetValue(op) => &op.target,
            Self::CopyField(op) => &op.target,
            Self::Round(op) => &op.target,
            Self::MapValues(op) => &op.target,
            Self::ConvertDateFormat(op) => &op.target,
            Self::Concatenate(op) => &op.target,
            Self::Formula(op) => &op.target,
            Self::FormulaArray(op) => &op.formula.target,
            Self::SetNthDayOfNextMonth(op) => &op.target,
            Self::SetNextBusinessDay(op) => &op.target,
            Self::CalculateBusinessDays(op) => &op.target,
        }
    }

    /// Run the operation against `table`, returning the rows written.
    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        match self {
            Self::SetValue(op) => op.apply(table, ctx),
            Self::CopyField(op) => op.apply(table, ctx),
            Self::Round(op) => op.apply(table, ctx),
            Self::MapValues(op) => op.apply(table, ctx),
            Self::ConvertDateFormat(op) => op.apply(table, ctx),
            Self::Concatenate(op) => op.apply(table, ctx),
            Self::Formula(op) => op.apply(table, ctx),
            Self::FormulaArray(op) => op.apply(table, ctx),
            Self::SetNthDayOfNextMonth(op) => op.apply(table, ctx),
            Self::SetNextBusinessDay(op) => op.apply(table, ctx),
            Self::CalculateBusinessDays(op) => op.apply(table, ctx),
        }
    }
}

/// Write `compute(row)` into `target` for every row selected by `mask`.
///
/// Unselected rows keep their current value; if `target` is a new column
/// they are null.
pub(crate) fn write_scoped<F>(
    table: &mut Table,
    target: &str,
    mask: &[bool],
    mut compute: F,
) -> Result<usize, TransformError>
where
    F: FnMut(usize) -> Value,
{
    let mut values = table.values_or_null(target);
    let mut written = 0;
    for (row, selected) in mask.iter().enumerate() {
        if *selected {
            values[row] = compute(row);
            written += 1;
        }
    }
    table.set_column(target, &values)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use tabflow_model::keys;

    use super::*;

    #[test]
    fn kind_lookup_is_case_insensitive() {
        assert_eq!(OperationKind::from_name("formula"), Some(OperationKind::Formula));
        assert_eq!(
            OperationKind::from_name(" MAPVALUESDEFAULTNULL "),
            Some(OperationKind::MapValuesDefaultNull)
        );
        assert_eq!(OperationKind::from_name("Explode"), None);
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_operation_fails_to_build() {
        let err = Operation::from_spec(&OperationSpec::new("Explode")).unwrap_err();
        assert!(matches!(err, TransformError::UnknownOperation(name) if name == "Explode"));
    }

    #[test]
    fn built_operation_reports_kind_and_target() {
        let spec = OperationSpec::new("mapvaluesdefaultnull")
            .with_arg(keys::INPUTS, "code")
            .with_arg(keys::DATASET, "main");
        let op = Operation::from_spec(&spec).unwrap();
        assert_eq!(op.kind(), OperationKind::MapValuesDefaultNull);
        assert_eq!(op.target(), "code");
        assert_eq!(op.scope(), &Scope::Dataset("main".to_string()));
    }
}
