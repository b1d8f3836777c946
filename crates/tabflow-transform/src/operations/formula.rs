//! Formula operations.
//!
//! `Formula` evaluates per row and turns any row failure into a null for
//! that row. `FormulaArray` first tries a strict pass over the whole table
//! (when configured for all data); if any row fails there it reruns every
//! row through the per-row path.

use tabflow_model::{OperationSpec, TypeTag, Value, keys};
use tracing::{debug, trace, warn};

use super::args::{Args, split_fields};
use super::write_scoped;
use crate::coercion::coerce;
use crate::error::{EvaluationError, TransformError};
use crate::expression::Expression;
use crate::options::RunContext;
use crate::table::{Scope, Table};

/// Values of `TransformComparator` that switch `FormulaArray` to all data.
const ALL_DATA_FLAGS: &[&str] = &["ALL", "ALLDATA", "TRUE", "Y", "1"];

static ALL_ROWS: Scope = Scope::All;

/// Evaluate an expression over typed input fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub scope: Scope,
    pub target: String,
    pub inputs: Vec<String>,
    /// Declared type per input; empty means inputs are used as stored.
    pub types: Vec<TypeTag>,
    pub expression: Expression,
}

impl Formula {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        Self::build(&Args::new(spec, "Formula"))
    }

    fn build(args: &Args<'_>) -> Result<Self, TransformError> {
        let inputs = args.get(keys::INPUTS).map(split_fields).unwrap_or_default();
        let types = args
            .get(keys::FROM_VALUE_OR_TYPES)
            .map(split_fields)
            .unwrap_or_default()
            .iter()
            .map(|tag| tag.parse::<TypeTag>().map_err(|err| args.error(err.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        if !types.is_empty() && types.len() != inputs.len() {
            return Err(args.error(format!(
                "{} input fields but {} input types",
                inputs.len(),
                types.len()
            )));
        }
        let source = args.require(keys::TO_VALUE_OR_FORMULA, "expression")?;
        let expression = Expression::compile(source, &inputs)
            .map_err(|err| args.error(format!("invalid expression `{source}`: {err}")))?;
        Ok(Self {
            scope: args.scope(),
            target: args.target()?,
            inputs,
            types,
            expression,
        })
    }

    /// Coerce one row's inputs and evaluate the expression.
    fn evaluate_row(
        &self,
        columns: &[Vec<Value>],
        row: usize,
        ctx: &RunContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = &column[row];
            values.push(match self.types.get(idx) {
                Some(tag) => coerce(value, *tag, &ctx.options.date_formats)?,
                None => value.clone(),
            });
        }
        self.expression.evaluate(&values)
    }

    fn input_columns(&self, table: &Table) -> Vec<Vec<Value>> {
        self.inputs
            .iter()
            .map(|input| table.values_or_null(input))
            .collect()
    }

    fn apply_scoped(
        &self,
        table: &mut Table,
        ctx: &RunContext<'_>,
        scope: &Scope,
    ) -> Result<usize, TransformError> {
        let mask = table.scope_mask(scope, &ctx.options.dataset_column);
        let columns = self.input_columns(table);
        let mut recovered = 0usize;
        let rows = write_scoped(table, &self.target, &mask, |row| {
            self.evaluate_row(&columns, row, ctx).unwrap_or_else(|err| {
                recovered += 1;
                trace!(row, error = %err, "formula row set to null");
                Value::Null
            })
        })?;
        if recovered > 0 {
            debug!(recovered, formula = self.expression.source(), "formula rows set to null");
        }
        Ok(rows)
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        self.apply_scoped(table, ctx, &self.scope)
    }
}

/// Vectorized formula with a per-row fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaArray {
    pub formula: Formula,
    pub all_data: bool,
}

impl FormulaArray {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, "FormulaArray");
        let all_data = args.get(keys::COMPARATOR).is_some_and(|flag| {
            ALL_DATA_FLAGS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(flag))
        });
        Ok(Self {
            formula: Formula::build(&args)?,
            all_data,
        })
    }

    /// Rows the step covers: every row in all-data mode, else the scope.
    pub fn scope(&self) -> &Scope {
        if self.all_data {
            &ALL_ROWS
        } else {
            &self.formula.scope
        }
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        if !self.all_data {
            return self.formula.apply(table, ctx);
        }

        let columns = self.formula.input_columns(table);
        let strict: Result<Vec<Value>, (usize, EvaluationError)> = (0..table.height())
            .map(|row| {
                self.formula
                    .evaluate_row(&columns, row, ctx)
                    .map_err(|err| (row, err))
            })
            .collect();

        match strict {
            Ok(values) => {
                table.set_column(&self.formula.target, &values)?;
                Ok(values.len())
            }
            Err((row, err)) => {
                warn!(
                    row,
                    error = %err,
                    formula = self.formula.expression.source(),
                    "vectorized formula failed, falling back to per-row evaluation"
                );
                self.formula.apply_scoped(table, ctx, &Scope::All)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(inputs: &str, types: &str, expression: &str) -> OperationSpec {
        OperationSpec::new("Formula")
            .with_arg(keys::INPUTS, inputs)
            .with_arg(keys::FROM_VALUE_OR_TYPES, types)
            .with_arg(keys::TO_VALUE_OR_FORMULA, expression)
            .with_arg(keys::NEW_FIELD, "out")
    }

    #[test]
    fn build_checks_type_count_and_syntax() {
        assert!(Formula::from_spec(&spec("A,B", "int,int", "A+B")).is_ok());
        assert!(Formula::from_spec(&spec("A,B", "int", "A+B")).is_err());
        assert!(Formula::from_spec(&spec("A", "int", "A +")).is_err());
        assert!(Formula::from_spec(&spec("A", "int", "abs(A)")).is_err());
        assert!(Formula::from_spec(&spec("A", "widget", "A")).is_err());
        assert!(Formula::from_spec(&spec("A", "int", "")).is_err());
    }

    #[test]
    fn deeply_nested_formula_is_a_configuration_error() {
        let deep = format!("{}A", "-".repeat(200_000));
        let err = Formula::from_spec(&spec("A", "int", &deep)).unwrap_err();
        assert!(matches!(err, TransformError::Configuration { .. }));
        assert!(err.to_string().contains("nested more than 256 levels"));
    }

    #[test]
    fn untyped_inputs_are_used_as_stored() {
        let formula = Formula::from_spec(&spec("A", "", "A * 2")).unwrap();
        assert!(formula.types.is_empty());
    }

    #[test]
    fn all_data_flag_values() {
        for flag in ["ALL", "alldata", "true", "Y", "1"] {
            let array = FormulaArray::from_spec(
                &spec("A", "int", "A").with_arg(keys::COMPARATOR, flag),
            )
            .unwrap();
            assert!(array.all_data, "{flag}");
            assert_eq!(array.scope(), &Scope::All);
        }
        let scoped = FormulaArray::from_spec(
            &spec("A", "int", "A").with_arg(keys::DATASET, "main"),
        )
        .unwrap();
        assert!(!scoped.all_data);
        assert_eq!(scoped.scope(), &Scope::Dataset("main".to_string()));
    }
}
