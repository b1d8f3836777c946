//! Ordered, configuration-driven pipeline.
//!
//! A [`Pipeline`] is an ordered list of built operations. Running it applies
//! every step exactly once, in configuration order, to a working table.
//! Each step works on a copy of the table that is committed only when the
//! step succeeds, so a failing step leaves no partial writes behind.
//!
//! # Example
//!
//! ```
//! use tabflow_model::{Value, keys};
//! use tabflow_transform::{CalendarCache, EngineOptions, Pipeline, RunContext, Table};
//!
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .add_operation(
//!         "SetValue",
//!         [(keys::NEW_FIELD, "status"), (keys::TO_VALUE_OR_FORMULA, "open")],
//!     )
//!     .unwrap();
//!
//! let table = Table::from_columns(vec![("id".to_string(), vec![Value::Int(1)])]).unwrap();
//! let calendars = CalendarCache::default();
//! let options = EngineOptions::default();
//! let out = pipeline.run(table, &RunContext::new(&calendars, &options)).unwrap();
//! assert_eq!(out.value(0, "status"), Value::from("open"));
//! ```

use std::time::{Duration, Instant};

use serde::Serialize;
use tabflow_model::{ConfigRow, OperationSpec};
use tracing::{debug, error, info, info_span};

use crate::error::{PipelineError, TransformError};
use crate::operations::{Operation, OperationKind};
use crate::options::RunContext;
use crate::table::Table;

/// One configured step.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStep {
    /// Zero-based position in the pipeline.
    pub index: usize,
    pub spec: OperationSpec,
    pub operation: Operation,
}

/// Outcome of one step in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub function: String,
    pub dataset: Option<String>,
    pub target: String,
    pub rows_affected: usize,
    pub rows_after: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

/// Per-step statistics of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|step| step.duration).sum()
    }
}

/// Ordered list of operations built from configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pipeline from configuration rows, in order. Fails on the
    /// first row naming an unknown operation or carrying invalid arguments.
    pub fn from_config(rows: &[ConfigRow]) -> Result<Self, PipelineError> {
        Self::from_specs(rows.iter().map(ConfigRow::to_spec))
    }

    pub fn from_specs<I>(specs: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = OperationSpec>,
    {
        let mut pipeline = Self::new();
        for spec in specs {
            pipeline.push(spec)?;
        }
        Ok(pipeline)
    }

    /// Append an operation by name with its arguments.
    pub fn add_operation<I, K, V>(&mut self, name: &str, args: I) -> Result<&mut Self, PipelineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let spec = args
            .into_iter()
            .fold(OperationSpec::new(name), |spec, (key, value)| spec.with_arg(key, value));
        self.push(spec)?;
        Ok(self)
    }

    /// Append an already assembled spec.
    pub fn push(&mut self, spec: OperationSpec) -> Result<&mut Self, PipelineError> {
        let index = self.steps.len();
        let operation = Operation::from_spec(&spec)
            .map_err(|source| PipelineError::at_build(index, spec.function_name.trim(), source))?;
        debug!(
            step = index,
            function = operation.kind().name(),
            target = operation.target(),
            "step configured"
        );
        self.steps.push(PipelineStep {
            index,
            spec,
            operation,
        });
        Ok(self)
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Operation kinds in step order.
    pub fn kinds(&self) -> Vec<OperationKind> {
        self.steps.iter().map(|step| step.operation.kind()).collect()
    }

    /// Run every step against `table` and return the final table.
    pub fn run(&self, table: Table, ctx: &RunContext<'_>) -> Result<Table, PipelineError> {
        self.run_with_report(table, ctx).map(|(table, _)| table)
    }

    /// Run every step and collect per-step statistics.
    ///
    /// On failure the returned error carries the table as left by the last
    /// successful step.
    pub fn run_with_report(
        &self,
        mut table: Table,
        ctx: &RunContext<'_>,
    ) -> Result<(Table, RunReport), PipelineError> {
        let mut report = RunReport {
            rows_in: table.height(),
            ..RunReport::default()
        };

        for step in &self.steps {
            let function = step.operation.kind().name();
            let dataset = step.operation.scope().dataset().map(str::to_string);
            let span = info_span!(
                "pipeline_step",
                step = step.index,
                function = function,
                dataset = dataset.as_deref().unwrap_or("*")
            );
            let _guard = span.enter();
            let start = Instant::now();

            let mut working = table.clone();
            match step.operation.apply(&mut working, ctx) {
                Ok(rows) => {
                    let duration = start.elapsed();
                    table = working;
                    info!(
                        rows,
                        rows_after = table.height(),
                        duration_ms = duration.as_millis(),
                        "step complete"
                    );
                    report.steps.push(StepReport {
                        index: step.index,
                        function: function.to_string(),
                        dataset,
                        target: step.operation.target().to_string(),
                        rows_affected: rows,
                        rows_after: table.height(),
                        duration,
                    });
                }
                Err(source) => {
                    error!(error = %source, "step failed");
                    return Err(failed(step, source, table));
                }
            }
        }

        report.rows_out = table.height();
        Ok((table, report))
    }
}

fn failed(step: &PipelineStep, source: TransformError, table: Table) -> PipelineError {
    PipelineError {
        step: step.index,
        function: step.operation.kind().name().to_string(),
        source,
        table: Some(Box::new(table)),
    }
}

#[cfg(test)]
mod tests {
    use tabflow_model::keys;

    use super::*;

    #[test]
    fn build_error_carries_step_index() {
        let rows = vec![
            ConfigRow {
                transform_function: "SetValue".into(),
                new_field_name: "a".into(),
                ..ConfigRow::default()
            },
            ConfigRow {
                transform_function: "Teleport".into(),
                ..ConfigRow::default()
            },
        ];
        let err = Pipeline::from_config(&rows).unwrap_err();
        assert_eq!(err.step, 1);
        assert_eq!(err.function, "Teleport");
        assert!(err.table.is_none());
        assert!(matches!(err.source, TransformError::UnknownOperation(_)));
    }

    #[test]
    fn add_operation_keeps_order() {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_operation("SetValue", [(keys::NEW_FIELD, "a")])
            .unwrap()
            .add_operation("CopyField", [(keys::INPUTS, "a"), (keys::NEW_FIELD, "b")])
            .unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline.kinds(),
            vec![OperationKind::SetValue, OperationKind::CopyField]
        );
        assert_eq!(pipeline.steps()[1].index, 1);
    }
}
