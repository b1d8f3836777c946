//! Error types for the transformation engine.
//!
//! Errors come in two tiers. Step-level errors ([`TransformError`]) abort the
//! run. Cell and row-level errors ([`CoercionError`], [`EvaluationError`])
//! never leave an operation: the affected cell becomes null and the
//! operation carries on.

use polars::prelude::PolarsError;
use tabflow_model::TypeTag;
use thiserror::Error;

use crate::table::Table;

/// Fatal, step-level failure.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The configuration names an operation the catalog does not know.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    /// A required argument is missing or malformed.
    #[error("{operation}: {message}")]
    Configuration { operation: String, message: String },

    /// A business-day step references a calendar that cannot be loaded.
    ///
    /// Calendar keys come from the configuration, so this is a configuration
    /// error raised at run time, when the calendar is first resolved. See
    /// [`TransformError::is_configuration`].
    #[error("holiday calendar `{key}` is unavailable: {reason}")]
    CalendarUnavailable { key: String, reason: String },

    /// The underlying table rejected a column write.
    #[error("table operation failed: {0}")]
    Table(#[from] PolarsError),
}

impl TransformError {
    pub fn config(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the error traces back to the configuration rather than the
    /// data or the table. Unresolvable calendar keys count as configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperation(_) | Self::Configuration { .. } | Self::CalendarUnavailable { .. }
        )
    }
}

/// A single cell could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("`{0}` is not a number")]
    NotNumeric(String),

    #[error("`{0}` is not an integer")]
    NotInteger(String),

    #[error("`{0}` is not a valid date")]
    InvalidDate(String),

    #[error("cannot convert {from} to {to}")]
    Unsupported { from: &'static str, to: TypeTag },
}

/// A formula could not be evaluated for one row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot apply `{op}` to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("cannot negate {0}")]
    InvalidNegation(&'static str),

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// A pipeline failed while being built or run.
///
/// `step` is the zero-based position of the failing step. When the failure
/// happened during a run, `table` holds the table as left by the last
/// successful step; it is for diagnostics only.
#[derive(Debug, Error)]
#[error("step {step} ({function}) failed: {source}")]
pub struct PipelineError {
    pub step: usize,
    pub function: String,
    #[source]
    pub source: TransformError,
    pub table: Option<Box<Table>>,
}

impl PipelineError {
    pub fn at_build(step: usize, function: impl Into<String>, source: TransformError) -> Self {
        Self {
            step,
            function: function.into(),
            source,
            table: None,
        }
    }
}
