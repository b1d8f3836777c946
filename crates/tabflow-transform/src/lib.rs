//! Configuration-driven table transformation engine.
//!
//! A [`Pipeline`] is built from configuration rows, each naming one
//! operation from the catalog and its string arguments. Running the
//! pipeline applies the operations in order to a [`Table`], each optionally
//! restricted to the rows of one dataset.
//!
//! - **table**: the working table and dataset [`Scope`]s
//! - **coercion**: conversion of cells to declared type tags
//! - **expression**: the sandboxed formula language
//! - **dates** / **calendar**: date arithmetic and business-day calendars
//! - **operations**: the operation catalog
//! - **pipeline**: the ordered executor and its run report

pub mod calendar;
pub mod coercion;
pub mod dates;
pub mod error;
pub mod expression;
pub mod operations;
pub mod options;
pub mod pipeline;
pub mod table;

pub use calendar::{CalendarCache, HolidayCalendar};
pub use coercion::coerce;
pub use error::{CoercionError, EvaluationError, PipelineError, TransformError};
pub use expression::{Expression, ExpressionError};
pub use operations::{Operation, OperationKind};
pub use options::{DEFAULT_DATASET_COLUMN, DEFAULT_DATE_FORMATS, EngineOptions, RunContext};
pub use pipeline::{Pipeline, PipelineStep, RunReport, StepReport};
pub use table::{Scope, Table};
