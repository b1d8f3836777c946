//! Core data model for the tabflow transformation engine.
//!
//! This crate holds the plain types shared by every other crate:
//!
//! - **value**: [`Value`], the scalar cell representation
//! - **types**: declared type tags and step frequencies
//! - **operation**: [`OperationSpec`] and the [`ConfigRow`] it is built from
//! - **record**: [`Record`], the uniform row handed to consumers
//! - **calendar**: the [`HolidayProvider`] lookup interface

pub mod calendar;
pub mod operation;
pub mod record;
pub mod types;
pub mod value;

pub use calendar::{CalendarError, HolidayProvider, StaticHolidays};
pub use operation::{ConfigRow, OperationSpec, keys};
pub use record::Record;
pub use types::{Frequency, ParseTagError, TypeTag};
pub use value::{ISO_DATE_FORMAT, Value, format_numeric};
