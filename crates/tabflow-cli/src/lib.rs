//! Library side of the `tabflow` binary: logging, run stages and report tables.

pub mod logging;
pub mod pipeline;
pub mod summary;
