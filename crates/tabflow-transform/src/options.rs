//! Engine options and per-run context.
//!
//! [`EngineOptions`] holds the knobs that are not part of any single step:
//! which column carries the dataset tag, and which date formats a bare
//! string may be in. [`RunContext`] bundles the options with the shared
//! holiday cache for one run.

use crate::calendar::CalendarCache;

/// Column that tags each row with its dataset unless configured otherwise.
pub const DEFAULT_DATASET_COLUMN: &str = "DataSetName";

/// Date formats tried, in order, when a string must become a date and no
/// explicit format is given.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y%m%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Options that apply to every step of a run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Column holding the dataset tag used for scoping.
    pub dataset_column: String,

    /// Formats tried when coercing strings to dates.
    pub date_formats: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dataset_column: DEFAULT_DATASET_COLUMN.to_string(),
            date_formats: DEFAULT_DATE_FORMATS
                .iter()
                .map(|fmt| (*fmt).to_string())
                .collect(),
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different column as the dataset tag.
    #[must_use]
    pub fn with_dataset_column(mut self, column: impl Into<String>) -> Self {
        self.dataset_column = column.into();
        self
    }

    /// Replace the list of fallback date formats.
    #[must_use]
    pub fn with_date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = formats.into_iter().map(Into::into).collect();
        self
    }
}

/// Everything a step may read besides the table itself.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub calendars: &'a CalendarCache,
    pub options: &'a EngineOptions,
}

impl<'a> RunContext<'a> {
    pub fn new(calendars: &'a CalendarCache, options: &'a EngineOptions) -> Self {
        Self { calendars, options }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.dataset_column, "DataSetName");
        assert_eq!(options.date_formats.first().map(String::as_str), Some("%Y-%m-%d"));
    }

    #[test]
    fn builder_overrides() {
        let options = EngineOptions::new()
            .with_dataset_column("source")
            .with_date_formats(["%d.%m.%Y"]);
        assert_eq!(options.dataset_column, "source");
        assert_eq!(options.date_formats, vec!["%d.%m.%Y".to_string()]);
    }
}
