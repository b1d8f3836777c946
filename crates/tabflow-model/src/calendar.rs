//! Holiday calendar lookup interface.
//!
//! The engine only needs `holidays(key) -> set<date>`. Where the dates come
//! from (files, a database, a service) is up to the implementor.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while resolving a holiday calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("calendar `{key}` not found")]
    NotFound { key: String },

    #[error("failed to load calendar `{key}`: {message}")]
    Load { key: String, message: String },
}

/// Source of non-business dates keyed by calendar name.
///
/// Implementations may block (file or network I/O); callers cache results.
pub trait HolidayProvider: Send + Sync {
    fn holidays(&self, key: &str) -> Result<BTreeSet<NaiveDate>, CalendarError>;
}

/// In-memory provider, mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidays {
    calendars: HashMap<String, BTreeSet<NaiveDate>>,
}

impl StaticHolidays {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_calendar<I>(mut self, key: impl Into<String>, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.calendars
            .insert(key.into(), dates.into_iter().collect());
        self
    }
}

impl HolidayProvider for StaticHolidays {
    fn holidays(&self, key: &str) -> Result<BTreeSet<NaiveDate>, CalendarError> {
        self.calendars
            .get(key)
            .cloned()
            .ok_or_else(|| CalendarError::NotFound {
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_lookup() {
        let new_year = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let provider = StaticHolidays::new().with_calendar("US", [new_year]);
        assert!(provider.holidays("US").unwrap().contains(&new_year));
        assert_eq!(
            provider.holidays("UK"),
            Err(CalendarError::NotFound {
                key: "UK".to_string()
            })
        );
    }
}
