//! Business-day calendars and the shared holiday cache.
//!
//! A business day is a Monday to Friday date that is not a holiday of the
//! calendar in use. Calendars are loaded lazily through a
//! [`HolidayProvider`] and cached for the lifetime of the
//! [`CalendarCache`], which may be shared by concurrent runs.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Datelike, Days, NaiveDate, Weekday};
use tabflow_model::{HolidayProvider, StaticHolidays};
use tracing::debug;

use crate::error::TransformError;

/// Holidays of one calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    key: String,
    holidays: BTreeSet<NaiveDate>,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl HolidayCalendar {
    pub fn new(key: impl Into<String>, holidays: BTreeSet<NaiveDate>) -> Self {
        Self {
            key: key.into(),
            holidays,
        }
    }

    /// Calendar with no holidays: only weekends are skipped.
    pub fn weekends_only() -> Self {
        Self::default()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    /// First business day strictly after `date`.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use tabflow_transform::calendar::HolidayCalendar;
    ///
    /// let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    /// let next = HolidayCalendar::weekends_only().next_business_day(friday);
    /// assert_eq!(next, NaiveDate::from_ymd_opt(2024, 1, 8));
    /// ```
    pub fn next_business_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut current = date.succ_opt()?;
        while !self.is_business_day(current) {
            current = current.succ_opt()?;
        }
        Some(current)
    }

    /// Business days in the half-open range `[start, end)`. When `end` is
    /// before `start` the count of `[end, start)` is returned negated.
    pub fn business_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return -self.business_days_between(end, start);
        }
        let total = (end - start).num_days();
        let full_weeks = total / 7;
        let mut count = full_weeks * 5;
        let mut current = start + Days::new((full_weeks * 7) as u64);
        while current < end {
            if !is_weekend(current) {
                count += 1;
            }
            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        let holidays = self
            .holidays
            .range(start..end)
            .filter(|date| !is_weekend(**date))
            .count();
        count - holidays as i64
    }
}

/// Lazily populated, thread-safe cache of holiday calendars.
///
/// An empty calendar key means "weekends only" and never touches the
/// provider. Provider failures are reported as
/// [`TransformError::CalendarUnavailable`] and are not cached.
pub struct CalendarCache {
    provider: Arc<dyn HolidayProvider>,
    loaded: RwLock<HashMap<String, Arc<HolidayCalendar>>>,
}

impl fmt::Debug for CalendarCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarCache")
            .field("loaded", &self.loaded_keys())
            .finish_non_exhaustive()
    }
}

impl Default for CalendarCache {
    fn default() -> Self {
        Self::new(StaticHolidays::new())
    }
}

impl CalendarCache {
    pub fn new(provider: impl HolidayProvider + 'static) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    pub fn from_shared(provider: Arc<dyn HolidayProvider>) -> Self {
        Self {
            provider,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a calendar key. `None` or a blank key yields the
    /// weekends-only calendar.
    pub fn resolve(&self, key: Option<&str>) -> Result<Arc<HolidayCalendar>, TransformError> {
        match key.map(str::trim) {
            None | Some("") => Ok(Arc::new(HolidayCalendar::weekends_only())),
            Some(key) => self.get(key),
        }
    }

    /// Load (or fetch from cache) the calendar for `key`.
    pub fn get(&self, key: &str) -> Result<Arc<HolidayCalendar>, TransformError> {
        if let Some(calendar) = self
            .loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(Arc::clone(calendar));
        }

        let holidays =
            self.provider
                .holidays(key)
                .map_err(|err| TransformError::CalendarUnavailable {
                    key: key.to_string(),
                    reason: err.to_string(),
                })?;
        debug!(calendar = key, holidays = holidays.len(), "loaded holiday calendar");

        let mut loaded = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        let calendar = loaded
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(HolidayCalendar::new(key, holidays)));
        Ok(Arc::clone(calendar))
    }

    /// Keys of the calendars loaded so far, sorted.
    pub fn loaded_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tabflow_model::CalendarError;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct CountingProvider {
        inner: StaticHolidays,
        calls: AtomicUsize,
    }

    impl HolidayProvider for CountingProvider {
        fn holidays(&self, key: &str) -> Result<BTreeSet<NaiveDate>, CalendarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.holidays(key)
        }
    }

    #[test]
    fn next_business_day_skips_weekend_and_holidays() {
        let calendar = HolidayCalendar::new("US", [date(2024, 1, 8)].into_iter().collect());
        // Friday -> Monday is a holiday -> Tuesday.
        assert_eq!(calendar.next_business_day(date(2024, 1, 5)), Some(date(2024, 1, 9)));
        // Strictly after: a business day does not map to itself.
        assert_eq!(calendar.next_business_day(date(2024, 1, 9)), Some(date(2024, 1, 10)));
    }

    #[test]
    fn business_days_between_counts_half_open_range() {
        let calendar = HolidayCalendar::weekends_only();
        // Mon 2024-01-01 .. Mon 2024-01-08 -> five weekdays.
        assert_eq!(calendar.business_days_between(date(2024, 1, 1), date(2024, 1, 8)), 5);
        assert_eq!(calendar.business_days_between(date(2024, 1, 8), date(2024, 1, 1)), -5);
        assert_eq!(calendar.business_days_between(date(2024, 1, 6), date(2024, 1, 7)), 0);
        assert_eq!(calendar.business_days_between(date(2024, 1, 3), date(2024, 1, 3)), 0);

        let with_holiday =
            HolidayCalendar::new("X", [date(2024, 1, 2), date(2024, 1, 6)].into_iter().collect());
        // The Saturday holiday is not subtracted twice.
        assert_eq!(with_holiday.business_days_between(date(2024, 1, 1), date(2024, 1, 8)), 4);
    }

    #[test]
    fn cache_loads_each_calendar_once() {
        let provider = Arc::new(CountingProvider {
            inner: StaticHolidays::new().with_calendar("US", [date(2024, 7, 4)]),
            calls: AtomicUsize::new(0),
        });
        let cache = CalendarCache::from_shared(provider.clone());
        let first = cache.get("US").unwrap();
        let second = cache.resolve(Some("US")).unwrap();
        assert!(first.is_holiday(date(2024, 7, 4)));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loaded_keys(), vec!["US".to_string()]);
    }

    #[test]
    fn blank_key_is_weekends_only_and_unknown_key_fails() {
        let cache = CalendarCache::default();
        assert!(cache.resolve(Some(" ")).unwrap().is_empty());
        assert!(cache.resolve(None).unwrap().is_empty());
        let err = cache.get("MARS").unwrap_err();
        assert!(matches!(err, TransformError::CalendarUnavailable { ref key, .. } if key == "MARS"));
        assert!(err.is_configuration());
    }
}
