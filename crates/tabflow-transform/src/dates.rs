//! Date parsing, formatting and calendar arithmetic.
//!
//! Formats use strftime directives (`%Y`, `%m`, `%d`, ...). Business-day
//! arithmetic lives in [`crate::calendar`].

use std::fmt::Write as _;

use chrono::format::{Item, ParseErrorKind, StrftimeItems};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Check that a strftime format string is usable for both parsing and
/// formatting.
pub fn validate_format(fmt: &str) -> Result<(), String> {
    if fmt.trim().is_empty() {
        return Err("date format is empty".to_string());
    }
    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid date format `{fmt}`"));
    }
    Ok(())
}

/// Parse text with an explicit format.
///
/// Formats without a time part parse to midnight. Formats that omit the
/// day (or the month and day) default the missing parts to 1, so `%Y%m`
/// accepts `202401`.
///
/// # Examples
/// ```
/// use tabflow_transform::dates::parse_with_format;
///
/// let parsed = parse_with_format("20240101", "%Y%m%d").unwrap();
/// assert_eq!(parsed.date().to_string(), "2024-01-01");
///
/// let month = parse_with_format("2024-03", "%Y-%m").unwrap();
/// assert_eq!(month.date().to_string(), "2024-03-01");
///
/// assert!(parse_with_format("not a date", "%Y%m%d").is_none());
/// ```
pub fn parse_with_format(text: &str, fmt: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, fmt) {
        return Some(datetime);
    }
    match NaiveDate::parse_from_str(text, fmt) {
        Ok(date) => return Some(date.and_time(NaiveTime::MIN)),
        Err(err) if err.kind() == ParseErrorKind::NotEnough => {}
        Err(_) => return None,
    }
    NaiveDate::parse_from_str(&format!("{text}|01"), &format!("{fmt}|%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{text}|01|01"), &format!("{fmt}|%m|%d")))
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Parse a date by trying each format in turn.
pub fn parse_date_any<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| parse_with_format(text, fmt.as_ref()))
        .map(|datetime| datetime.date())
}

/// Render a timestamp with a strftime format. Returns `None` if the format
/// cannot be rendered.
pub fn format_datetime(datetime: NaiveDateTime, fmt: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", datetime.format(fmt)).ok()?;
    Some(out)
}

/// Parse a weekday as a number (0 = Monday .. 6 = Sunday) or an English
/// name (`mon`, `Monday`, ...).
pub fn parse_weekday(text: &str) -> Option<Weekday> {
    let text = text.trim();
    if let Ok(number) = text.parse::<u8>() {
        return match number {
            0 => Some(Weekday::Mon),
            1 => Some(Weekday::Tue),
            2 => Some(Weekday::Wed),
            3 => Some(Weekday::Thu),
            4 => Some(Weekday::Fri),
            5 => Some(Weekday::Sat),
            6 => Some(Weekday::Sun),
            _ => None,
        };
    }
    text.parse::<Weekday>().ok()
}

/// The `n`-th `weekday` of a month, or `None` when that month has no such
/// day (a fifth Monday, say).
///
/// # Examples
/// ```
/// use chrono::Weekday;
/// use tabflow_transform::dates::nth_weekday_of_month;
///
/// let first_monday = nth_weekday_of_month(2024, 2, Weekday::Mon, 1).unwrap();
/// assert_eq!(first_monday.to_string(), "2024-02-05");
///
/// // February 2024 has only four Mondays.
/// assert!(nth_weekday_of_month(2024, 2, Weekday::Mon, 5).is_none());
/// ```
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    if n == 0 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    NaiveDate::from_ymd_opt(year, month, 1 + offset + 7 * (n - 1))
}

/// Move a (year, month) pair by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + (month as i32 - 1) + delta;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}
