//! Date-valued operations: format conversion, schedule dates and
//! business-day counts.
//!
//! `SetNthDayOfNextMonth` and `SetNextBusinessDay` support a history depth
//! `h`: every in-scope row becomes `h + 1` rows, period 0 first, each
//! carrying the date for one earlier period.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use tabflow_model::{Frequency, OperationSpec, TypeTag, Value, keys};
use tracing::debug;

use super::args::{Args, split_fields};
use super::write_scoped;
use crate::calendar::HolidayCalendar;
use crate::coercion::coerce;
use crate::dates::{
    format_datetime, nth_weekday_of_month, parse_date_any, parse_weekday, parse_with_format,
    shift_month, validate_format,
};
use crate::error::TransformError;
use crate::options::RunContext;
use crate::table::{Scope, Table};

/// Largest history depth a schedule step accepts.
pub const MAX_HISTORY_DEPTH: u32 = 1_000;

/// Reformat a date held as text (optionally split over several fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertDateFormat {
    pub scope: Scope,
    pub sources: Vec<String>,
    pub target: String,
    pub input_format: String,
    pub output_format: String,
}

impl ConvertDateFormat {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, "ConvertDateFormat");
        let sources = split_fields(args.require(keys::INPUTS, "source fields")?);
        let input_format = args.require(keys::FROM_VALUE_OR_TYPES, "input format")?;
        let output_format = args.require(keys::TO_VALUE_OR_FORMULA, "output format")?;
        validate_format(input_format).map_err(|msg| args.error(msg))?;
        validate_format(output_format).map_err(|msg| args.error(msg))?;
        Ok(Self {
            scope: args.scope(),
            sources,
            target: args.target()?,
            input_format: input_format.to_string(),
            output_format: output_format.to_string(),
        })
    }

    /// Convert one row's source values. `None` means the row did not parse.
    fn convert(&self, parts: &[Value]) -> Option<Value> {
        if parts.iter().all(Value::is_null) {
            return Some(Value::Null);
        }
        let datetime = match parts {
            [Value::Date(date)] => date.and_time(chrono::NaiveTime::MIN),
            _ => {
                let text: String = parts.iter().map(ToString::to_string).collect();
                parse_with_format(&text, &self.input_format)?
            }
        };
        format_datetime(datetime, &self.output_format).map(Value::Str)
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let mask = table.scope_mask(&self.scope, &ctx.options.dataset_column);
        let columns: Vec<Vec<Value>> = self
            .sources
            .iter()
            .map(|source| table.values_or_null(source))
            .collect();
        let mut recovered = 0usize;
        let rows = write_scoped(table, &self.target, &mask, |row| {
            let parts: Vec<Value> = columns.iter().map(|column| column[row].clone()).collect();
            self.convert(&parts).unwrap_or_else(|| {
                recovered += 1;
                Value::Null
            })
        })?;
        if recovered > 0 {
            debug!(recovered, format = %self.input_format, "unparseable dates set to null");
        }
        Ok(rows)
    }
}

/// Start date of a schedule: a field of the row, or one literal date.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StartDate {
    Field(String),
    Literal(NaiveDate),
}

/// Decide at run time whether the start argument names a column or is a
/// date literal.
fn resolve_start(
    table: &Table,
    raw: &str,
    operation: &'static str,
    ctx: &RunContext<'_>,
) -> Result<StartDate, TransformError> {
    if table.has_column(raw) {
        return Ok(StartDate::Field(raw.to_string()));
    }
    parse_date_any(raw, &ctx.options.date_formats)
        .map(StartDate::Literal)
        .ok_or_else(|| {
            TransformError::config(
                operation,
                format!("start date `{raw}` is neither a column nor a date"),
            )
        })
}

fn as_date(value: &Value, ctx: &RunContext<'_>) -> Option<NaiveDate> {
    match coerce(value, TypeTag::Date, &ctx.options.date_formats) {
        Ok(Value::Date(date)) => Some(date),
        _ => None,
    }
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map_or(Value::Null, Value::Date)
}

/// Write a period-indexed date into `target`, expanding in-scope rows to
/// `history + 1` rows. When the scope selects no rows and the start date
/// is a literal, fresh rows tagged with the scoped dataset are appended.
fn write_periods<F>(
    table: &mut Table,
    ctx: &RunContext<'_>,
    scope: &Scope,
    target: &str,
    history: u32,
    start: &StartDate,
    compute: F,
) -> Result<usize, TransformError>
where
    F: Fn(NaiveDate, u32) -> Option<NaiveDate>,
{
    let dataset_column = &ctx.options.dataset_column;
    let mask = table.scope_mask(scope, dataset_column);
    let starts: Vec<Option<NaiveDate>> = match start {
        StartDate::Field(name) => table
            .values_or_null(name)
            .iter()
            .map(|value| as_date(value, ctx))
            .collect(),
        StartDate::Literal(date) => vec![Some(*date); table.height()],
    };
    let periods = history + 1;

    if !mask.contains(&true) {
        return match start {
            StartDate::Literal(date) => {
                append_periods(table, scope, dataset_column, target, periods, |k| {
                    compute(*date, k)
                })
            }
            StartDate::Field(_) => write_scoped(table, target, &mask, |_| Value::Null),
        };
    }

    if periods == 1 {
        return write_scoped(table, target, &mask, |row| {
            date_value(starts[row].and_then(|date| compute(date, 0)))
        });
    }

    let mut columns = table.to_columns();
    let target_idx = match columns.iter().position(|(name, _)| name == target) {
        Some(idx) => idx,
        None => {
            columns.push((target.to_string(), vec![Value::Null; table.height()]));
            columns.len() - 1
        }
    };
    let selected = mask.iter().filter(|selected| **selected).count();
    let capacity = table.height() + selected * history as usize;
    let mut expanded: Vec<(String, Vec<Value>)> = columns
        .iter()
        .map(|(name, _)| (name.clone(), Vec::with_capacity(capacity)))
        .collect();

    for (row, in_scope) in mask.iter().enumerate() {
        let copies = if *in_scope { periods } else { 1 };
        for period in 0..copies {
            for (idx, (_, values)) in columns.iter().enumerate() {
                let value = if *in_scope && idx == target_idx {
                    date_value(starts[row].and_then(|date| compute(date, period)))
                } else {
                    values[row].clone()
                };
                expanded[idx].1.push(value);
            }
        }
    }

    table.replace_rows(expanded)?;
    Ok(selected * periods as usize)
}

fn append_periods<F>(
    table: &mut Table,
    scope: &Scope,
    dataset_column: &str,
    target: &str,
    periods: u32,
    compute: F,
) -> Result<usize, TransformError>
where
    F: Fn(u32) -> Option<NaiveDate>,
{
    let height = table.height();
    let mut columns = table.to_columns();
    for name in [Some(target), scope.dataset().map(|_| dataset_column)]
        .into_iter()
        .flatten()
    {
        if !columns.iter().any(|(column, _)| column == name) {
            columns.push((name.to_string(), vec![Value::Null; height]));
        }
    }

    for period in 0..periods {
        for (name, values) in &mut columns {
            let value = if name == target {
                date_value(compute(period))
            } else if name == dataset_column {
                scope.dataset().map_or(Value::Null, Value::from)
            } else {
                Value::Null
            };
            values.push(value);
        }
    }

    table.replace_rows(columns)?;
    Ok(periods as usize)
}

fn history_depth(args: &Args<'_>) -> Result<u32, TransformError> {
    let depth = args
        .parse::<u32>(keys::TO_VALUE_OR_FORMULA, "history depth")?
        .unwrap_or(0);
    if depth > MAX_HISTORY_DEPTH {
        return Err(args.error(format!(
            "history depth {depth} exceeds the maximum of {MAX_HISTORY_DEPTH}"
        )));
    }
    Ok(depth)
}

fn check_frequency(args: &Args<'_>, expected: Frequency) -> Result<(), TransformError> {
    match args.parse::<Frequency>(keys::COMPARATOR, "frequency")? {
        Some(found) if found != expected => Err(args.error(format!(
            "frequency {found} is not supported, expected {expected}"
        ))),
        _ => Ok(()),
    }
}

/// Set the n-th given weekday of the month after the start date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NthDayOfNextMonth {
    pub scope: Scope,
    pub target: String,
    pub start: String,
    pub weekday: Weekday,
    pub occurrence: u32,
    pub history: u32,
}

impl NthDayOfNextMonth {
    const NAME: &'static str = "SetNthDayOfNextMonth";

    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, Self::NAME);
        let start = args.require(keys::INPUTS, "start date")?.to_string();
        let rule = split_fields(args.require(keys::FROM_VALUE_OR_TYPES, "weekday,occurrence")?);
        let [weekday, occurrence] = rule.as_slice() else {
            return Err(args.error("expected `weekday,occurrence`"));
        };
        let weekday = parse_weekday(weekday)
            .ok_or_else(|| args.error(format!("invalid weekday `{weekday}`")))?;
        let occurrence = occurrence
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=5).contains(n))
            .ok_or_else(|| args.error(format!("occurrence `{occurrence}` must be 1 to 5")))?;
        check_frequency(&args, Frequency::Monthly)?;
        Ok(Self {
            scope: args.scope(),
            target: args.target()?,
            start,
            weekday,
            occurrence,
            history: history_depth(&args)?,
        })
    }

    /// The date for `period` months before the month after `start`.
    pub fn date_for(&self, start: NaiveDate, period: u32) -> Option<NaiveDate> {
        let delta = 1 - i32::try_from(period).ok()?;
        let (year, month) = shift_month(start.year(), start.month(), delta);
        nth_weekday_of_month(year, month, self.weekday, self.occurrence)
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let start = resolve_start(table, &self.start, Self::NAME, ctx)?;
        write_periods(table, ctx, &self.scope, &self.target, self.history, &start, |date, k| {
            self.date_for(date, k)
        })
    }
}

/// Set the first business day after the start date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextBusinessDay {
    pub scope: Scope,
    pub target: String,
    pub start: String,
    pub calendar: Option<String>,
    pub history: u32,
}

impl NextBusinessDay {
    const NAME: &'static str = "SetNextBusinessDay";

    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, Self::NAME);
        check_frequency(&args, Frequency::Daily)?;
        Ok(Self {
            scope: args.scope(),
            target: args.target()?,
            start: args.require(keys::INPUTS, "start date")?.to_string(),
            calendar: args.get(keys::FROM_VALUE_OR_TYPES).map(str::to_string),
            history: history_depth(&args)?,
        })
    }

    fn date_for(calendar: &HolidayCalendar, start: NaiveDate, period: u32) -> Option<NaiveDate> {
        let shifted = start.checked_sub_days(Days::new(u64::from(period)))?;
        calendar.next_business_day(shifted)
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let calendar = ctx.calendars.resolve(self.calendar.as_deref())?;
        let start = resolve_start(table, &self.start, Self::NAME, ctx)?;
        write_periods(table, ctx, &self.scope, &self.target, self.history, &start, |date, k| {
            Self::date_for(&calendar, date, k)
        })
    }
}

/// Count business days between a start and an end field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessDayCount {
    pub scope: Scope,
    pub target: String,
    pub start: String,
    pub end: String,
    pub start_type: TypeTag,
    pub end_type: TypeTag,
    pub calendar: Option<String>,
}

impl BusinessDayCount {
    pub fn from_spec(spec: &OperationSpec) -> Result<Self, TransformError> {
        let args = Args::new(spec, "CalculateBusinessDays");
        let inputs = split_fields(args.require(keys::INPUTS, "start,end fields")?);
        let (start, end) = match inputs.as_slice() {
            [start, end, ..] => (start.clone(), end.clone()),
            _ => return Err(args.error("expected `start,end` input fields")),
        };
        let types = args
            .get(keys::FROM_VALUE_OR_TYPES)
            .map(split_fields)
            .unwrap_or_default()
            .iter()
            .map(|tag| {
                tag.parse::<TypeTag>()
                    .map_err(|err| args.error(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let start_type = types.first().copied().unwrap_or(TypeTag::Date);
        let end_type = types.get(1).copied().unwrap_or(TypeTag::Date);
        Ok(Self {
            scope: args.scope(),
            target: args.target()?,
            start,
            end,
            start_type,
            end_type,
            calendar: args.get(keys::TO_VALUE_OR_FORMULA).map(str::to_string),
        })
    }

    fn to_date(value: &Value, tag: TypeTag, ctx: &RunContext<'_>) -> Option<NaiveDate> {
        let typed = coerce(value, tag, &ctx.options.date_formats).ok()?;
        as_date(&typed, ctx)
    }

    pub fn apply(&self, table: &mut Table, ctx: &RunContext<'_>) -> Result<usize, TransformError> {
        let calendar = ctx.calendars.resolve(self.calendar.as_deref())?;
        let mask = table.scope_mask(&self.scope, &ctx.options.dataset_column);
        let starts = table.values_or_null(&self.start);
        let ends = table.values_or_null(&self.end);
        let mut recovered = 0usize;
        let rows = write_scoped(table, &self.target, &mask, |row| {
            if starts[row].is_null() || ends[row].is_null() {
                return Value::Null;
            }
            let start = Self::to_date(&starts[row], self.start_type, ctx);
            let end = Self::to_date(&ends[row], self.end_type, ctx);
            match (start, end) {
                (Some(start), Some(end)) => Value::Int(calendar.business_days_between(start, end)),
                _ => {
                    recovered += 1;
                    Value::Null
                }
            }
        })?;
        if recovered > 0 {
            debug!(recovered, calendar = calendar.key(), "rows without valid dates set to null");
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn nth_spec(rule: &str) -> OperationSpec {
        OperationSpec::new("SetNthDayOfNextMonth")
            .with_arg(keys::INPUTS, "start")
            .with_arg(keys::FROM_VALUE_OR_TYPES, rule)
            .with_arg(keys::NEW_FIELD, "due")
    }

    #[test]
    fn nth_day_rule_parsing() {
        let op = NthDayOfNextMonth::from_spec(&nth_spec("0,1")).unwrap();
        assert_eq!(op.weekday, Weekday::Mon);
        assert_eq!(op.occurrence, 1);
        assert_eq!(op.history, 0);
        assert!(NthDayOfNextMonth::from_spec(&nth_spec("Mon,6")).is_err());
        assert!(NthDayOfNextMonth::from_spec(&nth_spec("Funday,1")).is_err());
        assert!(NthDayOfNextMonth::from_spec(&nth_spec("0")).is_err());
        let daily = nth_spec("0,1").with_arg(keys::COMPARATOR, "DAIL");
        assert!(NthDayOfNextMonth::from_spec(&daily).is_err());
    }

    #[test]
    fn history_depth_is_capped() {
        let deep = nth_spec("Mon,1").with_arg(keys::TO_VALUE_OR_FORMULA, "4000000000");
        let err = NthDayOfNextMonth::from_spec(&deep).unwrap_err();
        assert!(matches!(err, TransformError::Configuration { .. }));
        assert!(err.to_string().contains("history depth"));

        let limit = MAX_HISTORY_DEPTH.to_string();
        let op = NthDayOfNextMonth::from_spec(
            &nth_spec("Mon,1").with_arg(keys::TO_VALUE_OR_FORMULA, limit.as_str()),
        )
        .unwrap();
        assert_eq!(op.history, MAX_HISTORY_DEPTH);

        let business = OperationSpec::new("SetNextBusinessDay")
            .with_arg(keys::INPUTS, "start")
            .with_arg(keys::NEW_FIELD, "next")
            .with_arg(keys::TO_VALUE_OR_FORMULA, "1001");
        assert!(NextBusinessDay::from_spec(&business).is_err());
    }

    #[test]
    fn nth_day_periods_walk_back_one_month_each() {
        let op = NthDayOfNextMonth::from_spec(&nth_spec("Mon,1")).unwrap();
        let start = date(2024, 1, 15);
        assert_eq!(op.date_for(start, 0), Some(date(2024, 2, 5)));
        assert_eq!(op.date_for(start, 1), Some(date(2024, 1, 1)));
        assert_eq!(op.date_for(start, 2), Some(date(2023, 12, 4)));
    }

    #[test]
    fn next_business_day_requires_daily_frequency() {
        let spec = OperationSpec::new("SetNextBusinessDay")
            .with_arg(keys::INPUTS, "start")
            .with_arg(keys::NEW_FIELD, "next")
            .with_arg(keys::COMPARATOR, "MTH");
        assert!(NextBusinessDay::from_spec(&spec).is_err());
    }

    #[test]
    fn convert_joins_parts_before_parsing() {
        let spec = OperationSpec::new("ConvertDateFormat")
            .with_arg(keys::INPUTS, "y,md")
            .with_arg(keys::FROM_VALUE_OR_TYPES, "%Y%m%d")
            .with_arg(keys::TO_VALUE_OR_FORMULA, "%d/%m/%Y")
            .with_arg(keys::NEW_FIELD, "out");
        let op = ConvertDateFormat::from_spec(&spec).unwrap();
        assert_eq!(
            op.convert(&[Value::Int(2024), Value::from("0305")]),
            Some(Value::from("05/03/2024"))
        );
        assert_eq!(op.convert(&[Value::Null, Value::Null]), Some(Value::Null));
        assert_eq!(op.convert(&[Value::from("x"), Value::Null]), None);
    }

    #[test]
    fn convert_rejects_bad_formats() {
        let spec = OperationSpec::new("ConvertDateFormat")
            .with_arg(keys::INPUTS, "d")
            .with_arg(keys::FROM_VALUE_OR_TYPES, "%Y%m%d")
            .with_arg(keys::TO_VALUE_OR_FORMULA, "%Q")
            .with_arg(keys::NEW_FIELD, "out");
        assert!(matches!(
            ConvertDateFormat::from_spec(&spec),
            Err(TransformError::Configuration { .. })
        ));
    }

    #[test]
    fn business_day_count_parses_types() {
        let spec = OperationSpec::new("CalculateBusinessDays")
            .with_arg(keys::INPUTS, "opened,closed,ignored")
            .with_arg(keys::FROM_VALUE_OR_TYPES, "str,date")
            .with_arg(keys::NEW_FIELD, "days");
        let op = BusinessDayCount::from_spec(&spec).unwrap();
        assert_eq!((op.start.as_str(), op.end.as_str()), ("opened", "closed"));
        assert_eq!((op.start_type, op.end_type), (TypeTag::Str, TypeTag::Date));
        assert_eq!(op.calendar, None);

        let single = spec.clone().with_arg(keys::INPUTS, "opened");
        assert!(BusinessDayCount::from_spec(&single).is_err());
    }
}
