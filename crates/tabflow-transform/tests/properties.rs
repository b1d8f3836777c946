//! Property tests for the engine's algebraic guarantees.

use chrono::{Days, NaiveDate, NaiveTime};
use proptest::prelude::*;
use tabflow_model::{OperationSpec, Value, keys};
use tabflow_transform::calendar::HolidayCalendar;
use tabflow_transform::dates::{format_datetime, parse_with_format};
use tabflow_transform::{CalendarCache, EngineOptions, Pipeline, RunContext, Table};

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..40_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1950, 1, 1).unwrap() + Days::new(offset)
    })
}

fn holidays() -> impl Strategy<Value = HolidayCalendar> {
    prop::collection::btree_set(any_date(), 0..20)
        .prop_map(|dates| HolidayCalendar::new("generated", dates))
}

fn run(table: Table, specs: Vec<OperationSpec>) -> Table {
    let calendars = CalendarCache::default();
    let options = EngineOptions::default();
    Pipeline::from_specs(specs)
        .unwrap()
        .run(table, &RunContext::new(&calendars, &options))
        .unwrap()
}

fn single_column(name: &str, values: Vec<Value>) -> Table {
    Table::from_columns(vec![(name.to_string(), values)]).unwrap()
}

proptest! {
    #[test]
    fn business_day_count_is_antisymmetric(
        calendar in holidays(),
        a in any_date(),
        b in any_date(),
    ) {
        prop_assert_eq!(
            calendar.business_days_between(a, b),
            -calendar.business_days_between(b, a)
        );
    }

    #[test]
    fn business_day_count_is_additive(
        calendar in holidays(),
        a in any_date(),
        b in any_date(),
        c in any_date(),
    ) {
        prop_assert_eq!(
            calendar.business_days_between(a, b) + calendar.business_days_between(b, c),
            calendar.business_days_between(a, c)
        );
    }

    #[test]
    fn next_business_day_is_a_later_business_day(calendar in holidays(), start in any_date()) {
        let next = calendar.next_business_day(start).unwrap();
        prop_assert!(next > start);
        prop_assert!(calendar.is_business_day(next));
        prop_assert_eq!(calendar.business_days_between(start.succ_opt().unwrap(), next), 0);
    }

    #[test]
    fn date_format_round_trips(
        date in any_date(),
        fmt in prop::sample::select(vec!["%Y%m%d", "%Y-%m-%d", "%d/%m/%Y", "%m.%d.%Y"]),
    ) {
        let text = format_datetime(date.and_time(NaiveTime::MIN), fmt).unwrap();
        let parsed = parse_with_format(&text, fmt).unwrap();
        prop_assert_eq!(parsed.date(), date);
    }

    #[test]
    fn set_value_is_idempotent(
        values in prop::collection::vec(prop::option::of("[a-z]{0,6}"), 0..12),
        constant in "[a-z]{1,6}",
    ) {
        let input = single_column(
            "field",
            values.into_iter().map(Value::from).collect(),
        );
        let step = OperationSpec::new("SetValue")
            .with_arg(keys::NEW_FIELD, "field")
            .with_arg(keys::TO_VALUE_OR_FORMULA, constant);
        let once = run(input, vec![step.clone()]);
        let twice = run(once.clone(), vec![step]);
        prop_assert_eq!(once.records(), twice.records());
    }

    #[test]
    fn map_values_with_inverse_mapping_restores_input(
        picks in prop::collection::vec(0usize..5, 0..20),
    ) {
        let from = ["red", "green", "blue", "cyan", "gray"];
        let to = ["R", "G", "B", "C", "X"];
        let input = single_column(
            "color",
            picks.iter().map(|idx| Value::from(from[*idx])).collect(),
        );
        let forward = OperationSpec::new("MapValues")
            .with_arg(keys::INPUTS, "color")
            .with_arg(keys::FROM_VALUE_OR_TYPES, from.join(";"))
            .with_arg(keys::TO_VALUE_OR_FORMULA, to.join(";"));
        let backward = OperationSpec::new("MapValues")
            .with_arg(keys::INPUTS, "color")
            .with_arg(keys::FROM_VALUE_OR_TYPES, to.join(";"))
            .with_arg(keys::TO_VALUE_OR_FORMULA, from.join(";"));
        let out = run(input.clone(), vec![forward, backward]);
        prop_assert_eq!(out.records(), input.records());
    }
}
