//! Integration tests for the run stages behind `tabflow run`.

use std::fs;
use std::path::Path;

use tabflow_cli::pipeline::{
    RunSettings, calendar_cache, load_input, load_pipeline, render_records, run, transform,
};
use tabflow_cli::summary::operation_catalog;
use tabflow_transform::EngineOptions;
use tempfile::TempDir;

const HEADER: &str = "TransformFunction,TransformInputs,TransformFromValueOrFormulaInputTypes,TransformToValueOrFormula,DataSetName,NewFieldName,TransformComparator";

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_run_writes_records() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "config.csv",
        &format!(
            "{HEADER}\n\
             Formula,\"A,B\",\"int,int\",A + B,,C,\n\
             ConvertDateFormat,D,%Y%m%d,%d/%m/%Y,,Day,\n"
        ),
    );
    let input = write(dir.path(), "input.csv", "A,B,D\n2,3,20240205\n");
    let output = dir.path().join("out.json");

    let settings = RunSettings {
        config,
        input,
        input_format: None,
        calendars: None,
        output: Some(output.clone()),
        options: EngineOptions::default(),
        pretty: false,
    };
    let outcome = run(&settings).unwrap();
    assert_eq!(outcome.report.steps.len(), 2);
    assert_eq!(outcome.report.rows_out, 1);

    let records = outcome.table.records();
    insta::assert_json_snapshot!(records, @r#"
    [
      {
        "A": 2,
        "B": 3,
        "D": 20240205,
        "C": 5,
        "Day": "05/02/2024"
      }
    ]
    "#);

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(
        written.trim_end(),
        r#"[{"A":2,"B":3,"D":20240205,"C":5,"Day":"05/02/2024"}]"#
    );
}

#[test]
fn test_invalid_configuration_names_the_step() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "config.csv",
        &format!("{HEADER}\nSetValue,,,x,,flag,\nRound,amount,,,,,\n"),
    );
    let err = load_pipeline(&config).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("build pipeline from"));
    assert!(message.contains("step 1 (Round) failed"));
}

#[test]
fn test_failed_run_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "config.csv",
        &format!("{HEADER}\nCalculateBusinessDays,\"start,end\",,XX,,days,\n"),
    );
    let input = write(dir.path(), "input.csv", "start,end\n2024-01-01,2024-01-05\n");

    let pipeline = load_pipeline(&config).unwrap();
    let table = load_input(&input, None).unwrap();
    let calendars = calendar_cache(None).unwrap();
    let err = transform(&pipeline, table, &calendars, &EngineOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("XX"));
}

#[test]
fn test_missing_calendar_directory() {
    let err = calendar_cache(Some(Path::new("/nonexistent/calendars"))).unwrap_err();
    assert!(format!("{err:#}").contains("open calendar directory"));
}

#[test]
fn test_render_pretty_and_compact() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "input.json", r#"{"a": {"b": 1}}"#);
    let table = load_input(&input, None).unwrap();
    let records = table.records();
    assert_eq!(render_records(&records, false).unwrap(), r#"[{"a.b":1}]"#);
    assert_eq!(
        render_records(&records, true).unwrap(),
        "[\n  {\n    \"a.b\": 1\n  }\n]"
    );
}

#[test]
fn test_operation_catalog() {
    insta::assert_json_snapshot!(operation_catalog(), @r#"
    [
      {
        "name": "SetValue",
        "description": "Assign a constant, optionally typed"
      },
      {
        "name": "CopyField",
        "description": "Copy one field into another"
      },
      {
        "name": "Round",
        "description": "Round a numeric field, halves to even"
      },
      {
        "name": "MapValues",
        "description": "Map values through a lookup, keeping unmapped values"
      },
      {
        "name": "MapValuesDefaultNull",
        "description": "Map values through a lookup, nulling unmapped values"
      },
      {
        "name": "ConvertDateFormat",
        "description": "Parse a date with one format and render it with another"
      },
      {
        "name": "Concatenate",
        "description": "Join fields and literal text"
      },
      {
        "name": "Formula",
        "description": "Evaluate an expression per row"
      },
      {
        "name": "FormulaArray",
        "description": "Evaluate an expression over all data, per row on failure"
      },
      {
        "name": "SetNthDayOfNextMonth",
        "description": "Date of the n-th weekday of the following month"
      },
      {
        "name": "SetNextBusinessDay",
        "description": "First business day after a date"
      },
      {
        "name": "CalculateBusinessDays",
        "description": "Business days between two dates"
      }
    ]
    "#);
}
