use anyhow::{Context, Result};
use tabflow_transform::EngineOptions;

use tabflow_cli::pipeline::{RunOutcome, RunSettings, load_pipeline, run};
use tabflow_cli::summary::{operation_catalog, operations_table, print_report, steps_table};

use crate::cli::{CheckArgs, OperationsArgs, RunArgs};

pub fn run_pipeline(args: &RunArgs) -> Result<RunOutcome> {
    let mut options = EngineOptions::new().with_dataset_column(args.dataset_column.clone());
    if !args.date_formats.is_empty() {
        options = options.with_date_formats(args.date_formats.iter().cloned());
    }
    let settings = RunSettings {
        config: args.config.clone(),
        input: args.input.clone(),
        input_format: args.input_format.map(Into::into),
        calendars: args.calendars.clone(),
        output: args.output.clone(),
        options,
        pretty: args.pretty,
    };
    let outcome = run(&settings)?;
    if !args.no_report {
        print_report(&outcome.report);
    }
    Ok(outcome)
}

pub fn run_check(args: &CheckArgs) -> Result<()> {
    let pipeline = load_pipeline(&args.config)?;
    println!("{}", steps_table(&pipeline));
    println!(
        "{}: {} step(s) OK",
        args.config.display(),
        pipeline.len()
    );
    Ok(())
}

pub fn run_operations(args: &OperationsArgs) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(&operation_catalog()).context("serialize catalog")?;
        println!("{json}");
    } else {
        println!("{}", operations_table());
    }
    Ok(())
}
