//! Run stages for the `tabflow` binary.
//!
//! 1. **Configure**: read the configuration table and build the pipeline
//! 2. **Ingest**: load the input table and open the calendar directory
//! 3. **Transform**: run the pipeline
//! 4. **Output**: write the final table as JSON records

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tabflow_ingest::{CalendarDirectory, InputFormat, read_config, read_table};
use tabflow_model::Record;
use tabflow_transform::{CalendarCache, EngineOptions, Pipeline, RunContext, RunReport, Table};
use tracing::{debug, error, info, info_span, trace};

use crate::logging::redact_value;

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: PathBuf,
    pub input: PathBuf,
    pub input_format: Option<InputFormat>,
    pub calendars: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub options: EngineOptions,
    pub pretty: bool,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunOutcome {
    pub table: Table,
    pub report: RunReport,
}

/// Read a configuration file and build its pipeline.
pub fn load_pipeline(config: &Path) -> Result<Pipeline> {
    let span = info_span!("configure", config = %config.display());
    let _guard = span.enter();
    let start = Instant::now();

    let rows = read_config(config).with_context(|| format!("read configuration {}", config.display()))?;
    let pipeline = Pipeline::from_config(&rows)
        .with_context(|| format!("build pipeline from {}", config.display()))?;

    info!(
        steps = pipeline.len(),
        duration_ms = start.elapsed().as_millis(),
        "pipeline configured"
    );
    Ok(pipeline)
}

/// Load the input table.
pub fn load_input(input: &Path, format: Option<InputFormat>) -> Result<Table> {
    let span = info_span!("ingest", input = %input.display());
    let _guard = span.enter();
    let start = Instant::now();

    let table = read_table(input, format).with_context(|| format!("read input {}", input.display()))?;

    info!(
        rows = table.height(),
        columns = table.width(),
        duration_ms = start.elapsed().as_millis(),
        "input loaded"
    );
    Ok(table)
}

/// Calendar cache over a directory, or weekends-only calendars when none is given.
pub fn calendar_cache(dir: Option<&Path>) -> Result<CalendarCache> {
    match dir {
        Some(dir) => {
            let provider = CalendarDirectory::open(dir)
                .with_context(|| format!("open calendar directory {}", dir.display()))?;
            debug!(calendars = %dir.display(), "calendar directory opened");
            Ok(CalendarCache::new(provider))
        }
        None => Ok(CalendarCache::default()),
    }
}

/// Run the pipeline over `table`.
pub fn transform(
    pipeline: &Pipeline,
    table: Table,
    calendars: &CalendarCache,
    options: &EngineOptions,
) -> Result<RunOutcome> {
    let span = info_span!("transform", steps = pipeline.len());
    let _guard = span.enter();

    let ctx = RunContext::new(calendars, options);
    match pipeline.run_with_report(table, &ctx) {
        Ok((table, report)) => {
            info!(
                rows_in = report.rows_in,
                rows_out = report.rows_out,
                duration_ms = report.total_duration().as_millis(),
                "run complete"
            );
            Ok(RunOutcome { table, report })
        }
        Err(err) => {
            if let Some(partial) = &err.table {
                error!(rows = partial.height(), "run aborted; output discarded");
            }
            Err(err.into())
        }
    }
}

/// Serialize records as a JSON array.
pub fn render_records(records: &[Record], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(records)
    } else {
        serde_json::to_string(records)
    };
    json.context("serialize records")
}

/// Write records to `output`, or stdout when `None`.
pub fn write_records(records: &[Record], output: Option<&Path>, pretty: bool) -> Result<()> {
    let span = info_span!("output", records = records.len());
    let _guard = span.enter();

    for (row, record) in records.iter().enumerate().take(5) {
        if let Ok(text) = serde_json::to_string(record) {
            trace!(row, record = redact_value(&text), "output record");
        }
    }

    let body = render_records(records, pretty)?;
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{body}").with_context(|| format!("write {}", path.display()))?;
            writer.flush().with_context(|| format!("flush {}", path.display()))?;
            info!(path = %path.display(), "records written");
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            writeln!(lock, "{body}").context("write records to stdout")?;
        }
    }
    Ok(())
}

/// Configure, ingest, transform and write in one go.
pub fn run(settings: &RunSettings) -> Result<RunOutcome> {
    let pipeline = load_pipeline(&settings.config)?;
    let calendars = calendar_cache(settings.calendars.as_deref())?;
    let table = load_input(&settings.input, settings.input_format)?;
    let outcome = transform(&pipeline, table, &calendars, &settings.options)?;
    write_records(
        &outcome.table.records(),
        settings.output.as_deref(),
        settings.pretty,
    )?;
    Ok(outcome)
}
