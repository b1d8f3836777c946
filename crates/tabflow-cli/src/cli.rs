//! CLI argument definitions for `tabflow`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tabflow_ingest::InputFormat;
use tabflow_transform::DEFAULT_DATASET_COLUMN;

#[derive(Parser)]
#[command(
    name = "tabflow",
    version,
    about = "Apply configuration-driven transformations to tabular data",
    long_about = "Apply an ordered table of operations to a CSV or JSON input.\n\n\
                  Each configuration row names one operation, its arguments and\n\
                  optionally the dataset it is restricted to. The transformed\n\
                  table is written as JSON records."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow cell values in trace-level logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a configuration against an input file.
    Run(RunArgs),

    /// Build the pipeline from a configuration without running it.
    Check(CheckArgs),

    /// List the supported operations.
    Operations(OperationsArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Configuration CSV, one operation per row.
    #[arg(long = "config", short = 'c', value_name = "CONFIG")]
    pub config: PathBuf,

    /// Input table (.csv or .json).
    #[arg(long = "input", short = 'i', value_name = "INPUT")]
    pub input: PathBuf,

    /// Input format (default: from the file extension).
    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<InputFormatArg>,

    /// Directory holding holiday calendars as <KEY>.csv or <KEY>.txt.
    #[arg(long = "calendars", value_name = "DIR")]
    pub calendars: Option<PathBuf>,

    /// Write JSON records here instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Column that holds each row's dataset name.
    #[arg(long = "dataset-column", value_name = "NAME", default_value = DEFAULT_DATASET_COLUMN)]
    pub dataset_column: String,

    /// Date format tried when reading text as a date (repeatable, replaces the defaults).
    #[arg(long = "date-format", value_name = "FORMAT")]
    pub date_formats: Vec<String>,

    /// Pretty-print the JSON output.
    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Skip the per-step report on stderr.
    #[arg(long = "no-report")]
    pub no_report: bool,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Configuration CSV to validate.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(Parser)]
pub struct OperationsArgs {
    /// Print the catalog as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InputFormatArg {
    Csv,
    Json,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Csv => InputFormat::Csv,
            InputFormatArg::Json => InputFormat::Json,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
