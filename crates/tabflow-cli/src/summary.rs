//! Terminal tables for run reports, configured steps and the catalog.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::Serialize;
use tabflow_transform::{OperationKind, Pipeline, RunReport};

/// One catalog entry, as listed by `tabflow operations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn operation_catalog() -> Vec<OperationInfo> {
    OperationKind::ALL
        .iter()
        .map(|kind| OperationInfo {
            name: kind.name(),
            description: kind.description(),
        })
        .collect()
}

pub fn report_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Function"),
        header_cell("Dataset"),
        header_cell("Target"),
        header_cell("Rows"),
        header_cell("Rows after"),
        header_cell("ms"),
    ]);
    apply_summary_style(&mut table);
    for index in [0, 4, 5, 6] {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for step in &report.steps {
        table.add_row(vec![
            Cell::new(step.index),
            Cell::new(&step.function)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            dataset_cell(step.dataset.as_deref()),
            Cell::new(&step.target),
            Cell::new(step.rows_affected),
            Cell::new(step.rows_after),
            dim_cell(step.duration.as_millis()),
        ]);
    }
    table.add_row(vec![
        dim_cell("-"),
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(report.rows_in).add_attribute(Attribute::Bold),
        Cell::new(report.rows_out).add_attribute(Attribute::Bold),
        Cell::new(report.total_duration().as_millis()).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn steps_table(pipeline: &Pipeline) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Function"),
        header_cell("Dataset"),
        header_cell("Target"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for step in pipeline.steps() {
        table.add_row(vec![
            Cell::new(step.index),
            Cell::new(step.operation.kind().name()),
            dataset_cell(step.operation.scope().dataset()),
            Cell::new(step.operation.target()),
        ]);
    }
    table
}

pub fn operations_table() -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Operation"), header_cell("Description")]);
    apply_table_style(&mut table);
    for info in operation_catalog() {
        table.add_row(vec![info.name, info.description]);
    }
    table
}

pub fn print_report(report: &RunReport) {
    eprintln!("{}", report_table(report));
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dataset_cell(dataset: Option<&str>) -> Cell {
    match dataset {
        Some(name) => Cell::new(name),
        None => dim_cell("*"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
