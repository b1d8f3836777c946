//! The working table and dataset scoping.
//!
//! A [`Table`] holds every cell as a [`Value`], so a write never changes the
//! cells it does not touch. Polars frames are only built at the boundary
//! ([`Table::new`] and [`Table::to_frame`]), where each column is unified to
//! one dtype (see [`tabflow_common::values_to_column`]).

use std::fmt;

use polars::prelude::*;
use tabflow_common::{column_values, unify_kind, values_to_column};
use tabflow_model::{Record, Value};

/// Which rows a step touches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Every row.
    #[default]
    All,
    /// Only rows whose dataset column equals this name.
    Dataset(String),
}

impl Scope {
    /// Build a scope from a `DataSetName` cell. Absent, blank and `*` mean
    /// every row.
    pub fn from_dataset(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("" | "*") => Self::All,
            Some(name) => Self::Dataset(name.to_string()),
        }
    }

    pub fn dataset(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Dataset(name) => Some(name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Dataset(name) => f.write_str(name),
        }
    }
}

/// One named column. `dtype` is what the column materializes as when every
/// cell is null.
#[derive(Debug, Clone)]
struct TableColumn {
    name: String,
    dtype: DataType,
    values: Vec<Value>,
}

impl TableColumn {
    fn new(name: String, values: Vec<Value>, fallback: Option<&DataType>) -> Self {
        let dtype = unify_kind(&values)
            .dtype()
            .or_else(|| fallback.cloned())
            .unwrap_or(DataType::String);
        Self {
            name,
            dtype,
            values,
        }
    }
}

/// Tabular data the pipeline transforms.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<TableColumn>,
    height: usize,
}

impl From<DataFrame> for Table {
    fn from(frame: DataFrame) -> Self {
        Self::new(frame)
    }
}

impl Table {
    /// Read every cell of a frame.
    pub fn new(frame: DataFrame) -> Self {
        let columns = frame
            .get_columns()
            .iter()
            .map(|column| TableColumn {
                name: column.name().to_string(),
                dtype: column.dtype().clone(),
                values: column_values(column),
            })
            .collect();
        Self {
            columns,
            height: frame.height(),
        }
    }

    /// Build a table from records. Columns appear in first-seen order and a
    /// key missing from a record reads as null.
    pub fn from_records(records: &[Record]) -> PolarsResult<Self> {
        let mut names: Vec<String> = Vec::new();
        for record in records {
            for name in record.names() {
                if !names.iter().any(|known| known == name) {
                    names.push(name.to_string());
                }
            }
        }
        let columns = names
            .into_iter()
            .map(|name| {
                let values = records
                    .iter()
                    .map(|record| record.get(&name).cloned().unwrap_or_default())
                    .collect();
                (name, values)
            })
            .collect();
        let mut table = Self::from_columns(columns)?;
        table.height = records.len();
        Ok(table)
    }

    /// Build a table from named value columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> PolarsResult<Self> {
        let mut table = Self::default();
        table.replace_rows(columns)?;
        Ok(table)
    }

    /// Materialize the table as a Polars frame. A column holding a mix of
    /// kinds becomes a String column.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|column| values_to_column(&column.name, &column.values, Some(&column.dtype)))
            .collect::<PolarsResult<Vec<_>>>()?;
        DataFrame::new(columns)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Dtype the column materializes as, if it exists.
    pub fn dtype(&self, name: &str) -> Option<DataType> {
        let column = self.column(name)?;
        Some(unify_kind(&column.values).dtype().unwrap_or_else(|| column.dtype.clone()))
    }

    /// All cells of a column, or `None` if the column does not exist.
    pub fn values(&self, name: &str) -> Option<Vec<Value>> {
        self.column(name).map(|column| column.values.clone())
    }

    /// All cells of a column; a missing column reads as all nulls.
    pub fn values_or_null(&self, name: &str) -> Vec<Value> {
        self.values(name)
            .unwrap_or_else(|| vec![Value::Null; self.height()])
    }

    /// A single cell. Missing columns and out-of-range rows read as null.
    pub fn value(&self, row: usize, name: &str) -> Value {
        self.column(name)
            .and_then(|column| column.values.get(row))
            .cloned()
            .unwrap_or_default()
    }

    /// Replace (or append) a column. Cells are stored exactly as given; when
    /// every value is null the existing dtype is kept.
    pub fn set_column(&mut self, name: &str, values: &[Value]) -> PolarsResult<()> {
        if !self.columns.is_empty() && values.len() != self.height {
            return Err(shape_mismatch(name, values.len(), self.height));
        }
        let fallback = self.column(name).map(|column| column.dtype.clone());
        let column = TableColumn::new(name.to_string(), values.to_vec(), fallback.as_ref());
        match self.columns.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self.height = values.len();
        Ok(())
    }

    /// Rebuild the table from value columns, possibly with a different row
    /// count. All-null columns keep their current dtype.
    pub fn replace_rows(&mut self, columns: Vec<(String, Vec<Value>)>) -> PolarsResult<()> {
        let height = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((name, values)) = columns.iter().find(|(_, values)| values.len() != height) {
            return Err(shape_mismatch(name, values.len(), height));
        }
        let columns = columns
            .into_iter()
            .map(|(name, values)| {
                let fallback = self.column(&name).map(|column| column.dtype.clone());
                TableColumn::new(name, values, fallback.as_ref())
            })
            .collect();
        self.columns = columns;
        self.height = height;
        Ok(())
    }

    /// Every column as values, in table order.
    pub fn to_columns(&self) -> Vec<(String, Vec<Value>)> {
        self.columns
            .iter()
            .map(|column| (column.name.clone(), column.values.clone()))
            .collect()
    }

    /// Row mask for a scope. A dataset scope over a table without the
    /// dataset column selects nothing.
    pub fn scope_mask(&self, scope: &Scope, dataset_column: &str) -> Vec<bool> {
        match scope {
            Scope::All => vec![true; self.height()],
            Scope::Dataset(name) => match self.column(dataset_column) {
                Some(column) => column
                    .values
                    .iter()
                    .map(|tag| tag.to_text().is_some_and(|text| text.trim() == name))
                    .collect(),
                None => vec![false; self.height()],
            },
        }
    }

    /// Materialize the table as records. Every record has every column, in
    /// table order.
    pub fn records(&self) -> Vec<Record> {
        (0..self.height())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| (column.name.clone(), column.values[row].clone()))
                    .collect()
            })
            .collect()
    }

    fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|column| column.name == name)
    }
}

fn shape_mismatch(name: &str, len: usize, height: usize) -> PolarsError {
    PolarsError::ShapeMismatch(
        format!("column `{name}` has {len} values but the table has {height} rows").into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, Value)]) -> Record {
        fields
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn scope_from_dataset_cell() {
        assert_eq!(Scope::from_dataset(None), Scope::All);
        assert_eq!(Scope::from_dataset(Some(" * ")), Scope::All);
        assert_eq!(Scope::from_dataset(Some("  ")), Scope::All);
        assert_eq!(
            Scope::from_dataset(Some("orders")),
            Scope::Dataset("orders".to_string())
        );
    }

    #[test]
    fn from_records_fills_missing_keys_with_null() {
        let table = Table::from_records(&[
            record(&[("a", Value::Int(1))]),
            record(&[("b", Value::from("x"))]),
        ])
        .unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        let records = table.records();
        assert_eq!(records[0].get("b"), Some(&Value::Null));
        assert_eq!(records[1].get("a"), Some(&Value::Null));
    }

    #[test]
    fn scope_mask_matches_dataset_tag() {
        let table = Table::from_columns(vec![(
            "DataSetName".to_string(),
            vec![Value::from("X"), Value::from("Y"), Value::Null],
        )])
        .unwrap();
        let mask = table.scope_mask(&Scope::Dataset("X".to_string()), "DataSetName");
        assert_eq!(mask, vec![true, false, false]);
        assert_eq!(
            table.scope_mask(&Scope::Dataset("X".to_string()), "Other"),
            vec![false; 3]
        );
        assert_eq!(table.scope_mask(&Scope::All, "DataSetName"), vec![true; 3]);
    }

    #[test]
    fn set_column_keeps_dtype_for_all_null_writes() {
        let mut table =
            Table::from_columns(vec![("n".to_string(), vec![Value::Int(1), Value::Int(2)])])
                .unwrap();
        table.set_column("n", &[Value::Null, Value::Null]).unwrap();
        assert_eq!(table.dtype("n"), Some(DataType::Int64));
        assert_eq!(table.value(0, "n"), Value::Null);
        assert_eq!(table.value(0, "missing"), Value::Null);
    }

    #[test]
    fn set_column_stores_cells_exactly() {
        let big = 9_007_199_254_740_993;
        let mut table =
            Table::from_columns(vec![("n".to_string(), vec![Value::Int(3), Value::Int(big)])])
                .unwrap();
        table
            .set_column("n", &[Value::Float(1.5), Value::Int(big)])
            .unwrap();
        assert_eq!(table.value(1, "n"), Value::Int(big));
        assert_eq!(table.dtype("n"), Some(DataType::Float64));

        table.set_column("n", &[Value::from("n/a"), Value::Int(big)]).unwrap();
        assert_eq!(table.values("n").unwrap(), vec![Value::from("n/a"), Value::Int(big)]);

        let frame = table.to_frame().unwrap();
        assert_eq!(frame.column("n").unwrap().dtype(), &DataType::String);
        assert_eq!(Table::new(frame).value(1, "n"), Value::from("9007199254740993"));
    }

    #[test]
    fn set_column_rejects_wrong_length() {
        let mut table =
            Table::from_columns(vec![("n".to_string(), vec![Value::Int(1), Value::Int(2)])])
                .unwrap();
        assert!(table.set_column("m", &[Value::Null]).is_err());
        assert!(
            Table::from_columns(vec![
                ("a".to_string(), vec![Value::Int(1)]),
                ("b".to_string(), vec![]),
            ])
            .is_err()
        );
        assert_eq!(table.width(), 1);
    }
}
