//! Nested JSON input.
//!
//! Nested objects flatten into dotted column names (`order.id`), and every
//! array expands into one row per element. Sibling arrays combine as a
//! cartesian product, so
//!
//! ```text
//! {"id": 1, "tags": ["a", "b"], "sizes": [10, 20]}
//! ```
//!
//! yields four rows. An empty array contributes a single null cell rather
//! than dropping its parent.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};
use tabflow_model::{Record, Value};
use tabflow_transform::Table;

use crate::error::{IngestError, Result};

/// Separator between parent and child keys.
pub const KEY_SEPARATOR: char = '.';

type FlatRow = Vec<(String, Value)>;

/// Flatten a JSON document into uniform-ish records.
///
/// Records may lack keys that other records carry; [`Table::from_records`]
/// fills those with nulls.
pub fn flatten_json(value: &JsonValue) -> Vec<Record> {
    flatten(value, "")
        .into_iter()
        .map(|row| row.into_iter().collect())
        .collect()
}

fn flatten(value: &JsonValue, prefix: &str) -> Vec<FlatRow> {
    match value {
        JsonValue::Object(map) => flatten_object(map, prefix),
        JsonValue::Array(items) if items.is_empty() => {
            if prefix.is_empty() {
                Vec::new()
            } else {
                vec![vec![(prefix.to_string(), Value::Null)]]
            }
        }
        JsonValue::Array(items) => items.iter().flat_map(|item| flatten(item, prefix)).collect(),
        scalar => {
            let key = if prefix.is_empty() { "value" } else { prefix };
            vec![vec![(key.to_string(), scalar_value(scalar))]]
        }
    }
}

fn flatten_object(map: &Map<String, JsonValue>, prefix: &str) -> Vec<FlatRow> {
    let mut rows: Vec<FlatRow> = vec![Vec::new()];
    for (key, child) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{KEY_SEPARATOR}{key}")
        };
        let child_rows = flatten(child, &name);
        if child_rows.is_empty() {
            continue;
        }
        let mut merged = Vec::with_capacity(rows.len() * child_rows.len());
        for row in &rows {
            for child_row in &child_rows {
                let mut combined = row.clone();
                for (field, value) in child_row {
                    upsert(&mut combined, field, value.clone());
                }
                merged.push(combined);
            }
        }
        rows = merged;
    }
    rows
}

fn upsert(row: &mut FlatRow, field: &str, value: Value) {
    match row.iter_mut().find(|(name, _)| name == field) {
        Some(slot) => slot.1 = value,
        None => row.push((field.to_string(), value)),
    }
}

fn scalar_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        JsonValue::String(s) => Value::Str(s.clone()),
        _ => Value::Null,
    }
}

/// Parse JSON text into a [`Table`].
pub fn parse_table_json(text: &str, path: &Path) -> Result<Table> {
    let value: JsonValue = serde_json::from_str(text).map_err(|source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let records = flatten_json(&value);
    Ok(Table::from_records(&records)?)
}

/// Read a JSON file into a [`Table`].
pub fn read_table_json(path: &Path) -> Result<Table> {
    let text = fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
    parse_table_json(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sorted_names(record: &Record) -> Vec<&str> {
        let mut names: Vec<&str> = record.names().collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn test_nested_objects_use_dotted_keys() {
        let records = flatten_json(&json!({"id": 7, "customer": {"name": "Ada", "address": {"city": "Oslo"}}}));
        assert_eq!(records.len(), 1);
        assert_eq!(
            sorted_names(&records[0]),
            vec!["customer.address.city", "customer.name", "id"]
        );
        assert_eq!(records[0].get("customer.address.city"), Some(&Value::from("Oslo")));
    }

    #[test]
    fn test_arrays_expand_cartesian() {
        let records = flatten_json(&json!({"id": 1, "tags": ["a", "b"], "sizes": [10, 20]}));
        assert_eq!(records.len(), 4);
        let mut pairs: Vec<String> = records
            .iter()
            .map(|r| format!("{}{}", r.get("tags").unwrap(), r.get("sizes").unwrap()))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec!["a10", "a20", "b10", "b20"]);
        assert!(records.iter().all(|r| r.get("id") == Some(&Value::Int(1))));
    }

    #[test]
    fn test_array_of_objects() {
        let records = flatten_json(&json!({
            "order": 5,
            "lines": [{"sku": "x", "qty": 2}, {"sku": "y", "qty": 1.5}]
        }));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("lines.sku"), Some(&Value::from("y")));
        assert_eq!(records[1].get("lines.qty"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_top_level_array_and_empty_arrays() {
        let records = flatten_json(&json!([{"a": 1, "b": []}, {"a": 2, "b": [true]}]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("b"), Some(&Value::Null));
        assert_eq!(records[1].get("b"), Some(&Value::Bool(true)));
        assert!(flatten_json(&json!([])).is_empty());
    }

    #[test]
    fn test_parse_table_fills_missing_keys() {
        let table = parse_table_json(
            r#"[{"a": 1}, {"a": 2, "b": "x"}]"#,
            Path::new("inline.json"),
        )
        .unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.value(0, "b"), Value::Null);
        assert_eq!(table.value(1, "b"), Value::from("x"));
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_table_json("{not json", Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, IngestError::Json { .. }));
    }
}
