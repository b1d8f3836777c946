//! Operation specifications and the configuration rows they are built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Argument keys recognized in [`OperationSpec::args`].
///
/// These are the column names of the configuration table.
pub mod keys {
    pub const TRANSFORM_FUNCTION: &str = "TransformFunction";
    pub const INPUTS: &str = "TransformInputs";
    pub const FROM_VALUE_OR_TYPES: &str = "TransformFromValueOrFormulaInputTypes";
    pub const TO_VALUE_OR_FORMULA: &str = "TransformToValueOrFormula";
    pub const DATASET: &str = "DataSetName";
    pub const NEW_FIELD: &str = "NewFieldName";
    pub const COMPARATOR: &str = "TransformComparator";
}

/// A single named operation with its string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub function_name: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl OperationSpec {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            args: BTreeMap::new(),
        }
    }

    /// Add an argument (builder style).
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Returns the argument trimmed, treating blank values as absent.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Returns the argument untrimmed (blank values still count as absent).
    pub fn raw_arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// One row of the configuration table.
///
/// Headers follow the configuration column names (`TransformFunction`,
/// `DataSetName`, ...). Missing columns deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConfigRow {
    pub transform_function: String,
    pub transform_inputs: String,
    pub transform_from_value_or_formula_input_types: String,
    pub transform_to_value_or_formula: String,
    pub data_set_name: String,
    pub new_field_name: String,
    pub transform_comparator: String,
}

impl ConfigRow {
    /// Convert to an [`OperationSpec`], dropping blank cells.
    pub fn to_spec(&self) -> OperationSpec {
        let mut spec = OperationSpec::new(self.transform_function.trim());
        let fields = [
            (keys::INPUTS, &self.transform_inputs),
            (
                keys::FROM_VALUE_OR_TYPES,
                &self.transform_from_value_or_formula_input_types,
            ),
            (keys::TO_VALUE_OR_FORMULA, &self.transform_to_value_or_formula),
            (keys::DATASET, &self.data_set_name),
            (keys::NEW_FIELD, &self.new_field_name),
            (keys::COMPARATOR, &self.transform_comparator),
        ];
        for (key, value) in fields {
            if !value.trim().is_empty() {
                spec.args.insert(key.to_string(), value.clone());
            }
        }
        spec
    }
}
