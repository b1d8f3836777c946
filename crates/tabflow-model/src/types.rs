//! Declared semantic types and cadence tags used by configuration rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a configuration tag cannot be recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind} `{value}`")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}

/// Semantic type an operation expects an input field to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Int,
    Float,
    Str,
    Date,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::Date => "date",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "i64" | "long" => Ok(TypeTag::Int),
            "float" | "double" | "f64" | "number" | "numeric" | "decimal" => Ok(TypeTag::Float),
            "str" | "string" | "text" | "object" => Ok(TypeTag::Str),
            "date" | "datetime" => Ok(TypeTag::Date),
            _ => Err(ParseTagError {
                kind: "type tag",
                value: s.to_string(),
            }),
        }
    }
}

/// Cadence of a date-generating step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// `MTH`
    Monthly,
    /// `DAIL`
    Daily,
}

impl Frequency {
    /// The configuration code for this frequency.
    pub fn code(self) -> &'static str {
        match self {
            Frequency::Monthly => "MTH",
            Frequency::Daily => "DAIL",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MTH" | "MONTHLY" | "M" => Ok(Frequency::Monthly),
            "DAIL" | "DAILY" | "D" => Ok(Frequency::Daily),
            _ => Err(ParseTagError {
                kind: "frequency",
                value: s.to_string(),
            }),
        }
    }
}
