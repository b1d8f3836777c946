//! Argument access and list splitting shared by the operation builders.

use std::str::FromStr;

use tabflow_model::{OperationSpec, keys};

use crate::error::TransformError;
use crate::table::Scope;

/// Typed view over an [`OperationSpec`]'s string arguments. Every error it
/// produces is a [`TransformError::Configuration`] naming the operation.
pub(crate) struct Args<'a> {
    spec: &'a OperationSpec,
    operation: &'static str,
}

impl<'a> Args<'a> {
    pub fn new(spec: &'a OperationSpec, operation: &'static str) -> Self {
        Self { spec, operation }
    }

    pub fn error(&self, message: impl Into<String>) -> TransformError {
        TransformError::config(self.operation, message)
    }

    /// Trimmed argument, blank meaning absent.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.spec.arg(key)
    }

    /// Untrimmed argument, blank meaning absent.
    pub fn raw(&self, key: &str) -> Option<&'a str> {
        self.spec.raw_arg(key)
    }

    pub fn require(&self, key: &str, what: &str) -> Result<&'a str, TransformError> {
        self.get(key)
            .ok_or_else(|| self.error(format!("missing {what} ({key})")))
    }

    pub fn scope(&self) -> Scope {
        Scope::from_dataset(self.get(keys::DATASET))
    }

    pub fn target(&self) -> Result<String, TransformError> {
        self.require(keys::NEW_FIELD, "target field").map(str::to_string)
    }

    /// Target field, defaulting to `fallback` when not given.
    pub fn target_or(&self, fallback: &str) -> String {
        self.get(keys::NEW_FIELD).unwrap_or(fallback).to_string()
    }

    /// Parse an optional argument, reporting parse failures.
    pub fn parse<T>(&self, key: &str, what: &str) -> Result<Option<T>, TransformError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|text| {
                text.parse::<T>()
                    .map_err(|err| self.error(format!("invalid {what} `{text}`: {err}")))
            })
            .transpose()
    }
}

/// Split a field list on `,` or `;`, trimming entries and dropping blanks.
pub(crate) fn split_fields(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a value list on `separator`, trimming entries. Blank entries are
/// kept so positions line up between paired lists; a blank input is an
/// empty list.
pub(crate) fn split_values(raw: Option<&str>, separator: &str) -> Vec<String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw
            .split(separator)
            .map(|part| part.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// One piece of a concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcatToken {
    /// Quoted text, always used as-is.
    Literal(String),
    /// Bare text: a field reference. A missing field reads as empty text.
    Field(String),
}

/// Split concatenation tokens on `;`, honoring `'...'` and `"..."` quotes.
/// A doubled quote inside a quoted token stands for the quote itself.
pub(crate) fn split_concat_tokens(raw: &str) -> Vec<ConcatToken> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Some(open) if ch == open => {
                if chars.next_if_eq(&open).is_some() {
                    current.push(ch);
                    current.push(ch);
                } else {
                    quote = None;
                    current.push(ch);
                }
            }
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == ';' => tokens.push(std::mem::take(&mut current)),
            None => current.push(ch),
        }
    }
    tokens.push(current);

    tokens
        .into_iter()
        .filter_map(|token| classify_token(&token))
        .collect()
}

fn classify_token(token: &str) -> Option<ConcatToken> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    for quote in ['\'', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            let inner = &trimmed[1..trimmed.len() - 1];
            let doubled: String = [quote, quote].iter().collect();
            return Some(ConcatToken::Literal(
                inner.replace(&doubled, &quote.to_string()),
            ));
        }
    }
    Some(ConcatToken::Field(trimmed.to_string()))
}
