//! Single-row input records.
//!
//! A record is assembled once per request by the normalizer, handed to the
//! pipeline, and dropped with the response.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar cell: user-entered number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the cell. Text is trimmed and parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Textual view of the cell, as a categorical encoder sees it.
    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// True for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Raw field values as a front end collected them, in entry order.
///
/// Later entries for the same field shadow earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInputs {
    entries: Vec<(String, Value)>,
}

impl RawInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Most recent value entered for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Distinct field names in first-entry order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.entries.len());
        for (key, _) in &self.entries {
            if !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
        names
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawInputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut inputs = RawInputs::new();
        for (k, v) in iter {
            inputs.insert(k, v);
        }
        inputs
    }
}

/// Exactly one row of named cells, in model column order when known.
///
/// No mutating methods: a record is frozen once built.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InputRecord {
    /// Build a record from `(column, value)` pairs. A repeated column keeps
    /// its first position and its last value.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        for (name, value) in pairs {
            let name = name.into();
            match columns.iter().position(|c| *c == name) {
                Some(idx) => values[idx] = value,
                None => {
                    columns.push(name);
                    values.push(value);
                }
            }
        }
        Self { columns, values }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Iterate `(column, value)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
