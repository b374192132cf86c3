//! Input normalization.
//!
//! Turns whatever the front end collected into a single [`InputRecord`]
//! shaped like the model's training columns. Normalization never fails:
//! missing or unparseable values fall back to a neutral default.

use crate::artifact::{Bundle, ModelArtifact};
use crate::record::{InputRecord, RawInputs, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Fill value for numeric and untyped columns.
pub const NUMERIC_DEFAULT: f64 = 0.0;

/// Column typing used while building a record.
#[derive(Debug, Clone, Default)]
pub struct ColumnSchema<'a> {
    pub columns: Option<&'a [String]>,
    pub numeric: Option<&'a BTreeSet<String>>,
    pub categorical: Option<&'a BTreeSet<String>>,
}

impl<'a> ColumnSchema<'a> {
    /// Schema of a loaded artifact.
    pub fn of(artifact: &'a ModelArtifact) -> Self {
        match artifact {
            ModelArtifact::Bundle(bundle) => Self::from_bundle(bundle),
            ModelArtifact::Bare(pipeline) => Self {
                columns: pipeline.expected_columns(),
                ..Self::default()
            },
        }
    }

    pub fn from_bundle(bundle: &'a Bundle) -> Self {
        Self {
            columns: Some(&bundle.feature_columns),
            numeric: Some(&bundle.numeric_features),
            categorical: Some(&bundle.categorical_features),
        }
    }

    fn is_numeric(&self, column: &str) -> bool {
        self.numeric.is_some_and(|set| set.contains(column))
    }

    fn is_categorical(&self, column: &str) -> bool {
        self.categorical.is_some_and(|set| set.contains(column))
    }
}

/// Normalize raw inputs against an artifact's schema.
pub fn normalize_for(artifact: &ModelArtifact, raw: &RawInputs) -> InputRecord {
    normalize(raw, &ColumnSchema::of(artifact))
}

/// Build the model-shaped record.
///
/// With known columns, the output holds exactly those columns in that order;
/// inputs the model does not expect are dropped. Without them the raw inputs
/// pass through in entry order.
pub fn normalize(raw: &RawInputs, schema: &ColumnSchema<'_>) -> InputRecord {
    let Some(columns) = schema.columns else {
        debug!(fields = raw.len(), "No expected columns; passing inputs through");
        return InputRecord::from_pairs(
            raw.names()
                .into_iter()
                .filter_map(|name| raw.get(name).map(|v| (name, v.clone()))),
        );
    };

    for name in raw.names() {
        if !columns.iter().any(|c| c == name) {
            warn!(field = name, "Ignoring input the model does not expect");
        }
    }

    InputRecord::from_pairs(columns.iter().map(|column| {
        let value = if schema.is_numeric(column) {
            Value::Number(coerce_numeric(column, raw.get(column)))
        } else if schema.is_categorical(column) {
            Value::Text(raw.get(column).map(Value::as_text).unwrap_or_default())
        } else {
            raw.get(column)
                .cloned()
                .unwrap_or(Value::Number(NUMERIC_DEFAULT))
        };
        (column.as_str(), value)
    }))
}

/// Number for a numeric field: absent or blank is 0, unparseable text is 0
/// with a warning.
pub fn coerce_numeric(column: &str, value: Option<&Value>) -> f64 {
    match value {
        None => NUMERIC_DEFAULT,
        Some(v) if v.is_blank() => NUMERIC_DEFAULT,
        Some(v) => match v.as_f64() {
            Some(n) if n.is_finite() => n,
            _ => {
                warn!(field = column, value = %v, "Could not read number; using default");
                NUMERIC_DEFAULT
            }
        },
    }
}
