//! Column-wise preprocessing applied before the estimator.
//!
//! A [`ColumnTransformer`] routes named record columns through declared
//! sub-transformers and concatenates their outputs in declaration order.

use crate::error::PredictionError;
use crate::record::{InputRecord, Value};
use serde::{Deserialize, Serialize};

/// Capability: report the ordered output names for a set of input columns.
///
/// Returns `None` when the output cannot be named.
pub trait FeatureNames {
    fn output_names(&self, input_columns: &[String]) -> Option<Vec<String>>;
}

/// What to do with an unseen category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

/// Sub-transformer variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformer {
    /// Forward values untouched.
    Passthrough,
    /// `(x - mean) / scale` per column.
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },
    /// One indicator column per known category.
    OneHotEncoder {
        categories: Vec<Vec<String>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    /// Contributes neither values nor names.
    Drop,
}

impl FeatureNames for Transformer {
    fn output_names(&self, input_columns: &[String]) -> Option<Vec<String>> {
        match self {
            Transformer::Drop => Some(Vec::new()),
            Transformer::Passthrough | Transformer::StandardScaler { .. } => {
                Some(input_columns.to_vec())
            }
            Transformer::OneHotEncoder { categories, .. } => {
                if categories.len() != input_columns.len() {
                    return None;
                }
                Some(
                    input_columns
                        .iter()
                        .zip(categories)
                        .flat_map(|(column, cats)| {
                            cats.iter().map(move |cat| format!("{column}_{cat}"))
                        })
                        .collect(),
                )
            }
        }
    }
}

impl Transformer {
    pub fn is_drop(&self) -> bool {
        matches!(self, Transformer::Drop)
    }

    fn transform(
        &self,
        name: &str,
        columns: &[String],
        values: &[&Value],
        out: &mut Vec<f64>,
    ) -> Result<(), PredictionError> {
        match self {
            Transformer::Drop => {}
            Transformer::Passthrough => {
                for (column, value) in columns.iter().zip(values) {
                    out.push(numeric(column, value)?);
                }
            }
            Transformer::StandardScaler { mean, scale } => {
                if mean.len() != columns.len() || scale.len() != columns.len() {
                    return Err(PredictionError::InvalidTransformer {
                        transformer: name.to_string(),
                        reason: format!(
                            "scaler fitted on {} columns but applied to {}",
                            mean.len().min(scale.len()),
                            columns.len()
                        ),
                    });
                }
                for (i, (column, value)) in columns.iter().zip(values).enumerate() {
                    let x = numeric(column, value)?;
                    let s = if scale[i] == 0.0 { 1.0 } else { scale[i] };
                    out.push((x - mean[i]) / s);
                }
            }
            Transformer::OneHotEncoder {
                categories,
                handle_unknown,
            } => {
                if categories.len() != columns.len() {
                    return Err(PredictionError::InvalidTransformer {
                        transformer: name.to_string(),
                        reason: format!(
                            "encoder fitted on {} columns but applied to {}",
                            categories.len(),
                            columns.len()
                        ),
                    });
                }
                for ((column, value), cats) in columns.iter().zip(values).zip(categories) {
                    let text = value.as_text();
                    let hit = cats.iter().position(|c| *c == text);
                    if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                        return Err(PredictionError::UnseenCategory {
                            column: column.clone(),
                            value: text,
                        });
                    }
                    out.extend((0..cats.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
                }
            }
        }
        Ok(())
    }
}

/// Finite numeric view of a cell, or a type error naming the column.
pub(crate) fn numeric(column: &str, value: &Value) -> Result<f64, PredictionError> {
    value
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| PredictionError::TypeMismatch {
            column: column.to_string(),
            value: value.as_text(),
        })
}

/// One declared `(name, transformer, columns)` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerSpec {
    pub name: String,
    pub transformer: Transformer,
    pub columns: Vec<String>,
}

/// Treatment of columns no transformer claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remainder {
    #[default]
    Drop,
    Passthrough,
}

/// The preprocessing stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub transformers: Vec<TransformerSpec>,
    #[serde(default)]
    pub remainder: Remainder,
    /// Columns seen at fit time, when exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
}

impl ColumnTransformer {
    fn is_claimed(&self, column: &str) -> bool {
        self.transformers
            .iter()
            .any(|spec| spec.columns.iter().any(|c| c == column))
    }

    fn remainder_columns<'a, I>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter(|c| !self.is_claimed(c))
            .map(str::to_string)
            .collect()
    }

    /// Transform one record into the estimator's feature vector.
    pub fn transform(&self, record: &InputRecord) -> Result<Vec<f64>, PredictionError> {
        let mut out = Vec::new();

        for spec in &self.transformers {
            if spec.transformer.is_drop() {
                continue;
            }
            let values = spec
                .columns
                .iter()
                .map(|c| {
                    record
                        .get(c)
                        .ok_or_else(|| PredictionError::MissingColumn(c.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            spec.transformer
                .transform(&spec.name, &spec.columns, &values, &mut out)?;
        }

        if self.remainder == Remainder::Passthrough {
            let rest = match &self.feature_names_in {
                Some(names) => self.remainder_columns(names.iter().map(String::as_str)),
                None => self.remainder_columns(record.columns().iter().map(String::as_str)),
            };
            for column in rest {
                let value = record
                    .get(&column)
                    .ok_or_else(|| PredictionError::MissingColumn(column.clone()))?;
                out.push(numeric(&column, value)?);
            }
        }

        Ok(out)
    }
}

impl FeatureNames for ColumnTransformer {
    /// Names per sub-transformer in declaration order, then remainder.
    /// `input_columns` is ignored: each entry declares its own columns.
    fn output_names(&self, _input_columns: &[String]) -> Option<Vec<String>> {
        let mut names = Vec::new();
        for spec in &self.transformers {
            if spec.transformer.is_drop() {
                continue;
            }
            let expanded = spec
                .transformer
                .output_names(&spec.columns)
                .unwrap_or_else(|| spec.columns.clone());
            names.extend(expanded);
        }

        if self.remainder == Remainder::Passthrough {
            let declared = self.feature_names_in.as_ref()?;
            names.extend(self.remainder_columns(declared.iter().map(String::as_str)));
        }

        Some(names)
    }
}
