//! Preprocessing + estimator composition.

use crate::error::PredictionError;
use crate::estimator::Estimator;
use crate::record::InputRecord;
use crate::transform::{numeric, ColumnTransformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A fitted pipeline: optional column preprocessing followed by an estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<ColumnTransformer>,

    pub estimator: Estimator,

    /// Ordered input columns seen at fit time, when exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
}

impl From<Estimator> for Pipeline {
    fn from(estimator: Estimator) -> Self {
        Self {
            preprocessor: None,
            estimator,
            feature_names_in: None,
        }
    }
}

impl Pipeline {
    /// Ordered input columns the pipeline expects, if it declares them.
    pub fn expected_columns(&self) -> Option<&[String]> {
        self.feature_names_in
            .as_deref()
            .or_else(|| {
                self.preprocessor
                    .as_ref()
                    .and_then(|p| p.feature_names_in.as_deref())
            })
    }

    /// Build the `(1, n)` feature matrix for one record.
    pub fn features(&self, record: &InputRecord) -> Result<Array2<f64>, PredictionError> {
        let row = match &self.preprocessor {
            Some(preprocessor) => preprocessor.transform(record)?,
            None => record
                .iter()
                .map(|(column, value)| numeric(column, value))
                .collect::<Result<Vec<_>, _>>()?,
        };
        let width = row.len();
        Array2::from_shape_vec((1, width), row).map_err(|e| PredictionError::InvalidTransformer {
            transformer: "pipeline".to_string(),
            reason: e.to_string(),
        })
    }

    /// Predict a single scalar for one record.
    pub fn predict(&self, record: &InputRecord) -> Result<f64, PredictionError> {
        let x = self.features(record)?;
        let y = self.estimator.predict(x.view())?;
        let value = y.get(0).copied().ok_or(PredictionError::ShapeMismatch {
            expected: 1,
            actual: 0,
        })?;
        if !value.is_finite() {
            return Err(PredictionError::NonFinite(value));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::EstimatorKind;
    use crate::record::Value;
    use crate::tree::tests::{leaf, split};

    fn bare_linear() -> Pipeline {
        Pipeline::from(Estimator::from(EstimatorKind::LinearRegression {
            coefficients: vec![10.0, 1000.0],
            intercept: 50000.0,
        }))
    }

    #[test]
    fn test_predict_without_preprocessor() {
        let record = InputRecord::from_pairs(vec![
            ("LotArea", Value::Number(8000.0)),
            ("OverallQual", Value::from("7")),
        ]);
        let price = bare_linear().predict(&record).unwrap();
        assert_eq!(price, 80000.0 + 7000.0 + 50000.0);
    }

    #[test]
    fn test_predict_reports_type_error() {
        let record = InputRecord::from_pairs(vec![
            ("LotArea", Value::Number(8000.0)),
            ("OverallQual", Value::from("excellent")),
        ]);
        let err = bare_linear().predict(&record).unwrap_err();
        assert_eq!(
            err,
            PredictionError::TypeMismatch {
                column: "OverallQual".into(),
                value: "excellent".into()
            }
        );
    }

    #[test]
    fn test_predict_reports_width_mismatch() {
        let record = InputRecord::from_pairs(vec![("LotArea", Value::Number(8000.0))]);
        let err = bare_linear().predict(&record).unwrap_err();
        assert!(matches!(err, PredictionError::ShapeMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_predict_rejects_non_finite_output() {
        let pipeline = Pipeline::from(Estimator::from(EstimatorKind::LinearRegression {
            coefficients: vec![f64::MAX],
            intercept: 0.0,
        }));
        let record = InputRecord::from_pairs(vec![("LotArea", Value::Number(10.0))]);
        let err = pipeline.predict(&record).unwrap_err();
        assert!(matches!(err, PredictionError::NonFinite(_)));
    }

    #[test]
    fn test_tree_rejects_non_finite_input() {
        let pipeline = Pipeline {
            preprocessor: None,
            estimator: Estimator::from(EstimatorKind::DecisionTree {
                n_features: 1,
                tree: split(0, 5000.0, leaf(150000.0, 40), leaf(300000.0, 60)),
            }),
            feature_names_in: Some(vec!["LotArea".into()]),
        };

        for bad in [
            Value::from("NaN"),
            Value::from("inf"),
            Value::Number(f64::NAN),
        ] {
            let record = InputRecord::from_pairs(vec![("LotArea", bad.clone())]);
            let err = pipeline.predict(&record).unwrap_err();
            assert!(
                matches!(err, PredictionError::TypeMismatch { .. }),
                "{bad:?} gave {err:?}"
            );
        }

        let record = InputRecord::from_pairs(vec![("LotArea", Value::Number(8450.0))]);
        assert_eq!(pipeline.predict(&record), Ok(300000.0));
    }

    #[test]
    fn test_expected_columns_prefers_pipeline_level() {
        let mut pipeline = bare_linear();
        assert!(pipeline.expected_columns().is_none());
        pipeline.feature_names_in = Some(vec!["A".into(), "B".into()]);
        assert_eq!(
            pipeline.expected_columns().unwrap(),
            &["A".to_string(), "B".to_string()]
        );
    }
}
