//! Final regression estimators.

use crate::error::{ArtifactError, PredictionError};
use crate::tree::{ensemble_importances, RegressionTreeNode};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Model family and its fitted parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorKind {
    LinearRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    DecisionTree {
        n_features: usize,
        tree: RegressionTreeNode,
    },
    RandomForest {
        n_features: usize,
        trees: Vec<RegressionTreeNode>,
    },
    GradientBoosting {
        n_features: usize,
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTreeNode>,
    },
}

/// A fitted estimator, optionally carrying importances exported at training
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimator {
    #[serde(flatten)]
    pub model: EstimatorKind,

    /// Precomputed importances; preferred over split-derived ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
}

impl From<EstimatorKind> for Estimator {
    fn from(model: EstimatorKind) -> Self {
        Self {
            model,
            feature_importances: None,
        }
    }
}

impl Estimator {
    /// Short label for logs and `inspect` output.
    pub fn kind_name(&self) -> &'static str {
        match self.model {
            EstimatorKind::LinearRegression { .. } => "linear_regression",
            EstimatorKind::DecisionTree { .. } => "decision_tree",
            EstimatorKind::RandomForest { .. } => "random_forest",
            EstimatorKind::GradientBoosting { .. } => "gradient_boosting",
        }
    }

    /// Width of the feature vector the estimator was fit on.
    pub fn n_features(&self) -> usize {
        match &self.model {
            EstimatorKind::LinearRegression { coefficients, .. } => coefficients.len(),
            EstimatorKind::DecisionTree { n_features, .. }
            | EstimatorKind::RandomForest { n_features, .. }
            | EstimatorKind::GradientBoosting { n_features, .. } => *n_features,
        }
    }

    /// Fitted trees; empty for linear models.
    pub fn trees(&self) -> &[RegressionTreeNode] {
        match &self.model {
            EstimatorKind::LinearRegression { .. } => &[],
            EstimatorKind::DecisionTree { tree, .. } => std::slice::from_ref(tree),
            EstimatorKind::RandomForest { trees, .. } => trees,
            EstimatorKind::GradientBoosting { trees, .. } => trees,
        }
    }

    /// Deepest tree in the ensemble, if any.
    pub fn max_depth(&self) -> Option<usize> {
        self.trees().iter().map(RegressionTreeNode::depth).max()
    }

    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let n_features = self.n_features();
        let trees = self.trees();

        if matches!(self.model, EstimatorKind::RandomForest { .. }) && trees.is_empty() {
            return Err(ArtifactError::EmptyForest);
        }

        for (tree, node) in trees.iter().enumerate() {
            if let Some(feature) = node.max_feature_idx() {
                if feature >= n_features {
                    return Err(ArtifactError::SplitOutOfRange {
                        tree,
                        feature,
                        n_features,
                    });
                }
            }
        }
        Ok(())
    }

    /// Predict one value per row of `x`.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, PredictionError> {
        let expected = self.n_features();
        if x.ncols() != expected {
            return Err(PredictionError::ShapeMismatch {
                expected,
                actual: x.ncols(),
            });
        }

        let out = match &self.model {
            EstimatorKind::LinearRegression {
                coefficients,
                intercept,
            } => x.dot(&ArrayView1::from(coefficients.as_slice())) + *intercept,
            EstimatorKind::DecisionTree { tree, .. } => {
                Self::map_rows(x, |row| tree.predict_one(row))
            }
            EstimatorKind::RandomForest { trees, .. } => Self::map_rows(x, |row| {
                trees.iter().map(|t| t.predict_one(row)).sum::<f64>() / trees.len() as f64
            }),
            EstimatorKind::GradientBoosting {
                init,
                learning_rate,
                trees,
                ..
            } => Self::map_rows(x, |row| {
                init + learning_rate * trees.iter().map(|t| t.predict_one(row)).sum::<f64>()
            }),
        };
        Ok(out)
    }

    /// Per-feature importances, if this estimator family has them.
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        if let Some(explicit) = &self.feature_importances {
            return Some(explicit.clone());
        }
        match &self.model {
            EstimatorKind::LinearRegression { .. } => None,
            EstimatorKind::DecisionTree { n_features, tree } => {
                Some(ensemble_importances(std::slice::from_ref(tree), *n_features))
            }
            EstimatorKind::RandomForest { n_features, trees }
            | EstimatorKind::GradientBoosting {
                n_features, trees, ..
            } => Some(ensemble_importances(trees, *n_features)),
        }
    }

    fn map_rows<F>(x: ArrayView2<'_, f64>, f: F) -> Array1<f64>
    where
        F: Fn(&[f64]) -> f64,
    {
        x.axis_iter(Axis(0))
            .map(|row| f(&row.to_vec()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{leaf, seventy_thirty_tree, split};
    use ndarray::array;

    fn linear() -> Estimator {
        EstimatorKind::LinearRegression {
            coefficients: vec![2.0, 10.0],
            intercept: 5.0,
        }
        .into()
    }

    #[test]
    fn test_linear_predict() {
        let x = array![[1.0, 3.0]];
        let y = linear().predict(x.view()).unwrap();
        assert_eq!(y[0], 2.0 + 30.0 + 5.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0, 2.0, 3.0]];
        let err = linear().predict(x.view()).unwrap_err();
        assert_eq!(
            err,
            PredictionError::ShapeMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_linear_has_no_importances() {
        assert!(linear().feature_importances().is_none());
    }

    #[test]
    fn test_explicit_importances_take_precedence() {
        let mut est = linear();
        est.feature_importances = Some(vec![0.9, 0.1]);
        assert_eq!(est.feature_importances(), Some(vec![0.9, 0.1]));
    }

    #[test]
    fn test_random_forest_mean() {
        let est: Estimator = EstimatorKind::RandomForest {
            n_features: 1,
            trees: vec![
                split(0, 0.5, leaf(10.0, 1), leaf(20.0, 1)),
                split(0, 0.5, leaf(30.0, 1), leaf(40.0, 1)),
            ],
        }
        .into();
        let y = est.predict(array![[1.0], [0.0]].view()).unwrap();
        assert_eq!(y.to_vec(), vec![30.0, 20.0]);
    }

    #[test]
    fn test_gradient_boosting_sum() {
        let est: Estimator = EstimatorKind::GradientBoosting {
            n_features: 2,
            init: 100.0,
            learning_rate: 0.5,
            trees: vec![seventy_thirty_tree(), leaf(4.0, 10)],
        }
        .into();
        let y = est.predict(array![[1.0, 0.0]].view()).unwrap();
        assert_eq!(y[0], 100.0 + 0.5 * (100.0 + 4.0));

        let imp = est.feature_importances().unwrap();
        assert!((imp[0] - 0.7).abs() < 1e-12);
        assert!((imp[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_tree_summary() {
        let forest: Estimator = EstimatorKind::RandomForest {
            n_features: 2,
            trees: vec![seventy_thirty_tree(), leaf(1.0, 5)],
        }
        .into();
        assert_eq!(forest.trees().len(), 2);
        assert_eq!(forest.max_depth(), Some(2));

        assert!(linear().trees().is_empty());
        assert_eq!(linear().max_depth(), None);
    }

    #[test]
    fn test_validate_rejects_out_of_range_split() {
        let est: Estimator = EstimatorKind::DecisionTree {
            n_features: 1,
            tree: seventy_thirty_tree(),
        }
        .into();
        assert!(matches!(
            est.validate(),
            Err(ArtifactError::SplitOutOfRange {
                tree: 0,
                feature: 1,
                n_features: 1
            })
        ));
    }

    #[test]
    fn test_estimator_json_shape() {
        let json = r#"{"kind": "linear_regression", "coefficients": [1.0], "intercept": 0.5,
                       "feature_importances": [1.0]}"#;
        let est: Estimator = serde_json::from_str(json).unwrap();
        assert_eq!(est.kind_name(), "linear_regression");
        assert_eq!(est.n_features(), 1);
        assert_eq!(est.feature_importances(), Some(vec![1.0]));
    }
}
