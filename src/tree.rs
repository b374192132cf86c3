//! Serialized regression trees.
//!
//! Trees arrive fully grown from the training job; this module only walks
//! them for prediction and derives split-based feature importances.

use serde::{Deserialize, Serialize};

/// Leaf node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionLeaf {
    /// Predicted value for this leaf
    pub value: f64,
    /// Number of training samples that reached this leaf
    #[serde(default)]
    pub n_samples: usize,
}

/// Internal split node. Samples with `x[feature_idx] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSplit {
    pub feature_idx: usize,
    pub threshold: f64,
    pub left: Box<RegressionTreeNode>,
    pub right: Box<RegressionTreeNode>,
}

/// A node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionTreeNode {
    Split(RegressionSplit),
    Leaf(RegressionLeaf),
}

impl RegressionTreeNode {
    /// Walk the tree for one sample.
    pub fn predict_one(&self, x: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                RegressionTreeNode::Leaf(leaf) => return leaf.value,
                RegressionTreeNode::Split(split) => {
                    // Out-of-range indices are rejected by `max_feature_idx` at load.
                    let v = x.get(split.feature_idx).copied().unwrap_or(f64::NAN);
                    node = if v <= split.threshold {
                        &split.left
                    } else {
                        &split.right
                    };
                }
            }
        }
    }

    /// Leaf nodes have depth 0.
    pub fn depth(&self) -> usize {
        match self {
            RegressionTreeNode::Leaf(_) => 0,
            RegressionTreeNode::Split(split) => 1 + split.left.depth().max(split.right.depth()),
        }
    }

    /// Training samples beneath this node.
    pub fn n_samples(&self) -> usize {
        match self {
            RegressionTreeNode::Leaf(leaf) => leaf.n_samples,
            RegressionTreeNode::Split(split) => split.left.n_samples() + split.right.n_samples(),
        }
    }

    /// Largest feature index any split refers to.
    pub fn max_feature_idx(&self) -> Option<usize> {
        match self {
            RegressionTreeNode::Leaf(_) => None,
            RegressionTreeNode::Split(split) => [
                Some(split.feature_idx),
                split.left.max_feature_idx(),
                split.right.max_feature_idx(),
            ]
            .into_iter()
            .flatten()
            .max(),
        }
    }

    /// Add each split's sample count to its feature's slot.
    pub fn accumulate_importances(&self, importances: &mut [f64]) {
        if let RegressionTreeNode::Split(split) = self {
            if let Some(slot) = importances.get_mut(split.feature_idx) {
                *slot += self.n_samples() as f64;
            }
            split.left.accumulate_importances(importances);
            split.right.accumulate_importances(importances);
        }
    }
}

/// Average the per-tree split importances and normalize to sum to 1.
pub fn ensemble_importances(trees: &[RegressionTreeNode], n_features: usize) -> Vec<f64> {
    let mut total = vec![0.0; n_features];
    if trees.is_empty() {
        return total;
    }

    for tree in trees {
        let mut per_tree = vec![0.0; n_features];
        tree.accumulate_importances(&mut per_tree);
        for (t, p) in total.iter_mut().zip(per_tree) {
            *t += p;
        }
    }

    let n_trees = trees.len() as f64;
    for importance in &mut total {
        *importance /= n_trees;
    }

    let sum: f64 = total.iter().sum();
    if sum > 0.0 {
        for importance in &mut total {
            *importance /= sum;
        }
    }
    total
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn leaf(value: f64, n_samples: usize) -> RegressionTreeNode {
        RegressionTreeNode::Leaf(RegressionLeaf { value, n_samples })
    }

    pub(crate) fn split(
        feature_idx: usize,
        threshold: f64,
        left: RegressionTreeNode,
        right: RegressionTreeNode,
    ) -> RegressionTreeNode {
        RegressionTreeNode::Split(RegressionSplit {
            feature_idx,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Root on feature 0 covering 70 samples; right child on feature 1
    /// covering 30. Importances come out as [0.7, 0.3].
    pub(crate) fn seventy_thirty_tree() -> RegressionTreeNode {
        split(
            0,
            5.0,
            leaf(100.0, 40),
            split(1, 2.0, leaf(200.0, 10), leaf(300.0, 20)),
        )
    }

    #[test]
    fn test_predict_one_walks_splits() {
        let tree = seventy_thirty_tree();
        assert_eq!(tree.predict_one(&[1.0, 0.0]), 100.0);
        assert_eq!(tree.predict_one(&[9.0, 1.0]), 200.0);
        assert_eq!(tree.predict_one(&[9.0, 3.0]), 300.0);
    }

    #[test]
    fn test_depth_and_samples() {
        let tree = seventy_thirty_tree();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_samples(), 70);
        assert_eq!(tree.max_feature_idx(), Some(1));
        assert_eq!(leaf(1.0, 3).max_feature_idx(), None);
    }

    #[test]
    fn test_ensemble_importances_normalized() {
        let imp = ensemble_importances(&[seventy_thirty_tree()], 2);
        assert!((imp[0] - 0.7).abs() < 1e-12);
        assert!((imp[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_ensemble_importances_without_samples() {
        let tree = split(0, 1.0, leaf(1.0, 0), leaf(2.0, 0));
        assert_eq!(ensemble_importances(&[tree], 3), vec![0.0, 0.0, 0.0]);
        assert_eq!(ensemble_importances(&[], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_tree_json_shape() {
        let json = r#"{"split": {"feature_idx": 0, "threshold": 1.5,
            "left": {"leaf": {"value": 10.0, "n_samples": 3}},
            "right": {"leaf": {"value": 20.0}}}}"#;
        let tree: RegressionTreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(tree.predict_one(&[2.0]), 20.0);
        assert_eq!(tree.n_samples(), 3);
    }
}
