use crate::error::{ArtifactError, ScoringError};
use crate::model::FeatureVector;
use crate::scorer::{Scorer, check_width};

/// One regression tree in flat arrays. Node 0 is the root; a node is a leaf
/// when `left[node] < 0`. Children always sit at higher indices than their
/// parent, so traversal terminates.
#[derive(Debug, Clone)]
pub struct FlatTree {
    left: Vec<i32>,
    right: Vec<i32>,
    feature: Vec<u32>,
    threshold: Vec<f32>,
    default_left: Vec<bool>,
    /// Leaf value for leaves, unused for splits.
    value: Vec<f32>,
}

impl FlatTree {
    pub fn new(
        left: Vec<i32>,
        right: Vec<i32>,
        feature: Vec<u32>,
        threshold: Vec<f32>,
        default_left: Vec<bool>,
        value: Vec<f32>,
        n_features: usize,
    ) -> Result<Self, ArtifactError> {
        let n = left.len();
        if n == 0 {
            return Err(ArtifactError::Malformed("tree has no nodes".to_string()));
        }
        if [
            right.len(),
            feature.len(),
            threshold.len(),
            default_left.len(),
            value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(ArtifactError::Malformed(format!(
                "tree node arrays disagree on length {n}"
            )));
        }
        for node in 0..n {
            if left[node] < 0 {
                continue;
            }
            for child in [left[node], right[node]] {
                if child <= node as i32 || child as usize >= n {
                    return Err(ArtifactError::Malformed(format!(
                        "node {node} references child {child} in a tree of {n} nodes"
                    )));
                }
            }
            if feature[node] as usize >= n_features {
                return Err(ArtifactError::Malformed(format!(
                    "node {node} splits on feature {} but model has {n_features}",
                    feature[node]
                )));
            }
        }
        Ok(Self {
            left,
            right,
            feature,
            threshold,
            default_left,
            value,
        })
    }

    pub fn leaf_value(&self, x: &[f32]) -> f32 {
        let mut node = 0usize;
        loop {
            let left = self.left[node];
            if left < 0 {
                return self.value[node];
            }
            let v = x[self.feature[node] as usize];
            let go_left = if v.is_nan() {
                self.default_left[node]
            } else {
                v < self.threshold[node]
            };
            node = if go_left {
                left as usize
            } else {
                self.right[node] as usize
            };
        }
    }
}

/// Additive forest: `base_score + sum(weight_t * leaf_t(x))`.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<FlatTree>,
    weights: Vec<f32>,
    base_score: f32,
    n_features: usize,
    feature_names: Vec<String>,
}

impl TreeEnsemble {
    pub fn new(base_score: f32, n_features: usize) -> Self {
        Self {
            trees: Vec::new(),
            weights: Vec::new(),
            base_score,
            n_features,
            feature_names: Vec::new(),
        }
    }

    pub fn push_tree(&mut self, tree: FlatTree, weight: f32) {
        self.trees.push(tree);
        self.weights.push(weight);
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    pub fn predict_row(&self, x: &[f32]) -> f64 {
        let mut acc = self.base_score as f64;
        for (tree, &w) in self.trees.iter().zip(&self.weights) {
            acc += (w * tree.leaf_value(x)) as f64;
        }
        acc
    }
}

impl Scorer for TreeEnsemble {
    fn kind(&self) -> &'static str {
        "gbtree"
    }

    fn input_width(&self) -> usize {
        self.n_features
    }

    fn score(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ScoringError> {
        check_width(self.n_features, rows)?;
        Ok(rows.iter().map(|r| self.predict_row(r.values())).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/scorer/forest.rs"]
mod tests;
