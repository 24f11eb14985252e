//! Reader for XGBoost JSON model dumps (`Booster.save_model("*.json")`).
//!
//! Only the parts needed for single-target regression inference are modelled;
//! unknown fields are ignored.

use std::io::Read;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};

use crate::error::ArtifactError;
use crate::scorer::forest::{FlatTree, TreeEnsemble};

/// Objectives whose raw margin is the prediction itself.
const IDENTITY_OBJECTIVES: &[&str] = &[
    "reg:squarederror",
    "reg:linear",
    "reg:absoluteerror",
    "reg:pseudohubererror",
    "reg:quantileerror",
];

#[derive(Debug, Clone, Deserialize)]
pub struct XgbModel {
    pub learner: Learner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Learner {
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub gradient_booster: GradientBooster,
    pub objective: Objective,
    pub learner_model_param: LearnerModelParam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Objective {
    pub name: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct LearnerModelParam {
    #[serde(deserialize_with = "deserialize_base_score")]
    pub base_score: f32,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub num_class: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub num_feature: usize,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "one")]
    pub num_target: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum GradientBooster {
    Gbtree {
        model: ModelTrees,
    },
    Dart {
        gbtree: DartTrees,
        #[serde(default)]
        weight_drop: Vec<f32>,
    },
    Gblinear {},
}

#[derive(Debug, Clone, Deserialize)]
pub struct DartTrees {
    pub model: ModelTrees,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTrees {
    pub trees: Vec<XgbTree>,
    #[serde(default)]
    pub tree_info: Vec<i32>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct TreeParam {
    #[serde_as(as = "DisplayFromStr")]
    pub num_nodes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XgbTree {
    pub tree_param: TreeParam,
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<i64>,
    /// Split threshold for inner nodes, leaf value for leaves.
    pub split_conditions: Vec<f32>,
    #[serde(default)]
    pub split_type: Vec<i32>,
    #[serde(deserialize_with = "deserialize_flags")]
    pub default_left: Vec<bool>,
}

impl XgbModel {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ArtifactError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ArtifactError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn into_ensemble(self) -> Result<TreeEnsemble, ArtifactError> {
        let Learner {
            feature_names,
            gradient_booster,
            objective,
            learner_model_param: param,
        } = self.learner;

        if !IDENTITY_OBJECTIVES.contains(&objective.name.as_str()) {
            return Err(ArtifactError::Unsupported(format!(
                "objective {} is not a plain regression objective",
                objective.name
            )));
        }
        if param.num_target != 1 || param.num_class > 1 {
            return Err(ArtifactError::Unsupported(format!(
                "multi-output model (num_target={}, num_class={})",
                param.num_target, param.num_class
            )));
        }
        if !feature_names.is_empty() && feature_names.len() != param.num_feature {
            return Err(ArtifactError::Malformed(format!(
                "{} feature names for {} features",
                feature_names.len(),
                param.num_feature
            )));
        }

        let (trees, weight_drop) = match gradient_booster {
            GradientBooster::Gbtree { model } => (model, None),
            GradientBooster::Dart {
                gbtree,
                weight_drop,
            } => (gbtree.model, Some(weight_drop)),
            GradientBooster::Gblinear {} => {
                return Err(ArtifactError::Unsupported(
                    "gblinear booster has no trees".to_string(),
                ));
            }
        };
        if trees.tree_info.iter().any(|&g| g != 0) {
            return Err(ArtifactError::Unsupported(
                "trees assigned to more than one output group".to_string(),
            ));
        }

        let mut ensemble = TreeEnsemble::new(param.base_score, param.num_feature)
            .with_feature_names(feature_names);
        for (idx, tree) in trees.trees.into_iter().enumerate() {
            let weight = weight_drop
                .as_ref()
                .and_then(|w| w.get(idx).copied())
                .unwrap_or(1.0);
            let flat = convert_tree(tree, param.num_feature).map_err(|e| match e {
                ArtifactError::Malformed(m) => ArtifactError::Malformed(format!("tree {idx}: {m}")),
                ArtifactError::Unsupported(m) => {
                    ArtifactError::Unsupported(format!("tree {idx}: {m}"))
                }
                other => other,
            })?;
            ensemble.push_tree(flat, weight);
        }
        Ok(ensemble)
    }
}

fn convert_tree(tree: XgbTree, n_features: usize) -> Result<FlatTree, ArtifactError> {
    let n = tree.tree_param.num_nodes;
    if tree.left_children.len() != n {
        return Err(ArtifactError::Malformed(format!(
            "num_nodes is {n} but {} nodes present",
            tree.left_children.len()
        )));
    }
    if tree.split_type.iter().any(|&t| t != 0) {
        return Err(ArtifactError::Unsupported(
            "categorical splits".to_string(),
        ));
    }
    let mut feature = Vec::with_capacity(tree.split_indices.len());
    for &idx in &tree.split_indices {
        let idx = u32::try_from(idx)
            .map_err(|_| ArtifactError::Malformed(format!("negative split index {idx}")))?;
        feature.push(idx);
    }
    let value = tree.split_conditions.clone();
    FlatTree::new(
        tree.left_children,
        tree.right_children,
        feature,
        tree.split_conditions,
        tree.default_left,
        value,
        n_features,
    )
}

/// `base_score` shows up as a number, a numeric string, an array, or a
/// bracketed string such as `"[1.2E2]"` depending on the XGBoost version.
fn deserialize_base_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    fn scalar(value: &Value) -> Option<f32> {
        match value {
            Value::Number(n) => n.as_f64().map(|f| f as f32),
            Value::String(s) => {
                let t = s.trim();
                let inner = t
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .unwrap_or(t);
                inner.split(',').next()?.trim().parse::<f32>().ok()
            }
            Value::Array(items) => items.first().and_then(scalar),
            _ => None,
        }
    }

    let value = Value::deserialize(deserializer)?;
    scalar(&value).ok_or_else(|| D::Error::custom(format!("cannot read base_score from {value}")))
}

/// `default_left` is stored as 0/1 integers by current XGBoost, booleans by
/// some older writers.
fn deserialize_flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| match v {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            other => Err(D::Error::custom(format!("invalid flag {other}"))),
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/scorer/xgboost.rs"]
mod tests;
