use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use crate::error::ScoringError;
use crate::model::{FEATURE_COUNT, FEATURE_NAMES, FeatureBatch, FeatureVector};
use crate::scorer::{Scorer, check_width};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn make_temp_dir(tag: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("inflowqc_{}_{}_{}", tag, std::process::id(), id));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// XGBoost JSON for `base + (x[slot] < threshold ? left : right)`.
pub fn stump_model_json(base: f32, slot: usize, threshold: f32, left: f32, right: f32) -> Value {
    json!({
        "version": [2, 0, 3],
        "learner": {
            "feature_names": FEATURE_NAMES.to_vec(),
            "feature_types": vec!["float"; FEATURE_COUNT],
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "gbtree_model_param": {"num_trees": "1", "num_parallel_tree": "1"},
                    "tree_info": [0],
                    "trees": [{
                        "id": 0,
                        "tree_param": {
                            "num_nodes": "3",
                            "num_feature": FEATURE_COUNT.to_string(),
                            "size_leaf_vector": "1",
                            "num_deleted": "0"
                        },
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "parents": [2147483647, 0, 0],
                        "split_indices": [slot, 0, 0],
                        "split_conditions": [threshold, left, right],
                        "split_type": [0, 0, 0],
                        "default_left": [1, 0, 0],
                        "base_weights": [0.0, left, right],
                        "loss_changes": [1.0, 0.0, 0.0],
                        "sum_hessian": [10.0, 5.0, 5.0],
                        "categories": [],
                        "categories_nodes": [],
                        "categories_segments": [],
                        "categories_sizes": []
                    }]
                }
            },
            "objective": {
                "name": "reg:quantileerror",
                "quantile_loss_param": {"quantile_alpha": "0.5"}
            },
            "learner_model_param": {
                "base_score": format!("[{base:E}]"),
                "num_class": "0",
                "num_feature": FEATURE_COUNT.to_string(),
                "num_target": "1",
                "boost_from_average": "1"
            }
        }
    })
}

/// A model that predicts `value` for every row.
pub fn constant_model_json(value: f32) -> Value {
    stump_model_json(value, 0, 0.0, 0.0, 0.0)
}

pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path
}

/// Returns `offset + x[slot]` so tests can drive per-row outputs through features.
pub struct SlotScorer {
    pub slot: usize,
    pub offset: f64,
}

impl Scorer for SlotScorer {
    fn kind(&self) -> &'static str {
        "slot"
    }

    fn input_width(&self) -> usize {
        FEATURE_COUNT
    }

    fn score(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ScoringError> {
        check_width(FEATURE_COUNT, rows)?;
        Ok(rows
            .iter()
            .map(|r| self.offset + r.values()[self.slot] as f64)
            .collect())
    }
}

pub struct ConstScorer(pub f64);

impl Scorer for ConstScorer {
    fn kind(&self) -> &'static str {
        "const"
    }

    fn input_width(&self) -> usize {
        FEATURE_COUNT
    }

    fn score(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ScoringError> {
        Ok(vec![self.0; rows.len()])
    }
}

/// Misbehaving scorer used to exercise output validation.
pub struct BrokenScorer {
    pub emit_nan: bool,
}

impl Scorer for BrokenScorer {
    fn kind(&self) -> &'static str {
        "broken"
    }

    fn input_width(&self) -> usize {
        FEATURE_COUNT
    }

    fn score(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ScoringError> {
        if self.emit_nan {
            Ok(vec![f64::NAN; rows.len()])
        } else {
            Ok(vec![0.0; rows.len() + 1])
        }
    }
}

pub fn row(slots: &[(usize, f32)]) -> FeatureVector {
    let mut values = [0.0f32; FEATURE_COUNT];
    for &(slot, v) in slots {
        values[slot] = v;
    }
    FeatureVector::new(values)
}

/// Batch with `values[i]` placed in `slot` of row `i`, keyed `d0, d1, ...`.
pub fn batch_with_slot(slot: usize, values: &[f32]) -> FeatureBatch {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (format!("d{i}"), row(&[(slot, v)])))
        .collect()
}
