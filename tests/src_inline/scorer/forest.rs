use super::*;
use crate::model::FEATURE_COUNT;

// root splits on slot 0 at 10.0; missing goes right
fn stump(left_value: f32, right_value: f32) -> FlatTree {
    FlatTree::new(
        vec![1, -1, -1],
        vec![2, -1, -1],
        vec![0, 0, 0],
        vec![10.0, 0.0, 0.0],
        vec![false, false, false],
        vec![0.0, left_value, right_value],
        FEATURE_COUNT,
    )
    .unwrap()
}

fn row_with(slot0: f32) -> FeatureVector {
    let mut values = [0.0f32; FEATURE_COUNT];
    values[0] = slot0;
    FeatureVector::new(values)
}

#[test]
fn test_stump_routes_by_threshold() {
    let tree = stump(1.0, 2.0);
    assert_eq!(tree.leaf_value(row_with(5.0).values()), 1.0);
    assert_eq!(tree.leaf_value(row_with(10.0).values()), 2.0);
    assert_eq!(tree.leaf_value(row_with(f32::NAN).values()), 2.0);
}

#[test]
fn test_ensemble_sums_weighted_leaves_and_base() {
    let mut forest = TreeEnsemble::new(100.0, FEATURE_COUNT);
    forest.push_tree(stump(1.0, 2.0), 1.0);
    forest.push_tree(stump(10.0, 20.0), 0.5);
    let out = forest.score(&[row_with(0.0), row_with(50.0)]).unwrap();
    assert_eq!(out, vec![106.0, 112.0]);
}

#[test]
fn test_empty_forest_returns_base_score() {
    let forest = TreeEnsemble::new(7.5, FEATURE_COUNT);
    assert_eq!(forest.score(&[row_with(1.0)]).unwrap(), vec![7.5]);
    assert_eq!(forest.n_trees(), 0);
}

#[test]
fn test_width_mismatch_is_scoring_error() {
    let forest = TreeEnsemble::new(0.0, 12);
    let err = forest.score(&[row_with(1.0)]).unwrap_err();
    assert_eq!(
        err,
        ScoringError::WidthMismatch {
            expected: 12,
            found: FEATURE_COUNT
        }
    );
}

#[test]
fn test_malformed_trees_rejected() {
    // child pointing backwards would loop
    let cyclic = FlatTree::new(
        vec![1, 0],
        vec![1, -1],
        vec![0, 0],
        vec![0.0, 0.0],
        vec![false, false],
        vec![0.0, 0.0],
        FEATURE_COUNT,
    );
    assert!(cyclic.is_err());

    let out_of_range_feature = FlatTree::new(
        vec![1, -1, -1],
        vec![2, -1, -1],
        vec![99, 0, 0],
        vec![0.0; 3],
        vec![false; 3],
        vec![0.0; 3],
        FEATURE_COUNT,
    );
    assert!(out_of_range_feature.is_err());

    let ragged = FlatTree::new(
        vec![-1],
        vec![-1, -1],
        vec![0],
        vec![0.0],
        vec![false],
        vec![1.0],
        FEATURE_COUNT,
    );
    assert!(ragged.is_err());
}
