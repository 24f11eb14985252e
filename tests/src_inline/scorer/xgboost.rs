use super::*;
use crate::model::FEATURE_COUNT;
use crate::scorer::Scorer;
use crate::test_support::{row, stump_model_json};
use serde_json::json;

fn parse(value: &serde_json::Value) -> Result<TreeEnsemble, ArtifactError> {
    XgbModel::from_slice(&serde_json::to_vec(value).unwrap())?.into_ensemble()
}

#[test]
fn test_stump_model_predicts_base_plus_leaf() {
    let forest = parse(&stump_model_json(100.0, 3, 150.0, -5.0, 25.0)).unwrap();
    assert_eq!(forest.n_trees(), 1);
    assert_eq!(forest.base_score(), 100.0);
    assert_eq!(forest.feature_names().len(), FEATURE_COUNT);
    let out = forest
        .score(&[row(&[(3, 80.0)]), row(&[(3, 180.0)]), row(&[(3, f32::NAN)])])
        .unwrap();
    assert_eq!(out, vec![95.0, 125.0, 95.0]);
}

#[test]
fn test_base_score_formats() {
    for raw in [json!(1.5), json!("1.5"), json!([1.5]), json!("[1.5E0]")] {
        let v = json!({"base_score": raw, "num_class": "0", "num_feature": "41"});
        let p: LearnerModelParam = serde_json::from_value(v).unwrap();
        assert_eq!(p.base_score, 1.5);
        assert_eq!(p.num_target, 1);
    }
    let bad = json!({"base_score": {"x": 1}, "num_class": "0", "num_feature": "41"});
    assert!(serde_json::from_value::<LearnerModelParam>(bad).is_err());
}

#[test]
fn test_default_left_accepts_bools() {
    let mut model = stump_model_json(0.0, 0, 1.0, 1.0, 2.0);
    model["learner"]["gradient_booster"]["model"]["trees"][0]["default_left"] =
        json!([false, false, false]);
    let forest = parse(&model).unwrap();
    assert_eq!(forest.score(&[row(&[(0, f32::NAN)])]).unwrap(), vec![2.0]);
}

#[test]
fn test_dart_weights_scale_trees() {
    let mut model = stump_model_json(10.0, 0, 1.0, 4.0, 8.0);
    let trees = model["learner"]["gradient_booster"]["model"].clone();
    model["learner"]["gradient_booster"] = json!({
        "name": "dart",
        "gbtree": {"name": "gbtree", "model": trees},
        "weight_drop": [0.5]
    });
    let forest = parse(&model).unwrap();
    assert_eq!(forest.score(&[row(&[(0, 0.0)])]).unwrap(), vec![12.0]);
}

#[test]
fn test_unsupported_models_rejected() {
    let mut logistic = stump_model_json(0.5, 0, 1.0, 0.0, 1.0);
    logistic["learner"]["objective"] = json!({"name": "binary:logistic"});
    assert!(matches!(parse(&logistic), Err(ArtifactError::Unsupported(_))));

    let mut linear = stump_model_json(0.5, 0, 1.0, 0.0, 1.0);
    linear["learner"]["gradient_booster"] = json!({"name": "gblinear", "model": {"weights": [0.0]}});
    assert!(matches!(parse(&linear), Err(ArtifactError::Unsupported(_))));

    let mut multi = stump_model_json(0.5, 0, 1.0, 0.0, 1.0);
    multi["learner"]["learner_model_param"]["num_target"] = json!("3");
    assert!(matches!(parse(&multi), Err(ArtifactError::Unsupported(_))));

    let mut categorical = stump_model_json(0.5, 0, 1.0, 0.0, 1.0);
    categorical["learner"]["gradient_booster"]["model"]["trees"][0]["split_type"] = json!([1, 0, 0]);
    assert!(matches!(parse(&categorical), Err(ArtifactError::Unsupported(_))));
}

#[test]
fn test_malformed_tree_rejected() {
    let mut model = stump_model_json(0.0, 0, 1.0, 0.0, 1.0);
    model["learner"]["gradient_booster"]["model"]["trees"][0]["tree_param"]["num_nodes"] = json!("5");
    assert!(matches!(parse(&model), Err(ArtifactError::Malformed(_))));

    let mut model = stump_model_json(0.0, 0, 1.0, 0.0, 1.0);
    model["learner"]["gradient_booster"]["model"]["trees"][0]["split_indices"] = json!([-1, 0, 0]);
    assert!(matches!(parse(&model), Err(ArtifactError::Malformed(_))));

    assert!(matches!(
        XgbModel::from_slice(b"{\"learner\": 1}"),
        Err(ArtifactError::Json(_))
    ));
}
