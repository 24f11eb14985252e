use super::*;
use crate::model::FEATURE_COUNT;
use crate::test_support::row;

fn layer(n_in: usize, n_out: usize, w: f32, b: f32) -> DenseLayer {
    DenseLayer {
        weight: vec![vec![w; n_in]; n_out],
        bias: vec![b; n_out],
    }
}

fn weights(gate_bias: f32, out_weight: f32, out_bias: f32) -> GatedWeights {
    GatedWeights {
        input_dim: FEATURE_COUNT,
        hidden_dim: 1,
        encoder: [layer(FEATURE_COUNT, 1, 0.0, 1.0), layer(1, 1, 1.0, 0.0)],
        gate: layer(FEATURE_COUNT, 1, 0.0, gate_bias),
        decoder: [layer(1, 1, 1.0, 0.0), layer(1, 1, out_weight, out_bias)],
    }
}

#[test]
fn test_gelu_and_erf_reference_values() {
    assert!(erf(0.0).abs() < 1e-7);
    assert!((erf(0.5) - 0.520_499_877_8).abs() < 1e-6);
    assert!((erf(-0.5) + 0.520_499_877_8).abs() < 1e-6);
    assert!(gelu(0.0).abs() < 1e-12);
    assert!((gelu(1.0) - 0.841_344_746).abs() < 1e-6);
    assert!((gelu(-1.0) + 0.158_655_254).abs() < 1e-6);
}

#[test]
fn test_closed_gate_leaves_decoder_bias() {
    let model = GatedRegressor::new(weights(-1000.0, 2.0, 5.0)).unwrap();
    let out = model.score(&[row(&[(0, 3.0)]), row(&[])]).unwrap();
    assert_eq!(out.len(), 2);
    for v in out {
        assert!((v - 5.0).abs() < 1e-9);
    }
}

#[test]
fn test_open_gate_forward_matches_hand_computation() {
    let model = GatedRegressor::new(weights(1000.0, 2.0, 5.0)).unwrap();
    let enc = gelu(gelu(1.0));
    let expected = 2.0 * gelu(enc) + 5.0;
    let out = model.score(&[row(&[])]).unwrap();
    assert!((out[0] - expected).abs() < 1e-9);
    assert_eq!(model.kind(), "gated_mlp");
    assert_eq!(model.input_width(), FEATURE_COUNT);
}

#[test]
fn test_shape_validation() {
    let mut w = weights(0.0, 1.0, 0.0);
    w.gate = layer(FEATURE_COUNT - 1, 1, 0.0, 0.0);
    assert!(matches!(GatedRegressor::new(w), Err(ArtifactError::Malformed(_))));

    let mut w = weights(0.0, 1.0, 0.0);
    w.decoder[1] = layer(1, 2, 1.0, 0.0);
    assert!(GatedRegressor::new(w).is_err());
}

#[test]
fn test_width_mismatch_for_narrow_model() {
    let w = GatedWeights {
        input_dim: 3,
        hidden_dim: 1,
        encoder: [layer(3, 1, 0.0, 0.0), layer(1, 1, 0.0, 0.0)],
        gate: layer(3, 1, 0.0, 0.0),
        decoder: [layer(1, 1, 0.0, 0.0), layer(1, 1, 0.0, 0.0)],
    };
    let model = GatedRegressor::new(w).unwrap();
    assert!(matches!(
        model.score(&[row(&[])]),
        Err(ScoringError::WidthMismatch { expected: 3, .. })
    ));
}

#[test]
fn test_parses_json_export() {
    let json = serde_json::json!({
        "input_dim": 2,
        "hidden_dim": 1,
        "encoder": [{"weight": [[0.0, 0.0]], "bias": [0.0]}, {"weight": [[0.0]], "bias": [0.0]}],
        "gate": {"weight": [[0.0, 0.0]], "bias": [0.0]},
        "decoder": [{"weight": [[0.0]], "bias": [0.0]}, {"weight": [[0.0]], "bias": [7.0]}]
    });
    let model = GatedRegressor::from_slice(&serde_json::to_vec(&json).unwrap()).unwrap();
    assert!((model.predict_row(&[1.0, 2.0]) - 7.0).abs() < 1e-12);
}
