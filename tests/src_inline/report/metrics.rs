use super::*;

fn prow(lower: f64, median: f64, upper: f64) -> PredictionRow {
    PredictionRow {
        key: String::new(),
        lower,
        median,
        upper,
    }
}

fn sample() -> (Vec<PredictionRow>, Vec<f64>) {
    let rows = vec![
        prow(90.0, 100.0, 110.0),
        prow(190.0, 200.0, 210.0),
        prow(280.0, 300.0, 320.0),
        prow(350.0, 400.0, 450.0),
    ];
    (rows, vec![105.0, 180.0, 300.0, 500.0])
}

#[test]
fn test_point_and_interval_metrics() {
    let (rows, ys) = sample();
    let m = evaluate(&rows, &ys).unwrap();
    assert_eq!(m.n_scored, 4);
    assert!((m.mae - 31.25).abs() < 1e-12);
    assert!((m.rmse - (10425.0f64 / 4.0).sqrt()).abs() < 1e-9);
    assert!((m.coverage_pct - 50.0).abs() < 1e-12);
    assert!((m.mean_width - 45.0).abs() < 1e-12);
    let expected_acc = (1.0 - 31.25 / 271.25) * 100.0;
    assert!((m.accuracy_pct.unwrap() - expected_acc).abs() < 1e-9);
    assert!(m.r2.unwrap() < 1.0);
}

#[test]
fn test_pinball_median_is_half_mae() {
    let (rows, ys) = sample();
    let m = evaluate(&rows, &ys).unwrap();
    let q50 = m.pinball.iter().find(|p| p.quantile == 0.5).unwrap();
    assert!((q50.loss - 15.625).abs() < 1e-12);
    assert_eq!(m.pinball.len(), 3);
}

#[test]
fn test_pinball_asymmetry() {
    assert!((pinball(0.9, 10.0, 8.0) - 1.8).abs() < 1e-12);
    assert!((pinball(0.9, 8.0, 10.0) - 0.2).abs() < 1e-12);
    assert!((pinball(0.1, 8.0, 10.0) - 1.8).abs() < 1e-12);
}

#[test]
fn test_spike_metrics_above_75th_percentile() {
    let (rows, ys) = sample();
    let spike = evaluate(&rows, &ys).unwrap().spike.unwrap();
    assert!((spike.threshold - 350.0).abs() < 1e-12);
    assert_eq!(spike.count, 1);
    assert!((spike.mae - 100.0).abs() < 1e-12);
    assert!((spike.rmse - 100.0).abs() < 1e-12);
    assert!((spike.underprediction_pct - 100.0).abs() < 1e-12);
}

#[test]
fn test_non_finite_targets_skipped() {
    let (rows, mut ys) = sample();
    ys[1] = f64::NAN;
    let m = evaluate(&rows, &ys).unwrap();
    assert_eq!(m.n_scored, 3);
    assert!(evaluate(&rows, &[f64::NAN; 4]).is_none());
    assert!(evaluate(&[], &[]).is_none());
}

#[test]
fn test_constant_targets_have_no_r2_or_spikes() {
    let rows = vec![prow(0.0, 10.0, 20.0); 3];
    let m = evaluate(&rows, &[10.0, 10.0, 10.0]).unwrap();
    assert_eq!(m.r2, None);
    assert_eq!(m.mae, 0.0);
    assert!(m.spike.is_none());
    assert_eq!(m.accuracy_pct, Some(100.0));
}
