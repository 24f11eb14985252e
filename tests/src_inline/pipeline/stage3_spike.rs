use super::*;
use crate::model::profile::TierPolicy;
use crate::test_support::{ConstScorer, SlotScorer, batch_with_slot};

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

#[test]
fn test_small_batch_uses_absolute_fallback() {
    let policy = TierPolicy::stage1_v1();
    let out = apply_tiers(&[70.0, 45.0, 30.0, -5.0], &policy, true);
    assert_eq!(out.scaled, vec![280.0, 90.0, 30.0, -5.0]);
    assert_eq!(out.tiers, vec![2, 1, 0, 0]);
    assert_eq!(out.tiered_rows(), 2);
}

#[test]
fn test_stage2_fallback_is_steeper() {
    let policy = TierPolicy::stage2_v1();
    let out = apply_tiers(&[25.0, 45.0, 20.0], &policy, true);
    assert_eq!(out.scaled, vec![125.0, 360.0, 20.0]);
    assert_eq!(out.tiers, vec![1, 2, 0]);
}

#[test]
fn test_percentile_tiers_are_cumulative() {
    let raw = ramp(100);
    let out = apply_tiers(&raw, &TierPolicy::stage1_v1(), false);
    // p90 = 89.1, p95 = 94.05, p99 = 98.01
    assert_eq!(out.scaled[89], 89.0);
    assert_eq!(out.tiers[89], 0);
    assert_eq!(out.scaled[90], 180.0);
    assert_eq!(out.tiers[90], 1);
    assert_eq!(out.scaled[95], 285.0);
    assert_eq!(out.tiers[95], 2);
    assert_eq!(out.scaled[99], 396.0);
    assert_eq!(out.tiers[99], 3);
}

#[test]
fn test_monotonic_escalation() {
    let raw = ramp(100);
    let out = apply_tiers(&raw, &TierPolicy::stage1_v1(), false);
    let (a, b) = (92, 99);
    assert!(raw[a] < raw[b]);
    let mult_a = out.scaled[a] / raw[a];
    let mult_b = out.scaled[b] / raw[b];
    assert!(mult_b > mult_a);
    assert!(out.tiers[b] > out.tiers[a]);
}

#[test]
fn test_constant_signal_has_no_tiered_rows() {
    let raw = vec![12.0; 50];
    let out = apply_tiers(&raw, &TierPolicy::stage1_v1(), false);
    assert_eq!(out.scaled, raw);
    assert_eq!(out.tiered_rows(), 0);
}

#[test]
fn test_empty_signal() {
    let out = apply_tiers(&[], &TierPolicy::stage2_v1(), false);
    assert!(out.scaled.is_empty());
    let out = apply_tiers(&[], &TierPolicy::stage2_v1(), true);
    assert!(out.tiers.is_empty());
}

#[test]
fn test_single_row_correction_shifts_all_bounds() {
    let batch = batch_with_slot(0, &[0.0]);
    let scored = ScoredBatch::unblended(vec![QuantileTriple::new(79.5, 120.0, 160.5)]);
    let s1 = ConstScorer(70.0);
    let out = run_stage3(
        scored,
        Some(&s1),
        None,
        batch.rows(),
        &EnsembleProfile::default_v1(),
    )
    .unwrap();
    assert_eq!(out.correction, vec![280.0]);
    assert_eq!(out.triples[0], QuantileTriple::new(359.5, 400.0, 440.5));
    assert_eq!(out.base_median, vec![400.0]);
    assert_eq!(out.stage2.scaled, vec![0.0]);
    assert!(out.any_correction());
}

#[test]
fn test_absent_stages_contribute_zero() {
    let batch = batch_with_slot(0, &[1.0, 2.0, 3.0]);
    let triples = vec![QuantileTriple::new(1.0, 2.0, 3.0); 3];
    let scored = ScoredBatch::unblended(triples.clone());
    let out = run_stage3(scored, None, None, batch.rows(), &EnsembleProfile::default_v1()).unwrap();
    assert_eq!(out.triples, triples);
    assert!(!out.any_correction());
}

#[test]
fn test_both_stages_sum() {
    let values: Vec<f32> = (0..20).map(|i| i as f32).collect();
    let batch = batch_with_slot(0, &values);
    let scored = ScoredBatch::unblended(vec![QuantileTriple::new(0.0, 0.0, 0.0); 20]);
    let s1 = SlotScorer { slot: 0, offset: 0.0 };
    let s2 = ConstScorer(1.0);
    let out = run_stage3(
        scored,
        Some(&s1),
        Some(&s2),
        batch.rows(),
        &EnsembleProfile::default_v1(),
    )
    .unwrap();
    // stage1 p99 of 0..19 is 18.81; row 19 takes 4x. Stage2 is flat: no tiers.
    assert_eq!(out.correction[19], 19.0 * 4.0 + 1.0);
    assert_eq!(out.correction[0], 1.0);
    assert_eq!(out.stage2.tiered_rows(), 0);
    assert_eq!(out.triples[19].median, out.correction[19]);
}
