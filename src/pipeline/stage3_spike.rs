use tracing::debug;

use crate::error::EngineError;
use crate::model::profile::TierPolicy;
use crate::model::{EnsembleProfile, FeatureVector, ModelRole, QuantileTriple};
use crate::pipeline::invoke;
use crate::pipeline::stage1_base::ScoredBatch;
use crate::scorer::Scorer;
use crate::stats::percentile_sorted;

/// One correction stage after tiering. `tiers[i]` is 0 when row `i` stayed
/// unscaled, otherwise the 1-based index of the highest tier it exceeded.
#[derive(Debug, Clone, PartialEq)]
pub struct TierOutcome {
    pub scaled: Vec<f64>,
    pub tiers: Vec<u8>,
}

impl TierOutcome {
    fn zeros(n: usize) -> Self {
        Self {
            scaled: vec![0.0; n],
            tiers: vec![0; n],
        }
    }

    pub fn tiered_rows(&self) -> usize {
        self.tiers.iter().filter(|&&t| t > 0).count()
    }
}

/// Triples shifted by the summed correction of both stages. `base_median` is
/// the unblended q50 shifted by the same correction.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedBatch {
    pub triples: Vec<QuantileTriple>,
    pub base_median: Vec<f64>,
    pub correction: Vec<f64>,
    pub stage1: TierOutcome,
    pub stage2: TierOutcome,
}

impl CorrectedBatch {
    pub fn any_correction(&self) -> bool {
        self.correction.iter().any(|&c| c != 0.0)
    }
}

/// Scales raw corrections by the highest tier each row exceeds (strict `>`).
/// Multipliers are cumulative, never compounded. Small batches use the
/// policy's absolute cutoffs instead of batch percentiles.
pub fn apply_tiers(raw: &[f64], policy: &TierPolicy, small_batch: bool) -> TierOutcome {
    let cutoffs: Vec<(f64, f64)> = if small_batch {
        policy
            .fallback
            .iter()
            .map(|t| (t.threshold, t.multiplier))
            .collect()
    } else {
        let mut sorted = raw.to_vec();
        sorted.sort_by(f64::total_cmp);
        policy
            .tiers
            .iter()
            .map(|t| (percentile_sorted(&sorted, t.percentile), t.multiplier))
            .collect()
    };

    let mut out = TierOutcome::zeros(raw.len());
    for (i, &c) in raw.iter().enumerate() {
        let hit = cutoffs.iter().rposition(|&(cut, _)| c > cut);
        match hit {
            Some(idx) => {
                out.scaled[i] = c * cutoffs[idx].1;
                out.tiers[i] = (idx + 1) as u8;
            }
            None => out.scaled[i] = c,
        }
    }
    out
}

fn run_stage(
    scorer: Option<&dyn Scorer>,
    role: ModelRole,
    rows: &[FeatureVector],
    policy: &TierPolicy,
    small_batch: bool,
) -> Result<TierOutcome, EngineError> {
    match scorer {
        Some(scorer) => {
            let raw = invoke(scorer, role, rows)?;
            Ok(apply_tiers(&raw, policy, small_batch))
        }
        None => Ok(TierOutcome::zeros(rows.len())),
    }
}

pub fn run_stage3(
    scored: ScoredBatch,
    stage1: Option<&dyn Scorer>,
    stage2: Option<&dyn Scorer>,
    rows: &[FeatureVector],
    profile: &EnsembleProfile,
) -> Result<CorrectedBatch, EngineError> {
    let small_batch = profile.is_small_batch(rows.len());
    let s1 = run_stage(stage1, ModelRole::SpikeStage1, rows, &profile.stage1, small_batch)?;
    let s2 = run_stage(stage2, ModelRole::SpikeStage2, rows, &profile.stage2, small_batch)?;
    debug!(
        small_batch,
        stage1_tiered = s1.tiered_rows(),
        stage2_tiered = s2.tiered_rows(),
        "spike tiers"
    );

    let correction: Vec<f64> = s1.scaled.iter().zip(&s2.scaled).map(|(a, b)| a + b).collect();
    let triples = scored
        .triples
        .iter()
        .zip(&correction)
        .map(|(t, &c)| t.shifted(c))
        .collect();
    let base_median = scored
        .base_median
        .iter()
        .zip(&correction)
        .map(|(m, c)| m + c)
        .collect();

    Ok(CorrectedBatch {
        triples,
        base_median,
        correction,
        stage1: s1,
        stage2: s2,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_spike.rs"]
mod tests;
