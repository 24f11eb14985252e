use crate::model::flags::{RowDiagnostics, RowFlag};
use crate::model::{EnsembleProfile, QuantileTriple};
use crate::pipeline::stage3_spike::CorrectedBatch;
use crate::stats::percentile;

/// Final triples, each satisfying `lower <= median - eps` and
/// `upper >= median + eps`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistentBatch {
    pub triples: Vec<QuantileTriple>,
    pub diagnostics: Vec<RowDiagnostics>,
}

impl ConsistentBatch {
    pub fn count_flag(&self, flag: RowFlag) -> usize {
        self.diagnostics.iter().filter(|d| d.has(flag)).count()
    }
}

/// Rows whose corrected base median is extreme for this batch. The secondary
/// blend plays no part, so bounds do not depend on it. All false when no
/// correction was applied anywhere in the batch.
pub fn extreme_rows(corrected: &CorrectedBatch, profile: &EnsembleProfile) -> Vec<bool> {
    let n = corrected.triples.len();
    if !corrected.any_correction() {
        return vec![false; n];
    }
    let medians = &corrected.base_median;
    let cutoff = if profile.is_small_batch(n) {
        profile.widening.fallback_threshold
    } else {
        match percentile(medians, profile.widening.percentile) {
            Some(p) => p,
            None => return Vec::new(),
        }
    };
    medians.iter().map(|&m| m > cutoff).collect()
}

/// Widening first, then the epsilon clamp. Pure arithmetic; cannot fail.
pub fn run_stage4(corrected: CorrectedBatch, profile: &EnsembleProfile) -> ConsistentBatch {
    let extreme = extreme_rows(&corrected, profile);
    let eps = profile.epsilon;

    let mut triples = Vec::with_capacity(corrected.triples.len());
    let mut diagnostics = Vec::with_capacity(corrected.triples.len());

    for (i, t) in corrected.triples.iter().enumerate() {
        let mut diag = RowDiagnostics {
            stage1_tier: corrected.stage1.tiers[i],
            stage2_tier: corrected.stage2.tiers[i],
            correction: corrected.correction[i],
            flags: Vec::new(),
        };
        if diag.stage1_tier > 0 {
            diag.flags.push(RowFlag::Stage1Tiered);
        }
        if diag.stage2_tier > 0 {
            diag.flags.push(RowFlag::Stage2Tiered);
        }

        let mut t = *t;
        if extreme.get(i).copied().unwrap_or(false) {
            t = t.widened(profile.widening.factor);
            diag.flags.push(RowFlag::Widened);
        }

        let lower = t.lower.min(t.median - eps);
        let upper = t.upper.max(t.median + eps);
        if lower != t.lower {
            diag.flags.push(RowFlag::LowerClamped);
        }
        if upper != t.upper {
            diag.flags.push(RowFlag::UpperClamped);
        }

        triples.push(QuantileTriple::new(lower, t.median, upper));
        diagnostics.push(diag);
    }

    ConsistentBatch {
        triples,
        diagnostics,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_consistency.rs"]
mod tests;
