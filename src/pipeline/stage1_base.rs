use crate::artifacts::ModelSet;
use crate::error::EngineError;
use crate::model::{EnsembleProfile, FeatureVector, ModelRole, QuantileTriple};
use crate::pipeline::invoke;

/// Raw `(lower, median, upper)` per row. Ordering is not yet guaranteed.
/// `base_median` keeps the q50 output and never sees the secondary blend.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBatch {
    pub triples: Vec<QuantileTriple>,
    pub base_median: Vec<f64>,
    pub blended: bool,
}

impl ScoredBatch {
    pub fn unblended(triples: Vec<QuantileTriple>) -> Self {
        let base_median = triples.iter().map(|t| t.median).collect();
        Self {
            triples,
            base_median,
            blended: false,
        }
    }
}

/// Each base scorer runs once over the whole batch; the tails get the fixed
/// margin offsets, the median none.
pub fn run_stage1(
    models: &ModelSet,
    rows: &[FeatureVector],
    profile: &EnsembleProfile,
) -> Result<ScoredBatch, EngineError> {
    let q10 = invoke(models.q10.as_ref(), ModelRole::Q10, rows)?;
    let q50 = invoke(models.q50.as_ref(), ModelRole::Q50, rows)?;
    let q90 = invoke(models.q90.as_ref(), ModelRole::Q90, rows)?;

    let triples: Vec<QuantileTriple> = q10
        .iter()
        .zip(&q50)
        .zip(&q90)
        .map(|((&lo, &mid), &hi)| {
            QuantileTriple::new(lo - profile.lower_margin, mid, hi + profile.upper_margin)
        })
        .collect();

    Ok(ScoredBatch::unblended(triples))
}
