use crate::error::EngineError;
use crate::model::{FeatureVector, ModelRole, QuantileTriple};
use crate::pipeline::invoke;
use crate::pipeline::stage1_base::ScoredBatch;
use crate::scorer::Scorer;

/// `median' = w * alt + (1 - w) * median`. Lower and upper are never touched;
/// without a secondary estimator the batch passes through unchanged.
pub fn run_stage2(
    scored: ScoredBatch,
    secondary: Option<&dyn Scorer>,
    rows: &[FeatureVector],
    weight: f64,
) -> Result<ScoredBatch, EngineError> {
    let Some(scorer) = secondary else {
        return Ok(scored);
    };
    let alt = invoke(scorer, ModelRole::SecondaryMedian, rows)?;
    let triples = scored
        .triples
        .iter()
        .zip(&alt)
        .map(|(t, &a)| QuantileTriple::new(t.lower, weight * a + (1.0 - weight) * t.median, t.upper))
        .collect();
    Ok(ScoredBatch {
        triples,
        base_median: scored.base_median,
        blended: true,
    })
}
