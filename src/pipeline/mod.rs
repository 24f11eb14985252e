//! Ensemble orchestration: base bank, median blend, spike cascade,
//! consistency enforcement and assembly, in that fixed order.
//!
//! Each stage consumes the previous stage's output type, so a batch cannot
//! reach the enforcer without passing through correction first.

pub mod stage1_base;
pub mod stage2_blend;
pub mod stage3_spike;
pub mod stage4_consistency;
pub mod stage5_assemble;

use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::artifacts::{ModelNames, ModelSet, load_model_set};
use crate::error::{DegradedNotice, EngineError};
use crate::model::flags::RowFlag;
use crate::model::{EnsembleProfile, FeatureBatch, FeatureVector, ModelRole};
use crate::scorer::{Scorer, check_output};

use stage1_base::run_stage1;
use stage2_blend::run_stage2;
use stage3_spike::run_stage3;
use stage4_consistency::run_stage4;
use stage5_assemble::run_stage5;

pub use stage5_assemble::{Prediction, PredictionRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    ModelsLoaded,
    BatchScored,
    CorrectionApplied,
    Consistent,
    Done,
}

fn transition(from: EngineState, to: EngineState, rows: usize) {
    debug!(?from, ?to, rows, "engine state");
}

/// Runs one scorer over the batch and validates its output, tagging any
/// failure with the role that produced it.
pub(crate) fn invoke(
    scorer: &dyn Scorer,
    role: ModelRole,
    rows: &[FeatureVector],
) -> Result<Vec<f64>, EngineError> {
    let tag = |source| EngineError::Scoring { role, source };
    let values = scorer.score(rows).map_err(tag)?;
    check_output(rows.len(), &values).map_err(tag)?;
    Ok(values)
}

/// Owns every scorer for the life of the process. Shared by reference across
/// worker threads; nothing is mutated after construction.
#[derive(Debug)]
pub struct EnsembleEngine {
    models: ModelSet,
    profile: EnsembleProfile,
}

impl EnsembleEngine {
    pub fn load(
        model_dir: &Path,
        names: &ModelNames,
        profile: EnsembleProfile,
    ) -> Result<Self, EngineError> {
        profile.validate()?;
        let models = load_model_set(model_dir, names)?;
        Self::new(models, profile)
    }

    pub fn new(mut models: ModelSet, profile: EnsembleProfile) -> Result<Self, EngineError> {
        profile.validate()?;
        models.reconcile()?;
        transition(EngineState::Idle, EngineState::ModelsLoaded, 0);
        Ok(Self { models, profile })
    }

    pub fn profile(&self) -> &EnsembleProfile {
        &self.profile
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn notices(&self) -> &[DegradedNotice] {
        self.models.notices()
    }

    /// Either every row comes back order-consistent or the whole batch fails.
    pub fn predict(&self, batch: &FeatureBatch) -> Result<Prediction, EngineError> {
        let rows = batch.rows();
        let n = rows.len();
        if n == 0 {
            return Ok(Prediction::default());
        }

        let scored = run_stage1(&self.models, rows, &self.profile)?;
        let scored = run_stage2(
            scored,
            self.models.secondary_median.get(),
            rows,
            self.profile.blend_weight,
        )?;
        let blended = scored.blended;
        transition(EngineState::ModelsLoaded, EngineState::BatchScored, n);

        let corrected = run_stage3(
            scored,
            self.models.spike_stage1.get(),
            self.models.spike_stage2.get(),
            rows,
            &self.profile,
        )?;
        transition(EngineState::BatchScored, EngineState::CorrectionApplied, n);

        let consistent = run_stage4(corrected, &self.profile);
        transition(EngineState::CorrectionApplied, EngineState::Consistent, n);
        debug!(
            rows = n,
            stage1_tiered = consistent.count_flag(RowFlag::Stage1Tiered),
            stage2_tiered = consistent.count_flag(RowFlag::Stage2Tiered),
            widened = consistent.count_flag(RowFlag::Widened),
            "batch corrected"
        );

        let prediction = run_stage5(batch.keys(), consistent, blended);
        transition(EngineState::Consistent, EngineState::Done, n);
        Ok(prediction)
    }

    /// Independent batches in parallel. Each batch is tiered against its own
    /// distribution; on failure the lowest-indexed batch error is returned.
    pub fn predict_many(&self, batches: &[FeatureBatch]) -> Result<Vec<Prediction>, EngineError> {
        let results: Vec<Result<Prediction, EngineError>> =
            batches.par_iter().map(|b| self.predict(b)).collect();
        results.into_iter().collect()
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/engine.rs"]
mod tests;
