//! Model directory loading. Mandatory quantile models fail fast; optional
//! collaborators degrade to [`ScorerSlot::Absent`] with a notice.

pub mod reader;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ArtifactError, ConfigError, DegradedNotice};
use crate::model::{FEATURE_COUNT, FEATURE_NAMES, ModelRole};
use crate::scorer::xgboost::XgbModel;
use crate::scorer::{GatedRegressor, Scorer, ScorerSlot, TreeEnsemble};

use reader::Artifact;

/// File names looked up inside the model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNames {
    pub q10: String,
    pub q50: String,
    pub q90: String,
    pub secondary_median: String,
    pub spike_stage1: String,
    pub spike_stage1_legacy: String,
    pub spike_stage2: String,
}

impl Default for ModelNames {
    fn default() -> Self {
        Self {
            q10: "global_q10.json".to_string(),
            q50: "global_q50.json".to_string(),
            q90: "global_q90.json".to_string(),
            secondary_median: "tft_global_q50.json".to_string(),
            spike_stage1: "global_q50_spike.json".to_string(),
            spike_stage1_legacy: "global_q50_spike.model".to_string(),
            spike_stage2: "global_q50_extreme_spike.json".to_string(),
        }
    }
}

impl ModelNames {
    /// File names to try for `role`, in preference order.
    pub fn candidates(&self, role: ModelRole) -> Vec<String> {
        let primary: Vec<&str> = match role {
            ModelRole::Q10 => vec![self.q10.as_str()],
            ModelRole::Q50 => vec![self.q50.as_str()],
            ModelRole::Q90 => vec![self.q90.as_str()],
            ModelRole::SecondaryMedian => vec![self.secondary_median.as_str()],
            ModelRole::SpikeStage1 => vec![
                self.spike_stage1.as_str(),
                self.spike_stage1_legacy.as_str(),
            ],
            ModelRole::SpikeStage2 => vec![self.spike_stage2.as_str()],
        };
        let mut out = Vec::with_capacity(primary.len() * 2);
        for name in primary {
            out.push(name.to_string());
            out.push(format!("{name}.gz"));
        }
        out
    }
}

/// All scorers the engine runs. Exclusively owned by the engine once built.
pub struct ModelSet {
    pub q10: Box<dyn Scorer>,
    pub q50: Box<dyn Scorer>,
    pub q90: Box<dyn Scorer>,
    pub secondary_median: ScorerSlot,
    pub spike_stage1: ScorerSlot,
    pub spike_stage2: ScorerSlot,
    notices: Vec<DegradedNotice>,
}

impl ModelSet {
    pub fn new(
        q10: impl Scorer + 'static,
        q50: impl Scorer + 'static,
        q90: impl Scorer + 'static,
    ) -> Self {
        Self {
            q10: Box::new(q10),
            q50: Box::new(q50),
            q90: Box::new(q90),
            secondary_median: ScorerSlot::Absent,
            spike_stage1: ScorerSlot::Absent,
            spike_stage2: ScorerSlot::Absent,
            notices: Vec::new(),
        }
    }

    pub fn with_secondary_median(mut self, scorer: impl Scorer + 'static) -> Self {
        self.secondary_median = ScorerSlot::present(scorer);
        self
    }

    pub fn with_spike_stage1(mut self, scorer: impl Scorer + 'static) -> Self {
        self.spike_stage1 = ScorerSlot::present(scorer);
        self
    }

    pub fn with_spike_stage2(mut self, scorer: impl Scorer + 'static) -> Self {
        self.spike_stage2 = ScorerSlot::present(scorer);
        self
    }

    pub fn get(&self, role: ModelRole) -> Option<&dyn Scorer> {
        match role {
            ModelRole::Q10 => Some(self.q10.as_ref()),
            ModelRole::Q50 => Some(self.q50.as_ref()),
            ModelRole::Q90 => Some(self.q90.as_ref()),
            ModelRole::SecondaryMedian => self.secondary_median.get(),
            ModelRole::SpikeStage1 => self.spike_stage1.get(),
            ModelRole::SpikeStage2 => self.spike_stage2.get(),
        }
    }

    pub fn notices(&self) -> &[DegradedNotice] {
        &self.notices
    }

    /// Checks every scorer against the fixed feature width. A mandatory
    /// mismatch is fatal; an optional one turns the slot `Absent`.
    pub fn reconcile(&mut self) -> Result<(), ConfigError> {
        for (role, scorer) in [
            (ModelRole::Q10, &self.q10),
            (ModelRole::Q50, &self.q50),
            (ModelRole::Q90, &self.q90),
        ] {
            if scorer.input_width() != FEATURE_COUNT {
                return Err(ConfigError::IncompatibleWidth {
                    role,
                    expected: FEATURE_COUNT,
                    found: scorer.input_width(),
                });
            }
        }
        for role in [
            ModelRole::SecondaryMedian,
            ModelRole::SpikeStage1,
            ModelRole::SpikeStage2,
        ] {
            let slot = self.slot_mut(role);
            let width = match slot.get() {
                Some(s) if s.input_width() != FEATURE_COUNT => s.input_width(),
                _ => continue,
            };
            *slot = ScorerSlot::Absent;
            self.degrade(
                role,
                format!("expects {width} features, feature vectors carry {FEATURE_COUNT}"),
            );
        }
        Ok(())
    }

    fn slot_mut(&mut self, role: ModelRole) -> &mut ScorerSlot {
        match role {
            ModelRole::SpikeStage1 => &mut self.spike_stage1,
            ModelRole::SpikeStage2 => &mut self.spike_stage2,
            _ => &mut self.secondary_median,
        }
    }

    fn degrade(&mut self, role: ModelRole, reason: String) {
        let notice = DegradedNotice { role, reason };
        warn!("{notice}");
        self.notices.push(notice);
    }
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("q10", &self.q10.kind())
            .field("q50", &self.q50.kind())
            .field("q90", &self.q90.kind())
            .field("secondary_median", &self.secondary_median)
            .field("spike_stage1", &self.spike_stage1)
            .field("spike_stage2", &self.spike_stage2)
            .finish()
    }
}

pub fn load_model_set(dir: &Path, names: &ModelNames) -> Result<ModelSet, ConfigError> {
    info!(dir = %dir.display(), "loading models");
    let q10 = load_mandatory(dir, names, ModelRole::Q10)?;
    let q50 = load_mandatory(dir, names, ModelRole::Q50)?;
    let q90 = load_mandatory(dir, names, ModelRole::Q90)?;

    let mut set = ModelSet {
        q10,
        q50,
        q90,
        secondary_median: ScorerSlot::Absent,
        spike_stage1: ScorerSlot::Absent,
        spike_stage2: ScorerSlot::Absent,
        notices: Vec::new(),
    };

    for role in [
        ModelRole::SecondaryMedian,
        ModelRole::SpikeStage1,
        ModelRole::SpikeStage2,
    ] {
        let Some(path) = locate(dir, &names.candidates(role)) else {
            set.degrade(role, "no model file found".to_string());
            continue;
        };
        match load_scorer(role, &path) {
            Ok(scorer) => {
                info!(role = %role, path = %path.display(), kind = scorer.kind(), "loaded optional model");
                *set.slot_mut(role) = ScorerSlot::Present(scorer);
            }
            Err(err) => set.degrade(role, format!("{}: {err}", path.display())),
        }
    }

    set.reconcile()?;
    info!(
        secondary_median = set.secondary_median.is_present(),
        spike_stage1 = set.spike_stage1.is_present(),
        spike_stage2 = set.spike_stage2.is_present(),
        "model set ready"
    );
    Ok(set)
}

fn load_mandatory(
    dir: &Path,
    names: &ModelNames,
    role: ModelRole,
) -> Result<Box<dyn Scorer>, ConfigError> {
    let candidates = names.candidates(role);
    let path = locate(dir, &candidates).ok_or_else(|| ConfigError::MissingModel {
        role,
        path: dir.join(&candidates[0]),
    })?;
    let scorer = load_scorer(role, &path).map_err(|source| ConfigError::InvalidArtifact {
        role,
        path: path.clone(),
        source,
    })?;
    info!(role = %role, path = %path.display(), kind = scorer.kind(), "loaded model");
    Ok(scorer)
}

fn locate(dir: &Path, candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn load_scorer(role: ModelRole, path: &Path) -> Result<Box<dyn Scorer>, ArtifactError> {
    let artifact = Artifact::open(path)?;
    if role == ModelRole::SecondaryMedian {
        let model = match artifact {
            Artifact::Mapped(bytes) => GatedRegressor::from_slice(&bytes)?,
            Artifact::Gzip(stream) => GatedRegressor::from_reader(stream)?,
        };
        return Ok(Box::new(model));
    }
    let model = match artifact {
        Artifact::Mapped(bytes) => XgbModel::from_slice(&bytes)?,
        Artifact::Gzip(stream) => XgbModel::from_reader(stream)?,
    };
    let forest = model.into_ensemble()?;
    debug!(path = %path.display(), trees = forest.n_trees(), base_score = forest.base_score(), "parsed booster");
    check_feature_order(&forest)?;
    Ok(Box::new(forest))
}

/// Models that carry feature names must list them in canonical slot order.
fn check_feature_order(forest: &TreeEnsemble) -> Result<(), ArtifactError> {
    let names = forest.feature_names();
    if names.len() != FEATURE_COUNT {
        return Ok(());
    }
    match names.iter().zip(FEATURE_NAMES).position(|(a, b)| a != b) {
        Some(slot) => Err(ArtifactError::Malformed(format!(
            "feature order differs at slot {slot}: model has `{}`, expected `{}`",
            names[slot], FEATURE_NAMES[slot]
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/artifacts/tests.rs"]
mod tests;
