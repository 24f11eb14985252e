use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// A batch-relative escalation step: rows whose signal exceeds the batch's
/// `percentile` get `multiplier` applied (cumulative, not compounded).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub percentile: f64,
    pub multiplier: f64,
}

/// Absolute cutoff used instead of percentiles for small batches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackTier {
    pub threshold: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    pub tiers: Vec<Tier>,
    pub fallback: Vec<FallbackTier>,
}

impl TierPolicy {
    pub fn stage1_v1() -> Self {
        Self {
            tiers: vec![
                Tier {
                    percentile: 90.0,
                    multiplier: 2.0,
                },
                Tier {
                    percentile: 95.0,
                    multiplier: 3.0,
                },
                Tier {
                    percentile: 99.0,
                    multiplier: 4.0,
                },
            ],
            fallback: vec![
                FallbackTier {
                    threshold: 30.0,
                    multiplier: 2.0,
                },
                FallbackTier {
                    threshold: 60.0,
                    multiplier: 4.0,
                },
            ],
        }
    }

    pub fn stage2_v1() -> Self {
        Self {
            tiers: vec![
                Tier {
                    percentile: 90.0,
                    multiplier: 5.0,
                },
                Tier {
                    percentile: 95.0,
                    multiplier: 6.5,
                },
                Tier {
                    percentile: 99.0,
                    multiplier: 8.0,
                },
            ],
            fallback: vec![
                FallbackTier {
                    threshold: 20.0,
                    multiplier: 5.0,
                },
                FallbackTier {
                    threshold: 40.0,
                    multiplier: 8.0,
                },
            ],
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let bad_multiplier = |m: f64, prev: f64, first: bool| {
            !(m >= 1.0 && m.is_finite()) || (!first && m <= prev)
        };
        let mut prev_p = 0.0;
        let mut prev_m = 1.0;
        for (i, tier) in self.tiers.iter().enumerate() {
            if !(tier.percentile > 0.0 && tier.percentile < 100.0) {
                return invalid(format!(
                    "{name} tier {i}: percentile {} outside (0, 100)",
                    tier.percentile
                ));
            }
            if i > 0 && tier.percentile <= prev_p {
                return invalid(format!("{name} tier percentiles must strictly increase"));
            }
            if bad_multiplier(tier.multiplier, prev_m, i == 0) {
                return invalid(format!(
                    "{name} tier multipliers must be finite, >= 1 and strictly increase"
                ));
            }
            prev_p = tier.percentile;
            prev_m = tier.multiplier;
        }
        let mut prev_t = f64::NEG_INFINITY;
        let mut prev_m = 1.0;
        for (i, tier) in self.fallback.iter().enumerate() {
            if !tier.threshold.is_finite() || tier.threshold <= prev_t {
                return invalid(format!("{name} fallback thresholds must strictly increase"));
            }
            if bad_multiplier(tier.multiplier, prev_m, i == 0) {
                return invalid(format!(
                    "{name} fallback multipliers must be finite, >= 1 and strictly increase"
                ));
            }
            prev_t = tier.threshold;
            prev_m = tier.multiplier;
        }
        Ok(())
    }
}

/// Either list may be omitted in a profile file; the stage's v1 list fills in.
#[derive(Deserialize)]
struct TierPolicyPatch {
    tiers: Option<Vec<Tier>>,
    fallback: Option<Vec<FallbackTier>>,
}

impl TierPolicyPatch {
    fn over(self, base: TierPolicy) -> TierPolicy {
        TierPolicy {
            tiers: self.tiers.unwrap_or(base.tiers),
            fallback: self.fallback.unwrap_or(base.fallback),
        }
    }
}

fn stage1_policy<'de, D: Deserializer<'de>>(d: D) -> Result<TierPolicy, D::Error> {
    TierPolicyPatch::deserialize(d).map(|p| p.over(TierPolicy::stage1_v1()))
}

fn stage2_policy<'de, D: Deserializer<'de>>(d: D) -> Result<TierPolicy, D::Error> {
    TierPolicyPatch::deserialize(d).map(|p| p.over(TierPolicy::stage2_v1()))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WideningPolicy {
    /// Rows whose median exceeds this batch percentile are widened.
    pub percentile: f64,
    /// Small-batch replacement for `percentile`.
    pub fallback_threshold: f64,
    pub factor: f64,
}

impl WideningPolicy {
    pub fn v1() -> Self {
        Self {
            percentile: 90.0,
            fallback_threshold: 200.0,
            factor: 1.5,
        }
    }
}

impl Default for WideningPolicy {
    fn default() -> Self {
        Self::v1()
    }
}

/// Every tunable of the ensemble. The v1 constants were tuned empirically and
/// are candidates for recalibration against held-out coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleProfile {
    pub blend_weight: f64,
    pub lower_margin: f64,
    pub upper_margin: f64,
    pub small_batch_max_rows: usize,
    #[serde(deserialize_with = "stage1_policy")]
    pub stage1: TierPolicy,
    #[serde(deserialize_with = "stage2_policy")]
    pub stage2: TierPolicy,
    pub widening: WideningPolicy,
    pub epsilon: f64,
}

impl Default for EnsembleProfile {
    fn default() -> Self {
        Self::default_v1()
    }
}

impl EnsembleProfile {
    pub fn default_v1() -> Self {
        Self {
            blend_weight: 0.6,
            lower_margin: 0.5,
            upper_margin: 0.5,
            small_batch_max_rows: 10,
            stage1: TierPolicy::stage1_v1(),
            stage2: TierPolicy::stage2_v1(),
            widening: WideningPolicy::v1(),
            epsilon: 1e-3,
        }
    }

    /// Reads a JSON profile; absent fields keep their v1 defaults.
    pub fn from_json_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidProfile(format!("cannot read {}: {e}", path.display()))
        })?;
        let profile: Self = serde_json::from_str(&text).map_err(|e| {
            ConfigError::InvalidProfile(format!("cannot parse {}: {e}", path.display()))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn is_small_batch(&self, n_rows: usize) -> bool {
        n_rows <= self.small_batch_max_rows
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.blend_weight) {
            return invalid(format!(
                "blend_weight {} outside [0, 1]",
                self.blend_weight
            ));
        }
        let margin_ok = |m: f64| m >= 0.0 && m.is_finite();
        if !(margin_ok(self.lower_margin) && margin_ok(self.upper_margin)) {
            return invalid("margins must be finite and non-negative".to_string());
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return invalid(format!("epsilon {} must be positive", self.epsilon));
        }
        if !(self.widening.factor >= 1.0 && self.widening.factor.is_finite()) {
            return invalid(format!(
                "widening factor {} must be >= 1",
                self.widening.factor
            ));
        }
        if !(self.widening.percentile > 0.0 && self.widening.percentile < 100.0) {
            return invalid(format!(
                "widening percentile {} outside (0, 100)",
                self.widening.percentile
            ));
        }
        if !self.widening.fallback_threshold.is_finite() {
            return invalid(format!(
                "widening fallback_threshold {} must be finite",
                self.widening.fallback_threshold
            ));
        }
        self.stage1.validate("stage1")?;
        self.stage2.validate("stage2")?;
        Ok(())
    }
}

fn invalid(msg: String) -> Result<(), ConfigError> {
    Err(ConfigError::InvalidProfile(msg))
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/profile.rs"]
mod tests;
