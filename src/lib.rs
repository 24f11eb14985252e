//! Quantile-ensemble inference for patient inflow intervals.
//!
//! Three base quantile scorers, an optional secondary median, and a two-stage
//! spike correction cascade are combined into order-consistent
//! `(lower, median, upper)` triples, one per input row.

pub mod artifacts;
pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod scorer;
pub mod stats;

pub use artifacts::{ModelNames, ModelSet, load_model_set};
pub use error::{ConfigError, DegradedNotice, EngineError, InputError, ScoringError};
pub use model::{EnsembleProfile, FeatureBatch, FeatureVector, ModelRole, QuantileTriple};
pub use pipeline::{EnsembleEngine, Prediction, PredictionRow};
pub use scorer::{Scorer, ScorerSlot};

#[cfg(test)]
#[path = "../tests/src_inline/support.rs"]
mod test_support;
