//! Uniform `score(batch) -> floats` contract over heterogeneous model families.

pub mod forest;
pub mod gated;
pub mod xgboost;

use crate::error::ScoringError;
use crate::model::FeatureVector;

pub use forest::TreeEnsemble;
pub use gated::GatedRegressor;

/// A loaded regressor. Implementations are read-only after construction and
/// must be safe to call from several threads at once.
pub trait Scorer: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Number of feature slots the model was trained on.
    fn input_width(&self) -> usize;

    /// One value per row, in row order.
    fn score(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ScoringError>;
}

/// Optional collaborator, resolved once at load time.
pub enum ScorerSlot {
    Present(Box<dyn Scorer>),
    Absent,
}

impl ScorerSlot {
    pub fn present(scorer: impl Scorer + 'static) -> Self {
        ScorerSlot::Present(Box::new(scorer))
    }

    pub fn get(&self) -> Option<&dyn Scorer> {
        match self {
            ScorerSlot::Present(s) => Some(s.as_ref()),
            ScorerSlot::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ScorerSlot::Present(_))
    }
}

impl std::fmt::Debug for ScorerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerSlot::Present(s) => write!(f, "Present({})", s.kind()),
            ScorerSlot::Absent => f.write_str("Absent"),
        }
    }
}

pub fn check_width(expected: usize, rows: &[FeatureVector]) -> Result<(), ScoringError> {
    match rows.first() {
        Some(row) if row.width() != expected => Err(ScoringError::WidthMismatch {
            expected,
            found: row.width(),
        }),
        _ => Ok(()),
    }
}

/// Validates a raw scorer result against its batch: same length, all finite.
pub fn check_output(n_rows: usize, values: &[f64]) -> Result<(), ScoringError> {
    if values.len() != n_rows {
        return Err(ScoringError::LengthMismatch {
            expected: n_rows,
            found: values.len(),
        });
    }
    if let Some((row, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(ScoringError::NonFinite { row, value });
    }
    Ok(())
}
