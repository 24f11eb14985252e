use std::path::PathBuf;

use crate::model::role::ModelRole;

/// Problems with a model file itself, independent of which role it fills.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported model: {0}")]
    Unsupported(String),
    #[error("malformed model: {0}")]
    Malformed(String),
}

/// Fatal set-up problems. The engine refuses to start rather than substitute
/// a default prediction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("mandatory {role} model not found at {}", path.display())]
    MissingModel { role: ModelRole, path: PathBuf },
    #[error("{role} model expects {found} features, feature vectors carry {expected}")]
    IncompatibleWidth {
        role: ModelRole,
        expected: usize,
        found: usize,
    },
    #[error("cannot load {role} model from {}: {source}", path.display())]
    InvalidArtifact {
        role: ModelRole,
        path: PathBuf,
        #[source]
        source: ArtifactError,
    },
    #[error("invalid ensemble profile: {0}")]
    InvalidProfile(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("feature width mismatch: model expects {expected}, rows carry {found}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("scorer returned {found} values for {expected} rows")]
    LengthMismatch { expected: usize, found: usize },
    #[error("non-finite score {value} at row {row}")]
    NonFinite { row: usize, value: f64 },
}

/// Batch input problems. Line numbers are 1-based and count the header.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("input has no `{0}` column")]
    MissingKeyColumn(String),
    #[error("line {line}, column `{column}`: cannot parse `{value}` as a number")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },
    #[error("line {line}: row has {found} fields, header has {expected}")]
    RowWidth {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("input has no `{0}` column; evaluation needs observed targets")]
    MissingTarget(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("scoring failed in {role} model: {source}")]
    Scoring {
        role: ModelRole,
        #[source]
        source: ScoringError,
    },
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }
}

/// An optional collaborator that could not be used. Not an error: the engine
/// keeps running with that contribution set to zero / no blend.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DegradedNotice {
    pub role: ModelRole,
    pub reason: String,
}

impl std::fmt::Display for DegradedNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} model unavailable ({}); continuing without it", self.role, self.reason)
    }
}
