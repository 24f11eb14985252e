use serde::Serialize;

use crate::model::flags::{RowDiagnostics, RowFlag};
use crate::pipeline::stage4_consistency::ConsistentBatch;

/// One output record `{key, lower, median, upper}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub key: String,
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prediction {
    pub rows: Vec<PredictionRow>,
    pub diagnostics: Vec<RowDiagnostics>,
    pub blended: bool,
}

impl Prediction {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count_flag(&self, flag: RowFlag) -> usize {
        self.diagnostics.iter().filter(|d| d.has(flag)).count()
    }

    /// Concatenates per-batch predictions, keeping their order.
    pub fn concat(parts: Vec<Prediction>) -> Prediction {
        let mut out = Prediction::default();
        for part in parts {
            out.blended |= part.blended;
            out.rows.extend(part.rows);
            out.diagnostics.extend(part.diagnostics);
        }
        out
    }
}

/// Pairs each triple with its row key, in input order.
pub fn run_stage5(keys: &[String], consistent: ConsistentBatch, blended: bool) -> Prediction {
    let rows = keys
        .iter()
        .zip(&consistent.triples)
        .map(|(key, t)| PredictionRow {
            key: key.clone(),
            lower: t.lower,
            median: t.median,
            upper: t.upper,
        })
        .collect();
    Prediction {
        rows,
        diagnostics: consistent.diagnostics,
        blended,
    }
}
