//! Batch CSV reading. Columns are matched by header name and reordered into
//! canonical slot order; the file's own column order does not matter.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;
use tracing::{debug, info, warn};

use crate::error::InputError;
use crate::model::{FEATURE_COUNT, FEATURE_NAMES, FeatureBatch, FeatureVector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOptions {
    pub key_column: String,
    pub target_column: String,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            key_column: "date".to_string(),
            target_column: "admissions".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputBatch {
    pub batch: FeatureBatch,
    /// Observed targets, one per row, when the target column is present.
    pub targets: Option<Vec<f64>>,
    /// Canonical features the file did not carry; filled with 0.
    pub missing_features: Vec<&'static str>,
}

impl InputBatch {
    pub fn require_targets(&self, column: &str) -> Result<&[f64], InputError> {
        self.targets
            .as_deref()
            .ok_or_else(|| InputError::MissingTarget(column.to_string()))
    }
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, InputError> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Tab-separated when the name (ignoring `.gz`) ends in `.tsv`, comma otherwise.
fn delimiter_for(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".tsv") { b'\t' } else { b',' }
}

pub fn read_batch(path: &Path, opts: &InputOptions) -> Result<InputBatch, InputError> {
    let reader = open_maybe_gz(path)?;
    let input = read_batch_from(reader, delimiter_for(path), opts)?;
    info!(
        path = %path.display(),
        rows = input.batch.len(),
        has_targets = input.targets.is_some(),
        "input loaded"
    );
    Ok(input)
}

pub fn read_batch_from<R: Read>(
    reader: R,
    delimiter: u8,
    opts: &InputOptions,
) -> Result<InputBatch, InputError> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = csv.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let key_idx = position(&opts.key_column)
        .ok_or_else(|| InputError::MissingKeyColumn(opts.key_column.clone()))?;
    let target_idx = position(&opts.target_column);

    let slots: Vec<Option<usize>> = FEATURE_NAMES.iter().map(|&name| position(name)).collect();
    let missing_features: Vec<&'static str> = FEATURE_NAMES
        .iter()
        .zip(&slots)
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing_features.is_empty() {
        warn!(
            missing = missing_features.len(),
            columns = %missing_features.join(","),
            "feature columns absent from input; filled with 0"
        );
    }
    debug!(
        columns = headers.len(),
        matched = FEATURE_COUNT - missing_features.len(),
        "input header mapped"
    );

    let mut batch = FeatureBatch::new();
    let mut targets = target_idx.map(|_| Vec::new());

    for record in csv.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != headers.len() {
            return Err(InputError::RowWidth {
                line,
                expected: headers.len(),
                found: record.len(),
            });
        }

        let mut values = [0.0f32; FEATURE_COUNT];
        for (slot, idx) in slots.iter().enumerate() {
            if let Some(idx) = *idx {
                values[slot] = parse_cell(&record[idx], line, FEATURE_NAMES[slot], f32::NAN)?;
            }
        }
        if let (Some(idx), Some(out)) = (target_idx, targets.as_mut()) {
            out.push(parse_cell(&record[idx], line, &opts.target_column, f64::NAN)?);
        }
        batch.push(record[key_idx].trim(), FeatureVector::new(values));
    }

    Ok(InputBatch {
        batch,
        targets,
        missing_features,
    })
}

/// Empty cells take `missing`.
fn parse_cell<T: FromStr>(raw: &str, line: u64, column: &str, missing: T) -> Result<T, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(missing);
    }
    raw.parse::<T>().map_err(|_| InputError::InvalidValue {
        line,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
