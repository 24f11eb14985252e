pub mod metrics;
pub mod text;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::DegradedNotice;
use crate::model::flags::RowFlag;
use crate::model::role::role_order;
use crate::model::{EnsembleProfile, ModelRole};
use crate::pipeline::{EnsembleEngine, Prediction};
use crate::stats::{median, p90, p99};

use metrics::Metrics;
use text::render_report_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportMode {
    /// key, lower, median, upper
    Basic,
    /// adds tiers, correction and flags per row
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedStats {
    pub median: f64,
    pub p90: f64,
    pub p99: f64,
}

impl NamedStats {
    pub fn of(values: &[f64]) -> Self {
        Self {
            median: median(values),
            p90: p90(values),
            p99: p99(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub role: ModelRole,
    pub required: bool,
    pub present: bool,
    pub kind: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagCounts {
    pub stage1_tiered: usize,
    pub stage2_tiered: usize,
    pub widened: usize,
    pub lower_clamped: usize,
    pub upper_clamped: usize,
}

impl FlagCounts {
    pub fn of(prediction: &Prediction) -> Self {
        Self {
            stage1_tiered: prediction.count_flag(RowFlag::Stage1Tiered),
            stage2_tiered: prediction.count_flag(RowFlag::Stage2Tiered),
            widened: prediction.count_flag(RowFlag::Widened),
            lower_clamped: prediction.count_flag(RowFlag::LowerClamped),
            upper_clamped: prediction.count_flag(RowFlag::UpperClamped),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryData {
    pub tool: String,
    pub version: String,
    pub command: String,
    pub input: String,
    pub n_rows: usize,
    pub n_batches: usize,
    pub blended: bool,
    pub models: Vec<ModelStatus>,
    pub notices: Vec<DegradedNotice>,
    pub missing_features: Vec<&'static str>,
    pub profile: EnsembleProfile,
    pub median_prediction: NamedStats,
    pub interval_width: NamedStats,
    pub flags: FlagCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

/// Everything the writers need about one run.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub command: &'a str,
    pub input_path: &'a Path,
    pub key_column: &'a str,
    pub n_batches: usize,
    pub missing_features: &'a [&'static str],
    pub engine: &'a EnsembleEngine,
    pub prediction: &'a Prediction,
    pub metrics: Option<&'a Metrics>,
}

pub fn build_summary(input: &ReportInput<'_>) -> SummaryData {
    let rows = &input.prediction.rows;
    let medians: Vec<f64> = rows.iter().map(|r| r.median).collect();
    let widths: Vec<f64> = rows.iter().map(|r| r.upper - r.lower).collect();
    let models = role_order()
        .iter()
        .map(|&role| {
            let scorer = input.engine.models().get(role);
            ModelStatus {
                role,
                required: role.is_mandatory(),
                present: scorer.is_some(),
                kind: scorer.map(|s| s.kind()),
            }
        })
        .collect();

    SummaryData {
        tool: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        command: input.command.to_string(),
        input: input.input_path.display().to_string(),
        n_rows: rows.len(),
        n_batches: input.n_batches,
        blended: input.prediction.blended,
        models,
        notices: input.engine.notices().to_vec(),
        missing_features: input.missing_features.to_vec(),
        profile: input.engine.profile().clone(),
        median_prediction: NamedStats::of(&medians),
        interval_width: NamedStats::of(&widths),
        flags: FlagCounts::of(input.prediction),
        metrics: input.metrics.cloned(),
    }
}

pub fn write_reports(
    input: &ReportInput<'_>,
    out_dir: &Path,
    mode: ReportMode,
) -> std::io::Result<SummaryData> {
    fs::create_dir_all(out_dir)?;

    let predictions_path = out_dir.join("predictions.tsv");
    write_predictions_tsv(input, &predictions_path, mode)?;

    let summary = build_summary(input);
    let json = serde_json::to_string_pretty(&summary)?;
    write_text(&out_dir.join("summary.json"), &json)?;

    let report = render_report_text(&summary);
    write_text(&out_dir.join("report.txt"), &report)?;

    info!(out = %out_dir.display(), rows = summary.n_rows, "reports written");
    Ok(summary)
}

fn write_predictions_tsv(
    input: &ReportInput<'_>,
    path: &Path,
    mode: ReportMode,
) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let mut header = vec![input.key_column, "lower", "median", "upper"];
    if mode == ReportMode::Detailed {
        header.extend(["stage1_tier", "stage2_tier", "correction", "flags"]);
    }
    writeln!(w, "{}", header.join("\t"))?;

    let prediction = input.prediction;
    for (row, diag) in prediction.rows.iter().zip(&prediction.diagnostics) {
        let mut cells = vec![
            row.key.clone(),
            format_f64_6(row.lower),
            format_f64_6(row.median),
            format_f64_6(row.upper),
        ];
        if mode == ReportMode::Detailed {
            cells.push(diag.stage1_tier.to_string());
            cells.push(diag.stage2_tier.to_string());
            cells.push(format_f64_6(diag.correction));
            cells.push(diag.flags_label());
        }
        writeln!(w, "{}", cells.join("\t"))?;
    }
    w.flush()
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
