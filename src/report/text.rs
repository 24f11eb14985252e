use crate::model::EnsembleProfile;
use crate::report::metrics::Metrics;
use crate::report::{FlagCounts, SummaryData, format_f64_6};

pub fn render_report_text(data: &SummaryData) -> String {
    let mut out = String::new();

    out.push_str("Patient Inflow Interval Report\n");
    out.push_str("==============================\n\n");

    out.push_str("1. Run\n");
    out.push_str(&format!("Command: {}\n", data.command));
    out.push_str(&format!("Input: {}\n", data.input));
    out.push_str(&format!(
        "Rows: {} in {} batch(es)\n",
        data.n_rows, data.n_batches
    ));
    out.push_str(&format!(
        "Median blend: {}\n\n",
        if data.blended {
            format!("secondary weight {}", data.profile.blend_weight)
        } else {
            "off".to_string()
        }
    ));

    out.push_str("2. Models\n");
    for m in &data.models {
        match m.kind {
            Some(kind) => out.push_str(&format!("{}: {}\n", m.role, kind)),
            None => out.push_str(&format!("{}: absent\n", m.role)),
        }
    }
    for notice in &data.notices {
        out.push_str(&format!("Degraded: {}\n", notice));
    }
    out.push('\n');

    out.push_str("3. Intervals\n");
    out.push_str(&format!(
        "Median prediction: median={} p90={} p99={}\n",
        format_f64_6(data.median_prediction.median),
        format_f64_6(data.median_prediction.p90),
        format_f64_6(data.median_prediction.p99)
    ));
    out.push_str(&format!(
        "Interval width: median={} p90={} p99={}\n\n",
        format_f64_6(data.interval_width.median),
        format_f64_6(data.interval_width.p90),
        format_f64_6(data.interval_width.p99)
    ));

    out.push_str("4. Spike corrections\n");
    out.push_str(&format!(
        "Stage 1 tiered rows: {}\nStage 2 tiered rows: {}\nWidened rows: {}\n",
        data.flags.stage1_tiered, data.flags.stage2_tiered, data.flags.widened
    ));
    out.push_str(&format!(
        "Clamped rows: lower={} upper={}\n",
        data.flags.lower_clamped, data.flags.upper_clamped
    ));
    out.push_str(&format!(
        "{}\n\n",
        correction_statement(&data.flags, data.n_rows)
    ));

    if let Some(m) = &data.metrics {
        out.push_str("5. Accuracy\n");
        render_metrics(&mut out, m);
        out.push('\n');
    }

    out.push_str("Caveats\n");
    if !data.missing_features.is_empty() {
        out.push_str(&format!(
            "Missing feature columns filled with 0: {}\n",
            data.missing_features.join(", ")
        ));
    }
    if data.profile == EnsembleProfile::default_v1() {
        out.push_str(
            "Margins, tier multipliers and widening factor are empirical v1 defaults; recalibrate against held-out coverage.\n",
        );
    } else {
        out.push_str("A custom ensemble profile was in effect.\n");
    }
    out.push_str("Spike tiers are relative to each batch; identical rows may be corrected differently in different batches.\n");

    out
}

fn render_metrics(out: &mut String, m: &Metrics) {
    out.push_str(&format!("Scored rows: {}\n", m.n_scored));
    out.push_str(&format!(
        "MAE: {}\nRMSE: {}\n",
        format_f64_6(m.mae),
        format_f64_6(m.rmse)
    ));
    out.push_str(&format!("R2: {}\n", format_opt(m.r2)));
    out.push_str(&format!("Accuracy %: {}\n", format_opt(m.accuracy_pct)));
    out.push_str(&format!(
        "Coverage %: {} ({})\n",
        format_f64_6(m.coverage_pct),
        coverage_statement(m.coverage_pct)
    ));
    out.push_str(&format!("Mean width: {}\n", format_f64_6(m.mean_width)));
    for p in &m.pinball {
        out.push_str(&format!(
            "Pinball loss q{}: {}\n",
            (p.quantile * 100.0).round(),
            format_f64_6(p.loss)
        ));
    }
    match &m.spike {
        Some(s) => out.push_str(&format!(
            "Spikes (> {}): n={} MAE={} RMSE={} underpredicted={}%\n",
            format_f64_6(s.threshold),
            s.count,
            format_f64_6(s.mae),
            format_f64_6(s.rmse),
            format_f64_6(s.underprediction_pct)
        )),
        None => out.push_str("Spikes: none above the 75th percentile\n"),
    }
}

fn format_opt(v: Option<f64>) -> String {
    v.map(format_f64_6).unwrap_or_else(|| "n/a".to_string())
}

fn correction_statement(flags: &FlagCounts, n_rows: usize) -> &'static str {
    if n_rows == 0 {
        "No rows were scored."
    } else if flags.stage1_tiered == 0 && flags.stage2_tiered == 0 {
        "No row reached a spike tier."
    } else if flags.widened > 0 {
        "Spike-tiered rows present; the most extreme medians carry widened bands."
    } else {
        "Spike-tiered rows present; no band needed widening."
    }
}

fn coverage_statement(coverage_pct: f64) -> &'static str {
    if coverage_pct >= 80.0 {
        "at or above the nominal q10-q90 band"
    } else if coverage_pct >= 60.0 {
        "below nominal"
    } else {
        "well below nominal; intervals are too narrow"
    }
}
