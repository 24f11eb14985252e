use serde::Serialize;

use crate::pipeline::PredictionRow;
use crate::stats::{mean, percentile};

pub const PINBALL_QUANTILES: [f64; 3] = [0.1, 0.5, 0.9];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinballLoss {
    pub quantile: f64,
    pub loss: f64,
}

/// Error of the median on targets above the 75th percentile of targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeMetrics {
    pub threshold: f64,
    pub count: usize,
    pub mae: f64,
    pub rmse: f64,
    pub underprediction_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub n_scored: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: Option<f64>,
    pub accuracy_pct: Option<f64>,
    pub coverage_pct: f64,
    pub mean_width: f64,
    pub pinball: Vec<PinballLoss>,
    pub spike: Option<SpikeMetrics>,
}

/// `max(q * d, (q - 1) * d)` with `d = y - pred`.
pub fn pinball(q: f64, y: f64, pred: f64) -> f64 {
    let d = y - pred;
    (q * d).max((q - 1.0) * d)
}

/// Rows whose target is not finite are left out. `None` when nothing remains.
pub fn evaluate(rows: &[PredictionRow], targets: &[f64]) -> Option<Metrics> {
    let pairs: Vec<(&PredictionRow, f64)> = rows
        .iter()
        .zip(targets)
        .filter(|(_, y)| y.is_finite())
        .map(|(r, &y)| (r, y))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let n = pairs.len() as f64;
    let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
    let preds: Vec<f64> = pairs.iter().map(|(r, _)| r.median).collect();

    let mae = mean_abs_error(&ys, &preds);
    let rmse = root_mean_sq_error(&ys, &preds);

    let y_mean = mean(&ys).unwrap_or(0.0);
    let ss_tot: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = ys.iter().zip(&preds).map(|(y, p)| (y - p).powi(2)).sum();
    let r2 = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);
    let accuracy_pct = (y_mean != 0.0).then(|| ((1.0 - mae / y_mean) * 100.0).max(0.0));

    let inside = pairs
        .iter()
        .filter(|(r, y)| *y >= r.lower && *y <= r.upper)
        .count();
    let coverage_pct = inside as f64 / n * 100.0;
    let mean_width = pairs.iter().map(|(r, _)| r.upper - r.lower).sum::<f64>() / n;

    let pinball = PINBALL_QUANTILES
        .iter()
        .map(|&q| {
            let total: f64 = pairs
                .iter()
                .map(|(r, y)| {
                    let pred = if q < 0.5 {
                        r.lower
                    } else if q > 0.5 {
                        r.upper
                    } else {
                        r.median
                    };
                    pinball(q, *y, pred)
                })
                .sum();
            PinballLoss {
                quantile: q,
                loss: total / n,
            }
        })
        .collect();

    Some(Metrics {
        n_scored: pairs.len(),
        mae,
        rmse,
        r2,
        accuracy_pct,
        coverage_pct,
        mean_width,
        pinball,
        spike: spike_metrics(&ys, &preds),
    })
}

fn spike_metrics(ys: &[f64], preds: &[f64]) -> Option<SpikeMetrics> {
    let threshold = percentile(ys, 75.0)?;
    let (sy, sp): (Vec<f64>, Vec<f64>) = ys
        .iter()
        .zip(preds)
        .filter(|(y, _)| **y > threshold)
        .map(|(y, p)| (*y, *p))
        .unzip();
    if sy.is_empty() {
        return None;
    }
    let under = sy.iter().zip(&sp).filter(|(y, p)| p < y).count();
    Some(SpikeMetrics {
        threshold,
        count: sy.len(),
        mae: mean_abs_error(&sy, &sp),
        rmse: root_mean_sq_error(&sy, &sp),
        underprediction_pct: under as f64 / sy.len() as f64 * 100.0,
    })
}

fn mean_abs_error(ys: &[f64], preds: &[f64]) -> f64 {
    ys.iter().zip(preds).map(|(y, p)| (y - p).abs()).sum::<f64>() / ys.len() as f64
}

fn root_mean_sq_error(ys: &[f64], preds: &[f64]) -> f64 {
    (ys.iter().zip(preds).map(|(y, p)| (y - p).powi(2)).sum::<f64>() / ys.len() as f64).sqrt()
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/metrics.rs"]
mod tests;
