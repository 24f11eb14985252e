//! Gated feed-forward median regressor.
//!
//! `enc = gelu(E2 gelu(E1 x))`, `g = sigmoid(G x)`, `y = D2 gelu(D1 (enc * g))`.
//! Weights come from a JSON export with PyTorch `nn.Linear` layout
//! (`weight[out][in]`, `bias[out]`).

use std::io::Read;

use serde::Deserialize;

use crate::error::{ArtifactError, ScoringError};
use crate::model::FeatureVector;
use crate::scorer::{Scorer, check_width};

#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub weight: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl DenseLayer {
    fn check(&self, name: &str, n_in: usize, n_out: usize) -> Result<(), ArtifactError> {
        if self.weight.len() != n_out || self.bias.len() != n_out {
            return Err(ArtifactError::Malformed(format!(
                "{name}: expected {n_out} outputs, weight has {} rows and bias {}",
                self.weight.len(),
                self.bias.len()
            )));
        }
        if let Some(bad) = self.weight.iter().position(|r| r.len() != n_in) {
            return Err(ArtifactError::Malformed(format!(
                "{name}: weight row {bad} has {} inputs, expected {n_in}",
                self.weight[bad].len()
            )));
        }
        Ok(())
    }

    fn forward(&self, x: &[f64], out: &mut Vec<f64>) {
        out.clear();
        for (row, &b) in self.weight.iter().zip(&self.bias) {
            let mut acc = b as f64;
            for (&w, &xi) in row.iter().zip(x) {
                acc += w as f64 * xi;
            }
            out.push(acc);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatedWeights {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub encoder: [DenseLayer; 2],
    pub gate: DenseLayer,
    pub decoder: [DenseLayer; 2],
}

#[derive(Debug, Clone)]
pub struct GatedRegressor {
    w: GatedWeights,
}

impl GatedRegressor {
    pub fn new(weights: GatedWeights) -> Result<Self, ArtifactError> {
        let (i, h) = (weights.input_dim, weights.hidden_dim);
        if i == 0 || h == 0 {
            return Err(ArtifactError::Malformed(
                "input_dim and hidden_dim must be positive".to_string(),
            ));
        }
        weights.encoder[0].check("encoder.0", i, h)?;
        weights.encoder[1].check("encoder.1", h, h)?;
        weights.gate.check("gate", i, h)?;
        weights.decoder[0].check("decoder.0", h, h)?;
        weights.decoder[1].check("decoder.1", h, 1)?;
        Ok(Self { w: weights })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ArtifactError> {
        Self::new(serde_json::from_slice(bytes)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ArtifactError> {
        Self::new(serde_json::from_reader(reader)?)
    }

    pub fn predict_row(&self, x: &[f32]) -> f64 {
        let x: Vec<f64> = x.iter().map(|&v| v as f64).collect();
        let mut a = Vec::with_capacity(self.w.hidden_dim);
        let mut b = Vec::with_capacity(self.w.hidden_dim);

        self.w.encoder[0].forward(&x, &mut a);
        a.iter_mut().for_each(|v| *v = gelu(*v));
        self.w.encoder[1].forward(&a, &mut b);
        b.iter_mut().for_each(|v| *v = gelu(*v));

        self.w.gate.forward(&x, &mut a);
        for (enc, g) in b.iter_mut().zip(&a) {
            *enc *= sigmoid(*g);
        }

        self.w.decoder[0].forward(&b, &mut a);
        a.iter_mut().for_each(|v| *v = gelu(*v));
        self.w.decoder[1].forward(&a, &mut b);
        b[0]
    }
}

impl Scorer for GatedRegressor {
    fn kind(&self) -> &'static str {
        "gated_mlp"
    }

    fn input_width(&self) -> usize {
        self.w.input_dim
    }

    fn score(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ScoringError> {
        check_width(self.w.input_dim, rows)?;
        Ok(rows.iter().map(|r| self.predict_row(r.values())).collect())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Exact GELU, `x * Phi(x)`.
fn gelu(x: f64) -> f64 {
    0.5 * x * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

// Abramowitz & Stegun 7.1.26, |error| < 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
#[path = "../../tests/src_inline/scorer/gated.rs"]
mod tests;
