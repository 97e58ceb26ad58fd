//! Loss functions.
//!
//! A [`Loss`] is built from a [`LossKind`] tag and holds the resolved
//! `(loss, derivative)` function pair. Typical use:
//!
//! - run `network.feedforward(...)`
//! - compute `dL/d(prediction)` with [`Loss::get_loss_derivative`]
//! - thread it backwards through the layers
//!
//! Log-based losses clip probabilities to `[CLIP_EPSILON, 1 - CLIP_EPSILON]`.
//! This keeps training finite at the cost of a tiny bias near 0 and 1.

use std::fmt;
use std::str::FromStr;

use crate::activation::softmax_into;
use crate::error::check_len;
use crate::{Error, Result};

pub const CLIP_EPSILON: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
/// Supported loss functions.
pub enum LossKind {
    /// Mean squared error.
    Mse,
    /// Mean absolute error.
    Mae,
    /// Binary cross-entropy on probabilities.
    LogLoss,
    /// Categorical cross-entropy. Raw outputs are softmax-normalized first;
    /// the true class is the argmax of the label.
    CrossEntropy,
}

impl LossKind {
    pub fn name(self) -> &'static str {
        match self {
            LossKind::Mse => "mse",
            LossKind::Mae => "mae",
            LossKind::LogLoss => "log_loss",
            LossKind::CrossEntropy => "cross_entropy",
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mse" => Ok(LossKind::Mse),
            "mae" => Ok(LossKind::Mae),
            "log_loss" | "logloss" | "binary_cross_entropy" => Ok(LossKind::LogLoss),
            "cross_entropy" | "crossentropy" => Ok(LossKind::CrossEntropy),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown loss kind {other:?}"
            ))),
        }
    }
}

type LossFn = fn(&[f64], &[f64]) -> f64;
type DerivativeFn = fn(&[f64], &[f64], &mut [f64]);

/// A resolved loss strategy.
#[derive(Debug, Clone, Copy)]
pub struct Loss {
    kind: LossKind,
    loss: LossFn,
    derivative: DerivativeFn,
}

impl Loss {
    pub fn new(kind: LossKind) -> Self {
        let (loss, derivative): (LossFn, DerivativeFn) = match kind {
            LossKind::Mse => (mse, mse_derivative),
            LossKind::Mae => (mae, mae_derivative),
            LossKind::LogLoss => (log_loss, log_loss_derivative),
            LossKind::CrossEntropy => (cross_entropy, cross_entropy_derivative),
        };
        Self {
            kind,
            loss,
            derivative,
        }
    }

    #[inline]
    pub fn kind(&self) -> LossKind {
        self.kind
    }

    /// Scalar loss of `predicted` against `actual`.
    pub fn get_loss(&self, predicted: &[f64], actual: &[f64]) -> Result<f64> {
        check_pair(predicted, actual)?;
        Ok((self.loss)(predicted, actual))
    }

    /// `dL/d(predicted)`, same shape as `predicted`.
    pub fn get_loss_derivative(&self, predicted: &[f64], actual: &[f64]) -> Result<Vec<f64>> {
        check_pair(predicted, actual)?;
        let mut out = vec![0.0; predicted.len()];
        (self.derivative)(predicted, actual, &mut out);
        Ok(out)
    }
}

impl From<LossKind> for Loss {
    fn from(kind: LossKind) -> Self {
        Loss::new(kind)
    }
}

fn check_pair(predicted: &[f64], actual: &[f64]) -> Result<()> {
    check_len("loss label", predicted.len(), actual.len())?;
    if predicted.is_empty() {
        return Err(Error::InvalidData(
            "loss requires at least one output".to_owned(),
        ));
    }
    Ok(())
}

#[inline]
fn clip(p: f64) -> f64 {
    p.clamp(CLIP_EPSILON, 1.0 - CLIP_EPSILON)
}

/// `mean((p - a)^2)`.
pub fn mse(predicted: &[f64], actual: &[f64]) -> f64 {
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a) * (p - a))
        .sum();
    sum / predicted.len() as f64
}

/// `2 (p - a) / N`.
pub fn mse_derivative(predicted: &[f64], actual: &[f64], out: &mut [f64]) {
    let scale = 2.0 / predicted.len() as f64;
    for ((o, p), a) in out.iter_mut().zip(predicted).zip(actual) {
        *o = scale * (p - a);
    }
}

/// `mean(|p - a|)`.
pub fn mae(predicted: &[f64], actual: &[f64]) -> f64 {
    let sum: f64 = predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum();
    sum / predicted.len() as f64
}

/// `sign(p - a) / N`, with `sign(0) = 0`.
pub fn mae_derivative(predicted: &[f64], actual: &[f64], out: &mut [f64]) {
    let inv_n = 1.0 / predicted.len() as f64;
    for ((o, p), a) in out.iter_mut().zip(predicted).zip(actual) {
        let diff = p - a;
        *o = if diff > 0.0 {
            inv_n
        } else if diff < 0.0 {
            -inv_n
        } else {
            0.0
        };
    }
}

/// Binary cross-entropy: `-mean(a ln p + (1 - a) ln(1 - p))`.
pub fn log_loss(predicted: &[f64], actual: &[f64]) -> f64 {
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(&p, &a)| {
            let p = clip(p);
            a * p.ln() + (1.0 - a) * (1.0 - p).ln()
        })
        .sum();
    -sum / predicted.len() as f64
}

/// `(p - a) / (p (1 - p) N)` on clipped `p`.
pub fn log_loss_derivative(predicted: &[f64], actual: &[f64], out: &mut [f64]) {
    let n = predicted.len() as f64;
    for ((o, &p), &a) in out.iter_mut().zip(predicted).zip(actual) {
        let p = clip(p);
        *o = (p - a) / (p * (1.0 - p) * n);
    }
}

/// Categorical cross-entropy for a single sample: `-ln(softmax(p)[true])`.
pub fn cross_entropy(predicted: &[f64], actual: &[f64]) -> f64 {
    let mut probs = vec![0.0; predicted.len()];
    softmax_into(predicted, &mut probs);
    -clip(probs[true_class(actual)]).ln()
}

/// `softmax(p)` with 1 subtracted at the true class (batch size 1).
pub fn cross_entropy_derivative(predicted: &[f64], actual: &[f64], out: &mut [f64]) {
    softmax_into(predicted, out);
    out[true_class(actual)] -= 1.0;
}

/// Index of the largest label entry (first one on ties).
fn true_class(actual: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in actual.iter().enumerate().skip(1) {
        if v > actual[best] {
            best = i;
        }
    }
    best
}
