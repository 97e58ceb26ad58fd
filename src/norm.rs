//! Per-sample normalization layer.
//!
//! Normalizes the features of a single sample to zero mean and unit variance,
//! then applies a learnable scale (`gamma`) and shift (`beta`):
//!
//! - `xhat = (x - mean(x)) / sqrt(var(x) + eps)`
//! - `y = gamma * xhat + beta`

use crate::error::check_len;
use crate::layer::Layer;
use crate::{Error, Result};

pub const BATCH_NORM_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct BatchNorm {
    len: usize,
    gamma: Vec<f64>,
    beta: Vec<f64>,
    cache: Option<NormCache>,
}

#[derive(Debug, Clone)]
struct NormCache {
    xhat: Vec<f64>,
    inv_std: f64,
}

impl BatchNorm {
    /// Identity-initialised layer (`gamma = 1`, `beta = 0`).
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidConfiguration(
                "batch norm length must be > 0".to_owned(),
            ));
        }
        Ok(Self {
            len,
            gamma: vec![1.0; len],
            beta: vec![0.0; len],
            cache: None,
        })
    }

    pub fn from_parts(gamma: Vec<f64>, beta: Vec<f64>) -> Result<Self> {
        let mut layer = Self::new(gamma.len())?;
        check_len("batch norm beta", gamma.len(), beta.len())?;
        if gamma.iter().chain(&beta).any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "batch norm parameters must be finite".to_owned(),
            ));
        }
        layer.gamma = gamma;
        layer.beta = beta;
        Ok(layer)
    }

    /// Number of normalized features.
    #[inline]
    pub fn size(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn gamma(&self) -> &[f64] {
        &self.gamma
    }

    #[inline]
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }
}

impl Layer for BatchNorm {
    fn feedforward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        check_len("batch norm feedforward input", self.len, input.len())?;

        let n = self.len as f64;
        let mean = input.iter().sum::<f64>() / n;
        let var = input.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        let inv_std = 1.0 / (var + BATCH_NORM_EPSILON).sqrt();

        let xhat: Vec<f64> = input.iter().map(|x| (x - mean) * inv_std).collect();
        let out = xhat
            .iter()
            .zip(self.gamma.iter().zip(&self.beta))
            .map(|(xh, (g, b))| g.mul_add(*xh, *b))
            .collect();

        self.cache = Some(NormCache { xhat, inv_std });
        Ok(out)
    }

    fn learn(&mut self, rate: f64, upstream: &[f64]) -> Result<Vec<f64>> {
        check_len("batch norm learn gradient", self.len, upstream.len())?;
        let cache = self.cache.as_ref().ok_or_else(|| {
            Error::MissingForwardPass("batch norm learn called before feedforward".to_owned())
        })?;

        let n = self.len as f64;
        // dL/dxhat with the forward-pass gamma.
        let dxhat: Vec<f64> = upstream
            .iter()
            .zip(&self.gamma)
            .map(|(g, gamma)| g * gamma)
            .collect();
        let sum_dxhat: f64 = dxhat.iter().sum();
        let sum_dxhat_xhat: f64 = dxhat.iter().zip(&cache.xhat).map(|(d, x)| d * x).sum();

        let scale = cache.inv_std / n;
        let downstream = dxhat
            .iter()
            .zip(&cache.xhat)
            .map(|(d, xh)| scale * (n * d - sum_dxhat - xh * sum_dxhat_xhat))
            .collect();

        for i in 0..self.len {
            self.gamma[i] -= rate * upstream[i] * cache.xhat[i];
            self.beta[i] -= rate * upstream[i];
        }

        Ok(downstream)
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.len)
    }

    fn output_len(&self) -> Option<usize> {
        Some(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn weighted_sum(y: &[f64], w: &[f64]) -> f64 {
        y.iter().zip(w).map(|(a, b)| a * b).sum()
    }

    #[test]
    fn output_is_normalized_at_identity_init() {
        let mut bn = BatchNorm::new(4).unwrap();
        let y = bn.feedforward(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mean: f64 = y.iter().sum::<f64>() / 4.0;
        let var: f64 = y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 4.0;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(var, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn input_gradient_matches_finite_differences() {
        // L = sum(w * y) so dL/dy = w.
        let w = [0.3, -1.2, 0.7, 2.0];
        let x = [0.5, -1.0, 2.5, 0.1];
        let base = BatchNorm::from_parts(vec![1.5, 0.5, -1.0, 2.0], vec![0.1, 0.2, 0.3, 0.4])
            .unwrap();

        let mut bn = base.clone();
        bn.feedforward(&x).unwrap();
        let analytic = bn.learn(0.0, &w).unwrap();

        let eps = 1e-6;
        for i in 0..x.len() {
            let mut xp = x;
            xp[i] += eps;
            let mut xm = x;
            xm[i] -= eps;
            let lp = weighted_sum(&base.clone().feedforward(&xp).unwrap(), &w);
            let lm = weighted_sum(&base.clone().feedforward(&xm).unwrap(), &w);
            assert_abs_diff_eq!(analytic[i], (lp - lm) / (2.0 * eps), epsilon = 1e-5);
        }
    }

    #[test]
    fn learn_updates_gamma_and_beta() {
        let mut bn = BatchNorm::new(2).unwrap();
        bn.feedforward(&[0.0, 2.0]).unwrap();
        bn.learn(0.5, &[1.0, 1.0]).unwrap();
        assert_eq!(bn.beta(), &[-0.5, -0.5]);
        // xhat is about [-1, 1].
        assert!(bn.gamma()[0] > 1.0);
        assert!(bn.gamma()[1] < 1.0);
    }

    #[test]
    fn rejects_learn_before_forward_and_bad_parts() {
        let mut bn = BatchNorm::new(2).unwrap();
        assert!(matches!(
            bn.learn(0.1, &[1.0, 1.0]).unwrap_err(),
            Error::MissingForwardPass(_)
        ));
        assert!(BatchNorm::from_parts(vec![1.0, 1.0], vec![0.0]).is_err());
        assert!(BatchNorm::new(0).is_err());
    }
}
