//! Activation functions.
//!
//! An [`Activation`] is a closed set of kind tags. Building an
//! [`ActivationLayer`](crate::ActivationLayer) resolves the tag once into a
//! [`Kernel`]: a pair of plain function pointers plus the per-instance
//! coefficient, so the per-element hot loop never matches on the tag.
//!
//! Derivatives are expressed in terms of the layer *input* (the cached
//! pre-activation value), not the output.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Default negative-side slope for [`Activation::LeakyReLU`].
pub const DEFAULT_LEAKY_RELU_COEF: f64 = 0.1;

/// Default scale for [`Activation::Elu`].
pub const DEFAULT_ELU_ALPHA: f64 = 1.0;

/// Inputs to the sigmoid are clipped to this magnitude before exponentiation.
pub const SIGMOID_CLIP: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Element-wise activation function.
pub enum Activation {
    Sigmoid,
    ReLU,
    TanH,
    LeakyReLU { coef: f64 },
    Elu { alpha: f64 },
    /// Vector-valued softmax. Its backward pass is not available.
    Softmax,
}

impl Activation {
    /// Leaky ReLU with the default coefficient.
    pub const fn leaky_relu() -> Self {
        Activation::LeakyReLU {
            coef: DEFAULT_LEAKY_RELU_COEF,
        }
    }

    /// ELU with the default alpha.
    pub const fn elu() -> Self {
        Activation::Elu {
            alpha: DEFAULT_ELU_ALPHA,
        }
    }

    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::LeakyReLU { coef } => {
                if !(coef.is_finite() && (0.0..1.0).contains(&coef)) {
                    return Err(Error::InvalidConfiguration(format!(
                        "leaky ReLU coef must be finite and in [0,1), got {coef}"
                    )));
                }
            }
            Activation::Elu { alpha } => {
                if !(alpha.is_finite() && alpha > 0.0) {
                    return Err(Error::InvalidConfiguration(format!(
                        "ELU alpha must be finite and > 0, got {alpha}"
                    )));
                }
            }
            Activation::Sigmoid | Activation::ReLU | Activation::TanH | Activation::Softmax => {}
        }

        Ok(())
    }

    /// Resolve the tag into its function pair.
    pub fn kernel(self) -> Result<Kernel> {
        self.validate()?;

        let kernel = match self {
            Activation::Sigmoid => {
                Kernel::elementwise(|x, _| sigmoid(x), |x, _| sigmoid_derivative(x), 0.0)
            }
            Activation::ReLU => {
                Kernel::elementwise(|x, _| relu(x), |x, _| relu_derivative(x), 0.0)
            }
            Activation::TanH => {
                Kernel::elementwise(|x, _| tanh(x), |x, _| tanh_derivative(x), 0.0)
            }
            Activation::LeakyReLU { coef } => {
                Kernel::elementwise(leaky_relu, leaky_relu_derivative, coef)
            }
            Activation::Elu { alpha } => Kernel::elementwise(elu, elu_derivative, alpha),
            Activation::Softmax => Kernel::Softmax,
        };
        Ok(kernel)
    }

    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::ReLU => "relu",
            Activation::TanH => "tanh",
            Activation::LeakyReLU { .. } => "leaky_relu",
            Activation::Elu { .. } => "elu",
            Activation::Softmax => "softmax",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    /// Parses a kind tag; parameterised kinds get their default coefficient.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::ReLU),
            "tanh" => Ok(Activation::TanH),
            "leaky_relu" | "leakyrelu" => Ok(Activation::leaky_relu()),
            "elu" => Ok(Activation::elu()),
            "softmax" => Ok(Activation::Softmax),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown activation kind {other:?}"
            ))),
        }
    }
}

/// Scalar function taking `(x, coefficient)`.
pub type ScalarFn = fn(f64, f64) -> f64;

/// A resolved activation: what an activation layer actually runs.
#[derive(Debug, Clone, Copy)]
pub enum Kernel {
    Elementwise {
        forward: ScalarFn,
        derivative: ScalarFn,
        coef: f64,
    },
    Softmax,
}

impl Kernel {
    fn elementwise(forward: ScalarFn, derivative: ScalarFn, coef: f64) -> Self {
        Kernel::Elementwise {
            forward,
            derivative,
            coef,
        }
    }

    /// `out[i] = f(input[i])` (softmax over the whole vector).
    pub fn forward(&self, input: &[f64], out: &mut [f64]) {
        debug_assert_eq!(input.len(), out.len());
        match *self {
            Kernel::Elementwise { forward, coef, .. } => {
                for (o, &x) in out.iter_mut().zip(input) {
                    *o = forward(x, coef);
                }
            }
            Kernel::Softmax => softmax_into(input, out),
        }
    }

    /// `out[i] = upstream[i] * f'(input[i])`.
    pub fn backward(&self, input: &[f64], upstream: &[f64], out: &mut [f64]) -> Result<()> {
        debug_assert_eq!(input.len(), upstream.len());
        debug_assert_eq!(input.len(), out.len());
        match *self {
            Kernel::Elementwise {
                derivative, coef, ..
            } => {
                for ((o, &x), &g) in out.iter_mut().zip(input).zip(upstream) {
                    *o = g * derivative(x, coef);
                }
                Ok(())
            }
            Kernel::Softmax => Err(Error::NotImplemented(
                "softmax activation has no backward pass; use the cross-entropy loss on raw outputs instead"
                    .to_owned(),
            )),
        }
    }
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-SIGMOID_CLIP, SIGMOID_CLIP)).exp())
}

#[inline]
pub fn sigmoid_derivative(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

#[inline]
pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

#[inline]
pub fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

#[inline]
pub fn tanh(x: f64) -> f64 {
    x.tanh()
}

#[inline]
pub fn tanh_derivative(x: f64) -> f64 {
    let t = x.tanh();
    1.0 - t * t
}

#[inline]
pub fn leaky_relu(x: f64, coef: f64) -> f64 {
    (coef * x).max(x)
}

#[inline]
pub fn leaky_relu_derivative(x: f64, coef: f64) -> f64 {
    if x <= 0.0 { coef } else { 1.0 }
}

#[inline]
pub fn elu(x: f64, alpha: f64) -> f64 {
    if x <= 0.0 { alpha * x.exp_m1() } else { x }
}

#[inline]
pub fn elu_derivative(x: f64, alpha: f64) -> f64 {
    if x <= 0.0 { alpha * x.exp() } else { 1.0 }
}

/// Numerically stable softmax (shifted by the max element).
pub fn softmax_into(input: &[f64], out: &mut [f64]) {
    debug_assert_eq!(input.len(), out.len());
    if input.is_empty() {
        return;
    }

    let max = input.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for (o, &x) in out.iter_mut().zip(input) {
        *o = (x - max).exp();
        sum += *o;
    }
    let inv = 1.0 / sum;
    for o in out.iter_mut() {
        *o *= inv;
    }
}
