//! Layers.
//!
//! Every layer supports the same two-step contract:
//!
//! - `feedforward(input)` computes the output and caches whatever the backward
//!   step needs (for all layers here: the last input).
//! - `learn(rate, upstream)` takes `dL/d(output)`, updates trainable parameters
//!   with plain gradient descent and returns `dL/d(input)`.
//!
//! `learn` uses the cache written by the most recent `feedforward` on the same
//! instance. A layer that has never run forward refuses to learn with
//! [`Error::MissingForwardPass`].

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::activation::{Activation, Kernel};
use crate::error::check_len;
use crate::matmul;
use crate::norm::BatchNorm;
use crate::{Error, Result};

/// The capability set shared by all layer kinds.
pub trait Layer {
    /// Forward pass for a single sample.
    fn feedforward(&mut self, input: &[f64]) -> Result<Vec<f64>>;

    /// Backward pass for a single sample; returns the gradient for the previous layer.
    fn learn(&mut self, rate: f64, upstream: &[f64]) -> Result<Vec<f64>>;

    /// Required input length, or `None` for shape-preserving layers.
    fn input_len(&self) -> Option<usize>;

    /// Produced output length, or `None` for shape-preserving layers.
    fn output_len(&self) -> Option<usize>;
}

/// Fully-connected affine layer `y = W x + b`.
#[derive(Debug, Clone)]
pub struct Dense {
    input_len: usize,
    output_len: usize,
    /// Row-major matrix with shape (output_len, input_len).
    weights: Vec<f64>,
    bias: Vec<f64>,
    last_input: Option<Vec<f64>>,
}

impl Dense {
    /// Randomly initialised layer.
    ///
    /// Weights are drawn from `N(0, 1) * sqrt(2 / input_len)`, biases from `N(0, 1)`.
    pub fn new_with_rng<R: Rng + ?Sized>(
        input_len: usize,
        output_len: usize,
        rng: &mut R,
    ) -> Result<Self> {
        validate_dims(input_len, output_len)?;

        let scale = (2.0 / input_len as f64).sqrt();
        let weights = (0..input_len * output_len)
            .map(|_| {
                let z: f64 = StandardNormal.sample(rng);
                z * scale
            })
            .collect();
        let bias = (0..output_len)
            .map(|_| StandardNormal.sample(rng))
            .collect();

        Ok(Self {
            input_len,
            output_len,
            weights,
            bias,
            last_input: None,
        })
    }

    /// Build a layer from explicit parameters.
    ///
    /// `weights` is row-major `(output_len, input_len)`.
    pub fn from_parts(
        input_len: usize,
        output_len: usize,
        weights: Vec<f64>,
        bias: Vec<f64>,
    ) -> Result<Self> {
        validate_dims(input_len, output_len)?;
        check_len("dense weights", input_len * output_len, weights.len())?;
        check_len("dense bias", output_len, bias.len())?;
        if weights.iter().chain(&bias).any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "dense parameters must be finite".to_owned(),
            ));
        }

        Ok(Self {
            input_len,
            output_len,
            weights,
            bias,
            last_input: None,
        })
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn bias(&self) -> &[f64] {
        &self.bias
    }

    /// Mutable parameters, mainly for finite-difference checks.
    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    #[inline]
    pub fn bias_mut(&mut self) -> &mut [f64] {
        &mut self.bias
    }
}

impl Layer for Dense {
    fn feedforward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        check_len("dense feedforward input", self.input_len, input.len())?;

        let mut out = vec![0.0; self.output_len];
        matmul::matvec_add(
            self.output_len,
            self.input_len,
            &self.weights,
            input,
            &self.bias,
            &mut out,
        );

        match &mut self.last_input {
            Some(cache) => cache.copy_from_slice(input),
            None => self.last_input = Some(input.to_vec()),
        }
        Ok(out)
    }

    /// `dW = upstream * last_input^T`, `dB = upstream`.
    ///
    /// The returned gradient `W^T * upstream` uses the weights as they were
    /// during the forward pass, before this update.
    fn learn(&mut self, rate: f64, upstream: &[f64]) -> Result<Vec<f64>> {
        check_len("dense learn gradient", self.output_len, upstream.len())?;
        let last_input = self.last_input.as_deref().ok_or_else(|| {
            Error::MissingForwardPass("dense layer learn called before feedforward".to_owned())
        })?;

        let mut downstream = vec![0.0; self.input_len];
        matmul::matvec_transposed(
            self.output_len,
            self.input_len,
            &self.weights,
            upstream,
            &mut downstream,
        );

        matmul::rank1_update(
            self.output_len,
            self.input_len,
            &mut self.weights,
            -rate,
            upstream,
            last_input,
        );
        for (b, g) in self.bias.iter_mut().zip(upstream) {
            *b -= rate * g;
        }

        Ok(downstream)
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.input_len)
    }

    fn output_len(&self) -> Option<usize> {
        Some(self.output_len)
    }
}

/// Stateless non-linearity. Holds no trainable parameters.
#[derive(Debug, Clone)]
pub struct ActivationLayer {
    activation: Activation,
    kernel: Kernel,
    last_input: Option<Vec<f64>>,
}

impl ActivationLayer {
    /// Resolves `activation` immediately; invalid coefficients fail here.
    pub fn new(activation: Activation) -> Result<Self> {
        let kernel = activation.kernel()?;
        Ok(Self {
            activation,
            kernel,
            last_input: None,
        })
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }
}

impl Layer for ActivationLayer {
    fn feedforward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let mut out = vec![0.0; input.len()];
        self.kernel.forward(input, &mut out);
        self.last_input = Some(input.to_vec());
        Ok(out)
    }

    /// `rate` is unused: there is nothing to train.
    fn learn(&mut self, _rate: f64, upstream: &[f64]) -> Result<Vec<f64>> {
        let last_input = self.last_input.as_deref().ok_or_else(|| {
            Error::MissingForwardPass(format!(
                "{} activation learn called before feedforward",
                self.activation
            ))
        })?;
        check_len("activation learn gradient", last_input.len(), upstream.len())?;

        let mut out = vec![0.0; upstream.len()];
        self.kernel.backward(last_input, upstream, &mut out)?;
        Ok(out)
    }

    fn input_len(&self) -> Option<usize> {
        None
    }

    fn output_len(&self) -> Option<usize> {
        None
    }
}

/// Any layer a network can hold.
#[derive(Debug, Clone)]
pub enum NetworkLayer {
    Dense(Dense),
    Activation(ActivationLayer),
    BatchNorm(BatchNorm),
}

impl NetworkLayer {
    fn as_layer_mut(&mut self) -> &mut dyn Layer {
        match self {
            NetworkLayer::Dense(l) => l,
            NetworkLayer::Activation(l) => l,
            NetworkLayer::BatchNorm(l) => l,
        }
    }

    fn as_layer(&self) -> &dyn Layer {
        match self {
            NetworkLayer::Dense(l) => l,
            NetworkLayer::Activation(l) => l,
            NetworkLayer::BatchNorm(l) => l,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NetworkLayer::Dense(_) => "dense",
            NetworkLayer::Activation(_) => "activation",
            NetworkLayer::BatchNorm(_) => "batch_norm",
        }
    }
}

impl Layer for NetworkLayer {
    #[inline]
    fn feedforward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.as_layer_mut().feedforward(input)
    }

    #[inline]
    fn learn(&mut self, rate: f64, upstream: &[f64]) -> Result<Vec<f64>> {
        self.as_layer_mut().learn(rate, upstream)
    }

    fn input_len(&self) -> Option<usize> {
        self.as_layer().input_len()
    }

    fn output_len(&self) -> Option<usize> {
        self.as_layer().output_len()
    }
}

impl From<Dense> for NetworkLayer {
    fn from(value: Dense) -> Self {
        NetworkLayer::Dense(value)
    }
}

impl From<ActivationLayer> for NetworkLayer {
    fn from(value: ActivationLayer) -> Self {
        NetworkLayer::Activation(value)
    }
}

impl From<BatchNorm> for NetworkLayer {
    fn from(value: BatchNorm) -> Self {
        NetworkLayer::BatchNorm(value)
    }
}

fn validate_dims(input_len: usize, output_len: usize) -> Result<()> {
    if input_len == 0 || output_len == 0 {
        return Err(Error::InvalidConfiguration(format!(
            "dense dims must be > 0, got input_len={input_len} output_len={output_len}"
        )));
    }
    Ok(())
}
