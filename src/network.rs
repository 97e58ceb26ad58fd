//! The network: an ordered layer sequence plus its loss and scheduler.
//!
//! Data flows forward through the layers in order and gradients flow backward
//! in reverse order. Each layer caches its last input during `feedforward`, so
//! [`BrainBuilder::learn`] must follow a `feedforward` on the same network
//! whose output is the `predicted` argument.

use crate::layer::{Layer, NetworkLayer};
use crate::loss::{Loss, LossKind};
use crate::schedule::LrScheduler;
use crate::train::StopFlag;
use crate::{Error, Result};

#[derive(Debug)]
pub struct BrainBuilder {
    layers: Vec<NetworkLayer>,
    loss: Loss,
    scheduler: LrScheduler,
    input_len: Option<usize>,
    output_len: Option<usize>,
    pub(crate) stop: StopFlag,
}

impl BrainBuilder {
    /// Assemble a network from ready-made layers.
    ///
    /// Fails with [`Error::InvalidConfiguration`] when the layer list is empty or
    /// when consecutive sized layers disagree on their shared dimension.
    pub fn new(layers: Vec<NetworkLayer>, loss: LossKind, scheduler: LrScheduler) -> Result<Self> {
        let (input_len, output_len) = shape_chain(&layers)?;
        log::debug!(
            "built network: {} layers, input_len={input_len:?}, output_len={output_len:?}, loss={loss}, schedule={}",
            layers.len(),
            scheduler.config().kind
        );

        Ok(Self {
            layers,
            loss: Loss::new(loss),
            scheduler,
            input_len,
            output_len,
            stop: StopFlag::new(),
        })
    }

    /// Forward pass for a single sample.
    ///
    /// Side effect: every layer caches its input for the next [`Self::learn`].
    pub fn feedforward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        match self.input_len {
            Some(expected) if expected != input.len() => {
                return Err(Error::shape("network input", expected, input.len()));
            }
            _ => {}
        }

        let mut x = input.to_vec();
        for layer in &mut self.layers {
            x = layer.feedforward(&x)?;
        }
        Ok(x)
    }

    /// Loss of `predicted` against `actual`.
    pub fn get_loss(&self, predicted: &[f64], actual: &[f64]) -> Result<f64> {
        self.loss.get_loss(predicted, actual)
    }

    /// Backward pass for a single sample at the scheduler's current rate.
    ///
    /// `predicted` must be the output of the most recent [`Self::feedforward`].
    /// Returns the gradient of the loss w.r.t. the network input.
    pub fn learn(&mut self, predicted: &[f64], actual: &[f64]) -> Result<Vec<f64>> {
        let rate = self.scheduler.get_lr();
        let mut grad = self.loss.get_loss_derivative(predicted, actual)?;
        for layer in self.layers.iter_mut().rev() {
            grad = layer.learn(rate, &grad)?;
        }
        Ok(grad)
    }

    #[inline]
    pub fn layers(&self) -> &[NetworkLayer] {
        &self.layers
    }

    /// Mutable layer access, e.g. for finite-difference checks.
    #[inline]
    pub fn layers_mut(&mut self) -> &mut [NetworkLayer] {
        &mut self.layers
    }

    #[inline]
    pub fn loss_kind(&self) -> LossKind {
        self.loss.kind()
    }

    #[inline]
    pub fn scheduler(&self) -> &LrScheduler {
        &self.scheduler
    }

    #[inline]
    pub(crate) fn scheduler_mut(&mut self) -> &mut LrScheduler {
        &mut self.scheduler
    }

    /// Current learning rate.
    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.scheduler.get_lr()
    }

    /// Input length fixed by the first sized layer.
    #[inline]
    pub fn input_len(&self) -> Option<usize> {
        self.input_len
    }

    /// Output length fixed by the last sized layer.
    #[inline]
    pub fn output_len(&self) -> Option<usize> {
        self.output_len
    }

    /// A handle that can interrupt [`Self::train`] from elsewhere.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }
}

/// Clones get their own stop flag: stopping one copy never stops another.
impl Clone for BrainBuilder {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
            loss: self.loss,
            scheduler: self.scheduler.clone(),
            input_len: self.input_len,
            output_len: self.output_len,
            stop: StopFlag::new(),
        }
    }
}

/// Walks the layers and returns the network's (input_len, output_len).
fn shape_chain(layers: &[NetworkLayer]) -> Result<(Option<usize>, Option<usize>)> {
    if layers.is_empty() {
        return Err(Error::InvalidConfiguration(
            "network must have at least one layer".to_owned(),
        ));
    }

    let mut input_len = None;
    let mut current: Option<usize> = None;
    for (i, layer) in layers.iter().enumerate() {
        if let Some(expected_in) = layer.input_len() {
            match current {
                Some(width) if width != expected_in => {
                    return Err(Error::InvalidConfiguration(format!(
                        "layer {i} ({}) expects input_len {expected_in} but the previous layer produces {width}",
                        layer.kind_name()
                    )));
                }
                None => input_len = Some(expected_in),
                Some(_) => {}
            }
        }
        if let Some(out) = layer.output_len() {
            current = Some(out);
        }
    }

    Ok((input_len, current))
}
