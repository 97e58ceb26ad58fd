//! Training loop and batch prediction.
//!
//! Training is online gradient descent: every sample runs forward, has its loss
//! recorded and is immediately backpropagated. Samples are visited in the given
//! order. The scheduler advances once per completed epoch.
//!
//! A [`StopFlag`] is polled after every sample and after every epoch. Setting
//! it never interrupts a sample half-way.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{BrainBuilder, Dataset, Error, Result};

/// Epochs between progress log lines.
const LOG_EVERY: usize = 100;

const PREALLOCATED_EPOCHS: usize = 4096;

/// Cooperative cancellation handle shared between a training loop and whoever
/// wants to stop it (a signal handler, a UI close callback, another thread).
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the training loop to stop at its next safe point. Idempotent.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear a previous request so the network can be trained again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Summary of one epoch, handed to observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean loss over the samples processed in this epoch.
    pub average_loss: f64,
    /// Learning rate in effect during this epoch.
    pub learning_rate: f64,
    /// Samples processed (fewer than the dataset length if stopped mid-epoch).
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub epochs: Vec<EpochReport>,
    /// True when training ended early because of a [`StopFlag`].
    pub stopped: bool,
}

impl TrainReport {
    /// Average loss of the last (possibly partial) epoch.
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.average_loss)
    }
}

/// One row of [`BrainBuilder::predict`] output.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub input: Vec<f64>,
    pub label: Vec<f64>,
    pub output: Vec<f64>,
}

impl Prediction {
    /// Index of the largest output (the predicted class for classifiers).
    pub fn argmax(&self) -> Option<usize> {
        argmax(&self.output)
    }

    /// Index of the largest label entry.
    pub fn label_argmax(&self) -> Option<usize> {
        argmax(&self.label)
    }
}

fn argmax(xs: &[f64]) -> Option<usize> {
    xs.iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

impl BrainBuilder {
    /// Train for up to `max_iterations` epochs over `inputs`/`labels`.
    pub fn train(
        &mut self,
        max_iterations: usize,
        inputs: &[Vec<f64>],
        labels: &[Vec<f64>],
    ) -> Result<TrainReport> {
        self.train_with_observer(max_iterations, inputs, labels, |_| {})
    }

    /// Like [`Self::train`], calling `observer` after every epoch.
    pub fn train_with_observer<F>(
        &mut self,
        max_iterations: usize,
        inputs: &[Vec<f64>],
        labels: &[Vec<f64>],
        observer: F,
    ) -> Result<TrainReport>
    where
        F: FnMut(&EpochReport),
    {
        let data = Dataset::from_rows(inputs, labels)?;
        self.train_dataset(max_iterations, &data, observer)
    }

    /// Training loop over a validated [`Dataset`].
    pub fn train_dataset<F>(
        &mut self,
        max_iterations: usize,
        data: &Dataset,
        mut observer: F,
    ) -> Result<TrainReport>
    where
        F: FnMut(&EpochReport),
    {
        self.check_dataset(data)?;
        if max_iterations == 0 {
            return Err(Error::InvalidConfiguration(
                "max_iterations must be > 0".to_owned(),
            ));
        }

        let mut epochs = Vec::with_capacity(max_iterations.min(PREALLOCATED_EPOCHS));
        let mut stopped = false;

        for epoch in 0..max_iterations {
            let learning_rate = self.learning_rate();
            let mut loss_sum = 0.0;
            let mut samples = 0;

            for idx in 0..data.len() {
                let label = data.label(idx);
                let prediction = self.feedforward(data.input(idx))?;
                loss_sum += self.get_loss(&prediction, label)?;
                self.learn(&prediction, label)?;
                samples += 1;

                if self.stop.is_stop_requested() {
                    stopped = true;
                    break;
                }
            }

            let report = EpochReport {
                epoch,
                average_loss: loss_sum / samples as f64,
                learning_rate,
                samples,
            };
            observer(&report);
            epochs.push(report);

            // Only a completed epoch advances the schedule, even when stopping.
            if samples == data.len() {
                self.scheduler_mut().update();
            }

            if stopped || self.stop.is_stop_requested() {
                stopped = true;
                log::info!(
                    "training stopped after {} sample(s) of epoch {}/{max_iterations}",
                    samples,
                    epoch + 1
                );
                break;
            }

            if epoch % LOG_EVERY == 0 || epoch + 1 == max_iterations {
                log::info!(
                    "({}/{max_iterations}) iteration, loss: {:.6}, lr: {}",
                    epoch + 1,
                    report.average_loss,
                    learning_rate
                );
            }
        }

        Ok(TrainReport { epochs, stopped })
    }

    /// Run `feedforward` on every input without learning.
    pub fn predict(&mut self, inputs: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<Vec<Prediction>> {
        let data = Dataset::from_rows(inputs, labels)?;
        self.check_dataset(&data)?;

        let mut out = Vec::with_capacity(data.len());
        for idx in 0..data.len() {
            let input = data.input(idx);
            let output = self.feedforward(input)?;
            log::debug!("{:?} => {:?}", data.label(idx), output);
            out.push(Prediction {
                input: input.to_vec(),
                label: data.label(idx).to_vec(),
                output,
            });
        }
        Ok(out)
    }

    fn check_dataset(&self, data: &Dataset) -> Result<()> {
        if let Some(expected) = self.input_len() {
            if data.input_dim() != expected {
                return Err(Error::shape("dataset input", expected, data.input_dim()));
            }
        }
        if let Some(expected) = self.output_len() {
            if data.label_dim() != expected {
                return Err(Error::shape("dataset label", expected, data.label_dim()));
            }
        }
        Ok(())
    }
}
