//! A small feed-forward neural network library.
//!
//! `brain-builder` trains dense networks one sample at a time with plain
//! backpropagation. It is meant to be read: every layer is a pair of
//! `feedforward`/`learn` methods over `f64` column vectors.
//!
//! # Building blocks
//!
//! - [`Dense`], [`ActivationLayer`] and [`BatchNorm`] layers behind the [`Layer`] trait.
//! - [`Activation`]: sigmoid, ReLU, tanh, leaky ReLU, ELU (softmax forward only).
//! - [`LossKind`]: MSE, MAE, binary log-loss, categorical cross-entropy.
//! - [`LrScheduler`]: step, exponential, time-based and cosine decay, applied once per epoch.
//! - [`BrainBuilder`]: owns the layers, loss and scheduler and runs training.
//!
//! # Contracts
//!
//! - Shapes are checked at every public boundary and reported as [`Error::ShapeMismatch`].
//! - `learn` needs a preceding `feedforward` on the same instance; a layer that has
//!   never run forward returns [`Error::MissingForwardPass`].
//! - Log/division edge cases in the losses are clipped, never reported as errors.
//! - Training can be interrupted through a [`StopFlag`].
//!
//! # Quick start
//!
//! ```rust
//! use brain_builder::{Activation, LossKind, NetworkBuilder, ScheduleConfig};
//!
//! # fn main() -> brain_builder::Result<()> {
//! let xs = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//!     vec![1.0, 1.0],
//! ];
//! let ys = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];
//!
//! let mut net = NetworkBuilder::new()
//!     .dense(2, 4)
//!     .activation(Activation::TanH)
//!     .dense(4, 1)
//!     .activation(Activation::Sigmoid)
//!     .learning_rate(0.5)
//!     .loss(LossKind::Mse)
//!     .schedule(ScheduleConfig::constant())
//!     .build_with_seed(0)?;
//!
//! let report = net.train(200, &xs, &ys)?;
//! assert_eq!(report.epochs.len(), 200);
//!
//! for p in net.predict(&xs, &ys)? {
//!     assert_eq!(p.output.len(), 1);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # MSRV
//!
//! This crate's minimum supported Rust version (MSRV) is specified in `Cargo.toml`.

pub mod activation;
pub mod builder;
pub mod data;
pub mod error;
pub mod layer;
pub mod loss;
mod matmul;
pub mod network;
pub mod norm;
pub mod schedule;
pub mod serde_model;
pub mod train;

pub use activation::Activation;
pub use builder::{LayerSpec, NetworkBuilder, NetworkConfig};
pub use data::Dataset;
pub use error::{Error, Result};
pub use layer::{ActivationLayer, Dense, Layer, NetworkLayer};
pub use loss::{Loss, LossKind};
pub use network::BrainBuilder;
pub use norm::BatchNorm;
pub use schedule::{LrScheduleKind, LrScheduler, ScheduleConfig};
pub use serde_model::SerializedNetwork;
pub use train::{EpochReport, Prediction, StopFlag, TrainReport};
