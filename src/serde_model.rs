//! Network state capture/restore, and JSON persistence (feature: `serde`).
//!
//! The on-disk format is a versioned mirror of the network, not the internal
//! structs themselves, so the layout can change without breaking saved files.
//!
//! Restoring validates the version, every layer's shape and parameter
//! finiteness, the layer shape chain and the scheduler state. Caches from the
//! last forward pass are not saved: a restored network needs a `feedforward`
//! before it can `learn`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use std::path::Path;

use crate::layer::{ActivationLayer, Dense, NetworkLayer};
use crate::norm::BatchNorm;
use crate::{Activation, BrainBuilder, Error, LossKind, LrScheduler, Result, ScheduleConfig};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedNetwork {
    pub format_version: u32,
    pub layers: Vec<SerializedLayer>,
    pub loss: LossKind,
    pub scheduler: SerializedScheduler,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub enum SerializedLayer {
    Dense {
        input_len: usize,
        output_len: usize,
        /// Row-major (output_len, input_len).
        weights: Vec<f64>,
        bias: Vec<f64>,
    },
    Activation {
        activation: SerializedActivation,
    },
    BatchNorm {
        gamma: Vec<f64>,
        beta: Vec<f64>,
    },
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SerializedActivation {
    Sigmoid,
    Relu,
    Tanh,
    LeakyRelu { coef: f64 },
    Elu { alpha: f64 },
    Softmax,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedScheduler {
    pub initial_lr: f64,
    pub iteration: u64,
    pub current_lr: f64,
    pub config: ScheduleConfig,
}

impl From<Activation> for SerializedActivation {
    fn from(value: Activation) -> Self {
        match value {
            Activation::Sigmoid => SerializedActivation::Sigmoid,
            Activation::ReLU => SerializedActivation::Relu,
            Activation::TanH => SerializedActivation::Tanh,
            Activation::LeakyReLU { coef } => SerializedActivation::LeakyRelu { coef },
            Activation::Elu { alpha } => SerializedActivation::Elu { alpha },
            Activation::Softmax => SerializedActivation::Softmax,
        }
    }
}

impl From<SerializedActivation> for Activation {
    fn from(value: SerializedActivation) -> Self {
        match value {
            SerializedActivation::Sigmoid => Activation::Sigmoid,
            SerializedActivation::Relu => Activation::ReLU,
            SerializedActivation::Tanh => Activation::TanH,
            SerializedActivation::LeakyRelu { coef } => Activation::LeakyReLU { coef },
            SerializedActivation::Elu { alpha } => Activation::Elu { alpha },
            SerializedActivation::Softmax => Activation::Softmax,
        }
    }
}

impl From<&NetworkLayer> for SerializedLayer {
    fn from(layer: &NetworkLayer) -> Self {
        match layer {
            NetworkLayer::Dense(d) => {
                // One bias per output row; weights are (output_len, input_len).
                let output_len = d.bias().len();
                SerializedLayer::Dense {
                    input_len: d.weights().len() / output_len,
                    output_len,
                    weights: d.weights().to_vec(),
                    bias: d.bias().to_vec(),
                }
            }
            NetworkLayer::Activation(a) => SerializedLayer::Activation {
                activation: a.activation().into(),
            },
            NetworkLayer::BatchNorm(b) => SerializedLayer::BatchNorm {
                gamma: b.gamma().to_vec(),
                beta: b.beta().to_vec(),
            },
        }
    }
}

impl TryFrom<SerializedLayer> for NetworkLayer {
    type Error = Error;

    fn try_from(value: SerializedLayer) -> Result<Self> {
        Ok(match value {
            SerializedLayer::Dense {
                input_len,
                output_len,
                weights,
                bias,
            } => Dense::from_parts(input_len, output_len, weights, bias)?.into(),
            SerializedLayer::Activation { activation } => {
                ActivationLayer::new(activation.into())?.into()
            }
            SerializedLayer::BatchNorm { gamma, beta } => BatchNorm::from_parts(gamma, beta)?.into(),
        })
    }
}

impl From<&BrainBuilder> for SerializedNetwork {
    fn from(net: &BrainBuilder) -> Self {
        let scheduler = net.scheduler();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            layers: net.layers().iter().map(SerializedLayer::from).collect(),
            loss: net.loss_kind(),
            scheduler: SerializedScheduler {
                initial_lr: scheduler.initial_lr(),
                iteration: scheduler.iteration(),
                current_lr: scheduler.get_lr(),
                config: *scheduler.config(),
            },
        }
    }
}

impl TryFrom<SerializedNetwork> for BrainBuilder {
    type Error = Error;

    fn try_from(value: SerializedNetwork) -> Result<Self> {
        if value.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported model format_version {}; expected {}",
                value.format_version, MODEL_FORMAT_VERSION
            )));
        }

        let mut layers = Vec::with_capacity(value.layers.len());
        for (i, layer) in value.layers.into_iter().enumerate() {
            let layer = NetworkLayer::try_from(layer)
                .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;
            layers.push(layer);
        }

        let s = value.scheduler;
        let scheduler = LrScheduler::from_state(s.initial_lr, s.config, s.iteration, s.current_lr)
            .map_err(|e| Error::InvalidData(format!("scheduler invalid: {e}")))?;

        BrainBuilder::new(layers, value.loss, scheduler)
            .map_err(|e| Error::InvalidData(format!("network invalid: {e}")))
    }
}

impl BrainBuilder {
    /// Snapshot of all parameters and scheduler state.
    pub fn to_serialized(&self) -> SerializedNetwork {
        SerializedNetwork::from(self)
    }

    /// Rebuild a network from a snapshot. The result has a fresh stop flag.
    pub fn from_serialized(state: SerializedNetwork) -> Result<Self> {
        state.try_into()
    }
}

#[cfg(feature = "serde")]
impl BrainBuilder {
    /// Serialize the network to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_serialized())?)
    }

    /// Serialize the network to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_serialized())?)
    }

    /// Parse a network from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let state: SerializedNetwork = serde_json::from_str(s)?;
        Self::from_serialized(state)
    }

    /// Save the network to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        std::fs::write(path.as_ref(), s)?;
        log::debug!("saved network to {}", path.as_ref().display());
        Ok(())
    }

    /// Load a network from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> BrainBuilder {
        let dense = Dense::from_parts(2, 1, vec![0.5, -0.25], vec![0.1]).unwrap();
        let act = ActivationLayer::new(Activation::Sigmoid).unwrap();
        let mut scheduler = LrScheduler::new(0.5, ScheduleConfig::constant()).unwrap();
        for _ in 0..3 {
            scheduler.update();
        }
        BrainBuilder::new(vec![dense.into(), act.into()], LossKind::Mse, scheduler).unwrap()
    }

    #[test]
    fn snapshot_restores_identical_behavior() {
        let mut net = tiny();
        let mut restored = BrainBuilder::from_serialized(net.to_serialized()).unwrap();
        let x = [0.3, -1.7];
        assert_eq!(net.feedforward(&x).unwrap(), restored.feedforward(&x).unwrap());
        assert_eq!(restored.scheduler().iteration(), 3);
    }

    #[test]
    fn dense_dims_are_recorded_from_parameter_shapes() {
        let dense = Dense::from_parts(3, 2, vec![0.0; 6], vec![0.0; 2]).unwrap();
        let layer = NetworkLayer::from(dense);
        match SerializedLayer::from(&layer) {
            SerializedLayer::Dense {
                input_len,
                output_len,
                ..
            } => assert_eq!((input_len, output_len), (3, 2)),
            other => panic!("expected dense, got {other:?}"),
        }
    }

    #[test]
    fn rejects_inconsistent_snapshots() {
        let mut state = tiny().to_serialized();
        state.format_version = 999;
        let err = BrainBuilder::from_serialized(state).unwrap_err();
        assert!(format!("{err}").contains("format_version"));

        let mut state = tiny().to_serialized();
        state.layers.insert(
            1,
            SerializedLayer::Dense {
                input_len: 3,
                output_len: 1,
                weights: vec![0.0; 3],
                bias: vec![0.0],
            },
        );
        assert!(BrainBuilder::from_serialized(state).is_err());

        let mut state = tiny().to_serialized();
        if let SerializedLayer::Dense { weights, .. } = &mut state.layers[0] {
            weights[0] = f64::NAN;
        }
        assert!(BrainBuilder::from_serialized(state).is_err());

        let mut state = tiny().to_serialized();
        state.scheduler.initial_lr = -1.0;
        assert!(BrainBuilder::from_serialized(state).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn golden_json_is_stable_and_roundtrips() {
        let json = tiny().to_json_string_pretty().unwrap();

        let golden = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/golden/network_v1.json"
        ))
        .trim_end();
        assert_eq!(json, golden);

        let loaded = BrainBuilder::from_json_str(golden).unwrap();
        assert_eq!(loaded.to_json_string_pretty().unwrap(), golden);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn rejects_unknown_version_and_garbage() {
        let bad = r#"{"format_version":999,"layers":[],"loss":"mse","scheduler":{"initial_lr":1.0,"iteration":0,"current_lr":1.0,"config":{}}}"#;
        let err = BrainBuilder::from_json_str(bad).unwrap_err();
        assert!(format!("{err}").contains("format_version"));

        assert!(matches!(
            BrainBuilder::from_json_str("{not json").unwrap_err(),
            Error::Serialization(_)
        ));
    }
}
