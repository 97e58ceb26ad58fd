//! Network configuration and construction.
//!
//! A network is described by a [`NetworkConfig`]: an ordered list of
//! [`LayerSpec`]s, a learning rate, a loss kind, a schedule and an optional
//! seed. [`NetworkBuilder`] is the fluent way to produce one:
//!
//! ```rust
//! use brain_builder::{Activation, LossKind, NetworkBuilder};
//!
//! # fn main() -> brain_builder::Result<()> {
//! let net = NetworkBuilder::new()
//!     .dense(2, 2)
//!     .activation(Activation::Sigmoid)
//!     .dense(2, 1)
//!     .activation(Activation::Sigmoid)
//!     .learning_rate(5.0)
//!     .loss(LossKind::Mse)
//!     .build_with_seed(0)?;
//! assert_eq!(net.input_len(), Some(2));
//! # Ok(())
//! # }
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layer::{ActivationLayer, Dense, NetworkLayer};
use crate::norm::BatchNorm;
use crate::schedule::validate_lr;
use crate::{Activation, BrainBuilder, Error, LossKind, LrScheduler, Result, ScheduleConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
/// One entry of a network's layer list.
pub enum LayerSpec {
    Dense { input_len: usize, output_len: usize },
    Activation {
        #[cfg_attr(feature = "serde", serde(with = "activation_tag"))]
        kind: Activation,
    },
    BatchNorm { len: usize },
}

impl LayerSpec {
    fn validate(&self) -> Result<()> {
        match *self {
            LayerSpec::Dense {
                input_len,
                output_len,
            } => {
                if input_len == 0 || output_len == 0 {
                    return Err(Error::InvalidConfiguration(format!(
                        "dense sizes must be > 0, got {input_len} -> {output_len}"
                    )));
                }
            }
            LayerSpec::Activation { kind } => kind.validate()?,
            LayerSpec::BatchNorm { len } => {
                if len == 0 {
                    return Err(Error::InvalidConfiguration(
                        "batch norm length must be > 0".to_owned(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn instantiate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NetworkLayer> {
        Ok(match *self {
            LayerSpec::Dense {
                input_len,
                output_len,
            } => Dense::new_with_rng(input_len, output_len, rng)?.into(),
            LayerSpec::Activation { kind } => ActivationLayer::new(kind)?.into(),
            LayerSpec::BatchNorm { len } => BatchNorm::new(len)?.into(),
        })
    }

    /// `(input_len, output_len)`; `None` for shape-preserving layers.
    fn dims(&self) -> (Option<usize>, Option<usize>) {
        match *self {
            LayerSpec::Dense {
                input_len,
                output_len,
            } => (Some(input_len), Some(output_len)),
            LayerSpec::Activation { .. } => (None, None),
            LayerSpec::BatchNorm { len } => (Some(len), Some(len)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Everything needed to build a [`BrainBuilder`].
pub struct NetworkConfig {
    pub layers: Vec<LayerSpec>,
    pub learning_rate: f64,
    pub loss: LossKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub schedule: ScheduleConfig,
    /// Seed for weight initialization. `None` draws from OS entropy.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: Option<u64>,
}

impl NetworkConfig {
    /// Check rates, layer sizes and the layer shape chain.
    pub fn validate(&self) -> Result<()> {
        validate_lr(self.learning_rate)?;
        self.schedule.validate()?;
        if self.layers.is_empty() {
            return Err(Error::InvalidConfiguration(
                "network must have at least one layer".to_owned(),
            ));
        }

        let mut width: Option<usize> = None;
        for (i, spec) in self.layers.iter().enumerate() {
            spec.validate()?;
            let (input, output) = spec.dims();
            if let (Some(expected), Some(actual)) = (input, width) {
                if expected != actual {
                    return Err(Error::InvalidConfiguration(format!(
                        "layer {i} expects input_len {expected} but the previous layer produces {actual}"
                    )));
                }
            }
            if output.is_some() {
                width = output;
            }
        }
        Ok(())
    }

    /// Parse a JSON network description.
    #[cfg(feature = "serde")]
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl BrainBuilder {
    /// Build a freshly initialised network from `config`.
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        match config.seed {
            Some(seed) => Self::from_config_with_rng(config, &mut StdRng::seed_from_u64(seed)),
            None => Self::from_config_with_rng(config, &mut StdRng::from_entropy()),
        }
    }

    /// Build using the provided RNG (the config's seed is ignored).
    pub fn from_config_with_rng<R: Rng + ?Sized>(
        config: &NetworkConfig,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        let layers = config
            .layers
            .iter()
            .map(|spec| spec.instantiate(&mut *rng))
            .collect::<Result<Vec<_>>>()?;
        let scheduler = LrScheduler::new(config.learning_rate, config.schedule)?;
        BrainBuilder::new(layers, config.loss, scheduler)
    }
}

/// Fluent builder for a [`NetworkConfig`].
///
/// Defaults: learning rate 0.1, MSE loss, the default step-decay schedule.
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    config: NetworkConfig,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            config: NetworkConfig {
                layers: Vec::new(),
                learning_rate: 0.1,
                loss: LossKind::Mse,
                schedule: ScheduleConfig::default(),
                seed: None,
            },
        }
    }

    pub fn dense(mut self, input_len: usize, output_len: usize) -> Self {
        self.config.layers.push(LayerSpec::Dense {
            input_len,
            output_len,
        });
        self
    }

    pub fn activation(mut self, kind: Activation) -> Self {
        self.config.layers.push(LayerSpec::Activation { kind });
        self
    }

    pub fn batch_norm(mut self, len: usize) -> Self {
        self.config.layers.push(LayerSpec::BatchNorm { len });
        self
    }

    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    pub fn loss(mut self, loss: LossKind) -> Self {
        self.config.loss = loss;
        self
    }

    pub fn schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.config.schedule = schedule;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// The accumulated configuration, validated.
    pub fn into_config(self) -> Result<NetworkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    pub fn build(self) -> Result<BrainBuilder> {
        BrainBuilder::from_config(&self.config)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<BrainBuilder> {
        self.seed(seed).build()
    }
}

/// Activations appear in configs as plain strings (`"sigmoid"`) or, when they
/// carry a parameter, as `{ "leaky_relu": 0.2 }` / `{ "elu": 0.5 }`.
#[cfg(feature = "serde")]
mod activation_tag {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::Activation;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Name(String),
        LeakyRelu { leaky_relu: f64 },
        Elu { elu: f64 },
    }

    pub fn serialize<S: Serializer>(act: &Activation, s: S) -> Result<S::Ok, S::Error> {
        let repr = match *act {
            Activation::LeakyReLU { coef } => Repr::LeakyRelu { leaky_relu: coef },
            Activation::Elu { alpha } => Repr::Elu { elu: alpha },
            other => Repr::Name(other.name().to_owned()),
        };
        repr.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Activation, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
            Repr::LeakyRelu { leaky_relu } => Ok(Activation::LeakyReLU { coef: leaky_relu }),
            Repr::Elu { elu } => Ok(Activation::Elu { alpha: elu }),
        }
    }
}
