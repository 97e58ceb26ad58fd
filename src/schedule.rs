//! Learning-rate scheduling.
//!
//! The scheduler holds one piece of mutable state, the current rate. It is
//! advanced once per completed epoch with [`LrScheduler::update`] and read for
//! every sample with [`LrScheduler::get_lr`].
//!
//! After `k` updates the iteration counter is `k` and the rate equals the
//! schedule's formula evaluated at `t = k` (optionally smoothed, see
//! [`ScheduleConfig::momentum`]).

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
/// Decay policy.
pub enum LrScheduleKind {
    /// `initial * decay_rate ^ floor(t / decay_steps)`
    #[default]
    StepDecay,
    /// `initial * exp(-decay_rate * t)`
    ExponentialDecay,
    /// `initial / (1 + decay_rate * t)`
    TimeBasedDecay,
    /// `initial * (1 + cos(pi * t / total_steps)) / 2`
    CosineAnnealing,
    /// `initial`
    Constant,
}

impl LrScheduleKind {
    pub fn name(self) -> &'static str {
        match self {
            LrScheduleKind::StepDecay => "step_decay",
            LrScheduleKind::ExponentialDecay => "exponential_decay",
            LrScheduleKind::TimeBasedDecay => "time_based_decay",
            LrScheduleKind::CosineAnnealing => "cosine_annealing",
            LrScheduleKind::Constant => "constant",
        }
    }
}

impl fmt::Display for LrScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LrScheduleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "step_decay" => Ok(LrScheduleKind::StepDecay),
            "exponential_decay" | "exp_decay" => Ok(LrScheduleKind::ExponentialDecay),
            "time_based_decay" | "time_decay" => Ok(LrScheduleKind::TimeBasedDecay),
            "cosine_annealing" => Ok(LrScheduleKind::CosineAnnealing),
            "constant" | "none" => Ok(LrScheduleKind::Constant),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown learning rate schedule {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
/// Schedule hyperparameters.
pub struct ScheduleConfig {
    pub kind: LrScheduleKind,
    pub decay_rate: f64,
    /// Interval for [`LrScheduleKind::StepDecay`].
    pub decay_steps: u64,
    /// Horizon for [`LrScheduleKind::CosineAnnealing`].
    pub total_steps: u64,
    /// Smoothing factor in `[0, 1)`: `lr = m * previous + (1 - m) * formula(t)`.
    /// Zero disables smoothing.
    pub momentum: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            kind: LrScheduleKind::StepDecay,
            decay_rate: 0.1,
            decay_steps: 1000,
            total_steps: 10_000,
            momentum: 0.0,
        }
    }
}

impl ScheduleConfig {
    /// A schedule that keeps the initial rate forever.
    pub fn constant() -> Self {
        Self {
            kind: LrScheduleKind::Constant,
            ..Self::default()
        }
    }

    pub fn step_decay(decay_rate: f64, decay_steps: u64) -> Self {
        Self {
            kind: LrScheduleKind::StepDecay,
            decay_rate,
            decay_steps,
            ..Self::default()
        }
    }

    pub fn exponential_decay(decay_rate: f64) -> Self {
        Self {
            kind: LrScheduleKind::ExponentialDecay,
            decay_rate,
            ..Self::default()
        }
    }

    pub fn time_based_decay(decay_rate: f64) -> Self {
        Self {
            kind: LrScheduleKind::TimeBasedDecay,
            decay_rate,
            ..Self::default()
        }
    }

    pub fn cosine_annealing(total_steps: u64) -> Self {
        Self {
            kind: LrScheduleKind::CosineAnnealing,
            total_steps,
            ..Self::default()
        }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    /// Validate schedule hyperparameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.decay_rate.is_finite() && self.decay_rate >= 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "decay_rate must be finite and >= 0, got {}",
                self.decay_rate
            )));
        }
        if self.decay_steps == 0 {
            return Err(Error::InvalidConfiguration(
                "decay_steps must be > 0".to_owned(),
            ));
        }
        if self.total_steps == 0 {
            return Err(Error::InvalidConfiguration(
                "total_steps must be > 0".to_owned(),
            ));
        }
        if !(self.momentum.is_finite() && (0.0..1.0).contains(&self.momentum)) {
            return Err(Error::InvalidConfiguration(format!(
                "schedule momentum must be finite and in [0,1), got {}",
                self.momentum
            )));
        }
        Ok(())
    }
}

/// Mutable learning-rate state.
#[derive(Debug, Clone, PartialEq)]
pub struct LrScheduler {
    config: ScheduleConfig,
    initial_lr: f64,
    iteration: u64,
    current_lr: f64,
}

impl LrScheduler {
    pub fn new(initial_lr: f64, config: ScheduleConfig) -> Result<Self> {
        validate_lr(initial_lr)?;
        config.validate()?;
        Ok(Self {
            config,
            initial_lr,
            iteration: 0,
            current_lr: initial_lr,
        })
    }

    /// Restore a scheduler mid-run (used when loading a saved network).
    pub fn from_state(
        initial_lr: f64,
        config: ScheduleConfig,
        iteration: u64,
        current_lr: f64,
    ) -> Result<Self> {
        let mut s = Self::new(initial_lr, config)?;
        if !current_lr.is_finite() {
            return Err(Error::InvalidData(format!(
                "current learning rate must be finite, got {current_lr}"
            )));
        }
        s.iteration = iteration;
        s.current_lr = current_lr;
        Ok(s)
    }

    /// Rate as of the last `update` (the initial rate before any update).
    #[inline]
    pub fn get_lr(&self) -> f64 {
        self.current_lr
    }

    /// Advance by one epoch.
    pub fn update(&mut self) {
        self.iteration += 1;
        let target = self.rate_at(self.iteration);
        let m = self.config.momentum;
        self.current_lr = if m > 0.0 {
            m * self.current_lr + (1.0 - m) * target
        } else {
            target
        };
    }

    /// The unsmoothed schedule formula at iteration `t`.
    pub fn rate_at(&self, t: u64) -> f64 {
        let c = &self.config;
        let t_f = t as f64;
        match c.kind {
            LrScheduleKind::StepDecay => {
                let exponent = i32::try_from(t / c.decay_steps).unwrap_or(i32::MAX);
                self.initial_lr * c.decay_rate.powi(exponent)
            }
            LrScheduleKind::ExponentialDecay => self.initial_lr * (-c.decay_rate * t_f).exp(),
            LrScheduleKind::TimeBasedDecay => self.initial_lr / (1.0 + c.decay_rate * t_f),
            LrScheduleKind::CosineAnnealing => {
                self.initial_lr * (1.0 + (PI * t_f / c.total_steps as f64).cos()) / 2.0
            }
            LrScheduleKind::Constant => self.initial_lr,
        }
    }

    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    #[inline]
    pub fn initial_lr(&self) -> f64 {
        self.initial_lr
    }

    #[inline]
    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }
}

pub(crate) fn validate_lr(lr: f64) -> Result<()> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(Error::InvalidConfiguration(format!(
            "learning rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn after(s: &mut LrScheduler, updates: usize) -> f64 {
        for _ in 0..updates {
            s.update();
        }
        s.get_lr()
    }

    #[test]
    fn step_decay_drops_every_decay_steps() {
        let mut s = LrScheduler::new(1.0, ScheduleConfig::step_decay(0.1, 2)).unwrap();
        assert_eq!(s.get_lr(), 1.0);
        assert_relative_eq!(after(&mut s, 1), 1.0);
        assert_relative_eq!(after(&mut s, 1), 0.1);
        assert_relative_eq!(after(&mut s, 1), 0.1);
        assert_relative_eq!(after(&mut s, 1), 0.01);
        assert_eq!(s.iteration(), 4);
    }

    #[test]
    fn exponential_and_time_based_decay() {
        let mut e = LrScheduler::new(2.0, ScheduleConfig::exponential_decay(0.5)).unwrap();
        assert_relative_eq!(after(&mut e, 2), 2.0 * (-1.0_f64).exp());

        let mut t = LrScheduler::new(2.0, ScheduleConfig::time_based_decay(0.5)).unwrap();
        assert_relative_eq!(after(&mut t, 2), 1.0);
    }

    #[test]
    fn cosine_annealing_reaches_zero_at_horizon() {
        let mut s = LrScheduler::new(1.0, ScheduleConfig::cosine_annealing(4)).unwrap();
        assert_relative_eq!(after(&mut s, 2), 0.5, epsilon = 1e-12);
        assert!(after(&mut s, 2).abs() < 1e-12);
    }

    #[test]
    fn constant_never_changes() {
        let mut s = LrScheduler::new(5.0, ScheduleConfig::constant()).unwrap();
        assert_eq!(after(&mut s, 1000), 5.0);
    }

    #[test]
    fn momentum_smooths_towards_formula() {
        let cfg = ScheduleConfig::step_decay(0.0, 1).with_momentum(0.5);
        let mut s = LrScheduler::new(1.0, cfg).unwrap();
        // formula drops to 0 immediately; smoothing halves each step.
        assert_relative_eq!(after(&mut s, 1), 0.5);
        assert_relative_eq!(after(&mut s, 1), 0.25);
    }

    #[test]
    fn rejects_bad_config() {
        assert!(LrScheduler::new(0.0, ScheduleConfig::default()).is_err());
        assert!(LrScheduler::new(f64::NAN, ScheduleConfig::default()).is_err());
        assert!(LrScheduler::new(1.0, ScheduleConfig::step_decay(0.1, 0)).is_err());
        assert!(LrScheduler::new(1.0, ScheduleConfig::cosine_annealing(0)).is_err());
        assert!(LrScheduler::new(1.0, ScheduleConfig::constant().with_momentum(1.0)).is_err());
        assert!(matches!(
            "linear_warmup".parse::<LrScheduleKind>().unwrap_err(),
            Error::InvalidConfiguration(_)
        ));
    }
}
