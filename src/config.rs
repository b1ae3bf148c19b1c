use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::carrier::PHASE_TIME_DIVISOR;
use crate::generator::GeneratorConfig;
use crate::quantize::{OverflowPolicy, Quantizer};
use crate::sim::{SimTime, TimeUnit};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything that shapes one testbench run.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// run_time_us = 2000
/// carrier_freq_hz = 100000
/// overflow = "clamp"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestbenchConfig {
    pub run_time_us: u64,
    pub clock_freq_hz: f64,
    pub carrier_freq_hz: f64,
    pub alpha: i64,
    pub amplitude: f64,
    pub width_bits: u32,
    pub overflow: OverflowPolicy,
    pub clear_on_stop: bool,
    pub plot: bool,
    pub plot_path: Option<PathBuf>,
    pub capture_path: Option<PathBuf>,
}

impl Default for TestbenchConfig {
    fn default() -> Self {
        TestbenchConfig {
            run_time_us: 100_000,
            clock_freq_hz: 1.25e6,
            carrier_freq_hz: 433_000.0,
            alpha: 1,
            amplitude: 2047.0,
            width_bits: 12,
            overflow: OverflowPolicy::Error,
            clear_on_stop: false,
            plot: false,
            plot_path: None,
            capture_path: None,
        }
    }
}

impl TestbenchConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_owned(), source })?;
        let cfg = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let cfg: TestbenchConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if !(self.clock_freq_hz.is_finite() && self.clock_freq_hz > 0.0) {
            return invalid(format!("clock_freq_hz must be positive, got {}",
                                   self.clock_freq_hz));
        }
        if !(self.carrier_freq_hz.is_finite() && self.carrier_freq_hz > 0.0) {
            return invalid(format!("carrier_freq_hz must be positive, got {}",
                                   self.carrier_freq_hz));
        }
        if self.run_time_us == 0 {
            return invalid("run_time_us must be positive".to_owned());
        }
        if !(2..=16).contains(&self.width_bits) {
            return invalid(format!("width_bits must be within 2..=16, got {}",
                                   self.width_bits));
        }
        if self.clock_period_ns() == 0 {
            return invalid(format!("clock_freq_hz {} is above 1 GHz", self.clock_freq_hz));
        }
        if self.sequence_length().is_none() {
            return invalid(format!(
                "run_time_us {} at a {} ns clock does not fit the simulated timeline",
                self.run_time_us, self.clock_period_ns()));
        }
        let limit = ((1i64 << (self.width_bits - 1)) - 1) as f64;
        if !(self.amplitude.is_finite() && self.amplitude >= 0.0) {
            return invalid(format!("amplitude must be non-negative, got {}", self.amplitude));
        }
        if self.amplitude > limit && self.overflow != OverflowPolicy::Clamp {
            return invalid(format!(
                "amplitude {} exceeds the {}-bit full scale {} (set overflow = \"clamp\")",
                self.amplitude, self.width_bits, limit));
        }
        Ok(())
    }

    // reset, arming and the disarm edge take a few periods around the window
    fn sequence_length(&self) -> Option<SimTime> {
        let period = SimTime::checked_new(self.clock_period_ns(), TimeUnit::Ns)?;
        let window = SimTime::checked_new(self.run_time_us, TimeUnit::Us)?;
        period.femtos().checked_mul(4)?
            .checked_add(window.femtos())
            .map(SimTime)
    }

    /// Clock period in whole nanoseconds, rounded.
    pub fn clock_period_ns(&self) -> u64 {
        (1e9 / self.clock_freq_hz).round() as u64
    }

    // clock period in seconds, as used for the spectrum axis
    pub fn dt(&self) -> f64 {
        self.clock_period_ns() as f64 * 1e-9
    }

    /// Where the carrier lands on the spectrum of a capture, in Hz.
    pub fn tone_hz(&self) -> f64 {
        let cycles_per_sample = self.carrier_freq_hz / 2.0
            * self.clock_period_ns() as f64 / PHASE_TIME_DIVISOR;
        cycles_per_sample / self.dt()
    }

    pub fn quantizer(&self) -> Result<Quantizer, ConfigError> {
        Quantizer::new(self.width_bits, self.amplitude, self.overflow)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn generator_config(&self) -> Result<GeneratorConfig, ConfigError> {
        Ok(GeneratorConfig {
            quantizer: self.quantizer()?,
            clear_on_stop: self.clear_on_stop,
            ..Default::default()
        })
    }
}
