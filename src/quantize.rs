use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("quantizer width must be 2..=16 bits, got {0}")]
pub struct InvalidWidth(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("quantization overflow: {value} rounds outside of +/-{limit}")]
pub struct QuantizationOverflow {
    pub value: f64,
    pub limit: i32,
}

// what to do when a rounded sample does not fit the output width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    #[default]
    Error,
    Clamp,
}

/// Rounds real samples onto a signed fixed-width integer grid.
///
/// Values are scaled by `amplitude` and rounded half-to-even. The
/// representable range is symmetric, `[-(2^(bits-1) - 1), 2^(bits-1) - 1]`,
/// so a 12-bit quantizer at full scale produces values in `[-2047, 2047]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    bits: u32,
    amplitude: f64,
    policy: OverflowPolicy,
}

impl Default for Quantizer {
    fn default() -> Self {
        Quantizer {
            bits: 12,
            amplitude: 2047.0,
            policy: OverflowPolicy::Error,
        }
    }
}

impl Quantizer {
    pub fn new(bits: u32, amplitude: f64, policy: OverflowPolicy)
               -> Result<Self, InvalidWidth> {
        if !(2..=16).contains(&bits) {
            return Err(InvalidWidth(bits));
        }
        Ok(Quantizer { bits, amplitude, policy })
    }

    pub fn full_scale(bits: u32) -> Result<Self, InvalidWidth> {
        let q = Quantizer::new(bits, 0.0, OverflowPolicy::Error)?;
        Ok(Quantizer { amplitude: q.limit() as f64, ..q })
    }

    pub fn policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn limit(&self) -> i32 {
        (1i32 << (self.bits - 1)) - 1
    }

    // value is expected in [-1, 1] before scaling
    pub fn quantize(&self, value: f64) -> Result<i16, QuantizationOverflow> {
        let scaled = self.amplitude * value;
        let rounded = scaled.round_ties_even();
        let limit = self.limit() as f64;
        if rounded.abs() <= limit {
            return Ok(rounded as i16);
        }
        match self.policy {
            OverflowPolicy::Clamp => Ok(rounded.clamp(-limit, limit) as i16),
            OverflowPolicy::Error => Err(QuantizationOverflow {
                value: scaled,
                limit: self.limit(),
            }),
        }
    }
}
