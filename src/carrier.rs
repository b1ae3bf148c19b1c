use crate::quantize::{QuantizationOverflow, Quantizer};
use crate::signal::Signal;

use num::Complex;

// accumulated sample time is divided by this before it reaches the phase,
// whatever unit the sample period was declared in
pub const PHASE_TIME_DIVISOR: f64 = 1e12;

/// One quantized in-phase/quadrature sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IqPair {
    pub i: i16,
    pub q: i16,
}

impl IqPair {
    pub fn new(i: i16, q: i16) -> Self {
        IqPair { i, q }
    }

    pub fn to_complex(self) -> Complex<f64> {
        Complex::new(self.i as f64, self.q as f64)
    }
}

/// A fixed-frequency carrier sampled at a fixed period.
///
/// The phase at accumulated time `t` is `2π · (freq/2) · t / 1e12`. The
/// halved frequency and the picosecond divisor are part of the signal
/// definition and are kept exactly, even though the period is usually
/// declared in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Carrier {
    freq: f64,
    sample_period: u64,
    quantizer: Quantizer,
}

impl Carrier {
    pub fn new(freq: f64, sample_period: u64) -> Self {
        Carrier {
            freq,
            sample_period,
            quantizer: Quantizer::default(),
        }
    }

    pub fn quantizer(mut self, quantizer: Quantizer) -> Self {
        self.quantizer = quantizer;
        self
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    pub fn sample_period(&self) -> u64 {
        self.sample_period
    }

    pub fn phase(&self, t: u64) -> f64 {
        use std::f64::consts::PI;
        2.0 * PI * self.freq / 2.0 * t as f64 / PHASE_TIME_DIVISOR
    }

    pub fn sample_at(&self, t: u64) -> Result<IqPair, QuantizationOverflow> {
        let phase = self.phase(t);
        Ok(IqPair {
            i: self.quantizer.quantize(phase.cos())?,
            q: self.quantizer.quantize(phase.sin())?,
        })
    }

    // samples per second, taking the period in units of 1/PHASE_TIME_DIVISOR
    pub fn rate(&self) -> f64 {
        PHASE_TIME_DIVISOR / self.sample_period as f64
    }

    pub fn samples(self) -> CarrierSignal {
        CarrierSignal { carrier: self, t: 0 }
    }
}

/// Successive samples of a [`Carrier`], starting at `t = 0`.
///
/// Samples that overflow the quantizer come through as errors so the
/// stream keeps its time alignment.
#[derive(Debug, Clone)]
pub struct CarrierSignal {
    carrier: Carrier,
    t: u64,
}

impl CarrierSignal {
    pub fn time(&self) -> u64 {
        self.t
    }
}

impl Signal for CarrierSignal {
    type Sample = Result<IqPair, QuantizationOverflow>;
    fn next(&mut self) -> Option<Self::Sample> {
        let sample = self.carrier.sample_at(self.t);
        self.t += self.carrier.sample_period;
        Some(sample)
    }
    fn rate(&self) -> f64 {
        self.carrier.rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::OverflowPolicy;

    fn reference(freq: f64, t: f64) -> (f64, f64) {
        let phase = 2.0 * std::f64::consts::PI * (freq / 2.0) * t / 1e12;
        ((2047.0 * phase.cos()).round(), (2047.0 * phase.sin()).round())
    }

    #[test]
    fn starts_on_the_i_axis() {
        let c = Carrier::new(433000.0, 800);
        assert_eq!(c.sample_at(0), Ok(IqPair::new(2047, 0)));
    }

    #[test]
    fn follows_reference_formula() {
        let c = Carrier::new(433000.0, 800);
        for (n, s) in c.samples().take_samples(5000).iter().enumerate() {
            let s = s.unwrap();
            let (ri, rq) = reference(433000.0, (n as u64 * 800) as f64);
            assert!((s.i as f64 - ri).abs() <= 1.0, "I at {n}");
            assert!((s.q as f64 - rq).abs() <= 1.0, "Q at {n}");
        }
    }

    #[test]
    fn quarter_turn() {
        // f/2 = 1 cycle per 1e12 time units, a quarter is 2.5e11
        let c = Carrier::new(2.0, 250_000_000_000);
        let s: Vec<_> = c.samples().take_samples(4).collect_samples();
        assert_eq!(s[0], Ok(IqPair::new(2047, 0)));
        assert_eq!(s[1], Ok(IqPair::new(0, 2047)));
        assert_eq!(s[2], Ok(IqPair::new(-2047, 0)));
        assert_eq!(s[3], Ok(IqPair::new(0, -2047)));
    }

    #[test]
    fn stays_near_the_circle() {
        let c = Carrier::new(433000.0, 800);
        for s in c.samples().take_samples(2000).iter() {
            let r = s.unwrap().to_complex().norm();
            assert!((r - 2047.0).abs() < 1.5, "radius {r}");
        }
    }

    #[test]
    fn overflow_keeps_time_alignment() {
        let q = Quantizer::new(12, 3000.0, OverflowPolicy::Error).unwrap();
        let mut s = Carrier::new(433000.0, 800).quantizer(q).samples();
        assert!(s.next().unwrap().is_err());
        assert_eq!(s.time(), 800);
    }

    #[test]
    fn rate_uses_the_phase_divisor() {
        let c = Carrier::new(433000.0, 800);
        assert_eq!(c.rate(), 1.25e9);
    }
}
