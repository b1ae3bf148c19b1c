//! Property tests for the spectrum and the carrier numerics.

use proptest::prelude::*;
use pwrdet_tb::carrier::Carrier;
use pwrdet_tb::fft::{analytic_spectrum, SpectrumError};
use pwrdet_tb::Complex;

// plain O(N^2) DFT bin, already scaled the way the spectrum promises
fn reference_bin(x: &[f64], k: usize) -> Complex<f64> {
    let n = x.len() as f64;
    let sum: Complex<f64> = x.iter().enumerate()
        .map(|(j, v)| {
            let w = -2.0 * std::f64::consts::PI * (k * j) as f64 / n;
            Complex::new(0.0, w).exp() * v
        })
        .sum();
    let scale = if k == 0 { 1.0 } else { 2.0 };
    sum * scale / n
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Even-length input gives N/2 bins, DC scaled by 1/N and the rest by 2/N.
    #[test]
    fn bins_match_scaled_dft(
        half in 1usize..32,
        seed in prop::collection::vec(-1.0f64..1.0, 64),
    ) {
        let x = &seed[..2 * half];
        let s = analytic_spectrum(x, None).unwrap();
        prop_assert_eq!(s.len(), half);
        prop_assert_eq!(s.freqs.len(), half);
        for (k, b) in s.bins.iter().enumerate() {
            let r = reference_bin(x, k);
            prop_assert!((b - r).norm() < 1e-9, "bin {}: {} vs {}", k, b, r);
        }
    }

    /// An odd sample count behaves exactly like dropping the last sample.
    #[test]
    fn odd_length_is_truncated(
        x in prop::collection::vec(-100.0f64..100.0, 1..40),
        dt in 1e-6f64..1.0,
    ) {
        let x = if x.len() % 2 == 0 { &x[..x.len() - 1] } else { &x[..] };
        let odd = analytic_spectrum(x, Some(dt));
        let even = analytic_spectrum(&x[..x.len() - 1], Some(dt));
        prop_assert_eq!(odd, even);
    }

    /// Bin k sits at k / (N * dt).
    #[test]
    fn frequency_axis(n in 1usize..200, dt in 1e-9f64..10.0) {
        let x = vec![0.0f64; 2 * n];
        let s = analytic_spectrum(&x, Some(dt)).unwrap();
        for (k, f) in s.freqs.iter().enumerate() {
            let want = k as f64 / (2.0 * n as f64 * dt);
            prop_assert!((f - want).abs() <= 1e-12 * want.max(1.0));
        }
    }

    /// Every emitted pair is within one LSB of the ideal carrier.
    #[test]
    fn carrier_tracks_formula(
        freq in 1.0f64..1e9,
        period in 1u64..10_000,
        n in 0u64..100_000,
    ) {
        let carrier = Carrier::new(freq, period);
        let t = n * period;
        let pair = carrier.sample_at(t).unwrap();
        let phase = 2.0 * std::f64::consts::PI * (freq / 2.0) * t as f64 / 1e12;
        prop_assert!((pair.i as f64 - 2047.0 * phase.cos()).abs() <= 1.0);
        prop_assert!((pair.q as f64 - 2047.0 * phase.sin()).abs() <= 1.0);
    }
}

#[test]
fn empty_is_rejected() {
    let none: Vec<Complex<f64>> = Vec::new();
    assert_eq!(analytic_spectrum(&none, Some(1e-3)), Err(SpectrumError::EmptyInput));
}
