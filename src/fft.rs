use crate::carrier::IqPair;
use crate::plot::{Chart, PlotError, Plotter};
use crate::Signal;

use num::Complex;
use rustfft::FftPlanner;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpectrumError {
    #[error("empty input: no samples to transform")]
    EmptyInput,
}

#[derive(Debug, Error)]
pub enum FftPlotError {
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
    #[error(transparent)]
    Plot(#[from] PlotError),
}

/// Anything that can be fed to the transform as a complex sample.
pub trait Sample: Copy {
    fn to_complex(self) -> Complex<f64>;
}

impl Sample for f64 {
    fn to_complex(self) -> Complex<f64> {
        Complex::new(self, 0.0)
    }
}

impl Sample for f32 {
    fn to_complex(self) -> Complex<f64> {
        Complex::new(self as f64, 0.0)
    }
}

impl Sample for i16 {
    fn to_complex(self) -> Complex<f64> {
        Complex::new(self as f64, 0.0)
    }
}

impl Sample for i32 {
    fn to_complex(self) -> Complex<f64> {
        Complex::new(self as f64, 0.0)
    }
}

impl Sample for i64 {
    fn to_complex(self) -> Complex<f64> {
        Complex::new(self as f64, 0.0)
    }
}

impl Sample for Complex<f64> {
    fn to_complex(self) -> Complex<f64> {
        self
    }
}

impl Sample for Complex<f32> {
    fn to_complex(self) -> Complex<f64> {
        Complex::new(self.re as f64, self.im as f64)
    }
}

impl Sample for IqPair {
    fn to_complex(self) -> Complex<f64> {
        IqPair::to_complex(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spacing {
    // frequencies in cycles per sample
    Samples,
    // frequencies in Hz, dt in seconds
    Seconds(f64),
}

impl Spacing {
    pub fn dt(&self) -> f64 {
        match self {
            Spacing::Samples => 1.0,
            Spacing::Seconds(dt) => *dt,
        }
    }

    pub fn xlabel(&self) -> &'static str {
        match self {
            Spacing::Samples => "samples",
            Spacing::Seconds(_) => "freq [Hz]",
        }
    }
}

/// Positive half of a length-normalized DFT.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub freqs: Vec<f64>,
    pub bins: Vec<Complex<f64>>,
    pub spacing: Spacing,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.norm()).collect()
    }

    // strongest bin above DC, as (frequency, magnitude)
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.freqs.iter().zip(self.bins.iter())
            .skip(1)
            .map(|(f, b)| (*f, b.norm()))
            .fold(None, |best, (f, m)| match best {
                Some((_, bm)) if bm >= m => best,
                _ => Some((f, m)),
            })
    }

    pub fn chart(&self) -> Chart {
        Chart {
            title: "Analytic FFT plot".to_owned(),
            xlabel: self.spacing.xlabel().to_owned(),
            ylabel: "mag".to_owned(),
            points: self.freqs.iter().cloned()
                .zip(self.bins.iter().map(|b| b.norm()))
                .collect(),
        }
    }
}

/// Spectrum of a sample sequence, keeping only non-negative frequencies.
///
/// The transform is divided by the sequence length and every bin except DC
/// is doubled to fold in the negative half, which assumes the input is
/// effectively single-sided. Odd-length input loses its last sample. With
/// no `dt` the frequency axis is in cycles per sample.
pub fn analytic_spectrum<T>(samples: &[T], dt: Option<f64>)
                            -> Result<Spectrum, SpectrumError>
where
    T: Sample,
{
    let spacing = match dt {
        Some(dt) => Spacing::Seconds(dt),
        None => Spacing::Samples,
    };

    let len = samples.len() - samples.len() % 2;
    if len == 0 {
        return Err(SpectrumError::EmptyInput);
    }

    let mut data: Vec<Complex<f64>> = samples[..len].iter()
        .map(|s| s.to_complex())
        .collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(len);
    fft.process(&mut data);

    let norm = 1.0 / len as f64;
    let fstep = 1.0 / (len as f64 * spacing.dt());
    let half = len / 2;
    let mut freqs = Vec::with_capacity(half);
    let mut bins = Vec::with_capacity(half);
    for (k, v) in data.into_iter().take(half).enumerate() {
        let scale = if k == 0 { norm } else { 2.0 * norm };
        freqs.push(k as f64 * fstep);
        bins.push(v * scale);
    }

    Ok(Spectrum { freqs, bins, spacing })
}

pub fn analytic_spectrum_of<S>(input: S) -> Result<Spectrum, SpectrumError>
where
    S: Signal,
    S::Sample: Sample,
{
    let dt = 1.0 / input.rate();
    let data = input.collect_samples();
    analytic_spectrum(&data, Some(dt))
}

/// [`analytic_spectrum`], then hand the magnitude curve to `plotter`.
pub fn fft_plot<T>(samples: &[T], dt: Option<f64>,
                   plotter: Option<&mut dyn Plotter>)
                   -> Result<Spectrum, FftPlotError>
where
    T: Sample,
{
    let spectrum = analytic_spectrum(samples, dt)?;
    if let Some(plotter) = plotter {
        tracing::debug!(bins = spectrum.len(), "plotting spectrum");
        plotter.plot(&spectrum.chart())?;
    }
    Ok(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::NoPlot;
    use crate::signal;
    use std::f64::consts::PI;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // real cosine, n samples at `rate`
    fn tone(rate: f64, freq: f64, amplitude: f64, n: usize) -> Vec<f64> {
        (0..n).map(|k| amplitude * (2.0 * PI * freq * k as f64 / rate).cos()).collect()
    }

    // unit complex exponential
    fn spin(rate: f64, freq: f64, n: usize) -> Vec<Complex<f64>> {
        (0..n).map(|k| Complex::new(0.0, 2.0 * PI * freq * k as f64 / rate).exp()).collect()
    }

    #[test]
    fn empty_input_is_an_error() {
        let empty: [f64; 0] = [];
        assert_eq!(analytic_spectrum(&empty, None), Err(SpectrumError::EmptyInput));
        // one sample truncates to nothing
        assert_eq!(analytic_spectrum(&[1.0], None), Err(SpectrumError::EmptyInput));
    }

    #[test]
    fn dc_is_not_doubled() {
        let s = analytic_spectrum(&[3.0; 8], None).unwrap();
        assert_eq!(s.len(), 4);
        assert!(close(s.bins[0].re, 3.0));
        for b in &s.bins[1..] {
            assert!(b.norm() < 1e-12);
        }
    }

    #[test]
    fn real_cosine_recovers_amplitude() {
        // cos at bin 4 of 64, amplitude 2
        let data = tone(64.0, 4.0, 2.0, 64);
        let s = analytic_spectrum(&data, Some(1.0 / 64.0)).unwrap();
        let (f, m) = s.peak().unwrap();
        assert!(close(f, 4.0));
        assert!(close(m, 2.0));
    }

    #[test]
    fn complex_exponential_lands_on_one_bin() {
        let data = spin(32.0, 5.0, 32);
        let s = analytic_spectrum(&data, None).unwrap();
        let mags = s.magnitudes();
        assert!(close(mags[5], 2.0));
        assert!(close(s.freqs[5], 5.0 / 32.0));
    }

    #[test]
    fn odd_length_drops_last_sample() {
        let odd = [1.0, -2.0, 0.5, 4.0, 7.0];
        let a = analytic_spectrum(&odd, Some(0.1)).unwrap();
        let b = analytic_spectrum(&odd[..4], Some(0.1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn frequency_axis_uses_spacing() {
        let s = analytic_spectrum(&[0i16; 10], Some(0.5)).unwrap();
        for (k, f) in s.freqs.iter().enumerate() {
            assert!(close(*f, k as f64 / (10.0 * 0.5)));
        }
        assert_eq!(s.chart().xlabel, "freq [Hz]");
        let s = analytic_spectrum(&[0i16; 10], None).unwrap();
        assert_eq!(s.chart().xlabel, "samples");
    }

    #[test]
    fn iq_pairs_are_complex() {
        let data = [IqPair::new(1, 0), IqPair::new(0, 1),
                    IqPair::new(-1, 0), IqPair::new(0, -1)];
        let s = analytic_spectrum(&data, None).unwrap();
        assert!(close(s.bins[1].norm(), 2.0));
    }

    #[test]
    fn spectrum_of_signal_uses_its_rate() {
        let sig = signal::from_iter(100.0, tone(100.0, 10.0, 1.0, 100));
        let s = analytic_spectrum_of(sig).unwrap();
        assert!(close(s.peak().unwrap().0, 10.0));
    }

    #[test]
    fn fft_plot_without_display() {
        let data = tone(16.0, 2.0, 1.0, 16);
        let mut headless = NoPlot;
        let s = fft_plot(&data, None, Some(&mut headless as &mut dyn Plotter)).unwrap();
        assert_eq!(s.len(), 8);
        assert!(matches!(fft_plot::<f64>(&[], None, None),
                         Err(FftPlotError::Spectrum(SpectrumError::EmptyInput))));
    }
}
