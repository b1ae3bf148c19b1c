use std::path::Path;

use thiserror::Error;

use crate::carrier::IqPair;
use crate::sim::{Sim, SimTime};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    #[error("I and Q histories differ in length ({i} vs {q})")]
    Length { i: usize, q: usize },
    #[error("expected a 2 channel 16 bit capture, found {channels} channels of {bits} bits")]
    Format { channels: u16, bits: u16 },
    #[error("capture ends on a lone sample ({samples} samples in 2 channels)")]
    Unpaired { samples: usize },
}

/// I/Q samples pulled back out of a run, with their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct IqCapture {
    pub samples: Vec<IqPair>,
    pub rate: f64,
}

impl IqCapture {
    /// Pair up every write to the I and Q lines made at or after `since`.
    pub fn from_lines(sim: &Sim, data_i: &str, data_q: &str, since: SimTime,
                      rate: f64) -> Result<Self, CaptureError> {
        let i: Vec<_> = sim.writes_signed(data_i).into_iter()
            .filter(|w| w.time >= since)
            .collect();
        let q: Vec<_> = sim.writes_signed(data_q).into_iter()
            .filter(|w| w.time >= since)
            .collect();
        if i.len() != q.len() {
            return Err(CaptureError::Length { i: i.len(), q: q.len() });
        }
        let samples = i.iter().zip(q.iter())
            .map(|(i, q)| IqPair::new(i.value as i16, q.value as i16))
            .collect();
        Ok(IqCapture { samples, rate })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.rate
    }

    // stereo, I on the left and Q on the right
    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.rate.round() as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut wr = hound::WavWriter::create(path.as_ref(), spec)?;
        for s in self.samples.iter() {
            wr.write_sample(s.i)?;
            wr.write_sample(s.q)?;
        }
        wr.finalize()?;
        tracing::info!(path = %path.as_ref().display(), samples = self.len(),
                       "wrote capture");
        Ok(())
    }

    pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let mut rd = hound::WavReader::open(path)?;
        let spec = rd.spec();
        if spec.channels != 2 || spec.bits_per_sample != 16
            || spec.sample_format != hound::SampleFormat::Int {
            return Err(CaptureError::Format {
                channels: spec.channels,
                bits: spec.bits_per_sample,
            });
        }
        let raw = rd.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
        if raw.len() % 2 != 0 {
            return Err(CaptureError::Unpaired { samples: raw.len() });
        }
        let samples = raw.chunks_exact(2)
            .map(|c| IqPair::new(c[0], c[1]))
            .collect();
        Ok(IqCapture {
            samples,
            rate: spec.sample_rate as f64,
        })
    }
}
