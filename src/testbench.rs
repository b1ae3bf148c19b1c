//! The sin/cos power detector bench: reset the design, run the generator
//! for a fixed window, then look at what came out.

use futures::future::RemoteHandle;
use futures::FutureExt;
use thiserror::Error;
use tracing::info;

use crate::capture::{CaptureError, IqCapture};
use crate::config::{ConfigError, TestbenchConfig};
use crate::fft::{fft_plot, FftPlotError, Spectrum};
use crate::generator::{GeneratorHandle, GeneratorStats, SinCos};
use crate::plot::Plotter;
use crate::sim::{Clock, Sim, SimError, SimTime, Simulator, TimeUnit};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Fft(#[from] FftPlotError),
}

/// What [`pwrdet_sin_cos_test`] leaves behind once the window has closed.
pub struct Sequence {
    pub clock_period_ns: u64,
    pub armed_at: SimTime,
    pub disarmed_at: SimTime,
    pub generator: GeneratorHandle,
    // keeps the generator task alive until the caller is done with it
    pub task: RemoteHandle<GeneratorStats>,
}

#[derive(Debug, Clone)]
pub struct TestbenchReport {
    pub clock_period_ns: u64,
    pub armed_at: SimTime,
    pub disarmed_at: SimTime,
    pub stats: GeneratorStats,
    pub capture: IqCapture,
    pub spectrum: Spectrum,
    // strongest non-DC bin, (Hz, magnitude)
    pub peak: Option<(f64, f64)>,
}

impl TestbenchReport {
    pub fn samples(&self) -> usize {
        self.capture.len()
    }
}

/// Drive the reset and run sequence on `sim`.
///
/// Inputs are forced to their idle values with `init` held high, the clock
/// is started and the generator spawned. `init` is released after one edge,
/// the generator is armed one edge later and held for `run_time_us`, then
/// disarmed on the following edge. The configuration is checked before
/// anything is driven.
pub async fn pwrdet_sin_cos_test(sim: Sim, cfg: TestbenchConfig)
                                 -> Result<Sequence, Error> {
    cfg.validate()?;
    let gen_cfg = cfg.generator_config()?;
    let lines = gen_cfg.lines.clone();

    sim.declare("alpha", 16);
    sim.declare("init", 1);
    sim.declare(&lines.clk, 1);
    sim.declare(&lines.data_i, cfg.width_bits);
    sim.declare(&lines.data_q, cfg.width_bits);
    sim.declare(&lines.data_ena, 1);
    // the clock history is only noise in the capture
    sim.set_traced(&lines.clk, false);

    sim.set("alpha", cfg.alpha);
    sim.set("init", 1);
    sim.set(&lines.data_i, 0);
    sim.set(&lines.data_q, 0);
    sim.set(&lines.data_ena, 0);

    let period = cfg.clock_period_ns();
    sim.start_clock(Clock::new(&lines.clk, period, TimeUnit::Ns))?;

    let generator = SinCos::with_config(sim.clone(), period, cfg.carrier_freq_hz, gen_cfg);
    let handle = generator.handle();
    let task = sim.spawn_with_handle(generator.run())?;

    sim.rising_edge(&lines.clk).await.map_err(SimError::from)?;
    sim.set("init", 0);
    info!(time = %sim.now(), "init released");
    sim.rising_edge(&lines.clk).await.map_err(SimError::from)?;

    handle.arm();
    let armed_at = sim.now();
    info!(time = %armed_at, run_time_us = cfg.run_time_us, "generator armed");
    sim.timer(cfg.run_time_us, TimeUnit::Us).await;
    sim.rising_edge(&lines.clk).await.map_err(SimError::from)?;
    handle.disarm();
    let disarmed_at = sim.now();
    info!(time = %disarmed_at, "generator disarmed");

    Ok(Sequence {
        clock_period_ns: period,
        armed_at,
        disarmed_at,
        generator: handle,
        task,
    })
}

/// Run the whole bench on a fresh simulator and analyze the capture.
pub fn run_testbench(cfg: &TestbenchConfig, plotter: Option<&mut dyn Plotter>)
                     -> Result<TestbenchReport, Error> {
    cfg.validate()?;
    let mut simulator = Simulator::new();
    let sim = simulator.handle();

    let seq = simulator.run(pwrdet_sin_cos_test(sim.clone(), cfg.clone()))??;
    simulator.finish();
    let stats = seq.task.now_or_never()
        .unwrap_or_else(|| seq.generator.stats());
    info!(emitted = stats.emitted, overflows = stats.overflows,
          elapsed = stats.elapsed, "run complete");

    let lines = cfg.generator_config()?.lines;
    let capture = IqCapture::from_lines(&sim, &lines.data_i, &lines.data_q,
                                        seq.armed_at, 1.0 / cfg.dt())?;
    let spectrum = fft_plot(&capture.samples, Some(cfg.dt()), plotter)?;
    let peak = spectrum.peak();
    if let Some((freq, mag)) = peak {
        info!(freq, mag, expected = cfg.tone_hz(), "spectrum peak");
    }

    if let Some(path) = &cfg.capture_path {
        capture.write_wav(path)?;
    }

    Ok(TestbenchReport {
        clock_period_ns: seq.clock_period_ns,
        armed_at: seq.armed_at,
        disarmed_at: seq.disarmed_at,
        stats,
        capture,
        spectrum,
        peak,
    })
}
