use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pwrdet_tb::capture::IqCapture;
use pwrdet_tb::fft::fft_plot;
use pwrdet_tb::plot::{NoPlot, Plotter, SvgFile};
use pwrdet_tb::testbench::run_testbench;
use pwrdet_tb::TestbenchConfig;

const DEFAULT_PLOT: &str = "spectrum.svg";

#[derive(Parser)]
#[command(name = "pwrdet-tb")]
#[command(author, version, about = "sin/cos stimulus bench for the power detector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stimulus sequence and analyze what the generator emitted
    Run(RunArgs),

    /// Spectrum of a previously captured I/Q wav file
    Spectrum(SpectrumArgs),
}

#[derive(Args)]
struct RunArgs {
    /// TOML file with testbench settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// How long to keep the generator armed
    #[arg(long, value_name = "N")]
    run_time_us: Option<u64>,

    /// Carrier frequency in Hz
    #[arg(long, value_name = "HZ")]
    carrier: Option<f64>,

    /// Clock frequency in Hz
    #[arg(long, value_name = "HZ")]
    clock: Option<f64>,

    /// Write the spectrum plot to an SVG file
    #[arg(short, long, value_name = "FILE.svg", conflicts_with = "window")]
    plot: Option<PathBuf>,

    /// Show the spectrum in a window, blocking until it is closed
    #[arg(short, long)]
    window: bool,

    /// Save the captured I/Q samples as a stereo wav
    #[arg(long, value_name = "FILE.wav")]
    capture: Option<PathBuf>,
}

#[derive(Args)]
struct SpectrumArgs {
    /// Capture written by `run --capture`
    #[arg(value_name = "FILE.wav")]
    input: PathBuf,

    /// Sample spacing in seconds, instead of the wav sample rate
    #[arg(long, value_name = "SECONDS", value_parser = parse_dt)]
    dt: Option<f64>,

    /// Write the spectrum plot to an SVG file
    #[arg(short, long, value_name = "FILE.svg")]
    plot: Option<PathBuf>,
}

// sample spacing has to give a finite, positive frequency axis
fn check_dt(dt: f64) -> anyhow::Result<f64> {
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        anyhow::bail!("sample spacing must be a positive number of seconds, got {dt}")
    }
}

fn parse_dt(s: &str) -> Result<f64, String> {
    let dt: f64 = s.parse().map_err(|e| format!("{e}"))?;
    check_dt(dt).map_err(|e| e.to_string())
}

fn plotter(path: Option<PathBuf>, window: bool) -> anyhow::Result<Box<dyn Plotter>> {
    if window {
        return window_plotter();
    }
    Ok(match path {
        Some(path) => Box::new(SvgFile::new(path)),
        None => Box::new(NoPlot),
    })
}

#[cfg(feature = "window")]
fn window_plotter() -> anyhow::Result<Box<dyn Plotter>> {
    Ok(Box::new(pwrdet_tb::plot::Window::default()))
}

#[cfg(not(feature = "window"))]
fn window_plotter() -> anyhow::Result<Box<dyn Plotter>> {
    anyhow::bail!("built without the `window` feature, use --plot FILE.svg instead")
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => TestbenchConfig::load(path)?,
        None => TestbenchConfig::default(),
    };
    if let Some(t) = args.run_time_us {
        cfg.run_time_us = t;
    }
    if let Some(f) = args.carrier {
        cfg.carrier_freq_hz = f;
    }
    if let Some(f) = args.clock {
        cfg.clock_freq_hz = f;
    }
    if args.plot.is_some() {
        cfg.plot_path = args.plot;
    }
    if args.capture.is_some() {
        cfg.capture_path = args.capture;
    }
    cfg.validate()?;

    let plot_path = match (&cfg.plot_path, cfg.plot) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(DEFAULT_PLOT)),
        (None, false) => None,
    };
    let mut plotter = plotter(plot_path, args.window)?;

    let report = run_testbench(&cfg, Some(plotter.as_mut()))
        .context("testbench run failed")?;
    println!("clock period:  {} ns", report.clock_period_ns);
    println!("armed:         {} .. {}", report.armed_at, report.disarmed_at);
    println!("samples:       {} ({} overflowed)", report.samples(), report.stats.overflows);
    if let Some((freq, mag)) = report.peak {
        println!("peak:          {:.3} Hz, magnitude {:.2} (expected {:.3} Hz)",
                 freq, mag, cfg.tone_hz());
    }
    Ok(())
}

fn spectrum(args: SpectrumArgs) -> anyhow::Result<()> {
    let capture = IqCapture::read_wav(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let dt = check_dt(args.dt.unwrap_or_else(|| capture.dt()))
        .with_context(|| format!("{} has a sample rate of {}",
                                 args.input.display(), capture.rate))?;
    let mut plotter = plotter(args.plot, false)?;
    let spectrum = fft_plot(&capture.samples, Some(dt), Some(plotter.as_mut()))?;
    println!("samples: {}, bins: {}", capture.len(), spectrum.len());
    if let Some((freq, mag)) = spectrum.peak() {
        println!("peak: {:.3} Hz, magnitude {:.2}", freq, mag);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
                         .unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Spectrum(args) => spectrum(args),
    }
}
