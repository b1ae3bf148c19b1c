// spectrum of the generator's carrier without running a simulation
//
//   cargo run --example carrier_spectrum -- [CARRIER_HZ] [OUT.svg]

use pwrdet_tb::carrier::Carrier;
use pwrdet_tb::fft::analytic_spectrum_of;
use pwrdet_tb::plot::{Plotter, SvgFile};
use pwrdet_tb::Signal;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let carrier: f64 = match args.next() {
        Some(s) => s.parse()?,
        None => 433000.0,
    };
    let out = args.next().unwrap_or_else(|| "carrier_spectrum.svg".to_owned());

    // 800 time units per sample, like the 1.25 MHz bench clock
    let samples = Carrier::new(carrier, 800).samples()
        .take_samples(1 << 16)
        .collect_samples()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    let samples = pwrdet_tb::signal::from_iter(1.25e6, samples);
    let spectrum = analytic_spectrum_of(samples)?;

    if let Some((freq, mag)) = spectrum.peak() {
        println!("peak at {:.3} Hz, magnitude {:.2}", freq, mag);
    }
    SvgFile::new(out).plot(&spectrum.chart())?;
    Ok(())
}
