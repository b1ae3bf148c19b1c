// wickedly useful re-export
pub use num::Complex;

pub mod signal;
pub use signal::Signal;

pub mod quantize;
pub mod carrier;
pub use carrier::{Carrier, IqPair};

pub mod sim;
pub use sim::{Sim, SignalSink, Simulator};

pub mod generator;
pub use generator::SinCos;

pub mod capture;
pub mod config;
pub use config::TestbenchConfig;

pub mod testbench;

pub mod plot;

pub mod fft;
