//! A small in-memory stand-in for the simulator boundary.
//!
//! A real testbench talks to an HDL simulator; everything in this crate that
//! drives lines goes through [`SignalSink`] so the same code runs against the
//! discrete-event [`Simulator`] here. The simulator only stores line values,
//! keeps time and wakes tasks; it never evaluates a design.

use std::future::Future;

use thiserror::Error;

mod time;
pub use time::{SimTime, TimeUnit};

mod kernel;
pub use kernel::{Sim, Simulator, Write};

mod clock;
pub use clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("edge source closed")]
pub struct EdgeClosed;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation stalled at {at}: nothing left to wake the main task")]
    Stalled { at: SimTime },
    #[error("unknown time unit '{0}'")]
    UnknownTimeUnit(String),
    #[error("could not spawn task: {0}")]
    Spawn(#[from] futures::task::SpawnError),
    #[error(transparent)]
    EdgeClosed(#[from] EdgeClosed),
}

/// The simulator-facing side of a stimulus driver.
pub trait SignalSink {
    /// Assign a value to a named line, with the simulator's width rules.
    fn set(&self, line: &str, value: i64);

    /// Resolves on the next rising edge of `line`, or fails once the
    /// simulation is torn down.
    fn rising_edge(&self, line: &str) -> impl Future<Output = Result<(), EdgeClosed>>;

    /// Current simulated time, for log records.
    fn now(&self) -> SimTime;
}
