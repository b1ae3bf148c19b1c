//! Clock-synchronous sine/cosine stimulus.
//!
//! [`SinCos`] waits on rising edges of the clock line. While its run flag is
//! clear it only waits; once armed it writes one quantized I/Q pair plus a
//! valid strobe per edge and advances its time accumulator by one sample
//! period. The flag is read once per edge, so arming and disarming take
//! effect at the next edge the generator handles.
//!
//! The generator is moved into its own task by [`SinCos::run`]; the
//! [`GeneratorHandle`] it hands out beforehand is how the rest of the
//! testbench arms it and watches its progress.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::carrier::{Carrier, IqPair};
use crate::quantize::{QuantizationOverflow, Quantizer};
use crate::sim::SignalSink;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    QuantizationOverflow(#[from] QuantizationOverflow),
}

/// Names of the lines the generator owns, plus the clock it follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lines {
    pub clk: String,
    pub data_i: String,
    pub data_q: String,
    pub data_ena: String,
}

impl Default for Lines {
    fn default() -> Self {
        Lines {
            clk: "clk".to_owned(),
            data_i: "data_I".to_owned(),
            data_q: "data_Q".to_owned(),
            data_ena: "data_ena".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratorConfig {
    pub lines: Lines,
    pub quantizer: Quantizer,
    // write data_ena = 0 when leaving Active instead of leaving it latched
    pub clear_on_stop: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Waiting,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneratorStats {
    pub emitted: u64,
    pub overflows: u64,
    // accumulated sample time, in sample period units
    pub elapsed: u64,
}

#[derive(Debug, Default)]
struct Shared {
    run: AtomicBool,
    active: AtomicBool,
    emitted: AtomicU64,
    overflows: AtomicU64,
    elapsed: AtomicU64,
}

/// Start/stop control and progress of a running [`SinCos`].
#[derive(Debug, Clone, Default)]
pub struct GeneratorHandle {
    shared: Arc<Shared>,
}

impl GeneratorHandle {
    pub fn arm(&self) {
        self.shared.run.store(true, Ordering::Release);
    }

    pub fn disarm(&self) {
        self.shared.run.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.shared.run.load(Ordering::Acquire)
    }

    // as of the last edge the generator handled
    pub fn state(&self) -> GeneratorState {
        if self.shared.active.load(Ordering::Acquire) {
            GeneratorState::Active
        } else {
            GeneratorState::Waiting
        }
    }

    pub fn stats(&self) -> GeneratorStats {
        GeneratorStats {
            emitted: self.shared.emitted.load(Ordering::Acquire),
            overflows: self.shared.overflows.load(Ordering::Acquire),
            elapsed: self.shared.elapsed.load(Ordering::Acquire),
        }
    }
}

pub struct SinCos<S> {
    sink: S,
    carrier: Carrier,
    config: GeneratorConfig,
    state: GeneratorState,
    t: u64,
    stats: GeneratorStats,
    handle: GeneratorHandle,
}

impl<S> SinCos<S>
where
    S: SignalSink,
{
    pub fn new(sink: S, sample_period: u64, freq: f64) -> Self {
        SinCos::with_config(sink, sample_period, freq, GeneratorConfig::default())
    }

    pub fn with_config(sink: S, sample_period: u64, freq: f64,
                       config: GeneratorConfig) -> Self {
        SinCos {
            sink,
            carrier: Carrier::new(freq, sample_period).quantizer(config.quantizer),
            config,
            state: GeneratorState::Waiting,
            t: 0,
            stats: GeneratorStats::default(),
            handle: GeneratorHandle::default(),
        }
    }

    pub fn handle(&self) -> GeneratorHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn time(&self) -> u64 {
        self.t
    }

    pub fn stats(&self) -> GeneratorStats {
        self.stats
    }

    pub fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn publish(&self) {
        let shared = &self.handle.shared;
        shared.active.store(self.state == GeneratorState::Active, Ordering::Release);
        shared.emitted.store(self.stats.emitted, Ordering::Release);
        shared.overflows.store(self.stats.overflows, Ordering::Release);
        shared.elapsed.store(self.stats.elapsed, Ordering::Release);
    }

    /// Everything the generator does in response to one clock edge.
    ///
    /// Returns the pair written, or `None` when not armed. An overflowing
    /// sample writes nothing for this edge but still uses up its slot of
    /// sample time.
    pub fn on_edge(&mut self) -> Result<Option<IqPair>, GeneratorError> {
        let armed = self.handle.is_armed();
        match (self.state, armed) {
            (GeneratorState::Waiting, false) => return Ok(None),
            (GeneratorState::Active, false) => {
                self.state = GeneratorState::Waiting;
                if self.config.clear_on_stop {
                    self.sink.set(&self.config.lines.data_ena, 0);
                }
                info!(time = %self.sink.now(), emitted = self.stats.emitted,
                      "signal generator - stopped, waiting for start...");
                self.publish();
                return Ok(None);
            }
            (GeneratorState::Waiting, true) => {
                self.state = GeneratorState::Active;
                info!(time = %self.sink.now(), "signal generator - starting...");
            }
            (GeneratorState::Active, true) => {}
        }

        let t = self.t;
        self.t += self.carrier.sample_period();
        self.stats.elapsed = self.t;

        let result = match self.carrier.sample_at(t) {
            Ok(sample) => {
                let lines = &self.config.lines;
                self.sink.set(&lines.data_i, sample.i as i64);
                self.sink.set(&lines.data_q, sample.q as i64);
                self.sink.set(&lines.data_ena, 1);
                self.stats.emitted += 1;
                trace!(t, i = sample.i, q = sample.q, "sample");
                Ok(Some(sample))
            }
            Err(err) => {
                self.stats.overflows += 1;
                warn!(time = %self.sink.now(), t, %err, "dropping sample");
                Err(err.into())
            }
        };
        self.publish();
        result
    }

    /// Follow the clock until the edge source goes away.
    pub async fn run(mut self) -> GeneratorStats {
        let clk = self.config.lines.clk.clone();
        info!(time = %self.sink.now(), period = self.carrier.sample_period(),
              freq = self.carrier.freq(),
              "signal generator - waiting for start...");
        while self.sink.rising_edge(&clk).await.is_ok() {
            // overflow only costs this edge, on_edge already logged it
            let _ = self.on_edge();
        }
        debug!(emitted = self.stats.emitted, overflows = self.stats.overflows,
               "edge source closed");
        info!("...signal generator - done.");
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::OverflowPolicy;
    use crate::sim::{Sim, SimTime, Simulator, TimeUnit};
    use futures::FutureExt;

    const PERIOD: u64 = 800;
    const FREQ: f64 = 433000.0;

    async fn pulses(sim: Sim, n: usize) {
        // low first, so the generator is already waiting on the first edge
        for _ in 0..n {
            sim.timer(400, TimeUnit::Ns).await;
            sim.set("clk", 1);
            sim.timer(400, TimeUnit::Ns).await;
            sim.set("clk", 0);
        }
    }

    fn reference(n: u64) -> (f64, f64) {
        let phase = 2.0 * std::f64::consts::PI * (FREQ / 2.0) * (n * PERIOD) as f64 / 1e12;
        (2047.0 * phase.cos(), 2047.0 * phase.sin())
    }

    struct Bench {
        sim: Simulator,
        handle: GeneratorHandle,
        task: futures::future::RemoteHandle<GeneratorStats>,
    }

    fn bench(config: GeneratorConfig) -> Bench {
        let sim = Simulator::new();
        let h = sim.handle();
        h.declare("data_I", 12);
        h.declare("data_Q", 12);
        h.declare("data_ena", 1);
        let gen = SinCos::with_config(h.clone(), PERIOD, FREQ, config);
        let handle = gen.handle();
        let task = h.spawn_with_handle(gen.run()).unwrap();
        Bench { sim, handle, task }
    }

    #[test]
    fn silent_until_armed() {
        let mut b = bench(GeneratorConfig::default());
        let h = b.sim.handle();
        b.sim.run(pulses(h.clone(), 50)).unwrap();
        assert!(h.writes("data_I").is_empty());
        assert!(h.writes("data_Q").is_empty());
        assert!(h.writes("data_ena").is_empty());
        assert_eq!(b.handle.state(), GeneratorState::Waiting);
        assert_eq!(b.handle.stats(), GeneratorStats::default());
    }

    #[test]
    fn one_pair_per_armed_edge() {
        let mut b = bench(GeneratorConfig::default());
        let h = b.sim.handle();
        b.handle.arm();
        b.sim.run(pulses(h.clone(), 37)).unwrap();
        assert_eq!(h.writes("data_I").len(), 37);
        assert_eq!(h.writes("data_Q").len(), 37);
        assert_eq!(h.writes("data_ena").len(), 37);
        let stats = b.handle.stats();
        assert_eq!(stats.emitted, 37);
        assert_eq!(stats.elapsed, 37 * PERIOD);
        assert_eq!(b.handle.state(), GeneratorState::Active);
    }

    #[test]
    fn writes_follow_reference_and_clock() {
        let mut b = bench(GeneratorConfig::default());
        let h = b.sim.handle();
        b.handle.arm();
        b.sim.run(pulses(h.clone(), 500)).unwrap();
        let i = h.writes_signed("data_I");
        let q = h.writes_signed("data_Q");
        for (n, (wi, wq)) in i.iter().zip(q.iter()).enumerate() {
            let (ri, rq) = reference(n as u64);
            assert!((wi.value as f64 - ri).abs() <= 1.0, "I[{n}]");
            assert!((wq.value as f64 - rq).abs() <= 1.0, "Q[{n}]");
            // written in the same delta as the edge
            assert_eq!(wi.time, SimTime::new(400 + 800 * n as u64, TimeUnit::Ns));
        }
    }

    #[test]
    fn disarm_leaves_valid_latched() {
        let mut b = bench(GeneratorConfig::default());
        let h = b.sim.handle();
        let handle = b.handle.clone();
        let driver = h.clone();
        handle.arm();
        b.sim.run(async move {
            pulses(driver.clone(), 10).await;
            handle.disarm();
            pulses(driver, 10).await;
        }).unwrap();
        assert_eq!(h.writes("data_I").len(), 10);
        assert_eq!(h.get("data_ena"), Some(1));
        assert_eq!(b.handle.state(), GeneratorState::Waiting);
        assert_eq!(b.handle.stats().elapsed, 10 * PERIOD);
    }

    #[test]
    fn disarm_clears_valid_when_asked() {
        let config = GeneratorConfig { clear_on_stop: true, ..Default::default() };
        let mut b = bench(config);
        let h = b.sim.handle();
        let handle = b.handle.clone();
        let driver = h.clone();
        handle.arm();
        b.sim.run(async move {
            pulses(driver.clone(), 4).await;
            handle.disarm();
            pulses(driver.clone(), 3).await;
            handle.arm();
            pulses(driver, 2).await;
        }).unwrap();
        let ena: Vec<i64> = h.writes("data_ena").iter().map(|w| w.value).collect();
        assert_eq!(ena, vec![1, 1, 1, 1, 0, 1, 1]);
        // time picks up where it left off
        assert_eq!(b.handle.stats().elapsed, 6 * PERIOD);
    }

    #[test]
    fn overflow_skips_the_edge() {
        let quantizer = Quantizer::new(12, 3000.0, OverflowPolicy::Error).unwrap();
        let mut b = bench(GeneratorConfig { quantizer, ..Default::default() });
        let h = b.sim.handle();
        b.handle.arm();
        b.sim.run(pulses(h.clone(), 20)).unwrap();
        let stats = b.handle.stats();
        assert!(stats.overflows > 0);
        assert_eq!(stats.emitted + stats.overflows, 20);
        assert_eq!(h.writes("data_I").len() as u64, stats.emitted);
        assert_eq!(stats.elapsed, 20 * PERIOD);
    }

    #[test]
    fn overflow_clamps_when_asked() {
        let quantizer = Quantizer::new(12, 3000.0, OverflowPolicy::Clamp).unwrap();
        let mut b = bench(GeneratorConfig { quantizer, ..Default::default() });
        let h = b.sim.handle();
        b.handle.arm();
        b.sim.run(pulses(h.clone(), 1)).unwrap();
        assert_eq!(h.get_signed("data_I"), Some(2047));
        assert_eq!(b.handle.stats().overflows, 0);
    }

    #[test]
    fn ends_quietly_when_edges_stop() {
        let mut b = bench(GeneratorConfig::default());
        let h = b.sim.handle();
        b.handle.arm();
        b.sim.run(pulses(h, 5)).unwrap();
        b.sim.finish();
        let stats = b.task.now_or_never().unwrap();
        assert_eq!(stats.emitted, 5);
        assert_eq!(stats.elapsed, 5 * PERIOD);
    }
}
