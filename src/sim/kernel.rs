use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::RemoteHandle;
use futures::task::LocalSpawnExt;
use tokio::sync::watch;

use super::{Clock, EdgeClosed, SignalSink, SimError, SimTime, TimeUnit};

/// One recorded assignment to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    pub time: SimTime,
    pub value: i64,
}

#[derive(Debug)]
struct Line {
    width: u32,
    value: i64,
    rises: u64,
    traced: bool,
    writes: Vec<Write>,
    edges: watch::Sender<u64>,
}

impl Line {
    fn new(width: u32) -> Self {
        Line {
            width,
            value: 0,
            rises: 0,
            traced: true,
            writes: Vec::new(),
            edges: watch::channel(0).0,
        }
    }

    fn mask(&self, value: i64) -> i64 {
        if self.width >= 64 {
            value
        } else {
            value & ((1i64 << self.width) - 1)
        }
    }

    fn sign_extend(&self, raw: i64) -> i64 {
        if self.width >= 64 || raw & (1i64 << (self.width - 1)) == 0 {
            raw
        } else {
            raw - (1i64 << self.width)
        }
    }
}

#[derive(Debug, Default)]
struct Kernel {
    now: SimTime,
    lines: HashMap<String, Line>,
    timers: BinaryHeap<Reverse<(SimTime, u64)>>,
    wakeups: HashMap<u64, oneshot::Sender<()>>,
    seq: u64,
    closed: bool,
}

impl Kernel {
    fn line_mut(&mut self, name: &str) -> &mut Line {
        self.lines.entry(name.to_owned()).or_insert_with(|| Line::new(64))
    }

    fn schedule(&mut self, delay: SimTime) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let at = self.now + delay;
        self.seq += 1;
        self.timers.push(Reverse((at, self.seq)));
        self.wakeups.insert(self.seq, tx);
        rx
    }

    // jump to the next pending timer and fire everything due at that time
    fn advance(&mut self) -> bool {
        let at = match self.timers.peek() {
            Some(Reverse((at, _))) => *at,
            None => return false,
        };
        self.now = at;
        while let Some(Reverse((t, seq))) = self.timers.peek().cloned() {
            if t != at {
                break;
            }
            self.timers.pop();
            if let Some(tx) = self.wakeups.remove(&seq) {
                let _ = tx.send(());
            }
        }
        true
    }
}

/// Handle onto the simulated timeline, cheap to clone into tasks.
#[derive(Clone)]
pub struct Sim {
    kernel: Rc<RefCell<Kernel>>,
    spawner: LocalSpawner,
}

impl std::fmt::Debug for Sim {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Sim").field("now", &self.now()).finish()
    }
}

impl Sim {
    pub fn now(&self) -> SimTime {
        self.kernel.borrow().now
    }

    // sets the width of a line, creating it if needed
    pub fn declare(&self, line: &str, width: u32) {
        let width = width.clamp(1, 64);
        let mut k = self.kernel.borrow_mut();
        let l = k.line_mut(line);
        l.width = width;
        l.value = l.mask(l.value);
    }

    pub fn set_traced(&self, line: &str, traced: bool) {
        self.kernel.borrow_mut().line_mut(line).traced = traced;
    }

    /// Assign a value, truncated to the line's width.
    ///
    /// A 0 to 1 transition of bit 0 counts as a rising edge and wakes
    /// everything waiting in [`Sim::rising_edge`] on this line.
    pub fn set(&self, line: &str, value: i64) {
        let mut k = self.kernel.borrow_mut();
        let now = k.now;
        let l = k.line_mut(line);
        let value = l.mask(value);
        let prev = l.value;
        l.value = value;
        if l.traced {
            l.writes.push(Write { time: now, value });
        }
        if prev & 1 == 0 && value & 1 == 1 {
            l.rises += 1;
            // fails only when nobody is listening
            let _ = l.edges.send(l.rises);
        }
    }

    pub fn get(&self, line: &str) -> Option<i64> {
        self.kernel.borrow().lines.get(line).map(|l| l.value)
    }

    pub fn get_signed(&self, line: &str) -> Option<i64> {
        self.kernel.borrow().lines.get(line).map(|l| l.sign_extend(l.value))
    }

    pub fn rising_edges(&self, line: &str) -> u64 {
        self.kernel.borrow().lines.get(line).map(|l| l.rises).unwrap_or(0)
    }

    pub fn writes(&self, line: &str) -> Vec<Write> {
        self.kernel.borrow().lines.get(line)
            .map(|l| l.writes.clone())
            .unwrap_or_default()
    }

    pub fn writes_signed(&self, line: &str) -> Vec<Write> {
        self.kernel.borrow().lines.get(line)
            .map(|l| l.writes.iter()
                 .map(|w| Write { time: w.time, value: l.sign_extend(w.value) })
                 .collect())
            .unwrap_or_default()
    }

    /// Resolves on the next rising edge of `line` after the call.
    pub async fn rising_edge(&self, line: &str) -> Result<(), EdgeClosed> {
        let mut rx = {
            let mut k = self.kernel.borrow_mut();
            if k.closed {
                return Err(EdgeClosed);
            }
            k.line_mut(line).edges.subscribe()
        };
        rx.changed().await.map_err(|_| EdgeClosed)
    }

    pub fn wait(&self, delay: SimTime) -> impl Future<Output = ()> {
        let rx = self.kernel.borrow_mut().schedule(delay);
        async move {
            // a dropped timer belongs to a finished simulation
            if rx.await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }

    pub fn timer(&self, value: u64, unit: TimeUnit) -> impl Future<Output = ()> {
        self.wait(SimTime::new(value, unit))
    }

    pub fn spawn<F>(&self, task: F) -> Result<(), SimError>
    where
        F: Future<Output = ()> + 'static,
    {
        self.spawner.spawn_local(task)?;
        Ok(())
    }

    // the task is cancelled if the handle is dropped
    pub fn spawn_with_handle<F>(&self, task: F)
                                -> Result<RemoteHandle<F::Output>, SimError>
    where
        F: Future + 'static,
    {
        Ok(self.spawner.spawn_local_with_handle(task)?)
    }

    pub fn start_clock(&self, clock: Clock) -> Result<(), SimError> {
        tracing::debug!(line = %clock.line, period = clock.period,
                        unit = %clock.unit, "starting clock");
        self.spawn(clock.drive(self.clone()))
    }
}

impl SignalSink for Sim {
    fn set(&self, line: &str, value: i64) {
        Sim::set(self, line, value)
    }

    async fn rising_edge(&self, line: &str) -> Result<(), EdgeClosed> {
        Sim::rising_edge(self, line).await
    }

    fn now(&self) -> SimTime {
        Sim::now(self)
    }
}

/// Owns the executor and drives simulated time.
///
/// Between time steps every runnable task is polled until it suspends, so
/// whatever a task does in response to an edge lands before time moves on.
pub struct Simulator {
    pool: LocalPool,
    sim: Sim,
}

impl Default for Simulator {
    fn default() -> Self {
        Simulator::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let sim = Sim {
            kernel: Rc::new(RefCell::new(Kernel::default())),
            spawner: pool.spawner(),
        };
        Simulator { pool, sim }
    }

    pub fn handle(&self) -> Sim {
        self.sim.clone()
    }

    pub fn now(&self) -> SimTime {
        self.sim.now()
    }

    /// Run the timeline until `main` completes.
    pub fn run<F>(&mut self, main: F) -> Result<F::Output, SimError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let slot = Rc::new(RefCell::new(None));
        let out = slot.clone();
        self.sim.spawn(async move {
            let v = main.await;
            *out.borrow_mut() = Some(v);
        })?;
        loop {
            self.pool.run_until_stalled();
            if let Some(v) = slot.borrow_mut().take() {
                return Ok(v);
            }
            if !self.sim.kernel.borrow_mut().advance() {
                return Err(SimError::Stalled { at: self.now() });
            }
        }
    }

    // run every task up to and including `until`
    pub fn run_until(&mut self, until: SimTime) {
        loop {
            self.pool.run_until_stalled();
            let mut k = self.sim.kernel.borrow_mut();
            let next = k.timers.peek().map(|Reverse((at, _))| *at);
            match next {
                Some(at) if at <= until => {
                    k.advance();
                }
                _ => {
                    k.now = k.now.max(until);
                    return;
                }
            }
        }
    }

    /// Tear down: edge waiters get [`EdgeClosed`], pending timers never fire.
    pub fn finish(&mut self) {
        {
            let mut k = self.sim.kernel.borrow_mut();
            k.closed = true;
            for line in k.lines.values_mut() {
                // dropping the old sender closes every subscription
                line.edges = watch::channel(line.rises).0;
            }
            k.timers.clear();
            k.wakeups.clear();
        }
        self.pool.run_until_stalled();
        tracing::debug!(at = %self.now(), "simulation finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn set_truncates_to_width() {
        let sim = Simulator::new().handle();
        sim.declare("data_I", 12);
        sim.set("data_I", -1);
        assert_eq!(sim.get("data_I"), Some(0xfff));
        assert_eq!(sim.get_signed("data_I"), Some(-1));
        sim.set("data_I", 2047);
        assert_eq!(sim.get_signed("data_I"), Some(2047));
        sim.set("data_I", 4096 + 5);
        assert_eq!(sim.get("data_I"), Some(5));
        assert_eq!(sim.get("missing"), None);
    }

    #[test]
    fn writes_are_recorded_with_time() {
        let mut s = Simulator::new();
        let sim = s.handle();
        let h = sim.clone();
        s.run(async move {
            h.set("init", 1);
            h.timer(5, TimeUnit::Ns).await;
            h.set("init", 0);
        }).unwrap();
        assert_eq!(sim.writes("init"), vec![
            Write { time: SimTime::ZERO, value: 1 },
            Write { time: SimTime::new(5, TimeUnit::Ns), value: 0 },
        ]);
        assert_eq!(sim.now(), SimTime::new(5, TimeUnit::Ns));
    }

    #[test]
    fn untraced_lines_keep_no_history() {
        let sim = Simulator::new().handle();
        sim.set_traced("clk", false);
        sim.set("clk", 1);
        assert!(sim.writes("clk").is_empty());
        assert_eq!(sim.rising_edges("clk"), 1);
    }

    #[test]
    fn edge_wakes_waiters_before_time_moves() {
        let mut s = Simulator::new();
        let sim = s.handle();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (h, log) = (sim.clone(), seen.clone());
        sim.spawn(async move {
            while h.rising_edge("clk").await.is_ok() {
                log.borrow_mut().push(h.now());
            }
        }).unwrap();

        let h = sim.clone();
        s.run(async move {
            for _ in 0..3 {
                h.timer(10, TimeUnit::Ns).await;
                h.set("clk", 1);
                h.timer(10, TimeUnit::Ns).await;
                h.set("clk", 0);
            }
        }).unwrap();

        assert_eq!(*seen.borrow(), vec![
            SimTime::new(10, TimeUnit::Ns),
            SimTime::new(30, TimeUnit::Ns),
            SimTime::new(50, TimeUnit::Ns),
        ]);
    }

    #[test]
    fn stalls_without_timers() {
        let mut s = Simulator::new();
        let h = s.handle();
        let r = s.run(async move {
            let _ = h.rising_edge("clk").await;
        });
        assert!(matches!(r, Err(SimError::Stalled { .. })));
    }

    #[test]
    fn finish_closes_edges() {
        let mut s = Simulator::new();
        let sim = s.handle();
        let h = sim.clone();
        let waiter = sim.spawn_with_handle(async move {
            h.rising_edge("clk").await
        }).unwrap();
        s.run_until(SimTime::new(1, TimeUnit::Us));
        s.finish();
        assert!(matches!(waiter.now_or_never(), Some(Err(EdgeClosed))));
        assert!(futures::executor::block_on(sim.rising_edge("clk")).is_err());
    }

    #[test]
    fn run_until_stops_at_time() {
        let mut s = Simulator::new();
        let sim = s.handle();
        sim.start_clock(Clock::new("clk", 10, TimeUnit::Ns)).unwrap();
        s.run_until(SimTime::new(95, TimeUnit::Ns));
        // edges at 0, 10, ..., 90
        assert_eq!(sim.rising_edges("clk"), 10);
        assert_eq!(s.now(), SimTime::new(95, TimeUnit::Ns));
    }
}
