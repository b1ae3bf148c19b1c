use super::{Sim, SimError, SimTime, TimeUnit};

/// A free-running clock on one line, starting high.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clock {
    pub line: String,
    pub period: u64,
    pub unit: TimeUnit,
}

impl Clock {
    pub fn new(line: &str, period: u64, unit: TimeUnit) -> Self {
        Clock {
            line: line.to_owned(),
            period,
            unit,
        }
    }

    // unit as a string, "ns", "us" and so on
    pub fn with_units(line: &str, period: u64, unit: &str) -> Result<Self, SimError> {
        Ok(Clock::new(line, period, unit.parse()?))
    }

    pub fn period(&self) -> SimTime {
        SimTime::new(self.period, self.unit)
    }

    // (high, low); odd periods spend the extra femtosecond low
    pub fn half_periods(&self) -> (SimTime, SimTime) {
        let period = self.period().femtos();
        let high = period / 2;
        (SimTime(high), SimTime(period - high))
    }

    pub(super) async fn drive(self, sim: Sim) {
        let (high, low) = self.half_periods();
        loop {
            sim.set(&self.line, 1);
            sim.wait(high).await;
            sim.set(&self.line, 0);
            sim.wait(low).await;
        }
    }
}
