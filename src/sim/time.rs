use std::fmt;
use std::str::FromStr;

use super::SimError;

/// A point on the simulated timeline, in femtoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    // saturates at the end of the timeline instead of wrapping
    pub fn new(value: u64, unit: TimeUnit) -> Self {
        SimTime(value.saturating_mul(unit.femtos()))
    }

    pub fn checked_new(value: u64, unit: TimeUnit) -> Option<Self> {
        value.checked_mul(unit.femtos()).map(SimTime)
    }

    pub fn femtos(&self) -> u64 {
        self.0
    }

    pub fn as_unit(&self, unit: TimeUnit) -> f64 {
        self.0 as f64 / unit.femtos() as f64
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.as_unit(TimeUnit::Sec)
    }
}

impl std::ops::Add for SimTime {
    type Output = SimTime;
    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for SimTime {
    type Output = SimTime;
    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // largest unit that divides evenly
        let units = [TimeUnit::Sec, TimeUnit::Ms, TimeUnit::Us,
                     TimeUnit::Ns, TimeUnit::Ps];
        for unit in units {
            if self.0 != 0 && self.0 % unit.femtos() == 0 {
                return write!(f, "{} {}", self.0 / unit.femtos(), unit);
            }
        }
        write!(f, "{} fs", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Fs,
    Ps,
    Ns,
    Us,
    Ms,
    Sec,
}

impl TimeUnit {
    pub fn femtos(&self) -> u64 {
        match self {
            TimeUnit::Fs => 1,
            TimeUnit::Ps => 1_000,
            TimeUnit::Ns => 1_000_000,
            TimeUnit::Us => 1_000_000_000,
            TimeUnit::Ms => 1_000_000_000_000,
            TimeUnit::Sec => 1_000_000_000_000_000,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::Sec => "sec",
        })
    }
}

impl FromStr for TimeUnit {
    type Err = SimError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fs" => Ok(TimeUnit::Fs),
            "ps" => Ok(TimeUnit::Ps),
            "ns" => Ok(TimeUnit::Ns),
            "us" => Ok(TimeUnit::Us),
            "ms" => Ok(TimeUnit::Ms),
            "sec" | "s" => Ok(TimeUnit::Sec),
            _ => Err(SimError::UnknownTimeUnit(s.to_owned())),
        }
    }
}
