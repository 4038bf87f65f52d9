//! Simulated time base
//!
//! All components run on one logical timeline measured from the start of the
//! scenario. Time is kept as integer nanoseconds so that event ordering is
//! exact and reproducible; seconds as `f64` are only used at the edges
//! (configuration and log output).

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

/// A point on the simulated timeline (nanoseconds since scenario start)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of the simulation
    pub const ZERO: SimTime = SimTime(0);

    /// The far end of the timeline
    pub const MAX: SimTime = SimTime(u64::MAX);

    /// Creates a time from nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a time from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Creates a time from (fractional) seconds. Negative values clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs <= 0.0 || !secs.is_finite() {
            return Self::ZERO;
        }
        Self((secs * 1e9).round() as u64)
    }

    /// Returns the value in nanoseconds
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Returns the value in seconds
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Returns the elapsed duration since an earlier time (zero if `earlier` is later)
    pub fn duration_since(&self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Subtracts a duration, saturating at the start of the simulation
    pub fn saturating_sub(&self, d: Duration) -> SimTime {
        SimTime(self.0.saturating_sub(duration_nanos(d)))
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_add(duration_nanos(rhs)))
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Duration {
        self.duration_since(rhs)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{:.6}s", self.as_secs_f64())
    }
}

/// Simulation clock tracking the current logical time
///
/// The clock only moves forward; the event scheduler is its sole owner.
#[derive(Debug, Default)]
pub struct SimulationClock {
    now: SimTime,
}

impl SimulationClock {
    /// Creates a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Moves the clock to `t`. Moving backwards is ignored.
    pub fn advance_to(&mut self, t: SimTime) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Resets the clock to time zero
    pub fn reset(&mut self) {
        self.now = SimTime::ZERO;
    }
}
