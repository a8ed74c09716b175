//! Simulated time.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// A point on the simulated timeline, in seconds.
///
/// Wraps an `f64` but is totally ordered (via `f64::total_cmp`) so it can be
/// used as a queue key. Constructors reject NaN.
#[derive(Clone, Copy, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// Start of every run.
    pub const ZERO: Self = SimTime(0.0);

    /// Create a time value.
    ///
    /// # Panics
    ///
    /// Panics if `secs` is NaN.
    pub fn from_secs(secs: f64) -> Self {
        assert!(!secs.is_nan(), "SimTime cannot be NaN");
        SimTime(secs)
    }

    /// Seconds since the start of the run.
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// The smallest representable time strictly after `self`.
    ///
    /// Used to schedule "immediately after" events without colliding with
    /// the event currently being handled.
    pub fn next_after(self) -> Self {
        if self.0 == f64::INFINITY {
            return self;
        }
        if self.0 == 0.0 {
            return SimTime(f64::from_bits(1));
        }
        let bits = self.0.to_bits();
        let next = if self.0 > 0.0 { bits + 1 } else { bits - 1 };
        SimTime(f64::from_bits(next))
    }

    /// Elapsed seconds from `earlier` to `self`.
    pub fn since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, secs: f64) -> SimTime {
        SimTime::from_secs(self.0 + secs)
    }
}

impl Sub<f64> for SimTime {
    type Output = SimTime;

    fn sub(self, secs: f64) -> SimTime {
        SimTime::from_secs(self.0 - secs)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
