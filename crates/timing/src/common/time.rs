//! Simulated time base.
//!
//! This module defines the fixed-point time representation used by every timing model. It provides:
//! 1. **`SubsecondTime`:** An absolute time or latency in femtoseconds, with a `MAX` "not yet" sentinel.
//! 2. **`ComponentPeriod`:** The clock period of a frequency domain (one core).
//! 3. **`ComponentTime`:** A clock that advances in whole cycles or by arbitrary latencies.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Femtoseconds per nanosecond.
const FS_PER_NS: u64 = 1_000_000;

/// A point in simulated time, or a latency, in femtoseconds.
///
/// Arithmetic saturates: adding to `MAX` stays `MAX`, and subtracting a larger
/// value yields zero. Timestamps that have not happened yet are `MAX`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubsecondTime(u64);

impl SubsecondTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Sentinel for "never" / "not yet happened".
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a time from femtoseconds.
    #[inline(always)]
    pub const fn from_fs(fs: u64) -> Self {
        Self(fs)
    }

    /// Creates a time from picoseconds.
    #[inline(always)]
    pub const fn from_ps(ps: u64) -> Self {
        Self(ps.saturating_mul(1000))
    }

    /// Creates a time from nanoseconds.
    #[inline(always)]
    pub const fn from_ns(ns: u64) -> Self {
        Self(ns.saturating_mul(FS_PER_NS))
    }

    /// Returns the raw femtosecond count.
    #[inline(always)]
    pub const fn as_fs(self) -> u64 {
        self.0
    }

    /// Returns the time in whole picoseconds (truncating).
    pub const fn as_ps(self) -> u64 {
        self.0 / 1000
    }

    /// Returns the time in whole nanoseconds (truncating).
    pub const fn as_ns(self) -> u64 {
        self.0 / FS_PER_NS
    }

    /// Returns true for the `MAX` sentinel.
    #[inline(always)]
    pub const fn is_max(self) -> bool {
        self.0 == u64::MAX
    }

    /// Divides `self` by `period` and rounds to the nearest integer.
    ///
    /// Used to turn a memory-hierarchy latency into a cycle count. A zero
    /// period yields zero.
    pub const fn divide_rounded(self, period: Self) -> u64 {
        if period.0 == 0 {
            return 0;
        }
        (self.0 + period.0 / 2) / period.0
    }

    /// Returns the larger of two times.
    #[inline(always)]
    pub fn max(self, other: Self) -> Self {
        if self >= other { self } else { other }
    }

    /// Returns the smaller of two times.
    #[inline(always)]
    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }
}

impl Add for SubsecondTime {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for SubsecondTime {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for SubsecondTime {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for SubsecondTime {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Mul<u64> for SubsecondTime {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: u64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }
}

impl fmt::Display for SubsecondTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max() {
            write!(f, "MAX")
        } else {
            write!(f, "{}fs", self.0)
        }
    }
}

/// The clock period of a frequency domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentPeriod {
    period: SubsecondTime,
}

impl ComponentPeriod {
    /// Creates a period from a frequency in GHz.
    ///
    /// # Panics
    ///
    /// Panics if `ghz` is not strictly positive; configuration validation
    /// rejects such values before a period is ever built.
    pub fn from_ghz(ghz: f64) -> Self {
        assert!(ghz > 0.0, "clock frequency must be positive, got {ghz} GHz");
        let fs = (FS_PER_NS as f64 / ghz).round() as u64;
        Self {
            period: SubsecondTime::from_fs(fs.max(1)),
        }
    }

    /// Creates a period directly from its length.
    pub fn from_period(period: SubsecondTime) -> Self {
        Self {
            period: period.max(SubsecondTime::from_fs(1)),
        }
    }

    /// Length of one cycle.
    #[inline(always)]
    pub const fn period(&self) -> SubsecondTime {
        self.period
    }

    /// Converts a cycle count to time.
    #[inline(always)]
    pub fn cycles(&self, cycles: u64) -> SubsecondTime {
        self.period * cycles
    }

    /// Converts a time to whole cycles (truncating).
    #[inline(always)]
    pub const fn to_cycles(&self, time: SubsecondTime) -> u64 {
        time.as_fs() / self.period.as_fs()
    }
}

/// A clock in one frequency domain.
///
/// Holds elapsed time and the domain period so callers can advance by cycles
/// (`add_cycles`) or by latencies measured in other domains (`add_latency`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentTime {
    period: ComponentPeriod,
    elapsed: SubsecondTime,
}

impl ComponentTime {
    /// Creates a clock at time zero.
    pub const fn new(period: ComponentPeriod) -> Self {
        Self {
            period,
            elapsed: SubsecondTime::ZERO,
        }
    }

    /// Current elapsed time.
    #[inline(always)]
    pub const fn elapsed(&self) -> SubsecondTime {
        self.elapsed
    }

    /// Sets the elapsed time.
    #[inline(always)]
    pub fn set_elapsed(&mut self, time: SubsecondTime) {
        self.elapsed = time;
    }

    /// Length of one cycle in this domain.
    #[inline(always)]
    pub const fn period(&self) -> SubsecondTime {
        self.period.period()
    }

    /// The underlying period.
    pub const fn component_period(&self) -> ComponentPeriod {
        self.period
    }

    /// Elapsed time in whole cycles.
    pub const fn cycle_count(&self) -> u64 {
        self.period.to_cycles(self.elapsed)
    }

    /// Advances the clock by `cycles` cycles.
    #[inline(always)]
    pub fn add_cycles(&mut self, cycles: u64) {
        self.elapsed += self.period.cycles(cycles);
    }

    /// Advances the clock by an arbitrary latency.
    #[inline(always)]
    pub fn add_latency(&mut self, latency: SubsecondTime) {
        self.elapsed += latency;
    }

    /// Returns the time `cycles` cycles from now without advancing.
    #[inline(always)]
    pub fn after_cycles(&self, cycles: u64) -> SubsecondTime {
        self.elapsed + self.period.cycles(cycles)
    }

    /// Returns a zeroed clock in the same domain, used to accumulate a cost.
    pub const fn latency_generator(&self) -> Self {
        Self::new(self.period)
    }
}
