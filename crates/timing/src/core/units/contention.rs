//! Occupancy model for a pool of identical units.
//!
//! Each of the `N` units remembers when it becomes free. A request starting
//! at `t` takes the first unit free at `t` (or the one freeing earliest) and
//! occupies it for its duration. The ROB timer uses one instance for the load
//! queue and one for the store queue; IOCOOM-style queueing uses it the same
//! way.

use serde::Serialize;

use crate::common::SubsecondTime;

/// Request counters of a [`ContentionModel`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContentionStats {
    /// Requests served.
    pub requests: u64,
    /// Barrier requests served.
    pub barriers: u64,
    /// Requests that started before the previous one.
    pub out_of_order: u64,
    /// Requests that started at the same time as the previous one.
    pub simultaneous: u64,
    /// Summed queueing delay.
    pub total_delay: SubsecondTime,
    /// Summed barrier queueing delay.
    pub total_barrier_delay: SubsecondTime,
}

/// Tracks when each of a fixed number of units becomes free.
#[derive(Clone, Debug)]
pub struct ContentionModel {
    free_at: Vec<SubsecondTime>,
    t_last: SubsecondTime,
    stats: ContentionStats,
}

impl ContentionModel {
    /// Model with `num_outstanding` units. Zero units means unlimited.
    pub fn new(num_outstanding: usize) -> Self {
        Self {
            free_at: vec![SubsecondTime::ZERO; num_outstanding],
            t_last: SubsecondTime::ZERO,
            stats: ContentionStats::default(),
        }
    }

    /// Number of units.
    pub fn num_units(&self) -> usize {
        self.free_at.len()
    }

    /// Reserves a unit for `delay` starting no earlier than `start`.
    ///
    /// Returns the completion time. Requests arriving out of order are not
    /// queued: they complete after `delay` and leave the units untouched.
    pub fn completion_time(&mut self, start: SubsecondTime, delay: SubsecondTime) -> SubsecondTime {
        if self.free_at.is_empty() {
            return start + delay;
        }

        let end = if start < self.t_last {
            self.stats.out_of_order += 1;
            start + delay
        } else {
            if start == self.t_last {
                self.stats.simultaneous += 1;
            }

            let mut unit = 0;
            for (i, &t) in self.free_at.iter().enumerate() {
                if t <= start {
                    unit = i;
                    break;
                } else if t < self.free_at[unit] {
                    unit = i;
                }
            }

            let begin = start.max(self.free_at[unit]);
            let end = begin + delay;
            self.free_at[unit] = end;
            self.stats.total_delay += begin - start;
            self.t_last = start;
            end
        };

        self.stats.requests += 1;
        end
    }

    /// Waits for every unit to drain, then occupies all of them for `delay`.
    pub fn barrier_completion_time(
        &mut self,
        start: SubsecondTime,
        delay: SubsecondTime,
    ) -> SubsecondTime {
        let max_time = self.free_at.iter().fold(start, |acc, &t| acc.max(t));
        let end = max_time + delay;
        for t in &mut self.free_at {
            *t = end;
        }
        self.stats.total_barrier_delay += max_time - start;
        self.stats.barriers += 1;
        end
    }

    /// Some unit is free at `now`. Always true for an unlimited model.
    pub fn has_free_slot(&self, now: SubsecondTime) -> bool {
        self.free_at.is_empty() || self.free_at.iter().any(|&t| t <= now)
    }

    /// Units still busy at `now`.
    pub fn num_used(&self, now: SubsecondTime) -> usize {
        self.free_at.iter().filter(|&&t| t > now).count()
    }

    /// Request counters.
    pub const fn stats(&self) -> &ContentionStats {
        &self.stats
    }
}
