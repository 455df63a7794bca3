//! Memory-hierarchy hit location.
//!
//! Every memory result carries the level that served it. The ROB timer uses it
//! to attribute stalls to per-level CPI buckets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where in the memory hierarchy an access was served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitWhere {
    /// L1 instruction cache.
    #[default]
    L1I,
    /// Own L1 data cache.
    L1Own,
    /// Own L2.
    L2Own,
    /// Own L3.
    L3Own,
    /// Own L4.
    L4Own,
    /// Sibling core's L1.
    L1Sibling,
    /// Sibling core's L2.
    L2Sibling,
    /// Sibling core's L3.
    L3Sibling,
    /// Sibling core's L4.
    L4Sibling,
    /// Missed everywhere, source not tracked.
    Miss,
    /// Local DRAM.
    DramLocal,
    /// Remote DRAM.
    DramRemote,
    /// Remote cache.
    CacheRemote,
    /// Not yet resolved; the timer queries the hierarchy at issue.
    Unknown,
    /// Predicated-off access that never reached memory.
    PredicateFalse,
}

impl HitWhere {
    /// Number of distinct hit locations.
    pub const COUNT: usize = 15;

    /// All hit locations in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::L1I,
        Self::L1Own,
        Self::L2Own,
        Self::L3Own,
        Self::L4Own,
        Self::L1Sibling,
        Self::L2Sibling,
        Self::L3Sibling,
        Self::L4Sibling,
        Self::Miss,
        Self::DramLocal,
        Self::DramRemote,
        Self::CacheRemote,
        Self::Unknown,
        Self::PredicateFalse,
    ];

    /// Stable index for per-level statistic arrays.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in statistic keys (`cpiDataCache<name>`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::L1I => "L1I",
            Self::L1Own => "L1",
            Self::L2Own => "L2",
            Self::L3Own => "L3",
            Self::L4Own => "L4",
            Self::L1Sibling => "L1_S",
            Self::L2Sibling => "L2_S",
            Self::L3Sibling => "L3_S",
            Self::L4Sibling => "L4_S",
            Self::Miss => "miss",
            Self::DramLocal => "dram-local",
            Self::DramRemote => "dram-remote",
            Self::CacheRemote => "cache-remote",
            Self::Unknown => "unknown",
            Self::PredicateFalse => "predicate-false",
        }
    }

    /// Whether this location shows up as a CPI-stack bucket.
    pub const fn is_reportable(self) -> bool {
        !matches!(self, Self::Unknown | Self::PredicateFalse)
    }
}

impl fmt::Display for HitWhere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
