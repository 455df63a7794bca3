//! Set-associative cache tag store.
//!
//! Tracks which lines are resident so the cache hierarchy can tell at which
//! level an access hits. No data is stored. Misses allocate the line; the
//! victim is picked by the configured replacement policy.

/// Replacement policies (LRU, FIFO).
pub mod policies;

use serde::Serialize;

use self::policies::{FifoPolicy, LruPolicy, ReplacementPolicy};
use crate::config::{CacheConfig, ReplacementPolicy as PolicyKind};

#[derive(Clone, Copy, Debug, Default)]
struct CacheLine {
    tag: u64,
    valid: bool,
    dirty: bool,
}

/// Hit and miss counters of one cache level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Accesses that found the line.
    pub hits: u64,
    /// Accesses that allocated the line.
    pub misses: u64,
    /// Dirty lines evicted.
    pub writebacks: u64,
}

/// One level of set-associative cache.
#[derive(Debug)]
pub struct SetAssocCache {
    /// Access latency in cycles.
    pub latency: u64,
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    policy: Box<dyn ReplacementPolicy>,
    stats: CacheStats,
}

impl SetAssocCache {
    /// Builds the cache described by `config`.
    ///
    /// Degenerate geometries are clamped to one set of one 64-byte line;
    /// `Config::validate` rejects them before this point.
    pub fn new(config: &CacheConfig) -> Self {
        let ways = config.ways.max(1);
        let line_bytes = if config.line_bytes == 0 {
            64
        } else {
            config.line_bytes
        };
        let num_sets = (config.size_bytes / line_bytes / ways).max(1);

        let policy: Box<dyn ReplacementPolicy> = match config.policy {
            PolicyKind::Lru => Box::new(LruPolicy::new(num_sets, ways)),
            PolicyKind::Fifo => Box::new(FifoPolicy::new(num_sets, ways)),
        };

        Self {
            latency: config.latency,
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes,
            policy,
            stats: CacheStats::default(),
        }
    }

    #[inline(always)]
    fn locate(&self, addr: u64) -> (usize, u64) {
        let line = addr / self.line_bytes as u64;
        let set = (line % self.num_sets as u64) as usize;
        let tag = line / self.num_sets as u64;
        (set, tag)
    }

    fn find_way(&self, set: usize, tag: u64) -> Option<usize> {
        let base = set * self.ways;
        self.lines[base..base + self.ways]
            .iter()
            .position(|l| l.valid && l.tag == tag)
    }

    /// Returns true if the line holding `addr` is resident.
    pub fn contains(&self, addr: u64) -> bool {
        let (set, tag) = self.locate(addr);
        self.find_way(set, tag).is_some()
    }

    /// Looks up `addr`, allocating the line on a miss. Returns whether it hit.
    pub fn access(&mut self, addr: u64, is_write: bool) -> bool {
        let (set, tag) = self.locate(addr);
        let base = set * self.ways;

        if let Some(way) = self.find_way(set, tag) {
            self.policy.touch(set, way);
            if is_write {
                self.lines[base + way].dirty = true;
            }
            self.stats.hits += 1;
            return true;
        }

        let way = self.policy.victim(set) % self.ways;
        let victim = &mut self.lines[base + way];
        if victim.valid && victim.dirty {
            self.stats.writebacks += 1;
        }
        *victim = CacheLine {
            tag,
            valid: true,
            dirty: is_write,
        };
        self.policy.fill(set, way);
        self.stats.misses += 1;
        false
    }

    /// Hit and miss counters.
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }
}
