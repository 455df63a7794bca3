//! Branch Target Buffer.
//!
//! Direct-mapped, tagged with the full instruction pointer. Instruction
//! pointers are byte addresses of variable-length instructions, so the index
//! uses the low bits unshifted.

#[derive(Clone, Copy, Debug, Default)]
struct BtbEntry {
    ip: u64,
    target: u64,
    valid: bool,
}

/// Direct-mapped target cache.
#[derive(Debug)]
pub struct Btb {
    table: Vec<BtbEntry>,
    mask: usize,
}

impl Btb {
    /// Creates an empty BTB.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of entries, rounded up to a power of two (at least 1).
    pub fn new(size: usize) -> Self {
        let size = size.max(1).next_power_of_two();
        Self {
            table: vec![BtbEntry::default(); size],
            mask: size - 1,
        }
    }

    #[inline(always)]
    const fn index(&self, ip: u64) -> usize {
        (ip as usize) & self.mask
    }

    /// Stored target for `ip`.
    pub fn lookup(&self, ip: u64) -> Option<u64> {
        let e = self.table[self.index(ip)];
        (e.valid && e.ip == ip).then_some(e.target)
    }

    /// Records `target` for `ip`, evicting whatever shared the slot.
    pub fn update(&mut self, ip: u64, target: u64) {
        let idx = self.index(ip);
        self.table[idx] = BtbEntry {
            ip,
            target,
            valid: true,
        };
    }
}
