//! Reorder buffer slot.

use crate::common::BoundedSeqList;
use crate::common::SubsecondTime;
use crate::common::constants::{MAX_ADDRESS_PRODUCERS, MAX_INLINE_DEPENDANTS};
use crate::uop::DynamicMicroOp;

/// One in-flight micro-op and its pipeline timestamps.
///
/// Entries refer to each other by sequence number. A producer lists the
/// consumers to wake when it issues; a store lists the producers of its
/// address registers.
#[derive(Clone, Debug)]
pub struct RobEntry {
    /// The micro-op.
    pub uop: DynamicMicroOp,
    /// Entered the window.
    pub dispatched: SubsecondTime,
    /// All producers resolved; may issue from here on.
    pub ready: SubsecondTime,
    /// Latest producer result seen so far.
    pub ready_max: SubsecondTime,
    /// Store address known.
    pub address_ready: SubsecondTime,
    /// Latest address producer result seen so far.
    pub address_ready_max: SubsecondTime,
    /// Left the reservation station.
    pub issued: SubsecondTime,
    /// Result available; may commit from here on.
    pub done: SubsecondTime,
    dependants: BoundedSeqList<MAX_INLINE_DEPENDANTS>,
    address_producers: BoundedSeqList<MAX_ADDRESS_PRODUCERS>,
}

impl RobEntry {
    /// Fresh entry for `uop` numbered `seq`.
    pub fn new(mut uop: DynamicMicroOp, seq: u64) -> Self {
        uop.set_sequence_number(seq);
        Self {
            uop,
            dispatched: SubsecondTime::MAX,
            ready: SubsecondTime::MAX,
            ready_max: SubsecondTime::ZERO,
            address_ready: SubsecondTime::MAX,
            address_ready_max: SubsecondTime::ZERO,
            issued: SubsecondTime::MAX,
            done: SubsecondTime::MAX,
            dependants: BoundedSeqList::new(),
            address_producers: BoundedSeqList::new(),
        }
    }

    /// Resets the pipeline state and renumbers the entry, as if it had just
    /// been pushed. Register dependencies are recomputed at dispatch.
    pub fn reinit(&mut self, seq: u64) {
        self.uop.clear_dependencies();
        self.uop.set_sequence_number(seq);
        self.dispatched = SubsecondTime::MAX;
        self.ready = SubsecondTime::MAX;
        self.ready_max = SubsecondTime::ZERO;
        self.address_ready = SubsecondTime::MAX;
        self.address_ready_max = SubsecondTime::ZERO;
        self.issued = SubsecondTime::MAX;
        self.done = SubsecondTime::MAX;
        self.dependants.clear();
        self.address_producers.clear();
    }

    /// Sequence number of the micro-op.
    #[inline(always)]
    pub const fn sequence_number(&self) -> u64 {
        self.uop.sequence_number()
    }

    /// Has issued and knows its completion time.
    #[inline(always)]
    pub const fn is_done(&self) -> bool {
        !self.done.is_max()
    }

    /// Registers a consumer to wake at issue.
    ///
    /// # Panics
    ///
    /// Panics on more than `MAX_INLINE_DEPENDANTS` consumers.
    pub fn add_dependant(&mut self, seq: u64) {
        self.dependants.push(seq, "ROB dependants");
    }

    /// Consumers waiting on this entry.
    pub const fn dependants(&self) -> &BoundedSeqList<MAX_INLINE_DEPENDANTS> {
        &self.dependants
    }

    /// Registers an unresolved producer of this store's address.
    ///
    /// # Panics
    ///
    /// Panics on more than `MAX_ADDRESS_PRODUCERS` producers.
    pub fn add_address_producer(&mut self, seq: u64) {
        self.address_producers.push(seq, "store address producers");
    }

    /// Unresolved producers of this store's address.
    pub const fn address_producers(&self) -> &BoundedSeqList<MAX_ADDRESS_PRODUCERS> {
        &self.address_producers
    }
}
