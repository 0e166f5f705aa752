//! Payload buffer: per-instruction scratchpad indexed by Active List index.
//!
//! Everything dispatch records about an instruction that later stages need
//! but the Active List record itself does not carry (lane assignment,
//! branch ID, LQ/SQ indices, split-store linkage) lives here rather than
//! being threaded through every pipeline latch by value.

use crate::common::error::{ExceptionStage, Trap};
use crate::core::pipeline::backend::o3::renamer::{ActiveListIndex, BranchId};
use crate::core::pipeline::signals::{AtomicOp, ControlSignals, MemWidth};

/// A load or store queue slot reference, paired with its wraparound phase
/// bit so older/younger ordering survives index wraparound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct QueueSlot {
    /// Index into the LQ or SQ ring.
    pub index: usize,
    /// Wraparound phase bit, flips each time the ring wraps.
    pub phase: bool,
}

/// Per-instruction payload record.
#[derive(Clone, Debug, Default)]
pub struct PayloadEntry {
    /// Execution lane this instruction was steered to at dispatch.
    pub lane: usize,
    /// Branch ID, if this instruction took a checkpoint.
    pub branch_id: Option<BranchId>,
    /// Load queue slot, if this is a load (or the lower half of a split
    /// store that also needs the upper half's addr phase for ordering
    /// purposes — in practice only loads use this field).
    pub lq_slot: Option<QueueSlot>,
    /// Store queue slot, if this is a store. Both halves of a split store
    /// share the same slot.
    pub sq_slot: Option<QueueSlot>,
    /// Store queue sequence tag (the `Lsu`'s own handle for resolve/
    /// commit/cancel), if this is a store. Distinct from `sq_slot.index`,
    /// which is only the ring position.
    pub sq_seq: Option<u32>,
    /// True if this is the lower (value-producing) half of a split store;
    /// it must not allocate a new SQ slot and must not run AGEN.
    pub is_split_lower: bool,
    /// Deferred CSR write, computed at execute but applied at retire since
    /// CSR instructions are serializing: `(addr, new_value)`.
    pub csr_update: Option<(u32, u64)>,
    /// Deferred AMO read-modify-write, computed at execute (address only)
    /// but performed at retire once the instruction is known non-speculative:
    /// `(paddr, width, op, rs2_value)`.
    pub amo: Option<(u64, MemWidth, AtomicOp, u64)>,
    /// For a checkpointed branch/jump: the LSU's store sequence tag at the
    /// moment it dispatched, i.e. the "keep" point `Lsu::restore` rolls back
    /// to if this branch mispredicts.
    pub checkpoint_store_seq: Option<u32>,
    /// The architectural exception this entry carries, if the Active List's
    /// `exception` bit is set. The Active List only tracks the bit; the
    /// trap value itself has nowhere else to live between when it is
    /// detected and when retire re-raises it.
    pub trap: Option<(Trap, ExceptionStage)>,
    /// Control signals, kept from dispatch through retire purely for the
    /// retire stage's instruction-mix statistics (the Active List only
    /// tracks the coarse is_load/is_store/is_branch/is_amo/is_csr bits it
    /// needs for its own bookkeeping).
    pub ctrl: ControlSignals,
}

/// Payload buffer, one [`PayloadEntry`] per live Active List slot.
pub struct Payload {
    entries: Vec<PayloadEntry>,
}

impl Payload {
    /// Builds a payload buffer sized to the Active List's capacity.
    pub fn new(capacity: usize) -> Self {
        Payload {
            entries: vec![PayloadEntry::default(); capacity],
        }
    }

    /// Returns the payload entry for `i`.
    pub fn get(&self, i: ActiveListIndex) -> &PayloadEntry {
        &self.entries[i.0]
    }

    /// Returns the payload entry for `i`, mutably.
    pub fn get_mut(&mut self, i: ActiveListIndex) -> &mut PayloadEntry {
        &mut self.entries[i.0]
    }

    /// Resets the slot at `i` to its default (empty) state. Called when the
    /// entry retires or is squashed away.
    pub fn clear(&mut self, i: ActiveListIndex) {
        self.entries[i.0] = PayloadEntry::default();
    }
}
