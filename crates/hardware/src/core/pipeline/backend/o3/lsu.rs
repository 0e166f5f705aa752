//! Load/Store Unit: combined load queue and store queue.
//!
//! The store side reuses [`crate::core::pipeline::store_buffer::StoreBuffer`]
//! directly: its ring-buffer-with-ordered-tags shape is exactly what a store
//! queue needs (allocate at dispatch, resolve at AGEN, forward to younger
//! loads, commit/drain at retire, `flush_after` on a branch misprediction).
//! The tag it orders by must be unique and monotonically increasing for the
//! life of the entries currently in the buffer; `Rob::next_tag` provides
//! that property for the in-order backend by never reusing a tag within a
//! bounded window. The renamer's own `ActiveListIndex` does *not* have that
//! property (it's a ring index that wraps at Active List capacity), so this
//! module mints its own monotonically increasing sequence instead of reusing
//! Active List indices as store-buffer tags.
//!
//! The load side is simpler: a resident-load counter for load-queue
//! occupancy (held from dispatch to retire, mirroring the store queue's
//! dispatch-to-drain lifetime) plus a small list of loads currently stalled
//! on an unresolved or partially-overlapping store, polled once per cycle
//! for replay.

use crate::common::error::Trap;
use crate::common::{AccessType, TranslationResult, VirtAddr};
use crate::core::Cpu;
use crate::core::pipeline::backend::o3::pay::QueueSlot;
use crate::core::pipeline::backend::o3::renamer::ActiveListIndex;
use crate::core::pipeline::rob::RobTag;
use crate::core::pipeline::signals::{AtomicOp, MemWidth};
use crate::core::pipeline::store_buffer::{ForwardResult, StoreBuffer};
use crate::core::units::lsu::unaligned;

/// Sticky-bit memory dependence predictor: tracks, per load PC, whether a
/// load/store-ordering violation has previously been observed there. Once
/// set, that load PC always waits for every older store's address to
/// resolve instead of speculating past unresolved stores. Independent of
/// any functional-reference oracle.
///
/// In `conservative` mode every load waits on every unresolved older store
/// regardless of history, matching `config::MemDepPredictor::Conservative`;
/// otherwise a load only waits once its own PC has previously violated,
/// matching `config::MemDepPredictor::StoreSetSpeculative` (a simplified
/// per-PC stand-in for a full store-set predictor).
#[derive(Debug, Default)]
pub struct MemDepPredictor {
    sticky: std::collections::HashSet<u64>,
    conservative: bool,
}

impl MemDepPredictor {
    pub fn new(conservative: bool) -> Self {
        MemDepPredictor { sticky: std::collections::HashSet::new(), conservative }
    }

    /// True if a load at `pc` must wait for all older store addresses to
    /// resolve before executing.
    pub fn must_wait(&self, pc: u64) -> bool {
        self.conservative || self.sticky.contains(&pc)
    }

    /// Records a load/store ordering violation detected at retire.
    pub fn record_violation(&mut self, pc: u64) {
        self.sticky.insert(pc);
    }
}

/// Outcome of attempting a load at AGEN/execute.
pub enum LoadOutcome {
    /// Load completed this cycle with this (already sign-extended) value.
    Hit(u64),
    /// Load must wait; it has been recorded in the LSU's replay list.
    Stalled,
    /// Address translation raised a trap.
    Fault(Trap),
}

#[derive(Clone, Debug)]
struct ReplayEntry {
    al_index: ActiveListIndex,
    paddr: u64,
    width: MemWidth,
    signed_load: bool,
    branch_mask: u64,
}

/// Combined load queue / store queue.
pub struct Lsu {
    sq: StoreBuffer,
    next_store_seq: u32,

    lq_capacity: usize,
    lq_occupied: usize,
    replay: Vec<ReplayEntry>,

    pub mem_dep: MemDepPredictor,
    spec_disambig: bool,
}

impl Lsu {
    pub fn new(sq_capacity: usize, lq_capacity: usize, spec_disambig: bool, conservative_mem_dep: bool) -> Self {
        Lsu {
            sq: StoreBuffer::new(sq_capacity.max(1)),
            next_store_seq: 1,
            lq_capacity: lq_capacity.max(1),
            lq_occupied: 0,
            replay: Vec::new(),
            mem_dep: MemDepPredictor::new(conservative_mem_dep),
            spec_disambig,
        }
    }

    /// True iff the LSU cannot currently accept `n_loads` new loads and
    /// `n_stores` new stores.
    pub fn stall(&self, n_loads: usize, n_stores: usize) -> bool {
        (self.lq_capacity - self.lq_occupied) < n_loads || self.sq.free_slots() < n_stores
    }

    /// Allocates a load-queue slot (held until `retire_load`). Returns its
    /// (index, phase) pair for the Payload buffer.
    pub fn alloc_load(&mut self) -> QueueSlot {
        let slot = slot_of(self.lq_occupied as u32, self.lq_capacity);
        self.lq_occupied += 1;
        slot
    }

    /// Releases a load-queue slot at retire.
    pub fn retire_load(&mut self) {
        self.lq_occupied = self.lq_occupied.saturating_sub(1);
    }

    /// Allocates a store queue slot, returning its sequence tag (the
    /// store's handle for resolve/commit/cancel) and its (index, phase)
    /// pair for the Payload buffer.
    pub fn alloc_store(&mut self, width: MemWidth) -> Option<(u32, QueueSlot)> {
        if self.sq.free_slots() == 0 {
            return None;
        }
        let seq = self.next_store_seq;
        self.next_store_seq = self.next_store_seq.wrapping_add(1);
        self.sq.allocate(RobTag(seq), width);
        Some((seq, slot_of(seq, self.sq.capacity())))
    }

    /// Submits a store's resolved address and data (AGEN result).
    pub fn store_resolve(&mut self, seq: u32, vaddr: u64, paddr: u64, data: u64) {
        self.sq.resolve(RobTag(seq), vaddr, paddr, data);
    }

    /// Marks a store as committed at retire; it may now drain to memory.
    pub fn store_commit(&mut self, seq: u32) {
        self.sq.mark_committed(RobTag(seq));
    }

    /// Cancels a store whose store-conditional failed.
    pub fn store_cancel(&mut self, seq: u32) {
        self.sq.cancel(RobTag(seq));
    }

    /// Attempts a load: translates the address, checks forwarding/
    /// disambiguation, and either returns the value immediately or stalls
    /// the load for later replay.
    pub fn load_attempt(
        &mut self,
        cpu: &mut Cpu,
        al_index: ActiveListIndex,
        pc: u64,
        vaddr: u64,
        width: MemWidth,
        signed_load: bool,
        branch_mask: u64,
    ) -> LoadOutcome {
        let size = unaligned::width_to_bytes(width);
        let _ = unaligned::is_aligned(vaddr, size); // penalty accounting out of scope for O3

        let TranslationResult { paddr, trap, .. } = cpu.translate(VirtAddr::new(vaddr), AccessType::Read);
        if let Some(t) = trap {
            return LoadOutcome::Fault(t);
        }

        let must_wait_on_unresolved = (!self.spec_disambig || self.mem_dep.must_wait(pc)) && self.sq.has_unresolved();
        if must_wait_on_unresolved {
            self.replay.push(ReplayEntry { al_index, paddr, width, signed_load, branch_mask });
            return LoadOutcome::Stalled;
        }

        match self.sq.forward_load(paddr, width) {
            ForwardResult::Hit(raw) => LoadOutcome::Hit(sign_extend(raw, width, signed_load)),
            ForwardResult::Miss => LoadOutcome::Hit(sign_extend(read_memory(cpu, paddr, width), width, signed_load)),
            ForwardResult::Stall => {
                self.replay.push(ReplayEntry { al_index, paddr, width, signed_load, branch_mask });
                LoadOutcome::Stalled
            }
        }
    }

    /// Polls the replay list for a load whose blocking store has since
    /// resolved. Returns `(al_index, value)` for at most one resolved load
    /// per cycle (oldest first).
    pub fn poll_replay(&mut self, cpu: &mut Cpu) -> Option<(ActiveListIndex, u64)> {
        let idx = self
            .replay
            .iter()
            .position(|e| !matches!(self.sq.forward_load(e.paddr, e.width), ForwardResult::Stall) && !self.sq.has_unresolved())?;
        let e = self.replay.remove(idx);
        let raw = match self.sq.forward_load(e.paddr, e.width) {
            ForwardResult::Hit(v) => v,
            _ => read_memory(cpu, e.paddr, e.width),
        };
        Some((e.al_index, sign_extend(raw, e.width, e.signed_load)))
    }

    /// Performs an atomic read-modify-write at retire.
    pub fn amo_execute(&mut self, cpu: &mut Cpu, vaddr: u64, width: MemWidth, op: AtomicOp, reg_val: u64) -> Result<u64, Trap> {
        let TranslationResult { paddr, trap, .. } = cpu.translate(VirtAddr::new(vaddr), AccessType::Write);
        if let Some(t) = trap {
            return Err(t);
        }
        let old = read_memory(cpu, paddr, width);
        let new = crate::core::units::lsu::Lsu::atomic_alu(op, old, reg_val, width);
        write_memory(cpu, paddr, width, new);
        Ok(old)
    }

    /// Once per cycle: drains one committed store to memory, if any.
    pub fn drain_to_memory(&mut self, cpu: &mut Cpu) {
        if let Some(store) = self.sq.drain_one()
            && let Some(paddr) = store.paddr
        {
            write_memory(cpu, paddr, store.width, store.data);
        }
    }

    /// Discards store-queue entries allocated after `keep_store_seq`
    /// (a branch misprediction recovery point) and drops every replayed
    /// load whose branch mask has bit `b` set.
    pub fn restore(&mut self, keep_store_seq: u32, b: u32) {
        self.sq.flush_after(RobTag(keep_store_seq));
        self.squash(b);
    }

    /// Removes in-flight replayed loads whose branch mask has bit `b` set
    /// (used by the writeback-stage misprediction squash pass; resident,
    /// not-yet-replayed loads in other latches/lanes are squashed there).
    pub fn squash(&mut self, b: u32) {
        let bit = 1u64 << b;
        let before = self.replay.len();
        self.replay.retain(|e| e.branch_mask & bit == 0);
        self.lq_occupied = self.lq_occupied.saturating_sub(before - self.replay.len());
    }

    pub fn clear_branch_bit(&mut self, b: u32) {
        let bit = 1u64 << b;
        for e in &mut self.replay {
            e.branch_mask &= !bit;
        }
    }

    /// Full flush on a trap/exception/serializing-instruction squash:
    /// every in-flight (non-committed) entry is discarded and LQ occupancy
    /// resets, since the Active List that was holding those slots open is
    /// itself being squashed in its entirety.
    pub fn flush(&mut self) {
        self.sq.flush_speculative();
        self.lq_occupied = 0;
        self.replay.clear();
    }

    /// Current store sequence tag, used by dispatch/writeback as the
    /// "keep" point when a branch resolves.
    pub fn current_store_seq(&self) -> u32 {
        self.next_store_seq.wrapping_sub(1)
    }
}

fn slot_of(seq: u32, capacity: usize) -> QueueSlot {
    let capacity = capacity.max(1);
    QueueSlot {
        index: (seq as usize) % capacity,
        phase: ((seq as usize) / capacity) % 2 == 1,
    }
}

fn sign_extend(raw: u64, width: MemWidth, signed: bool) -> u64 {
    if !signed {
        return raw;
    }
    match width {
        MemWidth::Byte => (raw as i8) as i64 as u64,
        MemWidth::Half => (raw as i16) as i64 as u64,
        MemWidth::Word => (raw as i32) as i64 as u64,
        _ => raw,
    }
}

fn is_ram(cpu: &Cpu, paddr: u64) -> bool {
    let in_htif = cpu.htif_range.is_some_and(|(s, e)| paddr >= s && paddr < e);
    !in_htif && paddr >= cpu.ram_start && paddr < cpu.ram_end
}

fn read_memory(cpu: &mut Cpu, paddr: u64, width: MemWidth) -> u64 {
    if is_ram(cpu, paddr) {
        let offset = (paddr - cpu.ram_start) as usize;
        unsafe {
            return match width {
                MemWidth::Byte => *cpu.ram_ptr.add(offset) as u64,
                MemWidth::Half => (cpu.ram_ptr.add(offset) as *const u16).read_unaligned() as u64,
                MemWidth::Word => (cpu.ram_ptr.add(offset) as *const u32).read_unaligned() as u64,
                MemWidth::Double => (cpu.ram_ptr.add(offset) as *const u64).read_unaligned(),
                MemWidth::Nop => 0,
            };
        }
    }
    match width {
        MemWidth::Byte => cpu.bus.bus.read_u8(paddr) as u64,
        MemWidth::Half => cpu.bus.bus.read_u16(paddr) as u64,
        MemWidth::Word => cpu.bus.bus.read_u32(paddr) as u64,
        MemWidth::Double => cpu.bus.bus.read_u64(paddr),
        MemWidth::Nop => 0,
    }
}

fn write_memory(cpu: &mut Cpu, paddr: u64, width: MemWidth, data: u64) {
    if is_ram(cpu, paddr) {
        let offset = (paddr - cpu.ram_start) as usize;
        unsafe {
            match width {
                MemWidth::Byte => *cpu.ram_ptr.add(offset) = data as u8,
                MemWidth::Half => (cpu.ram_ptr.add(offset) as *mut u16).write_unaligned(data as u16),
                MemWidth::Word => (cpu.ram_ptr.add(offset) as *mut u32).write_unaligned(data as u32),
                MemWidth::Double => (cpu.ram_ptr.add(offset) as *mut u64).write_unaligned(data),
                MemWidth::Nop => {}
            }
        }
        return;
    }
    match width {
        MemWidth::Byte => cpu.bus.bus.write_u8(paddr, data as u8),
        MemWidth::Half => cpu.bus.bus.write_u16(paddr, data as u16),
        MemWidth::Word => cpu.bus.bus.write_u32(paddr, data as u32),
        MemWidth::Double => cpu.bus.bus.write_u64(paddr, data),
        MemWidth::Nop => {}
    }
}
