//! Execution lanes: Register-Read -> Execute[0..depth) -> Writeback.
//!
//! Each lane is an independent pipeline, unlike the in-order backend's
//! single shared Execute/Memory1/Memory2 sequence: a lane with a deeper
//! execute pipe (e.g. a multiplier) simply has more `ex` sub-stages than a
//! single-cycle ALU lane, and instructions in different lanes never block
//! each other.

use crate::common::error::{ExceptionStage, Trap};
use crate::core::pipeline::backend::o3::pay::QueueSlot;
use crate::core::pipeline::backend::o3::renamer::{ActiveListIndex, BranchId};
use crate::core::pipeline::signals::ControlSignals;

/// An instruction in flight in a lane, from issue through writeback.
#[derive(Clone, Debug)]
pub struct LaneOp {
    pub al_index: ActiveListIndex,
    /// Branch mask captured at rename: bit `b` set means this instruction
    /// is control-dependent on the still-unresolved branch with ID `b`.
    pub branch_mask: u64,
    /// Set if this instruction itself is a checkpointed branch.
    pub branch_id: Option<BranchId>,

    pub pc: u64,
    pub inst: u32,
    pub inst_size: u64,
    pub imm: i64,
    pub ctrl: ControlSignals,
    pub trap: Option<Trap>,
    pub exception_stage: Option<ExceptionStage>,
    pub pred_taken: bool,
    pub pred_target: u64,
    pub ghr_snapshot: u64,

    pub phys_rs1: u32,
    pub phys_rs2: u32,
    pub phys_rs3: u32,
    pub phys_rd: u32,
    pub dest_valid: bool,

    /// Operand values, filled in at Register-Read (or by a bypass wakeup
    /// one stage before a multi-cycle producer's terminal execute stage).
    pub op_a: u64,
    pub op_b: u64,
    pub op_c: u64,

    pub lq_slot: Option<QueueSlot>,
    pub sq_slot: Option<QueueSlot>,
    pub is_split_lower: bool,

    /// Result of execute, written back to the PRF at writeback.
    pub result: Option<u64>,
    pub fp_flags: u8,
    /// Physical address computed by AGEN, for memory ops.
    pub paddr: Option<u64>,
}

/// One execution lane.
pub struct Lane {
    /// Register-Read slot.
    pub rr: Option<LaneOp>,
    /// Execute sub-stages, `ex[0]` is freshly issued from RR, `ex[depth-1]`
    /// is terminal (does AGEN/ALU/LSU work).
    pub ex: Vec<Option<LaneOp>>,
    /// Writeback slot.
    pub wb: Option<LaneOp>,
}

impl Lane {
    pub fn new(depth: usize) -> Self {
        Lane {
            rr: None,
            ex: vec![None; depth.max(1)],
            wb: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.ex.len()
    }

    /// Advances every valid `ex[k-1]` into `ex[k]`, freeing `ex[0]`.
    /// The caller must have already moved any terminal-stage result out of
    /// `ex[depth-1]` (into WB or back into the LSU for a stalled load).
    pub fn advance_execute(&mut self) {
        for k in (1..self.ex.len()).rev() {
            self.ex[k] = self.ex[k - 1].take();
        }
    }

    pub fn flush(&mut self) {
        self.rr = None;
        for slot in &mut self.ex {
            *slot = None;
        }
        self.wb = None;
    }

    /// Removes every in-flight op whose branch mask has bit `b` set.
    pub fn squash(&mut self, b: u32) {
        let bit = 1u64 << b;
        if self.rr.as_ref().is_some_and(|op| op.branch_mask & bit != 0) {
            self.rr = None;
        }
        for slot in &mut self.ex {
            if slot.as_ref().is_some_and(|op| op.branch_mask & bit != 0) {
                *slot = None;
            }
        }
        if self.wb.as_ref().is_some_and(|op| op.branch_mask & bit != 0) {
            self.wb = None;
        }
    }

    /// Clears bit `b` from every in-flight op's branch mask (a branch with
    /// this ID resolved correctly; the bit no longer marks speculation).
    pub fn clear_branch_bit(&mut self, b: u32) {
        let bit = 1u64 << b;
        if let Some(op) = self.rr.as_mut() {
            op.branch_mask &= !bit;
        }
        for slot in self.ex.iter_mut().flatten() {
            slot.branch_mask &= !bit;
        }
        if let Some(op) = self.wb.as_mut() {
            op.branch_mask &= !bit;
        }
    }
}

/// All execution lanes, indexed `0..issue_width`.
pub struct LaneFile {
    pub lanes: Vec<Lane>,
}

impl LaneFile {
    /// Builds one lane per issue slot. `depths[i]` is lane `i`'s execute
    /// depth in cycles; an empty `depths` falls back to depth 1 for every
    /// lane.
    pub fn new(issue_width: usize, depths: &[usize]) -> Self {
        let lanes = (0..issue_width)
            .map(|i| {
                let depth = depths.get(i).copied().unwrap_or(1).max(1);
                Lane::new(depth)
            })
            .collect();
        LaneFile { lanes }
    }

    pub fn flush(&mut self) {
        for lane in &mut self.lanes {
            lane.flush();
        }
    }

    pub fn squash(&mut self, b: u32) {
        for lane in &mut self.lanes {
            lane.squash(b);
        }
    }

    pub fn clear_branch_bit(&mut self, b: u32) {
        for lane in &mut self.lanes {
            lane.clear_branch_bit(b);
        }
    }
}
