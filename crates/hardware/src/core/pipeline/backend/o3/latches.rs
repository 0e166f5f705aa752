//! Pipeline latches specific to the out-of-order backend.
//!
//! The frontend (Fetch1/Fetch2/Decode) reuses the shared
//! [`crate::core::pipeline::latches::IdExEntry`] latch type, same as the
//! in-order backend. From there, the renamed architecture diverges: instead
//! of `RenameIssueEntry` (which carries a single ROB tag and reads operands
//! at issue time against a concrete `Rob`/`Scoreboard`), O3 carries its own
//! per-instruction record through Rename2 -> Dispatch -> the issue queue.

use crate::core::pipeline::backend::o3::renamer::{ActiveListIndex, BranchId};
use crate::core::pipeline::latches::IdExEntry;
use crate::core::pipeline::signals::ControlSignals;
use crate::common::error::{ExceptionStage, Trap};

/// One instruction after Rename1/Rename2, carrying physical source/dest
/// register numbers instead of architectural ones.
#[derive(Clone, Debug)]
pub struct RenamedInst {
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

    /// Logical (architectural) source/dest register numbers, preserved for
    /// the Active List's record and for the functional oracle hook.
    pub logical_rs1: u8,
    pub logical_rs2: u8,
    pub logical_rs3: u8,
    pub logical_rd: u8,

    /// Renamed physical register numbers. Always valid even when the
    /// corresponding logical register is unused by this instruction (the
    /// issue queue only reads the ones `ctrl` says it needs).
    pub phys_rs1: u32,
    pub phys_rs2: u32,
    pub phys_rs3: u32,
    pub phys_rd: u32,
    pub dest_valid: bool,

    /// Global branch mask captured at Rename2, before this instruction's own
    /// checkpoint (if any) is taken. Records which in-flight branches this
    /// instruction is control-dependent on.
    pub branch_mask: u64,

    /// Checkpoint id allocated at Rename2 if this instruction is a branch.
    pub branch_id: Option<BranchId>,

    /// Active List slot this instruction occupies, assigned at dispatch.
    pub al_index: ActiveListIndex,
}

/// Rename1 -> Rename2 latch: a full bundle of decoded instructions that have
/// had their Active List slot and branch checkpoint reserved (stall counted)
/// but not yet renamed against the RMT. Rename operates on whole bundles:
/// either every instruction in the bundle renames this cycle, or none do.
#[derive(Clone, Debug, Default)]
pub struct RenameBundle {
    pub insts: Vec<IdExEntry>,
}

/// Rename2 -> Dispatch latch: the renamed bundle, ready for lane steering
/// and issue-queue/LSU allocation.
#[derive(Clone, Debug, Default)]
pub struct DispatchBundle {
    pub insts: Vec<RenamedInst>,
}
