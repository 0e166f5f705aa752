//! Pipeline latch structures for inter-stage communication.
//!
//! This module defines the buffers that connect the five stages of the pipeline. It implements:
//! 1. **Instruction Flow:** Structures for carrying state between Fetch, Decode, Execute, Memory, and Writeback.
//! 2. **Superscalar Support:** Multi-entry latches for wide-issue configurations.
//! 3. **Trap Propagation:** Carrying architectural exceptions and interrupts through the pipeline.

use crate::common::error::{ExceptionStage, Trap};
use crate::core::pipeline::rob::RobTag;
use crate::core::pipeline::signals::ControlSignals;

/// Entry in the IF/ID pipeline latch (Fetch to Decode stage).
///
/// Contains instruction information fetched from memory, including the raw
/// encoding and branch prediction metadata.
#[derive(Clone, Default, Debug)]
pub struct IfIdEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes (2 for compressed, 4 for standard).
    pub inst_size: u64,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Trap that occurred during fetch, if any.
    pub trap: Option<Trap>,
    /// Stage at which `trap` was detected, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Speculative global history register snapshot at fetch time, for repair on squash.
    pub ghr_snapshot: u64,
}

/// Entry in the ID/EX pipeline latch (Decode to Execute stage).
///
/// Contains decoded instruction information, including register indices,
/// immediate values, and control signals.
#[derive(Clone, Default, Debug)]
pub struct IdExEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// First source register index (rs1).
    pub rs1: usize,
    /// Second source register index (rs2).
    pub rs2: usize,
    /// Third source register index (rs3).
    pub rs3: usize,
    /// Destination register index (rd).
    pub rd: usize,
    /// Sign-extended immediate value.
    pub imm: i64,
    /// Value read from rs1 register.
    pub rv1: u64,
    /// Value read from rs2 register.
    pub rv2: u64,
    /// Value read from rs3 register.
    pub rv3: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during decode, if any.
    pub trap: Option<Trap>,
    /// Stage at which `trap` was detected, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Speculative global history register snapshot at fetch time, for repair on squash.
    pub ghr_snapshot: u64,
}

/// Entry in the Fetch1/Fetch2 pipeline latch (address translation to instruction capture).
///
/// Carries a translated fetch address and branch prediction metadata from the
/// first fetch half-stage (TLB lookup) to the second (cache read).
#[derive(Clone, Default, Debug)]
pub struct Fetch1Fetch2Entry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// Translated physical address of the instruction, if translation succeeded.
    pub paddr: u64,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Trap that occurred during address translation, if any.
    pub trap: Option<Trap>,
    /// Stage at which `trap` was detected, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Speculative global history register snapshot at fetch time, for repair on squash.
    pub ghr_snapshot: u64,
}

/// Entry in the Rename/Issue pipeline latch (Rename to Issue stage).
///
/// Carries a renamed instruction, its active-list tag, and its operand
/// sources (values or producer tags) into the out-of-order issue queue.
#[derive(Clone, Default, Debug)]
pub struct RenameIssueEntry {
    /// Active List tag identifying this instruction's reorder slot.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// First source register index (rs1).
    pub rs1: usize,
    /// Second source register index (rs2).
    pub rs2: usize,
    /// Third source register index (rs3).
    pub rs3: usize,
    /// Destination register index (rd).
    pub rd: usize,
    /// Sign-extended immediate value.
    pub imm: i64,
    /// Value read for rs1, valid only if `rs1_tag` is `None`.
    pub rv1: u64,
    /// Value read for rs2, valid only if `rs2_tag` is `None`.
    pub rv2: u64,
    /// Value read for rs3, valid only if `rs3_tag` is `None`.
    pub rv3: u64,
    /// Producer tag for rs1 if its value is not yet ready.
    pub rs1_tag: Option<RobTag>,
    /// Producer tag for rs2 if its value is not yet ready.
    pub rs2_tag: Option<RobTag>,
    /// Producer tag for rs3 if its value is not yet ready.
    pub rs3_tag: Option<RobTag>,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred upstream of issue, if any.
    pub trap: Option<Trap>,
    /// Stage at which `trap` was detected, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Speculative global history register snapshot at fetch time, for repair on squash.
    pub ghr_snapshot: u64,
}

/// Entry in the EX/MEM pipeline latch (Execute to Memory stage).
///
/// Contains execution results, including ALU outputs and memory operation parameters.
#[derive(Clone, Default, Debug)]
pub struct ExMemEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result or address for memory operations.
    pub alu: u64,
    /// Data to be stored (for store instructions).
    pub store_data: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during execute, if any.
    pub trap: Option<Trap>,
}

/// Entry in the EX/Mem1 pipeline latch (Execute to address-translation stage).
///
/// Identical in shape to [`ExMemEntry`] but additionally carries the
/// reorder/active-list tag needed once memory ordering is decoupled from
/// program-order pipeline flow (store buffer resolution, replay).
#[derive(Clone, Default, Debug)]
pub struct ExMem1Entry {
    /// Active List / ROB tag identifying this instruction's reorder slot.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result or address for memory operations.
    pub alu: u64,
    /// Data to be stored (for store instructions).
    pub store_data: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during execute, if any.
    pub trap: Option<Trap>,
    /// Stage at which `trap` was detected, if any.
    pub exception_stage: Option<ExceptionStage>,
}

/// Entry in the Mem1/Mem2 pipeline latch (address translation to cache access).
///
/// Carries the translated physical address (if any) alongside the original
/// virtual address, so Mem2 can perform store-buffer forwarding and cache
/// access without re-translating.
#[derive(Clone, Default, Debug)]
pub struct Mem1Mem2Entry {
    /// Active List / ROB tag identifying this instruction's reorder slot.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result (for non-memory instructions).
    pub alu: u64,
    /// Virtual address of the memory operand.
    pub vaddr: u64,
    /// Translated physical address of the memory operand, or zero on fault.
    pub paddr: u64,
    /// Data to be stored (for store instructions).
    pub store_data: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during address translation, if any.
    pub trap: Option<Trap>,
    /// Stage at which `trap` was detected, if any.
    pub exception_stage: Option<ExceptionStage>,
}

/// Entry in the Mem2/Writeback pipeline latch (cache access to writeback stage).
///
/// Identical in shape to [`MemWbEntry`] but additionally carries the
/// reorder/active-list tag needed to write results back through the
/// physical register file rather than directly to architectural state.
#[derive(Clone, Default, Debug)]
pub struct Mem2WbEntry {
    /// Active List / ROB tag identifying this instruction's reorder slot.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result (for non-load instructions).
    pub alu: u64,
    /// Data loaded from memory (for load instructions).
    pub load_data: u64,
    /// Control signals for the writeback stage.
    pub ctrl: ControlSignals,
    /// Trap that occurred during memory access, if any.
    pub trap: Option<Trap>,
    /// Stage at which `trap` was detected, if any.
    pub exception_stage: Option<ExceptionStage>,
}

/// Entry in the MEM/WB pipeline latch (Memory to Writeback stage).
///
/// Contains memory stage results, including loaded data and final register write values.
#[derive(Clone, Default, Debug)]
pub struct MemWbEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result (for non-load instructions).
    pub alu: u64,
    /// Data loaded from memory (for load instructions).
    pub load_data: u64,
    /// Control signals for the writeback stage.
    pub ctrl: ControlSignals,
    /// Trap that occurred during memory access, if any.
    pub trap: Option<Trap>,
}

/// IF/ID pipeline latch (Fetch to Decode stage).
///
/// Supports multiple instructions per cycle for superscalar execution.
#[derive(Clone, Debug)]
pub struct IfId {
    /// Vector of fetched instruction entries.
    pub entries: Vec<IfIdEntry>,
}

impl Default for IfId {
    /// Creates an empty IF/ID latch.
    ///
    /// # Returns
    ///
    /// A new `IfId` instance with an empty entries vector.
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

/// ID/EX pipeline latch (Decode to Execute stage).
///
/// Supports multiple instructions per cycle for superscalar execution.
#[derive(Clone, Default, Debug)]
pub struct IdEx {
    /// Vector of decoded instruction entries.
    pub entries: Vec<IdExEntry>,
}

/// EX/MEM pipeline latch (Execute to Memory stage).
///
/// Supports multiple instructions per cycle for superscalar execution.
#[derive(Clone, Default, Debug)]
pub struct ExMem {
    /// Vector of execution result entries.
    pub entries: Vec<ExMemEntry>,
}

/// MEM/WB pipeline latch (Memory to Writeback stage).
///
/// Supports multiple instructions per cycle for superscalar execution.
#[derive(Clone, Default, Debug)]
pub struct MemWb {
    /// Vector of memory stage result entries.
    pub entries: Vec<MemWbEntry>,
}
