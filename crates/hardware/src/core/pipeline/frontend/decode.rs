//! Decode Stage: ISA decode to control signals (shared across backends).
//!
//! Unlike the legacy in-order decode stage, this stage does not read register
//! operands: the out-of-order renamer has not yet assigned producer tags, so
//! operand values are read later, at issue. This stage only turns raw
//! instruction bits into [`ControlSignals`] and carries register *indices*
//! forward for the rename stage to resolve.

use crate::core::Cpu;
use crate::core::pipeline::decode_common::decode_control;
use crate::core::pipeline::latches::{IdExEntry, IfIdEntry};
use crate::core::pipeline::signals::ControlSignals;
use crate::isa::decode::decode as instruction_decode;
use crate::isa::instruction::InstructionBits;

/// ADDI x0, x0, 0 instruction encoding (canonical NOP).
const INSTRUCTION_NOP: u32 = 0x0000_0013;

/// Zero instruction encoding, also treated as a NOP.
const INSTRUCTION_ZERO: u32 = 0;

/// Executes the decode stage: ISA decode into control signals.
///
/// Consumes Fetch2->Decode entries and produces Decode->Rename entries.
pub fn decode_stage(cpu: &mut Cpu, input: &mut Vec<IfIdEntry>, output: &mut Vec<IdExEntry>) {
    let entries = std::mem::take(input);
    output.clear();

    for if_entry in entries {
        if let Some(ref trap) = if_entry.trap {
            if cpu.trace {
                eprintln!("DE  pc={:#x} # TRAP: {:?}", if_entry.pc, trap);
            }
            output.push(IdExEntry {
                pc: if_entry.pc,
                inst: if_entry.inst,
                inst_size: if_entry.inst_size,
                trap: if_entry.trap,
                exception_stage: if_entry.exception_stage,
                pred_taken: if_entry.pred_taken,
                pred_target: if_entry.pred_target,
                ghr_snapshot: if_entry.ghr_snapshot,
                ..Default::default()
            });
            continue;
        }

        let inst = if_entry.inst;

        if inst == INSTRUCTION_NOP || inst == INSTRUCTION_ZERO {
            continue;
        }

        let d = instruction_decode(inst);
        let (ctrl, trap) = match decode_control(&d, inst, if_entry.pc) {
            Ok(c) => (c, None),
            Err(t) => (ControlSignals::default(), Some(t)),
        };
        let rs3_idx = inst.rs3();

        if cpu.trace {
            eprintln!("DE  pc={:#x} inst={:#010x}", if_entry.pc, inst);
        }

        output.push(IdExEntry {
            pc: if_entry.pc,
            inst,
            inst_size: if_entry.inst_size,
            rs1: d.rs1,
            rs2: d.rs2,
            rs3: rs3_idx,
            rd: d.rd,
            imm: d.imm,
            rv1: 0,
            rv2: 0,
            rv3: 0,
            ctrl,
            trap: trap.clone(),
            exception_stage: trap
                .as_ref()
                .map(|_| crate::common::error::ExceptionStage::Decode),
            pred_taken: if_entry.pred_taken,
            pred_target: if_entry.pred_target,
            ghr_snapshot: if_entry.ghr_snapshot,
        });
    }
}
