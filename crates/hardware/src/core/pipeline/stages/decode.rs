//! Instruction Decode (ID) Stage.
//!
//! This module implements the second stage of the pipeline. It performs the following:
//! 1. **Decoding:** Converts raw 32-bit instruction bits into control signals using the ISA decoder.
//! 2. **Hazard Detection:** Checks for intra-bundle dependencies (in superscalar configurations).
//! 3. **Register Read:** Reads source operands (rs1, rs2, rs3) from the Register File.
//! 4. **Control Generation:** Generates ALU, Memory, and CSR control signals for the Execute stage.

use crate::core::Cpu;
use crate::core::pipeline::latches::IdExEntry;
use crate::core::pipeline::signals::ControlSignals;
use crate::isa::decode::decode as instruction_decode;
use crate::isa::instruction::InstructionBits;

/// ADDI x0, x0, 0 instruction encoding (canonical NOP).
///
/// This instruction performs no operation and is used to flush pipeline stages.
const INSTRUCTION_NOP: u32 = 0x0000_0013;

/// Zero instruction encoding (invalid instruction used as NOP).
///
/// Treated as a no-op when decoded; used to pad or flush the pipeline.
const INSTRUCTION_ZERO: u32 = 0;

/// Executes the instruction decode stage.
///
/// This function processes instructions from the IF/ID latch. It decodes the raw instruction
/// bits into control signals, reads source operands from the register file (handling
/// intra-bundle hazards if superscalar), and pushes the result to the ID/EX latch.
///
/// # Arguments
///
/// * `cpu` - Mutable reference to the CPU state.
pub fn decode_stage(cpu: &mut Cpu) {
    let mut if_entries = std::mem::take(&mut cpu.if_id.entries);

    let mut id_ex_entries = std::mem::take(&mut cpu.id_ex_shadow);
    id_ex_entries.clear();

    let mut consumed_count = 0;
    let mut bundle_writes: Vec<(usize, bool)> = Vec::with_capacity(cpu.pipeline_width);

    for if_entry in &if_entries {
        if let Some(trap) = &if_entry.trap {
            id_ex_entries.push(IdExEntry {
                pc: if_entry.pc,
                inst: if_entry.inst,
                inst_size: if_entry.inst_size,
                trap: Some(trap.clone()),
                ..Default::default()
            });
            consumed_count += 1;
            continue;
        }

        let inst = if_entry.inst;

        if inst == INSTRUCTION_NOP || inst == INSTRUCTION_ZERO {
            consumed_count += 1;
            continue;
        }

        let d = instruction_decode(inst);

        let (ctrl, trap) = match crate::core::pipeline::decode_common::decode_control(
            &d,
            inst,
            if_entry.pc,
        ) {
            Ok(c) => (c, None),
            Err(t) => (ControlSignals::default(), Some(t)),
        };

        let mut hazard = false;
        if d.rs1 != 0 || ctrl.rs1_fp {
            if bundle_writes.contains(&(d.rs1, ctrl.rs1_fp)) {
                hazard = true;
            }
        }
        if d.rs2 != 0 || ctrl.rs2_fp {
            if bundle_writes.contains(&(d.rs2, ctrl.rs2_fp)) {
                hazard = true;
            }
        }
        let rs3_idx = inst.rs3();
        if ctrl.rs3_fp {
            if bundle_writes.contains(&(rs3_idx, true)) {
                hazard = true;
            }
        }

        if hazard {
            break;
        }

        if ctrl.reg_write && d.rd != 0 {
            bundle_writes.push((d.rd, false));
        }
        if ctrl.fp_reg_write {
            bundle_writes.push((d.rd, true));
        }

        let rv1 = if ctrl.rs1_fp {
            cpu.regs.read_f(d.rs1)
        } else {
            cpu.regs.read(d.rs1)
        };
        let rv2 = if ctrl.rs2_fp {
            cpu.regs.read_f(d.rs2)
        } else {
            cpu.regs.read(d.rs2)
        };
        let rv3 = if ctrl.rs3_fp {
            cpu.regs.read_f(rs3_idx)
        } else {
            0
        };

        id_ex_entries.push(IdExEntry {
            pc: if_entry.pc,
            inst,
            inst_size: if_entry.inst_size,
            rs1: d.rs1,
            rs2: d.rs2,
            rs3: rs3_idx,
            rd: d.rd,
            imm: d.imm,
            rv1,
            rv2,
            rv3,
            ctrl,
            exception_stage: trap.as_ref().map(|_| crate::common::error::ExceptionStage::Decode),
            trap,
            pred_taken: if_entry.pred_taken,
            pred_target: if_entry.pred_target,
            ghr_snapshot: 0,
        });

        consumed_count += 1;
    }

    if consumed_count < if_entries.len() {
        let remaining = if_entries.split_off(consumed_count);
        cpu.if_id.entries = remaining;
    }

    cpu.id_ex.entries = id_ex_entries;
    cpu.if_id_shadow = if_entries;
}
