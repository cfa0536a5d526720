//! # Conditional Instructions
//!
//! IFB, IFC, IFE, IFN, IFG, IFA, IFL and IFU test `b` against `a` and, when
//! the test fails, skip the next instruction. Skipping only advances PC over
//! the instruction's words; its operands are not evaluated.
//!
//! A skipped conditional keeps the chain going, so `IFE A, 1 / IFE B, 2 /
//! SET C, 3` skips both the second test and the SET when the first fails.
//!
//! Cycle timing:
//! - 2 cycles (plus next-word fetches) when the test passes
//! - +1 cycle when the test fails
//! - +1 more cycle for each further conditional skipped in the chain

use crate::cpu::{CpuState, Register};
use crate::memory::MEMORY_WORDS;
use crate::opcodes::{BasicOpcode, Instruction};

/// Evaluates a conditional opcode. True means execution continues normally.
pub(crate) fn condition(opcode: BasicOpcode, b: u16, a: u16) -> bool {
    use BasicOpcode::*;
    match opcode {
        Ifb => (b & a) != 0,
        Ifc => (b & a) == 0,
        Ife => b == a,
        Ifn => b != a,
        Ifg => b > a,
        Ifa => (b as i16) > (a as i16),
        Ifl => b < a,
        Ifu => (b as i16) < (a as i16),
        _ => true,
    }
}

/// Skips the instruction at PC, following chained conditionals. Returns the
/// penalty cycles.
///
/// The chain is bounded by the size of memory so that a memory image made of
/// nothing but conditionals cannot spin forever.
pub(crate) fn skip(cpu: &mut CpuState) -> u64 {
    let mut cycles = 1;
    let mut pc = cpu.reg(Register::Pc);
    for _ in 0..MEMORY_WORDS {
        let word = cpu.memory.read(pc);
        pc = pc.wrapping_add(Instruction::length(word));
        if !Instruction::is_conditional(word) {
            break;
        }
        cycles += 1;
    }
    cpu.set_reg(Register::Pc, pc);
    cycles
}
