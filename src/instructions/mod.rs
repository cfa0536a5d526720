//! # DCPU-16 Instruction Implementations
//!
//! Instructions are decoded by [`crate::opcodes`] and executed here, grouped
//! by category:
//!
//! - **alu**: arithmetic and bitwise operations and their EX side results
//! - **branches**: the IFx conditionals and instruction skipping
//! - **control**: SET, STI/STD, JSR and the interrupt instructions
//! - **hardware**: HWN, HWQ and HWI
//!
//! Operands are resolved to a [`Location`] before an instruction runs, with
//! `a` resolved before `b` so that stack side effects happen in ISA order.

pub(crate) mod alu;
pub(crate) mod branches;
pub(crate) mod control;
pub(crate) mod hardware;

use tracing::trace;

use crate::addressing::{Operand, OperandSlot};
use crate::cpu::{CpuState, Register};
use crate::devices::DeviceBus;
use crate::opcodes::{BasicOpcode, Instruction, SpecialOpcode};

/// Where an operand reads from and writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    Register(Register),
    Memory(u16),
    /// Reads yield the value, writes are discarded.
    Literal(u16),
}

impl CpuState {
    /// Turns an operand into a location, applying PUSH/POP stack pointer
    /// adjustments.
    pub(crate) fn resolve(&mut self, operand: Operand, slot: OperandSlot) -> Location {
        match operand {
            Operand::Register(r) => Location::Register(r),
            Operand::Indirect(r) => Location::Memory(self.reg(r)),
            Operand::IndirectOffset(r, offset) => Location::Memory(self.reg(r).wrapping_add(offset)),
            Operand::PushPop => {
                let sp = self.reg(Register::Sp);
                match slot {
                    OperandSlot::A => {
                        self.set_reg(Register::Sp, sp.wrapping_add(1));
                        Location::Memory(sp)
                    }
                    OperandSlot::B => {
                        let sp = sp.wrapping_sub(1);
                        self.set_reg(Register::Sp, sp);
                        Location::Memory(sp)
                    }
                }
            }
            Operand::Peek => Location::Memory(self.reg(Register::Sp)),
            Operand::Pick(n) => Location::Memory(self.reg(Register::Sp).wrapping_add(n)),
            Operand::IndirectNextWord(addr) => Location::Memory(addr),
            Operand::NextWord(v) | Operand::Literal(v) => Location::Literal(v),
        }
    }

    pub(crate) fn load(&self, location: Location) -> u16 {
        match location {
            Location::Register(r) => self.reg(r),
            Location::Memory(addr) => self.memory.read(addr),
            Location::Literal(v) => v,
        }
    }

    pub(crate) fn store(&mut self, location: Location, value: u16) {
        match location {
            Location::Register(r) => self.set_reg(r, value),
            Location::Memory(addr) => self.memory.write(addr, value),
            Location::Literal(_) => {}
        }
    }
}

/// Fetches, decodes and executes one instruction. Returns its cycle cost.
pub(crate) fn execute(cpu: &mut CpuState, bus: &mut DeviceBus) -> u64 {
    let pc = cpu.reg(Register::Pc);
    let word = cpu.fetch();
    let instruction = Instruction::decode(word, &mut || cpu.fetch());
    trace!(pc, %instruction, "execute");

    match instruction {
        Instruction::Basic { opcode, b, a } => execute_basic(cpu, opcode, b, a),
        Instruction::Special { opcode, a } => execute_special(cpu, bus, opcode, a),
        Instruction::Reserved { .. } => crate::opcodes::RESERVED_CYCLES,
    }
}

fn execute_basic(cpu: &mut CpuState, opcode: BasicOpcode, b: Operand, a: Operand) -> u64 {
    use BasicOpcode::*;

    let cycles = opcode.base_cycles() + a.extra_cycles() + b.extra_cycles();
    let a_location = cpu.resolve(a, OperandSlot::A);
    let a_value = cpu.load(a_location);
    let b_location = cpu.resolve(b, OperandSlot::B);

    match opcode {
        Set => {
            cpu.store(b_location, a_value);
            cycles
        }
        Sti | Std => {
            control::execute_transfer(cpu, opcode, b_location, a_value);
            cycles
        }
        Ifb | Ifc | Ife | Ifn | Ifg | Ifa | Ifl | Ifu => {
            let b_value = cpu.load(b_location);
            if branches::condition(opcode, b_value, a_value) {
                cycles
            } else {
                cycles + branches::skip(cpu)
            }
        }
        _ => {
            let b_value = cpu.load(b_location);
            let ex = cpu.reg(Register::Ex);
            let result = alu::evaluate(opcode, b_value, a_value, ex);
            cpu.store(b_location, result.value);
            if let Some(ex) = result.ex {
                cpu.set_reg(Register::Ex, ex);
            }
            cycles
        }
    }
}

fn execute_special(
    cpu: &mut CpuState,
    bus: &mut DeviceBus,
    opcode: SpecialOpcode,
    a: Operand,
) -> u64 {
    use SpecialOpcode::*;

    let cycles = opcode.base_cycles() + a.extra_cycles();
    let a_location = cpu.resolve(a, OperandSlot::A);

    match opcode {
        Jsr | Int | Iag | Ias | Rfi | Iaq => {
            control::execute_special(cpu, opcode, a_location);
            cycles
        }
        Hwn | Hwq | Hwi => cycles + hardware::execute(cpu, bus, opcode, a_location),
    }
}
