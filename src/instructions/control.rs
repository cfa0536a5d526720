//! # Control Flow and Interrupt Instructions
//!
//! - STI, STD: SET followed by incrementing/decrementing I and J
//! - JSR: push the return address and jump
//! - INT: raise a software interrupt
//! - IAG, IAS: read and write IA
//! - RFI: return from an interrupt handler
//! - IAQ: turn interrupt queueing on or off

use super::Location;
use crate::cpu::{CpuState, Register};
use crate::opcodes::{BasicOpcode, SpecialOpcode};

pub(crate) fn execute_transfer(cpu: &mut CpuState, opcode: BasicOpcode, b: Location, a: u16) {
    cpu.store(b, a);
    let step = |r: u16| match opcode {
        BasicOpcode::Std => r.wrapping_sub(1),
        _ => r.wrapping_add(1),
    };
    let i = step(cpu.reg(Register::I));
    let j = step(cpu.reg(Register::J));
    cpu.set_reg(Register::I, i);
    cpu.set_reg(Register::J, j);
}

pub(crate) fn execute_special(cpu: &mut CpuState, opcode: SpecialOpcode, a: Location) {
    match opcode {
        SpecialOpcode::Jsr => {
            let target = cpu.load(a);
            let ret = cpu.reg(Register::Pc);
            cpu.push(ret);
            cpu.set_reg(Register::Pc, target);
        }
        // Mid-instruction, so this always lands in the queue and is
        // delivered at the next boundary.
        SpecialOpcode::Int => {
            let message = cpu.load(a);
            cpu.interrupt(message);
        }
        SpecialOpcode::Iag => {
            let ia = cpu.reg(Register::Ia);
            cpu.store(a, ia);
        }
        SpecialOpcode::Ias => {
            let ia = cpu.load(a);
            cpu.set_reg(Register::Ia, ia);
        }
        SpecialOpcode::Rfi => {
            cpu.queue_enabled = false;
            let a_reg = cpu.pop();
            cpu.set_reg(Register::A, a_reg);
            let pc = cpu.pop();
            cpu.set_reg(Register::Pc, pc);
        }
        SpecialOpcode::Iaq => {
            cpu.queue_enabled = cpu.load(a) != 0;
        }
        SpecialOpcode::Hwn | SpecialOpcode::Hwq | SpecialOpcode::Hwi => {}
    }
}
