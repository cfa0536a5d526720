//! # Hardware Instructions
//!
//! - HWN: number of bus slots (disconnected slots included)
//! - HWQ: identity of a hardware id, spread over A, B, C, X and Y
//! - HWI: dispatch to a device's interrupt handler

use super::Location;
use crate::cpu::{CpuState, Register};
use crate::devices::DeviceBus;
use crate::opcodes::SpecialOpcode;

/// Executes a hardware instruction. Returns the extra cycles reported by the
/// device for HWI, zero otherwise.
pub(crate) fn execute(
    cpu: &mut CpuState,
    bus: &mut DeviceBus,
    opcode: SpecialOpcode,
    a: Location,
) -> u64 {
    match opcode {
        SpecialOpcode::Hwn => {
            cpu.store(a, bus.len() as u16);
            0
        }
        SpecialOpcode::Hwq => {
            let info = bus.query(cpu.load(a));
            cpu.set_reg(Register::A, info.device_id as u16);
            cpu.set_reg(Register::B, (info.device_id >> 16) as u16);
            cpu.set_reg(Register::C, info.version);
            cpu.set_reg(Register::X, info.manufacturer_id as u16);
            cpu.set_reg(Register::Y, (info.manufacturer_id >> 16) as u16);
            0
        }
        SpecialOpcode::Hwi => {
            let hardware_id = cpu.load(a);
            bus.interrupt(hardware_id, cpu)
        }
        _ => 0,
    }
}
