//! # DCPU-16 Emulator Core
//!
//! A DCPU-16 (v1.7) CPU with a hardware bus and the stock peripherals,
//! designed to be embedded in a host that drives it tick by tick.
//!
//! This crate provides the processor (registers, 64K words of memory, the
//! interrupt queue and the on-fire fault), a trait-based device contract,
//! the generic clock and keyboard, the LEM1802 display, the M35FD floppy
//! drive, a boot ROM, and a snapshot format for saving and resuming.
//!
//! ## Quick Start
//!
//! ```rust
//! use dcpu16::{Dcpu16, Register};
//!
//! let mut cpu = Dcpu16::new();
//!
//! // SET A, 0x10 ; MUL A, A ; ADD PC, -1
//! cpu.load_program(&[0x7c, 0x01, 0x00, 0x10, 0x00, 0x04, 0x83, 0x82]);
//!
//! cpu.execute(100);
//! assert_eq!(cpu.register(Register::A), 0x100);
//! assert!(cpu.is_halted());
//! ```
//!
//! ## Architecture
//!
//! - **Ownership**: the CPU owns its device bus; devices see the CPU only
//!   through the [`Processor`] handle passed into each callback
//! - **Determinism**: no threads and no clocks; time enters only through
//!   the cycle budget given to `execute` and the duration given to device
//!   updates
//! - **Faults are state**: malformed instructions resolve to defined
//!   behavior and queue overflow sets the sticky on-fire flag, so a guest
//!   program can never make the emulator panic
//!
//! ## Modules
//!
//! - `cpu` - registers, interrupt handling and the execution loop
//! - `memory` - the 65536-word address space
//! - `opcodes` / `addressing` - instruction and operand encoding
//! - `devices` - the device contract, the bus and the stock peripherals
//! - `snapshot` - the CPU state snapshot format
//! - `computer` - power and tick scheduling for hosts
//! - `word` / `range` - machine word and numeric range helpers

pub mod addressing;
pub mod computer;
pub mod cpu;
pub mod devices;
pub mod error;
pub mod memory;
pub mod opcodes;
pub mod range;
pub mod snapshot;
pub mod word;

// Internal instruction implementations (not part of public API)
mod instructions;
pub(crate) mod io;

// Re-export public API
pub use addressing::{Operand, OperandSlot};
pub use computer::{Computer, ComputerConfig, PowerState, TickReport};
pub use cpu::{CpuState, Dcpu16, Register, HALT_INSTRUCTION, MAX_QUEUED_INTERRUPTS};
pub use devices::{Device, DeviceBus, HardwareInfo, Processor};
pub use error::{BusError, MediaError, RangeError, StateError};
pub use memory::{Memory, MEMORY_WORDS};
pub use opcodes::{BasicOpcode, Instruction, SpecialOpcode};
pub use range::Range;
pub use snapshot::Snapshot;
