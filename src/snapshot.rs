//! CPU state snapshots.
//!
//! A snapshot captures everything a running program can observe (registers,
//! memory, the interrupt queue and both flags) so that execution resumes
//! bit-for-bit where it stopped. Device state is not included; each device
//! owns its own persistence.
//!
//! ## Binary Format
//!
//! All integers are little-endian:
//! - 4 bytes: magic `0xdbb0cae0`
//! - 4 bytes: version (1)
//! - 24 bytes: registers A, B, C, X, Y, Z, I, J, PC, SP, EX, IA
//! - 131072 bytes: memory, 65536 words
//! - 1 byte: on-fire flag
//! - 1 byte: queue-enabled flag
//! - 4 bytes: queue length (signed, 0 to 256)
//! - 2 bytes per queued message, oldest first
//!
//! ## Usage
//!
//! ```rust
//! use dcpu16::{Dcpu16, Register};
//!
//! let mut cpu = Dcpu16::new();
//! cpu.set_register(Register::X, 0x1234);
//! let bytes = cpu.save_state();
//!
//! let mut restored = Dcpu16::new();
//! restored.load_state(&bytes).unwrap();
//! assert_eq!(restored.register(Register::X), 0x1234);
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::cpu::{CpuState, Dcpu16, Register, MAX_QUEUED_INTERRUPTS};
use crate::error::StateError;
use crate::io::{ReadLeExt, WriteLeExt};
use crate::memory::{Memory, MEMORY_WORDS};

pub const SNAPSHOT_MAGIC: u32 = 0xdbb0_cae0;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const FORMAT: &str = "DCPU-16 snapshot";

/// Size of a snapshot with an empty interrupt queue.
pub const BASE_SIZE: usize = 4 + 4 + 2 * Register::ALL.len() + 2 * MEMORY_WORDS + 1 + 1 + 4;

/// A decoded snapshot, detached from any CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub registers: [u16; 12],
    pub memory: Memory,
    pub on_fire: bool,
    pub queue_enabled: bool,
    pub interrupt_queue: VecDeque<u16>,
}

impl Snapshot {
    pub fn capture(state: &CpuState) -> Self {
        Self {
            registers: state.registers,
            memory: state.memory.clone(),
            on_fire: state.on_fire,
            queue_enabled: state.queue_enabled,
            interrupt_queue: state.interrupt_queue.clone(),
        }
    }

    /// Replaces every observable field of `state`.
    pub fn restore(self, state: &mut CpuState) {
        state.registers = self.registers;
        state.memory = self.memory;
        state.on_fire = self.on_fire;
        state.queue_enabled = self.queue_enabled;
        state.interrupt_queue = self.interrupt_queue;
        state.wake_requested = false;
        state.in_instruction = false;
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.put_u32_le(SNAPSHOT_MAGIC);
        out.put_u32_le(SNAPSHOT_VERSION);
        out.put_words_le(&self.registers);
        out.put_words_le(self.memory.as_slice());
        out.put_bool(self.on_fire);
        out.put_bool(self.queue_enabled);
        out.put_i32_le(self.interrupt_queue.len() as i32);
        for &message in &self.interrupt_queue {
            out.put_u16_le(message);
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StateError> {
        let mut reader = bytes;

        let magic = reader.read_u32_le().map_err(StateError::io(FORMAT))?;
        if magic != SNAPSHOT_MAGIC {
            return Err(StateError::InvalidMagic {
                format: FORMAT,
                expected: SNAPSHOT_MAGIC,
                found: magic,
            });
        }
        let version = reader.read_u32_le().map_err(StateError::io(FORMAT))?;
        if version != SNAPSHOT_VERSION {
            return Err(StateError::UnsupportedVersion {
                format: FORMAT,
                expected: SNAPSHOT_VERSION,
                found: version,
            });
        }

        let mut registers = [0u16; 12];
        reader
            .read_words_le(&mut registers)
            .map_err(StateError::io(FORMAT))?;

        let mut memory = Memory::new();
        reader
            .read_words_le(memory.as_mut_slice())
            .map_err(StateError::io(FORMAT))?;

        let on_fire = reader.read_bool().map_err(StateError::io(FORMAT))?;
        let queue_enabled = reader.read_bool().map_err(StateError::io(FORMAT))?;

        let queue_len = reader.read_i32_le().map_err(StateError::io(FORMAT))?;
        let queue_len = usize::try_from(queue_len)
            .ok()
            .filter(|&len| len <= MAX_QUEUED_INTERRUPTS)
            .ok_or(StateError::Corrupt {
                format: FORMAT,
                reason: "interrupt queue length out of range",
            })?;
        let mut interrupt_queue = VecDeque::with_capacity(MAX_QUEUED_INTERRUPTS);
        for _ in 0..queue_len {
            interrupt_queue.push_back(reader.read_u16_le().map_err(StateError::io(FORMAT))?);
        }

        if !reader.is_empty() {
            return Err(StateError::Corrupt {
                format: FORMAT,
                reason: "trailing bytes",
            });
        }

        Ok(Self {
            registers,
            memory,
            on_fire,
            queue_enabled,
            interrupt_queue,
        })
    }

    pub fn encoded_len(&self) -> usize {
        BASE_SIZE + 2 * self.interrupt_queue.len()
    }
}

impl Dcpu16 {
    /// Serializes the CPU state.
    pub fn save_state(&self) -> Vec<u8> {
        Snapshot::capture(&self.state).encode()
    }

    /// Replaces the CPU state with a decoded snapshot.
    ///
    /// The snapshot is decoded in full first; on error the CPU is untouched.
    /// The cycle counter and the device bus are not part of a snapshot.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        let snapshot = Snapshot::decode(bytes)?;
        debug!(
            pc = snapshot.registers[Register::Pc.index()],
            queued = snapshot.interrupt_queue.len(),
            "snapshot loaded"
        );
        snapshot.restore(&mut self.state);
        Ok(())
    }
}
