//! # CPU State and Execution
//!
//! This module contains the DCPU-16 processor: its register file, memory,
//! interrupt queue and the fetch-decode-execute loop, plus the device bus it
//! dispatches hardware interrupts to.
//!
//! ## CPU State
//!
//! The CPU maintains:
//! - **Registers**: A, B, C, X, Y, Z, I, J, PC, SP, EX and IA (all `u16`)
//! - **Memory**: 65536 words, addressed modulo 65536
//! - **Interrupt queue**: up to 256 pending messages, FIFO
//! - **Flags**: queue-enabled and the sticky on-fire fault
//! - **Cycle counter**: `u64` monotonically increasing cycle count
//!
//! ## Execution Model
//!
//! - `step()`: execute one instruction, then dispatch one queued interrupt
//!   if queueing is off
//! - `execute()`: execute whole instructions until a cycle budget is spent
//!
//! Interrupts raised while an instruction is running (by INT, or by a device
//! during HWI) are always queued and delivered at the next instruction
//! boundary.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::devices::{Device, DeviceBus, HardwareInfo, Processor};
use crate::error::BusError;
use crate::instructions;
use crate::memory::Memory;
use crate::opcodes::Instruction;
use crate::word;

/// Encoding of `ADD PC, -1`, the conventional "halt" loop.
pub const HALT_INSTRUCTION: u16 = 0x8382;

/// Pending interrupts the queue holds before the CPU catches fire.
pub const MAX_QUEUED_INTERRUPTS: usize = 256;

/// The twelve DCPU-16 registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    B,
    C,
    X,
    Y,
    Z,
    I,
    J,
    Pc,
    Sp,
    Ex,
    Ia,
}

impl Register {
    /// All registers, in snapshot order.
    pub const ALL: [Register; 12] = [
        Register::A,
        Register::B,
        Register::C,
        Register::X,
        Register::Y,
        Register::Z,
        Register::I,
        Register::J,
        Register::Pc,
        Register::Sp,
        Register::Ex,
        Register::Ia,
    ];

    /// The general purpose registers, in operand-code order.
    pub const GENERAL: [Register; 8] = [
        Register::A,
        Register::B,
        Register::C,
        Register::X,
        Register::Y,
        Register::Z,
        Register::I,
        Register::J,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_general(self) -> bool {
        (self as usize) < 8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::X => "X",
            Register::Y => "Y",
            Register::Z => "Z",
            Register::I => "I",
            Register::J => "J",
            Register::Pc => "PC",
            Register::Sp => "SP",
            Register::Ex => "EX",
            Register::Ia => "IA",
        }
    }
}

/// Everything a program and its devices can observe: registers, memory,
/// the interrupt queue and the two flags.
///
/// Devices reach this through the [`Processor`] trait while the CPU keeps
/// ownership of the bus, which is what lets HWI hand a device mutable
/// access to the CPU without a reference cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuState {
    pub(crate) registers: [u16; 12],
    pub(crate) memory: Memory,
    pub(crate) interrupt_queue: VecDeque<u16>,
    pub(crate) queue_enabled: bool,
    pub(crate) on_fire: bool,
    /// Set by any interrupt request, cleared when `execute` starts.
    pub(crate) wake_requested: bool,
    /// True while an instruction is executing.
    pub(crate) in_instruction: bool,
}

impl CpuState {
    pub fn new() -> Self {
        Self {
            registers: [0; 12],
            memory: Memory::new(),
            interrupt_queue: VecDeque::with_capacity(MAX_QUEUED_INTERRUPTS),
            queue_enabled: false,
            on_fire: false,
            wake_requested: false,
            in_instruction: false,
        }
    }

    #[inline]
    pub fn reg(&self, register: Register) -> u16 {
        self.registers[register.index()]
    }

    #[inline]
    pub fn set_reg(&mut self, register: Register, value: u16) {
        self.registers[register.index()] = value;
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn is_queue_enabled(&self) -> bool {
        self.queue_enabled
    }

    pub fn is_on_fire(&self) -> bool {
        self.on_fire
    }

    /// Pending interrupt messages, oldest first.
    pub fn interrupt_queue(&self) -> impl ExactSizeIterator<Item = u16> + '_ {
        self.interrupt_queue.iter().copied()
    }

    /// Reads the word at PC and advances PC.
    pub(crate) fn fetch(&mut self) -> u16 {
        let pc = self.reg(Register::Pc);
        self.set_reg(Register::Pc, pc.wrapping_add(1));
        self.memory.read(pc)
    }

    pub(crate) fn push(&mut self, value: u16) {
        let sp = self.reg(Register::Sp).wrapping_sub(1);
        self.set_reg(Register::Sp, sp);
        self.memory.write(sp, value);
    }

    pub(crate) fn pop(&mut self) -> u16 {
        let sp = self.reg(Register::Sp);
        self.set_reg(Register::Sp, sp.wrapping_add(1));
        self.memory.read(sp)
    }

    /// Requests delivery of an interrupt.
    ///
    /// With IA zero the message is discarded. Otherwise it is delivered
    /// immediately when queueing is off and no instruction is running, and
    /// queued in every other case.
    pub fn interrupt(&mut self, message: u16) {
        self.wake_requested = true;
        if self.reg(Register::Ia) == 0 {
            trace!(message, "interrupt discarded, IA is zero");
            return;
        }
        if self.queue_enabled || self.in_instruction {
            self.enqueue(message);
        } else {
            self.deliver(message);
        }
    }

    fn enqueue(&mut self, message: u16) {
        if self.interrupt_queue.len() >= MAX_QUEUED_INTERRUPTS {
            if !self.on_fire {
                warn!(
                    message,
                    pc = self.reg(Register::Pc),
                    "interrupt queue overflow, DCPU-16 is on fire"
                );
            }
            self.on_fire = true;
            return;
        }
        self.interrupt_queue.push_back(message);
    }

    /// Enters the interrupt handler: push PC, push A, jump to IA.
    fn deliver(&mut self, message: u16) {
        let ia = self.reg(Register::Ia);
        if ia == 0 {
            return;
        }
        let pc = self.reg(Register::Pc);
        let a = self.reg(Register::A);
        self.push(pc);
        self.push(a);
        self.set_reg(Register::Pc, ia);
        self.set_reg(Register::A, message);
        self.queue_enabled = true;
        trace!(message, ia, "interrupt delivered");
    }

    /// Delivers the oldest queued interrupt if queueing is off.
    pub(crate) fn dispatch_queued_interrupt(&mut self) {
        if self.queue_enabled {
            return;
        }
        if let Some(message) = self.interrupt_queue.pop_front() {
            self.deliver(message);
        }
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for CpuState {
    fn register(&self, register: Register) -> u16 {
        self.reg(register)
    }

    fn set_register(&mut self, register: Register, value: u16) {
        self.set_reg(register, value);
    }

    fn memory(&self) -> &Memory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    fn interrupt(&mut self, message: u16) {
        CpuState::interrupt(self, message);
    }
}

/// A DCPU-16 with its device bus.
///
/// # Examples
///
/// ```
/// use dcpu16::{Dcpu16, Register};
///
/// let mut cpu = Dcpu16::new();
///
/// // SET A, 0x30 ; ADD A, 2 ; ADD PC, -1
/// cpu.load_program(&[0x7c, 0x01, 0x00, 0x30, 0x8c, 0x02, 0x83, 0x82]);
///
/// let consumed = cpu.execute(4);
/// assert_eq!(consumed, 4);
/// assert_eq!(cpu.register(Register::A), 0x32);
/// assert!(cpu.is_halted());
/// ```
#[derive(Debug)]
pub struct Dcpu16 {
    pub(crate) state: CpuState,
    pub(crate) bus: DeviceBus,
    pub(crate) cycles: u64,
}

impl Dcpu16 {
    /// Creates a powered-on CPU with zeroed registers and memory and an
    /// empty bus.
    pub fn new() -> Self {
        Self {
            state: CpuState::new(),
            bus: DeviceBus::new(),
            cycles: 0,
        }
    }

    /// Copies a big-endian program image into memory at address 0.
    pub fn load_program(&mut self, image: &[u8]) {
        let words = word::words_from_be_bytes(image);
        self.state.memory.load(0, &words);
        debug!(words = words.len(), "program image loaded");
    }

    /// Executes one instruction and returns the cycles it cost.
    ///
    /// Always at least one cycle. After the instruction, one queued
    /// interrupt is delivered if queueing is disabled.
    pub fn step(&mut self) -> u64 {
        self.state.in_instruction = true;
        let cycles = instructions::execute(&mut self.state, &mut self.bus);
        self.state.in_instruction = false;
        self.cycles += cycles;
        self.state.dispatch_queued_interrupt();
        cycles
    }

    /// Runs whole instructions until at least `budget` cycles are spent.
    ///
    /// Returns the cycles actually consumed, which overshoots `budget` by
    /// less than one instruction's cost. A zero budget executes nothing.
    pub fn execute(&mut self, budget: u64) -> u64 {
        if budget == 0 {
            return 0;
        }
        self.state.wake_requested = false;
        let mut consumed = 0;
        while consumed < budget {
            consumed += self.step();
        }
        consumed
    }

    /// Requests an interrupt from the host side.
    pub fn interrupt(&mut self, message: u16) {
        self.state.interrupt(message);
    }

    /// True when the instruction at PC is `ADD PC, -1`.
    pub fn is_halted(&self) -> bool {
        self.state.memory.read(self.state.reg(Register::Pc)) == HALT_INSTRUCTION
    }

    /// True when halted and an interrupt has been requested since the last
    /// `execute` call.
    ///
    /// Every request counts, including one discarded because IA is zero. A
    /// host that runs on this signal then spends one tick spinning on the
    /// halt loop before the flag clears.
    pub fn is_pending_wake_up(&self) -> bool {
        self.is_halted() && self.state.wake_requested
    }

    pub fn is_on_fire(&self) -> bool {
        self.state.on_fire
    }

    pub fn is_queue_enabled(&self) -> bool {
        self.state.queue_enabled
    }

    /// Total cycles executed since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn register(&self, register: Register) -> u16 {
        self.state.reg(register)
    }

    pub fn set_register(&mut self, register: Register, value: u16) {
        self.state.set_reg(register, value);
    }

    pub fn memory(&self) -> &Memory {
        &self.state.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.state.memory
    }

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    /// Attaches a device and returns its hardware id.
    pub fn connect(&mut self, device: Box<dyn Device>) -> Result<u16, BusError> {
        self.bus.connect(device, &mut self.state)
    }

    /// Detaches the device at `hardware_id`, leaving a placeholder slot.
    ///
    /// Returns `None` if the slot is out of range or already empty.
    pub fn disconnect(&mut self, hardware_id: u16) -> Option<Box<dyn Device>> {
        self.bus.disconnect(hardware_id)
    }

    /// Detaches every device in bus order, leaving the bus empty.
    pub fn disconnect_all(&mut self) -> Vec<Box<dyn Device>> {
        self.bus.disconnect_all()
    }

    /// Number of bus slots, including disconnected ones.
    pub fn device_count(&self) -> usize {
        self.bus.len()
    }

    /// Identity reported to HWQ for `hardware_id`.
    pub fn hardware_info(&self, hardware_id: u16) -> HardwareInfo {
        self.bus.query(hardware_id)
    }

    /// Borrows the device at `hardware_id` as a `T`.
    pub fn device<T: Device>(&self, hardware_id: u16) -> Option<&T> {
        self.bus.get(hardware_id)?.as_any().downcast_ref::<T>()
    }

    /// Runs `f` with the device at `hardware_id` and a handle to this CPU.
    ///
    /// This is how hosts feed devices (key presses, disk swaps) so that any
    /// interrupt the device raises goes through the normal path. Returns
    /// `None` if the slot is empty or holds a different device type.
    pub fn with_device<T: Device, R>(
        &mut self,
        hardware_id: u16,
        f: impl FnOnce(&mut T, &mut dyn Processor) -> R,
    ) -> Option<R> {
        let device = self
            .bus
            .get_mut(hardware_id)?
            .as_any_mut()
            .downcast_mut::<T>()?;
        Some(f(device, &mut self.state))
    }

    /// Runs every connected device's per-tick update in bus order.
    pub fn update_devices(&mut self, elapsed: Duration) {
        self.bus.update(&mut self.state, elapsed);
    }

    /// Decodes the instruction at `addr` without executing it.
    pub fn disassemble(&self, addr: u16) -> Instruction {
        let mut next = addr;
        let word = self.state.memory.read(next);
        Instruction::decode(word, &mut || {
            next = next.wrapping_add(1);
            self.state.memory.read(next)
        })
    }
}

impl Default for Dcpu16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Dcpu16 {
    fn register(&self, register: Register) -> u16 {
        self.state.reg(register)
    }

    fn set_register(&mut self, register: Register, value: u16) {
        self.state.set_reg(register, value);
    }

    fn memory(&self) -> &Memory {
        &self.state.memory
    }

    fn memory_mut(&mut self) -> &mut Memory {
        &mut self.state.memory
    }

    fn interrupt(&mut self, message: u16) {
        self.state.interrupt(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::Operand;
    use crate::opcodes::{basic, BasicOpcode};

    fn cpu_with(words: &[u16]) -> Dcpu16 {
        let mut cpu = Dcpu16::new();
        cpu.memory_mut().load(0, words);
        cpu
    }

    #[test]
    fn test_new_cpu_is_zeroed() {
        let cpu = Dcpu16::new();
        for r in Register::ALL {
            assert_eq!(cpu.register(r), 0);
        }
        assert!(!cpu.is_queue_enabled());
        assert!(!cpu.is_on_fire());
        assert_eq!(cpu.cycles(), 0);
        assert_eq!(cpu.device_count(), 0);
    }

    #[test]
    fn test_execute_zero_budget_does_nothing() {
        let mut cpu = cpu_with(&basic(
            BasicOpcode::Set,
            Operand::Register(Register::A),
            Operand::Literal(1),
        ));
        assert_eq!(cpu.execute(0), 0);
        assert_eq!(cpu.register(Register::Pc), 0);
    }

    #[test]
    fn test_execute_overshoots_by_less_than_one_instruction() {
        // DIV costs 3; a budget of 1 still runs it whole
        let mut cpu = cpu_with(&basic(
            BasicOpcode::Div,
            Operand::Register(Register::A),
            Operand::Literal(1),
        ));
        assert_eq!(cpu.execute(1), 3);
        assert_eq!(cpu.register(Register::Pc), 1);
        assert_eq!(cpu.cycles(), 3);
    }

    #[test]
    fn test_stack_push_pop_wraps() {
        let mut state = CpuState::new();
        state.push(0x1234);
        assert_eq!(state.reg(Register::Sp), 0xffff);
        assert_eq!(state.memory.read(0xffff), 0x1234);
        assert_eq!(state.pop(), 0x1234);
        assert_eq!(state.reg(Register::Sp), 0);
    }

    #[test]
    fn test_halt_detection() {
        let mut cpu = cpu_with(&[HALT_INSTRUCTION]);
        assert!(cpu.is_halted());
        cpu.set_register(Register::Pc, 1);
        assert!(!cpu.is_halted());
    }

    #[test]
    fn test_disassemble() {
        let cpu = cpu_with(&[0x7c01, 0x0030]);
        assert_eq!(cpu.disassemble(0).to_string(), "SET A, 0x0030");
    }
}
