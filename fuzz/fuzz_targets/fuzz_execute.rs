//! Fuzz target for instruction execution.
//!
//! Loads an arbitrary program and register file into a CPU with the stock
//! peripherals attached, then runs it with interrupts arriving from the host
//! between slices. Nothing a guest does may panic.

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use dcpu16::devices::{Firmware, GenericClock, GenericKeyboard, Key, Lem1802, M35fd};
use dcpu16::{Dcpu16, Register, MAX_QUEUED_INTERRUPTS};
use libfuzzer_sys::fuzz_target;

/// One host action between execution slices
#[derive(Debug, Arbitrary)]
enum HostEvent {
    Execute(u8),
    Interrupt(u16),
    KeyDown(char),
    Update(u16),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Register file in `Register::ALL` order
    registers: [u16; 12],
    /// Program words loaded at 0
    program: Vec<u16>,
    /// Words loaded at the top of memory, where the stack lives
    stack: [u16; 16],
    events: Vec<HostEvent>,
}

fuzz_target!(|input: FuzzInput| {
    let mut cpu = Dcpu16::new();
    cpu.memory_mut().load(0, &input.program);
    cpu.memory_mut().load(0xfff0, &input.stack);
    for (r, &value) in Register::ALL.into_iter().zip(&input.registers) {
        cpu.set_register(r, value);
    }

    let keyboard = cpu.connect(Box::new(GenericKeyboard::new())).unwrap();
    cpu.connect(Box::new(GenericClock::new())).unwrap();
    cpu.connect(Box::new(Lem1802::new())).unwrap();
    cpu.connect(Box::new(M35fd::new())).unwrap();
    cpu.connect(Box::new(Firmware::new())).unwrap();

    for event in input.events.iter().take(64) {
        match *event {
            HostEvent::Execute(budget) => {
                let consumed = cpu.execute(budget as u64);
                assert!(consumed >= budget as u64);
            }
            HostEvent::Interrupt(message) => cpu.interrupt(message),
            HostEvent::KeyDown(c) => {
                cpu.with_device(keyboard, |kb: &mut GenericKeyboard, cpu| {
                    kb.key_down(cpu, Key::Char(c))
                });
            }
            HostEvent::Update(millis) => cpu.update_devices(Duration::from_millis(millis as u64)),
        }
        assert!(cpu.state().interrupt_queue().len() <= MAX_QUEUED_INTERRUPTS);
    }
});
