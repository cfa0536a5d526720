//! Integration tests for interrupt delivery and the interrupt queue.
//!
//! Covers host-raised and software (INT) interrupts, IA = 0 discards, the
//! IAQ/RFI queueing handshake, wake-up detection and the on-fire overflow.

use dcpu16::opcodes::{basic, special};
use dcpu16::{
    BasicOpcode, Dcpu16, Operand, Register, SpecialOpcode, HALT_INSTRUCTION, MAX_QUEUED_INTERRUPTS,
};

const HANDLER: u16 = 0x0040;

fn reg(r: Register) -> Operand {
    Operand::Register(r)
}

fn lit(v: u16) -> Operand {
    Operand::Literal(v)
}

/// A CPU with `program` at 0 and, at [`HANDLER`], `SET C, A ; RFI 0`.
fn cpu_with_handler(program: &[Vec<u16>]) -> Dcpu16 {
    let mut cpu = Dcpu16::new();
    cpu.memory_mut().load(0, &program.concat());
    let handler = [
        basic(BasicOpcode::Set, reg(Register::C), reg(Register::A)),
        special(SpecialOpcode::Rfi, lit(0)),
    ]
    .concat();
    cpu.memory_mut().load(HANDLER, &handler);
    cpu
}

#[test]
fn test_interrupt_with_ia_zero_is_discarded() {
    let mut cpu = cpu_with_handler(&[vec![HALT_INSTRUCTION]]);
    cpu.set_register(Register::A, 0x1111);
    cpu.interrupt(0x55);

    assert_eq!(cpu.register(Register::Pc), 0);
    assert_eq!(cpu.register(Register::A), 0x1111);
    assert_eq!(cpu.register(Register::Sp), 0);
    assert_eq!(cpu.state().interrupt_queue().len(), 0);
    assert!(!cpu.is_queue_enabled());
}

#[test]
fn test_host_interrupt_is_delivered_immediately() {
    let mut cpu = cpu_with_handler(&[vec![HALT_INSTRUCTION]]);
    cpu.set_register(Register::Ia, HANDLER);
    cpu.set_register(Register::A, 0x1111);
    cpu.interrupt(0x55);

    assert_eq!(cpu.register(Register::Pc), HANDLER);
    assert_eq!(cpu.register(Register::A), 0x55);
    assert!(cpu.is_queue_enabled());
    // PC pushed first, then A
    assert_eq!(cpu.register(Register::Sp), 0xfffe);
    assert_eq!(cpu.memory().read(0xffff), 0);
    assert_eq!(cpu.memory().read(0xfffe), 0x1111);

    cpu.step();
    assert_eq!(cpu.register(Register::C), 0x55);
    assert_eq!(cpu.step(), 3);
    assert_eq!(cpu.register(Register::Pc), 0);
    assert_eq!(cpu.register(Register::A), 0x1111);
    assert_eq!(cpu.register(Register::Sp), 0);
    assert!(!cpu.is_queue_enabled());
}

#[test]
fn test_software_interrupt_round_trip() {
    let mut cpu = cpu_with_handler(&[
        special(SpecialOpcode::Ias, Operand::NextWord(HANDLER)),
        special(SpecialOpcode::Int, lit(5)),
        basic(BasicOpcode::Set, reg(Register::B), lit(1)),
        vec![HALT_INSTRUCTION],
    ]);
    assert_eq!(cpu.step(), 2);
    assert_eq!(cpu.register(Register::Ia), HANDLER);

    // INT is queued mid-instruction and dispatched at the boundary
    assert_eq!(cpu.step(), 4);
    assert_eq!(cpu.register(Register::Pc), HANDLER);
    assert_eq!(cpu.register(Register::A), 5);
    assert_eq!(cpu.memory().read(0xffff), 3);

    cpu.execute(4); // SET C, A ; RFI
    assert_eq!(cpu.register(Register::C), 5);
    assert_eq!(cpu.register(Register::Pc), 3);
    assert_eq!(cpu.register(Register::A), 0);

    cpu.step();
    assert_eq!(cpu.register(Register::B), 1);
    assert!(cpu.is_halted());
}

#[test]
fn test_int_with_ia_zero_does_nothing() {
    let mut cpu = cpu_with_handler(&[special(SpecialOpcode::Int, lit(5))]);
    assert_eq!(cpu.step(), 4);
    assert_eq!(cpu.register(Register::Pc), 1);
    assert_eq!(cpu.register(Register::A), 0);
    assert_eq!(cpu.state().interrupt_queue().len(), 0);
}

#[test]
fn test_iag_and_ias() {
    let mut cpu = cpu_with_handler(&[
        special(SpecialOpcode::Ias, reg(Register::X)),
        special(SpecialOpcode::Iag, reg(Register::Y)),
    ]);
    cpu.set_register(Register::X, 0x1234);
    assert_eq!(cpu.execute(2), 2);
    assert_eq!(cpu.register(Register::Ia), 0x1234);
    assert_eq!(cpu.register(Register::Y), 0x1234);
}

#[test]
fn test_iaq_holds_interrupts_until_released() {
    let mut cpu = cpu_with_handler(&[
        special(SpecialOpcode::Iaq, lit(1)),
        basic(BasicOpcode::Set, reg(Register::B), lit(1)),
        special(SpecialOpcode::Iaq, lit(0)),
        vec![HALT_INSTRUCTION],
    ]);
    cpu.set_register(Register::Ia, HANDLER);

    assert_eq!(cpu.step(), 2);
    assert!(cpu.is_queue_enabled());
    cpu.interrupt(7);
    cpu.interrupt(8);
    assert_eq!(cpu.state().interrupt_queue().collect::<Vec<_>>(), vec![7, 8]);

    cpu.step();
    assert_eq!(cpu.register(Register::B), 1);
    assert_eq!(cpu.register(Register::Pc), 2);

    // Releasing the queue delivers the oldest message right after IAQ
    cpu.step();
    assert_eq!(cpu.register(Register::Pc), HANDLER);
    assert_eq!(cpu.register(Register::A), 7);
    assert_eq!(cpu.state().interrupt_queue().collect::<Vec<_>>(), vec![8]);

    // The handler's RFI lets the second one in
    cpu.step();
    assert_eq!(cpu.register(Register::C), 7);
    cpu.step();
    assert_eq!(cpu.register(Register::Pc), HANDLER);
    assert_eq!(cpu.register(Register::A), 8);
    cpu.execute(4);
    assert_eq!(cpu.register(Register::C), 8);
    assert_eq!(cpu.register(Register::Pc), 3);
    assert!(cpu.is_halted());
}

#[test]
fn test_queue_overflow_sets_on_fire() {
    let mut cpu = cpu_with_handler(&[vec![HALT_INSTRUCTION]]);
    cpu.set_register(Register::Ia, HANDLER);
    // Enter the handler, which leaves queueing enabled
    cpu.interrupt(0);
    assert!(cpu.is_queue_enabled());

    for message in 0..MAX_QUEUED_INTERRUPTS as u16 {
        cpu.interrupt(message);
    }
    assert!(!cpu.is_on_fire());
    assert_eq!(cpu.state().interrupt_queue().len(), MAX_QUEUED_INTERRUPTS);

    cpu.interrupt(0xdead);
    assert!(cpu.is_on_fire());
    assert_eq!(cpu.state().interrupt_queue().len(), MAX_QUEUED_INTERRUPTS);
    assert_eq!(cpu.state().interrupt_queue().last(), Some(255));

    // Sticky, and the CPU keeps running
    cpu.execute(100);
    assert!(cpu.is_on_fire());
}

#[test]
fn test_pending_wake_up() {
    let mut cpu = cpu_with_handler(&[vec![HALT_INSTRUCTION]]);
    assert!(cpu.is_halted());
    assert!(!cpu.is_pending_wake_up());

    // Any request counts, even one that IA = 0 discards
    cpu.interrupt(1);
    assert!(cpu.is_pending_wake_up());

    cpu.execute(1);
    assert!(!cpu.is_pending_wake_up());
    assert!(cpu.is_halted());
}

#[test]
fn test_wake_up_leaves_halt_loop() {
    let mut cpu = cpu_with_handler(&[vec![HALT_INSTRUCTION]]);
    cpu.set_register(Register::Ia, HANDLER);
    cpu.execute(10);
    assert!(cpu.is_halted());

    cpu.interrupt(0x77);
    assert!(!cpu.is_halted());
    cpu.execute(1);
    assert_eq!(cpu.register(Register::C), 0x77);
}
