//! Integration tests for the IFx conditionals and skip chains.

use dcpu16::opcodes::basic;
use dcpu16::{BasicOpcode, Dcpu16, Operand, Register};

fn reg(r: Register) -> Operand {
    Operand::Register(r)
}

fn lit(v: u16) -> Operand {
    Operand::Literal(v)
}

fn cpu_with(program: &[Vec<u16>]) -> Dcpu16 {
    let mut cpu = Dcpu16::new();
    cpu.memory_mut().load(0, &program.concat());
    cpu
}

/// `IFx A, B` followed by `SET C, 1`. Returns whether the SET ran and the
/// cycles the conditional cost.
fn check_condition(opcode: BasicOpcode, b: u16, a: u16) -> (bool, u64) {
    let mut cpu = cpu_with(&[
        basic(opcode, reg(Register::A), reg(Register::B)),
        basic(BasicOpcode::Set, reg(Register::C), lit(1)),
    ]);
    cpu.set_register(Register::A, b);
    cpu.set_register(Register::B, a);
    let cycles = cpu.step();
    if cpu.register(Register::Pc) == 1 {
        cpu.step();
    }
    (cpu.register(Register::C) == 1, cycles)
}

#[test]
fn test_each_condition() {
    let cases = [
        (BasicOpcode::Ifb, 0b1100, 0b0100, true),
        (BasicOpcode::Ifb, 0b1100, 0b0011, false),
        (BasicOpcode::Ifc, 0b1100, 0b0011, true),
        (BasicOpcode::Ifc, 0b1100, 0b0100, false),
        (BasicOpcode::Ife, 42, 42, true),
        (BasicOpcode::Ife, 42, 43, false),
        (BasicOpcode::Ifn, 42, 43, true),
        (BasicOpcode::Ifn, 42, 42, false),
        (BasicOpcode::Ifg, 0x8000, 0x7fff, true),
        (BasicOpcode::Ifg, 0x7fff, 0x7fff, false),
        (BasicOpcode::Ifa, 0x7fff, 0x8000, true),
        (BasicOpcode::Ifa, 0x8000, 0x7fff, false),
        (BasicOpcode::Ifl, 0x7fff, 0x8000, true),
        (BasicOpcode::Ifl, 0x8000, 0x8000, false),
        (BasicOpcode::Ifu, 0xffff, 0x0000, true),
        (BasicOpcode::Ifu, 0x0000, 0xffff, false),
    ];
    for (opcode, b, a, expected) in cases {
        let (ran, cycles) = check_condition(opcode, b, a);
        assert_eq!(ran, expected, "{} {b:#06x}, {a:#06x}", opcode.mnemonic());
        assert_eq!(cycles, if expected { 2 } else { 3 });
    }
}

#[test]
fn test_failed_test_skips_multi_word_instruction() {
    let mut cpu = cpu_with(&[
        basic(BasicOpcode::Ife, reg(Register::A), lit(1)),
        basic(
            BasicOpcode::Set,
            Operand::IndirectNextWord(0x1000),
            Operand::NextWord(0x2222),
        ),
        basic(BasicOpcode::Set, reg(Register::B), lit(2)),
    ]);
    assert_eq!(cpu.step(), 3);
    assert_eq!(cpu.register(Register::Pc), 4);
    cpu.step();
    assert_eq!(cpu.memory().read(0x1000), 0);
    assert_eq!(cpu.register(Register::B), 2);
}

#[test]
fn test_chained_conditionals_are_skipped_together() {
    let mut cpu = cpu_with(&[
        basic(BasicOpcode::Ife, reg(Register::A), lit(1)),
        basic(BasicOpcode::Ife, reg(Register::B), lit(0x100)),
        basic(BasicOpcode::Ifn, reg(Register::C), lit(0)),
        basic(BasicOpcode::Set, reg(Register::X), lit(3)),
        basic(BasicOpcode::Set, reg(Register::Y), lit(4)),
    ]);
    // 2 base + 1 failed + 1 per skipped conditional
    assert_eq!(cpu.step(), 5);
    assert_eq!(cpu.register(Register::Pc), 5);
    cpu.step();
    assert_eq!(cpu.register(Register::X), 0);
    assert_eq!(cpu.register(Register::Y), 4);
}

#[test]
fn test_passing_chain_runs_every_test() {
    let mut cpu = cpu_with(&[
        basic(BasicOpcode::Ife, reg(Register::A), lit(0)),
        basic(BasicOpcode::Ife, reg(Register::B), lit(0)),
        basic(BasicOpcode::Set, reg(Register::X), lit(3)),
    ]);
    assert_eq!(cpu.execute(5), 5);
    assert_eq!(cpu.register(Register::X), 3);
}

#[test]
fn test_skip_has_no_side_effects() {
    let mut cpu = cpu_with(&[
        basic(BasicOpcode::Ifn, reg(Register::A), reg(Register::A)),
        basic(BasicOpcode::Set, Operand::PushPop, Operand::PushPop),
    ]);
    cpu.set_register(Register::Sp, 0x8000);
    cpu.step();
    assert_eq!(cpu.register(Register::Sp), 0x8000);
    assert_eq!(cpu.register(Register::Pc), 2);
}

#[test]
fn test_next_word_operands_cost_extra() {
    let mut cpu = cpu_with(&[basic(
        BasicOpcode::Ife,
        Operand::IndirectNextWord(0x3000),
        Operand::NextWord(0x1234),
    )]);
    cpu.memory_mut().write(0x3000, 0x1234);
    assert_eq!(cpu.step(), 4);
    assert_eq!(cpu.register(Register::Pc), 3);
}

#[test]
fn test_all_conditional_memory_terminates() {
    let mut cpu = Dcpu16::new();
    // IFN A, A everywhere
    cpu.memory_mut().as_mut_slice().fill(0x0013);
    let cycles = cpu.step();
    assert!(cycles > 3);
}
