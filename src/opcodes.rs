//! # Opcodes and Instruction Decoding
//!
//! This module is the single source of truth for the DCPU-16 v1.7 opcode
//! space: mnemonics, base cycle costs, and how an instruction word plus its
//! next words decode into an [`Instruction`].
//!
//! Word layouts:
//!
//! - basic: `aaaaaabbbbbooooo`
//! - special (`o == 0`): `aaaaaaooooo00000`
//!
//! Reserved opcodes decode to [`Instruction::Reserved`] and execute as a
//! one-cycle no-op, so arbitrary memory always decodes to something runnable.

use std::fmt;

use crate::addressing::{Operand, OperandSlot};

/// Basic (two-operand) opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicOpcode {
    Set = 0x01,
    Add = 0x02,
    Sub = 0x03,
    Mul = 0x04,
    Mli = 0x05,
    Div = 0x06,
    Dvi = 0x07,
    Mod = 0x08,
    Mdi = 0x09,
    And = 0x0a,
    Bor = 0x0b,
    Xor = 0x0c,
    Shr = 0x0d,
    Asr = 0x0e,
    Shl = 0x0f,
    Ifb = 0x10,
    Ifc = 0x11,
    Ife = 0x12,
    Ifn = 0x13,
    Ifg = 0x14,
    Ifa = 0x15,
    Ifl = 0x16,
    Ifu = 0x17,
    Adx = 0x1a,
    Sbx = 0x1b,
    Sti = 0x1e,
    Std = 0x1f,
}

impl BasicOpcode {
    pub fn from_code(code: u16) -> Option<Self> {
        use BasicOpcode::*;
        Some(match code {
            0x01 => Set,
            0x02 => Add,
            0x03 => Sub,
            0x04 => Mul,
            0x05 => Mli,
            0x06 => Div,
            0x07 => Dvi,
            0x08 => Mod,
            0x09 => Mdi,
            0x0a => And,
            0x0b => Bor,
            0x0c => Xor,
            0x0d => Shr,
            0x0e => Asr,
            0x0f => Shl,
            0x10 => Ifb,
            0x11 => Ifc,
            0x12 => Ife,
            0x13 => Ifn,
            0x14 => Ifg,
            0x15 => Ifa,
            0x16 => Ifl,
            0x17 => Ifu,
            0x1a => Adx,
            0x1b => Sbx,
            0x1e => Sti,
            0x1f => Std,
            _ => return None,
        })
    }

    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Cycle cost before operand next-word fetches and failed-test penalties.
    pub const fn base_cycles(self) -> u64 {
        use BasicOpcode::*;
        match self {
            Set | And | Bor | Xor | Shr | Asr | Shl => 1,
            Add | Sub | Mul | Mli | Sti | Std => 2,
            Ifb | Ifc | Ife | Ifn | Ifg | Ifa | Ifl | Ifu => 2,
            Div | Dvi | Mod | Mdi | Adx | Sbx => 3,
        }
    }

    pub const fn is_conditional(self) -> bool {
        (self as u16) >= 0x10 && (self as u16) <= 0x17
    }

    pub const fn mnemonic(self) -> &'static str {
        use BasicOpcode::*;
        match self {
            Set => "SET",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Mli => "MLI",
            Div => "DIV",
            Dvi => "DVI",
            Mod => "MOD",
            Mdi => "MDI",
            And => "AND",
            Bor => "BOR",
            Xor => "XOR",
            Shr => "SHR",
            Asr => "ASR",
            Shl => "SHL",
            Ifb => "IFB",
            Ifc => "IFC",
            Ife => "IFE",
            Ifn => "IFN",
            Ifg => "IFG",
            Ifa => "IFA",
            Ifl => "IFL",
            Ifu => "IFU",
            Adx => "ADX",
            Sbx => "SBX",
            Sti => "STI",
            Std => "STD",
        }
    }
}

/// Special (one-operand) opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialOpcode {
    Jsr = 0x01,
    Int = 0x08,
    Iag = 0x09,
    Ias = 0x0a,
    Rfi = 0x0b,
    Iaq = 0x0c,
    Hwn = 0x10,
    Hwq = 0x11,
    Hwi = 0x12,
}

impl SpecialOpcode {
    pub fn from_code(code: u16) -> Option<Self> {
        use SpecialOpcode::*;
        Some(match code {
            0x01 => Jsr,
            0x08 => Int,
            0x09 => Iag,
            0x0a => Ias,
            0x0b => Rfi,
            0x0c => Iaq,
            0x10 => Hwn,
            0x11 => Hwq,
            0x12 => Hwi,
            _ => return None,
        })
    }

    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Cycle cost before operand fetches. HWI adds whatever the device reports.
    pub const fn base_cycles(self) -> u64 {
        use SpecialOpcode::*;
        match self {
            Iag | Ias => 1,
            Iaq | Hwn => 2,
            Jsr | Rfi => 3,
            Int | Hwq | Hwi => 4,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        use SpecialOpcode::*;
        match self {
            Jsr => "JSR",
            Int => "INT",
            Iag => "IAG",
            Ias => "IAS",
            Rfi => "RFI",
            Iaq => "IAQ",
            Hwn => "HWN",
            Hwq => "HWQ",
            Hwi => "HWI",
        }
    }
}

/// Cost of a reserved or undefined instruction.
pub const RESERVED_CYCLES: u64 = 1;

/// A fully decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Basic {
        opcode: BasicOpcode,
        b: Operand,
        a: Operand,
    },
    Special {
        opcode: SpecialOpcode,
        a: Operand,
    },
    /// An unassigned opcode. Its operand words have been consumed.
    Reserved { word: u16 },
}

const fn opcode_field(word: u16) -> u16 {
    word & 0x1f
}

const fn b_field(word: u16) -> u16 {
    (word >> 5) & 0x1f
}

const fn a_field(word: u16) -> u16 {
    word >> 10
}

impl Instruction {
    /// Decodes `word`, reading any next words from `next_word` in `a`, `b`
    /// order.
    pub fn decode(word: u16, next_word: &mut impl FnMut() -> u16) -> Instruction {
        let a = Operand::decode(a_field(word), OperandSlot::A, next_word);
        let opcode = opcode_field(word);
        if opcode == 0 {
            return match SpecialOpcode::from_code(b_field(word)) {
                Some(opcode) => Instruction::Special { opcode, a },
                None => Instruction::Reserved { word },
            };
        }
        let b = Operand::decode(b_field(word), OperandSlot::B, next_word);
        match BasicOpcode::from_code(opcode) {
            Some(opcode) => Instruction::Basic { opcode, b, a },
            None => Instruction::Reserved { word },
        }
    }

    /// Number of words (instruction plus next words) starting with `word`.
    pub const fn length(word: u16) -> u16 {
        let mut length = 1;
        if Operand::has_next_word(a_field(word)) {
            length += 1;
        }
        if opcode_field(word) != 0 && Operand::has_next_word(b_field(word)) {
            length += 1;
        }
        length
    }

    /// True if `word` is one of the IFx instructions.
    pub const fn is_conditional(word: u16) -> bool {
        let opcode = opcode_field(word);
        opcode >= 0x10 && opcode <= 0x17
    }

    /// Base cost plus next-word fetches. Excludes skip penalties and the
    /// cycles a device adds to HWI.
    pub const fn cycles(&self) -> u64 {
        match self {
            Instruction::Basic { opcode, b, a } => {
                opcode.base_cycles() + b.extra_cycles() + a.extra_cycles()
            }
            Instruction::Special { opcode, a } => opcode.base_cycles() + a.extra_cycles(),
            Instruction::Reserved { .. } => RESERVED_CYCLES,
        }
    }

    /// Encodes the instruction back into words.
    ///
    /// Returns `None` if an operand has no encoding in its slot, or for
    /// [`Instruction::Reserved`].
    pub fn encode(&self) -> Option<Vec<u16>> {
        match *self {
            Instruction::Basic { opcode, b, a } => {
                let (a_code, a_next) = a.encode(OperandSlot::A)?;
                let (b_code, b_next) = b.encode(OperandSlot::B)?;
                let mut words = vec![(a_code << 10) | (b_code << 5) | opcode.code()];
                words.extend(a_next);
                words.extend(b_next);
                Some(words)
            }
            Instruction::Special { opcode, a } => {
                let (a_code, a_next) = a.encode(OperandSlot::A)?;
                let mut words = vec![(a_code << 10) | (opcode.code() << 5)];
                words.extend(a_next);
                Some(words)
            }
            Instruction::Reserved { .. } => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Basic { opcode, b, a } => {
                let b = match b {
                    Operand::PushPop => "PUSH".to_string(),
                    other => other.to_string(),
                };
                let a = match a {
                    Operand::PushPop => "POP".to_string(),
                    other => other.to_string(),
                };
                write!(f, "{} {}, {}", opcode.mnemonic(), b, a)
            }
            Instruction::Special { opcode, a } => {
                let a = match a {
                    Operand::PushPop => "POP".to_string(),
                    other => other.to_string(),
                };
                write!(f, "{} {}", opcode.mnemonic(), a)
            }
            Instruction::Reserved { word } => write!(f, "DAT {:#06x}", word),
        }
    }
}

/// Assembles `opcode b, a`.
///
/// # Examples
///
/// ```
/// use dcpu16::opcodes::{basic, BasicOpcode};
/// use dcpu16::{Operand, Register};
///
/// // SET A, 0x30
/// let words = basic(BasicOpcode::Set, Operand::Register(Register::A), Operand::Literal(0x30));
/// assert_eq!(words, vec![0x7c01, 0x0030]);
///
/// // ADD PC, -1: the canonical halt
/// let words = basic(BasicOpcode::Add, Operand::Register(Register::Pc), Operand::Literal(0xffff));
/// assert_eq!(words, vec![0x8382]);
/// ```
///
/// # Panics
///
/// Panics if an operand cannot be encoded in its slot, e.g. `Register(Ia)`.
pub fn basic(opcode: BasicOpcode, b: Operand, a: Operand) -> Vec<u16> {
    match (Instruction::Basic { opcode, b, a }).encode() {
        Some(words) => words,
        None => panic!("operands {b} / {a} cannot be encoded"),
    }
}

/// Assembles a special instruction `opcode a`.
///
/// # Panics
///
/// Panics if `a` cannot be encoded.
pub fn special(opcode: SpecialOpcode, a: Operand) -> Vec<u16> {
    match (Instruction::Special { opcode, a }).encode() {
        Some(words) => words,
        None => panic!("operand {a} cannot be encoded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Register;

    fn decode_all(words: &[u16]) -> Instruction {
        let mut rest = words[1..].iter().copied();
        Instruction::decode(words[0], &mut || rest.next().unwrap_or(0))
    }

    #[test]
    fn test_every_basic_code_round_trips() {
        for code in 0u16..0x20 {
            if let Some(op) = BasicOpcode::from_code(code) {
                assert_eq!(op.code(), code);
                assert!(op.base_cycles() >= 1);
                assert_eq!(op.is_conditional(), (0x10..=0x17).contains(&code));
            }
        }
        assert!(BasicOpcode::from_code(0x18).is_none());
        assert!(BasicOpcode::from_code(0x1d).is_none());
    }

    #[test]
    fn test_decode_set_with_next_word() {
        let instr = decode_all(&[0x7c01, 0x0030]);
        assert_eq!(
            instr,
            Instruction::Basic {
                opcode: BasicOpcode::Set,
                b: Operand::Register(Register::A),
                a: Operand::NextWord(0x30),
            }
        );
        assert_eq!(instr.cycles(), 2);
        assert_eq!(Instruction::length(0x7c01), 2);
    }

    #[test]
    fn test_next_words_follow_a_then_b() {
        // SET [0x1000], 0x20
        let words = basic(
            BasicOpcode::Set,
            Operand::IndirectNextWord(0x1000),
            Operand::NextWord(0x20),
        );
        assert_eq!(words.len(), 3);
        assert_eq!(words[1], 0x20);
        assert_eq!(words[2], 0x1000);
        assert_eq!(Instruction::length(words[0]), 3);
    }

    #[test]
    fn test_decode_special() {
        let words = special(SpecialOpcode::Jsr, Operand::NextWord(0x4000));
        assert_eq!(words, vec![0x7c20, 0x4000]);
        assert_eq!(
            decode_all(&words),
            Instruction::Special {
                opcode: SpecialOpcode::Jsr,
                a: Operand::NextWord(0x4000),
            }
        );
    }

    #[test]
    fn test_zero_word_is_reserved() {
        assert_eq!(decode_all(&[0x0000]), Instruction::Reserved { word: 0 });
        assert_eq!(Instruction::length(0x0000), 1);
    }

    #[test]
    fn test_reserved_basic_still_consumes_operands() {
        // opcode 0x18 with a = next word, b = [next word]
        let word = (0x1f << 10) | (0x1e << 5) | 0x18;
        assert_eq!(Instruction::length(word), 3);
        let mut consumed = 0;
        let instr = Instruction::decode(word, &mut || {
            consumed += 1;
            0
        });
        assert_eq!(instr, Instruction::Reserved { word });
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_display() {
        let instr = decode_all(&[0x8382]);
        assert_eq!(instr.to_string(), "ADD PC, 0xffff");
        let instr = decode_all(&basic(BasicOpcode::Set, Operand::PushPop, Operand::PushPop));
        assert_eq!(instr.to_string(), "SET PUSH, POP");
    }
}
