//! # Operand Addressing
//!
//! Every DCPU-16 instruction carries one or two operands, each encoded as a
//! small operand code. Codes in the 0x00-0x1f range name registers, memory
//! locations reached through registers or the stack, and "next word" forms
//! that consume an extra word following the instruction. Codes 0x20-0x3f are
//! inline literals from -1 to 30 and only fit in the 6-bit `a` field.
//!
//! Decoding consumes next words in operand order (`a` first, then `b`), which
//! is also the order in which the CPU evaluates the operands.

use std::fmt;

use crate::cpu::Register;

/// Which operand field of an instruction is being decoded.
///
/// The distinction matters for code 0x18 (PUSH as `b`, POP as `a`) and for
/// inline literals, which only exist in the wider `a` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSlot {
    A,
    B,
}

/// A decoded operand, with any next word already read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// `A`..`J`, `SP`, `PC` or `EX`. IA is never directly addressable.
    Register(Register),
    /// `[register]`
    Indirect(Register),
    /// `[register + next word]`
    IndirectOffset(Register, u16),
    /// `[--SP]` as `b`, `[SP++]` as `a`.
    PushPop,
    /// `[SP]`
    Peek,
    /// `[SP + next word]`
    Pick(u16),
    /// `[next word]`
    IndirectNextWord(u16),
    /// Next word, read as a literal value.
    NextWord(u16),
    /// Inline literal from the `a` field (-1..=30).
    Literal(u16),
}

const PUSH_POP: u16 = 0x18;
const PEEK: u16 = 0x19;
const PICK: u16 = 0x1a;
const SP: u16 = 0x1b;
const PC: u16 = 0x1c;
const EX: u16 = 0x1d;
const INDIRECT_NEXT_WORD: u16 = 0x1e;
const NEXT_WORD: u16 = 0x1f;
const INLINE_LITERAL: u16 = 0x20;

impl Operand {
    /// True if the operand code is followed by an extra word.
    pub const fn has_next_word(code: u16) -> bool {
        matches!(code, 0x10..=0x17 | PICK | INDIRECT_NEXT_WORD | NEXT_WORD)
    }

    /// Decodes an operand code, pulling a next word from `next_word` if the
    /// code calls for one.
    pub fn decode(code: u16, slot: OperandSlot, next_word: &mut impl FnMut() -> u16) -> Operand {
        match code {
            0x00..=0x07 => Operand::Register(Register::GENERAL[code as usize]),
            0x08..=0x0f => Operand::Indirect(Register::GENERAL[(code - 0x08) as usize]),
            0x10..=0x17 => {
                Operand::IndirectOffset(Register::GENERAL[(code - 0x10) as usize], next_word())
            }
            PUSH_POP => Operand::PushPop,
            PEEK => Operand::Peek,
            PICK => Operand::Pick(next_word()),
            SP => Operand::Register(Register::Sp),
            PC => Operand::Register(Register::Pc),
            EX => Operand::Register(Register::Ex),
            INDIRECT_NEXT_WORD => Operand::IndirectNextWord(next_word()),
            NEXT_WORD => Operand::NextWord(next_word()),
            // 0x20 is -1, 0x21 is 0, ... 0x3f is 30. Only reachable from `a`.
            _ => {
                debug_assert_eq!(slot, OperandSlot::A);
                Operand::Literal((code & 0x3f).wrapping_sub(INLINE_LITERAL + 1))
            }
        }
    }

    /// Encodes the operand for `slot`, returning the operand code and the
    /// next word it needs, if any.
    ///
    /// Literals that fit are encoded inline in the `a` slot. Returns `None`
    /// for `Register(Ia)`, which has no operand encoding.
    pub fn encode(&self, slot: OperandSlot) -> Option<(u16, Option<u16>)> {
        let encoded = match *self {
            Operand::Register(Register::Sp) => (SP, None),
            Operand::Register(Register::Pc) => (PC, None),
            Operand::Register(Register::Ex) => (EX, None),
            Operand::Register(Register::Ia) => return None,
            Operand::Register(r) => (r.index() as u16, None),
            Operand::Indirect(r) => (0x08 + general_index(r)?, None),
            Operand::IndirectOffset(r, offset) => (0x10 + general_index(r)?, Some(offset)),
            Operand::PushPop => (PUSH_POP, None),
            Operand::Peek => (PEEK, None),
            Operand::Pick(n) => (PICK, Some(n)),
            Operand::IndirectNextWord(addr) => (INDIRECT_NEXT_WORD, Some(addr)),
            Operand::Literal(v) if slot == OperandSlot::A && (v == 0xffff || v <= 30) => {
                (INLINE_LITERAL + v.wrapping_add(1), None)
            }
            Operand::Literal(v) | Operand::NextWord(v) => (NEXT_WORD, Some(v)),
        };
        Some(encoded)
    }

    /// Extra cycles spent fetching this operand's next word.
    pub const fn extra_cycles(&self) -> u64 {
        match self {
            Operand::IndirectOffset(..)
            | Operand::Pick(_)
            | Operand::IndirectNextWord(_)
            | Operand::NextWord(_) => 1,
            _ => 0,
        }
    }
}

fn general_index(r: Register) -> Option<u16> {
    r.is_general().then(|| r.index() as u16)
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{}", r.name()),
            Operand::Indirect(r) => write!(f, "[{}]", r.name()),
            Operand::IndirectOffset(r, offset) => write!(f, "[{} + {:#06x}]", r.name(), offset),
            Operand::PushPop => write!(f, "PUSH/POP"),
            Operand::Peek => write!(f, "PEEK"),
            Operand::Pick(n) => write!(f, "PICK {:#06x}", n),
            Operand::IndirectNextWord(addr) => write!(f, "[{:#06x}]", addr),
            Operand::NextWord(v) | Operand::Literal(v) => write!(f, "{:#06x}", v),
        }
    }
}
