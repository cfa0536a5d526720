//! # ALU Instructions
//!
//! Arithmetic and bitwise basic opcodes as pure functions of `b`, `a` and the
//! incoming EX:
//! - ADD, SUB, ADX, SBX: EX carries the carry/borrow
//! - MUL, MLI: EX is the high word of the product
//! - DIV, DVI: EX holds the fractional part, `((b << 16) / a)`
//! - MOD, MDI: EX untouched
//! - AND, BOR, XOR: EX untouched
//! - SHR, ASR, SHL: EX receives the bits shifted out
//!
//! Division and modulo by zero yield zero. Shift counts of 16 and up shift
//! everything out rather than panicking.

use crate::opcodes::BasicOpcode;

/// Result of an ALU operation: the value written to `b`, and the new EX if
/// the operation sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AluResult {
    pub value: u16,
    pub ex: Option<u16>,
}

impl AluResult {
    fn value(value: u16) -> Self {
        Self { value, ex: None }
    }

    fn with_ex(value: u16, ex: u16) -> Self {
        Self { value, ex: Some(ex) }
    }
}

/// Evaluates an arithmetic or bitwise opcode.
///
/// Called only for ALU opcodes; anything else passes `b` through unchanged.
pub(crate) fn evaluate(opcode: BasicOpcode, b: u16, a: u16, ex: u16) -> AluResult {
    use BasicOpcode::*;
    match opcode {
        Add => add(b, a),
        Sub => sub(b, a),
        Mul => mul(b, a),
        Mli => mli(b, a),
        Div => div(b, a),
        Dvi => dvi(b, a),
        Mod => AluResult::value(if a == 0 { 0 } else { b % a }),
        Mdi => mdi(b, a),
        And => AluResult::value(b & a),
        Bor => AluResult::value(b | a),
        Xor => AluResult::value(b ^ a),
        Shr => shr(b, a),
        Asr => asr(b, a),
        Shl => shl(b, a),
        Adx => adx(b, a, ex),
        Sbx => sbx(b, a, ex),
        _ => AluResult::value(b),
    }
}

fn add(b: u16, a: u16) -> AluResult {
    let (sum, overflow) = b.overflowing_add(a);
    AluResult::with_ex(sum, overflow as u16)
}

fn sub(b: u16, a: u16) -> AluResult {
    let (diff, underflow) = b.overflowing_sub(a);
    AluResult::with_ex(diff, if underflow { 0xffff } else { 0 })
}

fn mul(b: u16, a: u16) -> AluResult {
    let product = b as u32 * a as u32;
    AluResult::with_ex(product as u16, (product >> 16) as u16)
}

fn mli(b: u16, a: u16) -> AluResult {
    let product = (b as i16 as i32) * (a as i16 as i32);
    AluResult::with_ex(product as u16, (product >> 16) as u16)
}

fn div(b: u16, a: u16) -> AluResult {
    if a == 0 {
        return AluResult::with_ex(0, 0);
    }
    let quotient = b / a;
    let fraction = ((b as u32) << 16) / a as u32;
    AluResult::with_ex(quotient, fraction as u16)
}

fn dvi(b: u16, a: u16) -> AluResult {
    if a == 0 {
        return AluResult::with_ex(0, 0);
    }
    // i64 keeps -32768 / -1 and its shifted form in range; Rust division
    // truncates toward zero.
    let b = b as i16 as i64;
    let a = a as i16 as i64;
    let quotient = b / a;
    let fraction = (b << 16) / a;
    AluResult::with_ex(quotient as u16, fraction as u16)
}

fn mdi(b: u16, a: u16) -> AluResult {
    if a == 0 {
        return AluResult::value(0);
    }
    let remainder = (b as i16 as i32) % (a as i16 as i32);
    AluResult::value(remainder as u16)
}

fn shr(b: u16, a: u16) -> AluResult {
    let wide = (b as u32) << 16;
    let shifted = wide.checked_shr(a as u32).unwrap_or(0);
    AluResult::with_ex((shifted >> 16) as u16, shifted as u16)
}

fn asr(b: u16, a: u16) -> AluResult {
    let wide = (b as i16 as i32) << 16;
    // Shifting an i32 by 31 or more saturates to the sign.
    let shifted = wide >> (a as u32).min(31);
    AluResult::with_ex((shifted >> 16) as u16, shifted as u16)
}

fn shl(b: u16, a: u16) -> AluResult {
    let shifted = (b as u64).checked_shl(a as u32).unwrap_or(0);
    AluResult::with_ex(shifted as u16, (shifted >> 16) as u16)
}

fn adx(b: u16, a: u16, ex: u16) -> AluResult {
    let sum = b as u32 + a as u32 + ex as u32;
    AluResult::with_ex(sum as u16, if sum > 0xffff { 1 } else { 0 })
}

fn sbx(b: u16, a: u16, ex: u16) -> AluResult {
    // EX is added as-is, so an EX of 0xffff left by SUB borrows one.
    let diff = b as i32 - a as i32 + ex as i16 as i32;
    let ex = if diff < 0 {
        0xffff
    } else if diff > 0xffff {
        1
    } else {
        0
    };
    AluResult::with_ex(diff as u16, ex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_overflow_sets_ex() {
        assert_eq!(add(0xffff, 1), AluResult::with_ex(0, 1));
        assert_eq!(add(2, 3), AluResult::with_ex(5, 0));
    }

    #[test]
    fn test_sub_underflow_sets_ex() {
        assert_eq!(sub(0, 1), AluResult::with_ex(0xffff, 0xffff));
        assert_eq!(sub(5, 3), AluResult::with_ex(2, 0));
    }

    #[test]
    fn test_mul_high_word() {
        assert_eq!(mul(0x1000, 0x0010), AluResult::with_ex(0x0000, 0x0001));
        assert_eq!(mul(0xffff, 0xffff), AluResult::with_ex(0x0001, 0xfffe));
    }

    #[test]
    fn test_mli_is_signed() {
        // -2 * 3 = -6
        assert_eq!(mli(0xfffe, 3), AluResult::with_ex(0xfffa, 0xffff));
    }

    #[test]
    fn test_div_fraction_and_zero() {
        assert_eq!(div(7, 2), AluResult::with_ex(3, 0x8000));
        assert_eq!(div(7, 0), AluResult::with_ex(0, 0));
    }

    #[test]
    fn test_dvi_rounds_toward_zero() {
        // -7 / 2 = -3
        assert_eq!(dvi(0xfff9, 2).value, 0xfffd);
        assert_eq!(dvi(0x8000, 0xffff).value, 0x8000);
        assert_eq!(dvi(5, 0), AluResult::with_ex(0, 0));
    }

    #[test]
    fn test_mod_and_mdi() {
        assert_eq!(evaluate(BasicOpcode::Mod, 7, 3, 0).value, 1);
        assert_eq!(evaluate(BasicOpcode::Mod, 7, 0, 0).value, 0);
        // -7 MDI 16 = -7
        assert_eq!(mdi(0xfff9, 16).value, 0xfff9);
        assert_eq!(mdi(0x8000, 0xffff).value, 0);
    }

    #[test]
    fn test_shifts_keep_shifted_out_bits_in_ex() {
        assert_eq!(shr(0x0003, 1), AluResult::with_ex(0x0001, 0x8000));
        assert_eq!(asr(0x8000, 4), AluResult::with_ex(0xf800, 0x0000));
        assert_eq!(shl(0x8001, 1), AluResult::with_ex(0x0002, 0x0001));
    }

    #[test]
    fn test_large_shift_counts_do_not_panic() {
        assert_eq!(shr(0xffff, 40), AluResult::with_ex(0, 0));
        assert_eq!(asr(0x8000, 0xffff), AluResult::with_ex(0xffff, 0xffff));
        assert_eq!(shl(0xffff, 0xffff), AluResult::with_ex(0, 0));
        assert_eq!(shl(0xffff, 20), AluResult::with_ex(0, 0xfff0));
    }

    #[test]
    fn test_adx_sbx_carry_chain() {
        assert_eq!(adx(0xffff, 0, 1), AluResult::with_ex(0, 1));
        assert_eq!(adx(1, 1, 1), AluResult::with_ex(3, 0));
        assert_eq!(sbx(0, 0, 0xffff), AluResult::with_ex(0xffff, 0xffff));
        assert_eq!(sbx(0xffff, 0, 1), AluResult::with_ex(0, 1));
        assert_eq!(sbx(5, 2, 0), AluResult::with_ex(3, 0));
    }

    #[test]
    fn test_bitwise_leaves_ex_alone() {
        assert_eq!(evaluate(BasicOpcode::And, 0xf0f0, 0xff00, 7).ex, None);
        assert_eq!(evaluate(BasicOpcode::Bor, 0xf000, 0x000f, 7).value, 0xf00f);
        assert_eq!(evaluate(BasicOpcode::Xor, 0xffff, 0x00ff, 7).value, 0xff00);
    }
}
