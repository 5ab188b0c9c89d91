//! Data-processing ALU: the sixteen opcodes and their flag rules.
//!
//! Arithmetic runs in a 64-bit domain so the carry falls out of the wide
//! result instead of per-operand case analysis: for additions C is set when
//! the wide sum no longer fits 32 bits, for subtractions C is the *no
//! borrow* convention (set when the wide difference still fits). Logical
//! opcodes never touch C themselves; their carry comes from the shifter.

use crate::psr::Psr;

/// The sixteen data-processing opcodes (instruction bits 24:21).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AluOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl AluOp {
    pub(crate) fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            0xF => Self::Mvn,
            _ => unreachable!(),
        }
    }

    /// Test/compare opcodes compute flags only and never write rd.
    pub(crate) fn writes_rd(self) -> bool {
        !matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }
}

/// An ALU result with the full post-instruction C and V values: callers
/// apply them (plus N/Z from `value`) only on flag-setting variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AluResult {
    pub value: u32,
    pub carry: bool,
    pub overflow: bool,
}

/// Run one opcode. `flags` supplies carry-in for the with-carry forms and
/// the current C/V for opcodes that leave them alone; `shifter_carry` is
/// the barrel shifter's carry-out, which becomes C for logical opcodes.
pub(crate) fn apply(op: AluOp, op1: u32, op2: u32, flags: Psr, shifter_carry: bool) -> AluResult {
    let carry_in = u64::from(flags.c());
    match op {
        AluOp::And | AluOp::Tst => logical(op1 & op2, shifter_carry, flags),
        AluOp::Eor | AluOp::Teq => logical(op1 ^ op2, shifter_carry, flags),
        AluOp::Orr => logical(op1 | op2, shifter_carry, flags),
        AluOp::Bic => logical(op1 & !op2, shifter_carry, flags),
        AluOp::Mov => logical(op2, shifter_carry, flags),
        AluOp::Mvn => logical(!op2, shifter_carry, flags),
        AluOp::Add | AluOp::Cmn => add(op1, op2, 0),
        AluOp::Adc => add(op1, op2, carry_in),
        AluOp::Sub | AluOp::Cmp => sub(op1, op2, 0),
        AluOp::Sbc => sub(op1, op2, 1 - carry_in),
        AluOp::Rsb => sub(op2, op1, 0),
        AluOp::Rsc => sub(op2, op1, 1 - carry_in),
    }
}

fn logical(value: u32, shifter_carry: bool, flags: Psr) -> AluResult {
    AluResult {
        value,
        carry: shifter_carry,
        overflow: flags.v(),
    }
}

fn add(op1: u32, op2: u32, carry_in: u64) -> AluResult {
    let wide = u64::from(op1) + u64::from(op2) + carry_in;
    let value = wide as u32;
    AluResult {
        value,
        carry: wide >> 32 != 0,
        // Signed overflow: both operands agree in sign and the result
        // disagrees with them.
        overflow: (!(op1 ^ op2) & (op1 ^ value)) >> 31 != 0,
    }
}

fn sub(op1: u32, op2: u32, borrow: u64) -> AluResult {
    let wide = u64::from(op1)
        .wrapping_sub(u64::from(op2))
        .wrapping_sub(borrow);
    let value = wide as u32;
    AluResult {
        value,
        // No-borrow convention: set when the subtraction did not wrap.
        carry: wide <= u64::from(u32::MAX),
        overflow: ((op1 ^ op2) & (op1 ^ value)) >> 31 != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(c: bool, v: bool) -> Psr {
        let mut p = Psr::from_bits(0);
        p.set_c(c);
        p.set_v(v);
        p
    }

    #[test]
    fn add_carry_and_overflow() {
        // 0x7FFFFFFF + 1: signed overflow, no unsigned carry.
        let r = apply(AluOp::Add, 0x7FFF_FFFF, 1, flags(false, false), false);
        assert_eq!(r.value, 0x8000_0000);
        assert!(!r.carry);
        assert!(r.overflow);

        // 0xFFFFFFFF + 1: unsigned carry, no signed overflow.
        let r = apply(AluOp::Add, 0xFFFF_FFFF, 1, flags(false, false), false);
        assert_eq!(r.value, 0);
        assert!(r.carry);
        assert!(!r.overflow);
    }

    #[test]
    fn sub_no_borrow_convention() {
        // 5 - 3: no borrow, C set.
        let r = apply(AluOp::Sub, 5, 3, flags(false, false), false);
        assert_eq!(r.value, 2);
        assert!(r.carry);

        // 3 - 5: borrow, C clear.
        let r = apply(AluOp::Sub, 3, 5, flags(false, false), false);
        assert_eq!(r.value, 0xFFFF_FFFE);
        assert!(!r.carry);
    }

    #[test]
    fn sub_self_is_zero_carry_set_no_overflow() {
        let r = apply(AluOp::Sub, 0x8000_0000, 0x8000_0000, flags(false, true), false);
        assert_eq!(r.value, 0);
        assert!(r.carry);
        assert!(!r.overflow);
    }

    #[test]
    fn sub_overflow() {
        // INT_MIN - 1 overflows.
        let r = apply(AluOp::Sub, 0x8000_0000, 1, flags(false, false), false);
        assert_eq!(r.value, 0x7FFF_FFFF);
        assert!(r.overflow);
        assert!(r.carry);
    }

    #[test]
    fn adc_and_sbc_use_carry_in() {
        let r = apply(AluOp::Adc, 1, 1, flags(true, false), false);
        assert_eq!(r.value, 3);
        // SBC with C set is a plain subtract.
        let r = apply(AluOp::Sbc, 5, 3, flags(true, false), false);
        assert_eq!(r.value, 2);
        // SBC with C clear subtracts one more.
        let r = apply(AluOp::Sbc, 5, 3, flags(false, false), false);
        assert_eq!(r.value, 1);
    }

    #[test]
    fn rsb_reverses_operands() {
        let r = apply(AluOp::Rsb, 3, 10, flags(false, false), false);
        assert_eq!(r.value, 7);
        assert!(r.carry);
    }

    #[test]
    fn logical_takes_carry_from_shifter_and_keeps_v() {
        let r = apply(AluOp::And, 0xF0, 0x0F, flags(false, true), true);
        assert_eq!(r.value, 0);
        assert!(r.carry, "shifter carry-out becomes C");
        assert!(r.overflow, "V untouched by logical ops");
    }

    #[test]
    fn mvn_inverts() {
        let r = apply(AluOp::Mvn, 0, 0, flags(false, false), false);
        assert_eq!(r.value, 0xFFFF_FFFF);
    }

    #[test]
    fn compare_ops_do_not_write() {
        assert!(!AluOp::Tst.writes_rd());
        assert!(!AluOp::Teq.writes_rd());
        assert!(!AluOp::Cmp.writes_rd());
        assert!(!AluOp::Cmn.writes_rd());
        assert!(AluOp::Add.writes_rd());
        assert!(AluOp::Mvn.writes_rd());
    }
}
