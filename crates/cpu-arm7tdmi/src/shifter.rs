//! Barrel shifter: operand-2 evaluation for the data-processing path and
//! the scaled-register addressing modes.
//!
//! Every variant produces a value *and* a carry-out (the last bit shifted
//! off the end). The carry-out only reaches the status register when a
//! flag-setting logical instruction consumes it; callers decide that.
//!
//! The immediate and register-count encodings disagree about the meaning
//! of zero, so they get separate entry points:
//! - immediate count 0 encodes a special form per type (LSL#0 pass-through,
//!   LSR#32, ASR#32, RRX);
//! - a register count of 0 always passes the value through untouched, and
//!   counts of 32 and above are reachable (the low byte of the register is
//!   used unmasked up to 255).

/// Shift type field (instruction bits 6:5).
pub(crate) const LSL: u32 = 0;
pub(crate) const LSR: u32 = 1;
pub(crate) const ASR: u32 = 2;
pub(crate) const ROR: u32 = 3;

/// A shifter result: the operand value and the carry-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shifted {
    pub value: u32,
    pub carry: bool,
}

const fn bit(value: u32, n: u32) -> bool {
    value & (1 << n) != 0
}

/// Shift by an immediate 5-bit amount, with the count-0 special forms.
pub(crate) fn shift_imm(kind: u32, amount: u32, value: u32, carry_in: bool) -> Shifted {
    debug_assert!(amount < 32);
    match (kind, amount) {
        // LSL #0: untouched, carry flows through.
        (LSL, 0) => Shifted { value, carry: carry_in },
        (LSL, n) => Shifted {
            value: value << n,
            carry: bit(value, 32 - n),
        },
        // LSR #0 encodes LSR #32: everything shifted out.
        (LSR, 0) => Shifted {
            value: 0,
            carry: bit(value, 31),
        },
        (LSR, n) => Shifted {
            value: value >> n,
            carry: bit(value, n - 1),
        },
        // ASR #0 encodes ASR #32: sign fill.
        (ASR, 0) => Shifted {
            value: ((value as i32) >> 31) as u32,
            carry: bit(value, 31),
        },
        (ASR, n) => Shifted {
            value: ((value as i32) >> n) as u32,
            carry: bit(value, n - 1),
        },
        // ROR #0 encodes RRX: rotate through carry by one.
        (ROR, 0) => Shifted {
            value: (u32::from(carry_in) << 31) | (value >> 1),
            carry: bit(value, 0),
        },
        (ROR, n) => {
            let rotated = value.rotate_right(n);
            Shifted {
                value: rotated,
                carry: bit(rotated, 31),
            }
        }
        _ => unreachable!("shift type field is two bits"),
    }
}

/// Shift by a register-supplied count (already reduced to its low byte).
pub(crate) fn shift_reg(kind: u32, count: u32, value: u32, carry_in: bool) -> Shifted {
    debug_assert!(count < 256);
    if count == 0 {
        return Shifted { value, carry: carry_in };
    }
    match kind {
        LSL => match count {
            1..=31 => Shifted {
                value: value << count,
                carry: bit(value, 32 - count),
            },
            32 => Shifted {
                value: 0,
                carry: bit(value, 0),
            },
            _ => Shifted { value: 0, carry: false },
        },
        LSR => match count {
            1..=31 => Shifted {
                value: value >> count,
                carry: bit(value, count - 1),
            },
            32 => Shifted {
                value: 0,
                carry: bit(value, 31),
            },
            _ => Shifted { value: 0, carry: false },
        },
        ASR => {
            if count < 32 {
                Shifted {
                    value: ((value as i32) >> count) as u32,
                    carry: bit(value, count - 1),
                }
            } else {
                // Saturates: every bit is the sign bit.
                Shifted {
                    value: ((value as i32) >> 31) as u32,
                    carry: bit(value, 31),
                }
            }
        }
        ROR => {
            let n = count & 31;
            if n == 0 {
                // Nonzero multiple of 32: value intact, carry from bit 31.
                Shifted {
                    value,
                    carry: bit(value, 31),
                }
            } else {
                let rotated = value.rotate_right(n);
                Shifted {
                    value: rotated,
                    carry: bit(rotated, 31),
                }
            }
        }
        _ => unreachable!("shift type field is two bits"),
    }
}

/// Rotated 8-bit immediate (data-processing immediate form): the byte is
/// rotated right by twice the 4-bit rotate field. Rotate 0 leaves the carry
/// untouched; any other rotate takes carry from bit 31 of the result.
pub(crate) fn rotate_imm8(imm8: u32, rot4: u32, carry_in: bool) -> Shifted {
    debug_assert!(imm8 < 256 && rot4 < 16);
    if rot4 == 0 {
        return Shifted { value: imm8, carry: carry_in };
    }
    let value = imm8.rotate_right(rot4 * 2);
    Shifted {
        value,
        carry: bit(value, 31),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsl_zero_passes_carry_through() {
        let s = shift_imm(LSL, 0, 0xFFFF_FFFF, true);
        assert_eq!(s, Shifted { value: 0xFFFF_FFFF, carry: true });
        let s = shift_imm(LSL, 0, 0xFFFF_FFFF, false);
        assert!(!s.carry);
    }

    #[test]
    fn lsl_carry_is_last_bit_out() {
        let s = shift_imm(LSL, 1, 0x8000_0001, false);
        assert_eq!(s.value, 2);
        assert!(s.carry);
        let s = shift_imm(LSL, 4, 0x0800_0000, false);
        assert_eq!(s.value, 0x8000_0000);
        assert!(!s.carry);
    }

    #[test]
    fn lsr_zero_means_thirty_two() {
        let s = shift_imm(LSR, 0, 0x8000_0000, false);
        assert_eq!(s, Shifted { value: 0, carry: true });
        let s = shift_imm(LSR, 0, 0x7FFF_FFFF, true);
        assert_eq!(s, Shifted { value: 0, carry: false });
    }

    #[test]
    fn asr_zero_sign_fills() {
        let s = shift_imm(ASR, 0, 0x8000_0000, false);
        assert_eq!(s, Shifted { value: 0xFFFF_FFFF, carry: true });
        let s = shift_imm(ASR, 0, 0x4000_0000, true);
        assert_eq!(s, Shifted { value: 0, carry: false });
    }

    #[test]
    fn rrx_rotates_through_carry() {
        let s = shift_imm(ROR, 0, 0x0000_0001, true);
        assert_eq!(s, Shifted { value: 0x8000_0000, carry: true });
        let s = shift_imm(ROR, 0, 0x0000_0002, false);
        assert_eq!(s, Shifted { value: 0x0000_0001, carry: false });
    }

    #[test]
    fn register_count_zero_is_untouched() {
        for kind in [LSL, LSR, ASR, ROR] {
            let s = shift_reg(kind, 0, 0xDEAD_BEEF, true);
            assert_eq!(s, Shifted { value: 0xDEAD_BEEF, carry: true });
        }
    }

    #[test]
    fn register_count_exactly_thirty_two() {
        let s = shift_reg(LSL, 32, 0x0000_0001, false);
        assert_eq!(s, Shifted { value: 0, carry: true });
        let s = shift_reg(LSR, 32, 0x8000_0000, false);
        assert_eq!(s, Shifted { value: 0, carry: true });
    }

    #[test]
    fn register_count_over_thirty_two() {
        let s = shift_reg(LSL, 33, 0xFFFF_FFFF, true);
        assert_eq!(s, Shifted { value: 0, carry: false });
        let s = shift_reg(LSR, 200, 0xFFFF_FFFF, true);
        assert_eq!(s, Shifted { value: 0, carry: false });
        // ASR keeps saturating instead.
        let s = shift_reg(ASR, 100, 0x8000_0000, false);
        assert_eq!(s, Shifted { value: 0xFFFF_FFFF, carry: true });
    }

    #[test]
    fn register_ror_multiple_of_thirty_two() {
        let s = shift_reg(ROR, 64, 0x8000_0001, false);
        assert_eq!(s, Shifted { value: 0x8000_0001, carry: true });
    }

    #[test]
    fn rotated_immediate_carry() {
        // Rotate 0: carry untouched.
        let s = rotate_imm8(0xFF, 0, true);
        assert_eq!(s, Shifted { value: 0xFF, carry: true });
        // Rotate producing a high bit: carry = bit 31.
        let s = rotate_imm8(0x80, 4, false);
        assert_eq!(s.value, 0x80u32.rotate_right(8));
        assert!(s.carry == (s.value & 0x8000_0000 != 0));
    }
}
