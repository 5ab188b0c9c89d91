//! Multiply unit: products and the data-dependent cycle model.
//!
//! The array multiplier retires 8 multiplier bits per cycle and stops early
//! once the remaining high bytes of the multiplier are all zeros, or all
//! ones when the operands are treated as signed (sign extension carries no
//! information). That gives 1-4 internal cycles for the 32-bit forms and
//! one extra for the long forms' second accumulator cycle; accumulating
//! adds one more on either.

use crate::cpu::Arm7Tdmi;

/// Internal cycles consumed by the multiplier array for multiplier value
/// `rs` (1 to 4).
pub(crate) fn array_cycles(rs: u32, signed: bool) -> u32 {
    const MASKS: [u32; 3] = [0xFFFF_FF00, 0xFFFF_0000, 0xFF00_0000];
    for (i, mask) in MASKS.iter().enumerate() {
        let top = rs & mask;
        if top == 0 || (signed && top == *mask) {
            return i as u32 + 1;
        }
    }
    4
}

/// 64-bit product for the long forms. `signed` selects SMULL/SMLAL
/// sign-extension of both operands.
pub(crate) fn long_product(rm: u32, rs: u32, signed: bool) -> u64 {
    if signed {
        (i64::from(rm as i32) * i64::from(rs as i32)) as u64
    } else {
        u64::from(rm) * u64::from(rs)
    }
}

impl Arm7Tdmi {
    /// MUL/MLA: 32x32 -> 32, truncating. The multiplier always wraps at 32
    /// bits; early termination of the array only affects timing, never the
    /// result. C becomes meaningless after a flag-setting multiply on this
    /// core and is left unchanged.
    pub(crate) fn exec_multiply(&mut self, word: u32, accumulate: bool, set_flags: bool) {
        let rd = ((word >> 16) & 0xF) as usize;
        let rn = ((word >> 12) & 0xF) as usize;
        let rs_val = self.regs.read(((word >> 8) & 0xF) as usize);
        let rm_val = self.regs.read((word & 0xF) as usize);

        // The short forms scan the multiplier as signed: sign-fill bytes
        // carry no information either way.
        let mut cycles = array_cycles(rs_val, true);
        let mut result = rm_val.wrapping_mul(rs_val);
        if accumulate {
            result = result.wrapping_add(self.regs.read(rn));
            cycles += 1;
        }
        self.timer.internal(cycles);
        self.regs.write(rd, result);
        if set_flags {
            self.regs.cpsr.set_nz(result);
        }
    }

    /// UMULL/UMLAL/SMULL/SMLAL: 32x32 -> 64 into an rdhi:rdlo pair.
    pub(crate) fn exec_multiply_long(
        &mut self,
        word: u32,
        signed: bool,
        accumulate: bool,
        set_flags: bool,
    ) {
        let rdhi = ((word >> 16) & 0xF) as usize;
        let rdlo = ((word >> 12) & 0xF) as usize;
        let rs_val = self.regs.read(((word >> 8) & 0xF) as usize);
        let rm_val = self.regs.read((word & 0xF) as usize);

        // One extra cycle over the short forms for the high word.
        let mut cycles = array_cycles(rs_val, signed) + 1;
        let mut product = long_product(rm_val, rs_val, signed);
        if accumulate {
            let acc = (u64::from(self.regs.read(rdhi)) << 32) | u64::from(self.regs.read(rdlo));
            product = product.wrapping_add(acc);
            cycles += 1;
        }
        self.timer.internal(cycles);
        self.regs.write(rdlo, product as u32);
        self.regs.write(rdhi, (product >> 32) as u32);
        if set_flags {
            self.regs.cpsr.set_n(product & (1 << 63) != 0);
            self.regs.cpsr.set_z(product == 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_track_significant_bytes() {
        assert_eq!(array_cycles(0x0000_0000, false), 1);
        assert_eq!(array_cycles(0x0000_00FF, false), 1);
        assert_eq!(array_cycles(0x0000_0100, false), 2);
        assert_eq!(array_cycles(0x0000_FFFF, false), 2);
        assert_eq!(array_cycles(0x0001_0000, false), 3);
        assert_eq!(array_cycles(0x00FF_FFFF, false), 3);
        assert_eq!(array_cycles(0x0100_0000, false), 4);
        assert_eq!(array_cycles(0xFFFF_FFFF, false), 4);
    }

    #[test]
    fn signed_sign_extension_terminates_early() {
        // -1: every byte is sign fill.
        assert_eq!(array_cycles(0xFFFF_FFFF, true), 1);
        // -256: low byte significant, rest sign fill.
        assert_eq!(array_cycles(0xFFFF_FF00, true), 1);
        assert_eq!(array_cycles(0xFFFF_8000, true), 2);
        assert_eq!(array_cycles(0xFF80_0000, true), 3);
        assert_eq!(array_cycles(0x8000_0000, true), 4);
    }

    #[test]
    fn long_products() {
        assert_eq!(long_product(0xFFFF_FFFF, 2, false), 0x1_FFFF_FFFE);
        // -1 * 2 = -2 signed.
        assert_eq!(long_product(0xFFFF_FFFF, 2, true), (-2i64) as u64);
        assert_eq!(
            long_product(0x8000_0000, 0x8000_0000, true),
            0x4000_0000_0000_0000
        );
    }
}
