//! Execute handlers for the data-processing and PSR-transfer families.

use crate::alu::{self, AluOp};
use crate::cpu::Arm7Tdmi;
use crate::decode::Operand2;
use crate::psr::{self, Mode, Psr, MODE_MASK};
use crate::registers::PC;
use crate::shifter::{self, Shifted};

impl Arm7Tdmi {
    pub(crate) fn exec_data_proc(&mut self, word: u32, op: AluOp, set_flags: bool, operand: Operand2) {
        let reg_shift = operand == Operand2::ShiftReg;
        let op2 = self.operand2(word, operand);
        let rn = ((word >> 16) & 0xF) as usize;
        let rd = ((word >> 12) & 0xF) as usize;
        let mut op1 = self.regs.read(rn);
        // With a register-specified shift the first operand is read one
        // cycle later, so a PC read sees one more word of lookahead.
        if rn == PC && reg_shift {
            op1 = op1.wrapping_add(4);
        }

        let result = alu::apply(op, op1, op2.value, self.regs.cpsr, op2.carry);

        if set_flags {
            if rd == PC && op.writes_rd() {
                // S-variant write to the PC: the SPSR comes back with it.
                // In User/System there is no SPSR and this reloads the
                // live CPSR, which is a no-op.
                let spsr = self.regs.spsr();
                self.regs.switch_mode(spsr.mode());
                self.regs.cpsr = spsr;
            } else {
                self.regs.cpsr.set_nz(result.value);
                self.regs.cpsr.set_c(result.carry);
                self.regs.cpsr.set_v(result.overflow);
            }
        }
        if op.writes_rd() {
            self.write_reg(rd, result.value);
        }
    }

    /// MRS: read CPSR or the current mode's SPSR into a register.
    pub(crate) fn exec_mrs(&mut self, word: u32, spsr: bool) {
        let rd = ((word >> 12) & 0xF) as usize;
        let value = if spsr {
            self.regs.spsr().bits()
        } else {
            self.regs.cpsr.bits()
        };
        self.write_reg(rd, value);
    }

    /// MSR: write fields of CPSR or the current mode's SPSR.
    ///
    /// Only the flags byte (field bit 19) and control byte (field bit 16)
    /// exist on this architecture. User mode can touch the flags byte
    /// only, and the Thumb bit is never writable this way; state changes
    /// go through BX.
    pub(crate) fn exec_msr(&mut self, word: u32, spsr: bool, immediate: bool) {
        let value = if immediate {
            shifter::rotate_imm8(word & 0xFF, (word >> 8) & 0xF, self.regs.cpsr.c()).value
        } else {
            self.regs.read((word & 0xF) as usize)
        };
        let mut mask = 0u32;
        if word & (1 << 19) != 0 {
            mask |= 0xFF00_0000;
        }
        if word & (1 << 16) != 0 {
            mask |= 0x0000_00FF;
        }

        if spsr {
            let old = self.regs.spsr();
            self.regs
                .set_spsr(Psr::from_bits((old.bits() & !mask) | (value & mask)));
            return;
        }

        if self.regs.cpsr.mode() == Mode::User {
            mask &= 0xFF00_0000;
        }
        mask &= !psr::T;

        let new_bits = (self.regs.cpsr.bits() & !mask) | (value & mask);
        let new_bits = match Mode::from_bits(new_bits) {
            Some(mode) => {
                self.regs.switch_mode(mode);
                new_bits
            }
            // Reserved mode encodings keep the current mode field.
            None => (new_bits & !MODE_MASK) | self.regs.cpsr.mode().bits(),
        };
        self.regs.cpsr = Psr::from_bits(new_bits);
    }

    /// Evaluate the second operand through the barrel shifter. A
    /// register-specified count occupies the datapath for one extra
    /// internal cycle.
    fn operand2(&mut self, word: u32, operand: Operand2) -> Shifted {
        let carry = self.regs.cpsr.c();
        match operand {
            Operand2::RotImm => {
                shifter::rotate_imm8(word & 0xFF, (word >> 8) & 0xF, carry)
            }
            Operand2::ShiftImm => {
                let rm = self.regs.read((word & 0xF) as usize);
                shifter::shift_imm((word >> 5) & 3, (word >> 7) & 0x1F, rm, carry)
            }
            Operand2::ShiftReg => {
                self.timer.internal(1);
                let count = self.regs.read(((word >> 8) & 0xF) as usize) & 0xFF;
                let rm_idx = (word & 0xF) as usize;
                let mut rm = self.regs.read(rm_idx);
                if rm_idx == PC {
                    rm = rm.wrapping_add(4);
                }
                shifter::shift_reg((word >> 5) & 3, count, rm, carry)
            }
        }
    }
}
