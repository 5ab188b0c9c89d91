//! Thumb instruction decode and execution.
//!
//! A 64-entry table indexed by halfword bits 15:10 selects the format;
//! formats whose leading bits cover several operations sub-dispatch on the
//! remaining fields inside their handler. Semantically everything funnels
//! into the same ALU, shifter and transfer machinery as the 32-bit
//! decoder; only the field extraction differs.

use crate::alu::{self, AluOp};
use crate::bus::Arm7Bus;
use crate::cpu::Arm7Tdmi;
use crate::exceptions::Exception;
use crate::multiply;
use crate::registers::{LR, PC, SP};
use crate::shifter::{self, ASR, LSL, LSR, ROR};
use crate::timing::Width;

/// Thumb instruction formats, one tag per table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThumbOp {
    /// LSL/LSR/ASR by a 5-bit immediate.
    ShiftImm,
    /// Three-register / small-immediate ADD and SUB.
    AddSub,
    /// MOV/CMP/ADD/SUB with an 8-bit immediate.
    AluImm,
    /// The sixteen two-register ALU operations.
    AluReg,
    /// High-register ADD/CMP/MOV and BX.
    HiRegBx,
    /// PC-relative word load.
    LdrPc,
    /// Register-offset loads and stores, including the signed forms.
    TransferReg,
    /// Immediate-offset word and byte loads and stores.
    TransferImm,
    /// Immediate-offset halfword loads and stores.
    TransferHalf,
    /// SP-relative word loads and stores.
    TransferSp,
    /// Address generation from PC or SP.
    LoadAddress,
    /// SP adjustment and PUSH/POP.
    Misc,
    /// LDMIA/STMIA.
    BlockTransfer,
    /// Conditional branch, with SWI in the 1111 condition slot.
    CondBranchSwi,
    /// Unconditional branch.
    Branch,
    /// First half of the BL pair: load the high offset part into lr.
    BlHigh,
    /// Second half of the BL pair: branch and leave the return address.
    BlLow,
    Undefined,
}

pub(crate) fn thumb_index(word: u32) -> usize {
    ((word >> 10) & 0x3F) as usize
}

pub(crate) fn build_thumb_table() -> [ThumbOp; 64] {
    let mut table = [ThumbOp::Undefined; 64];
    for (index, slot) in table.iter_mut().enumerate() {
        *slot = decode(index as u32);
    }
    table
}

fn decode(index: u32) -> ThumbOp {
    match index {
        0b00_0110 | 0b00_0111 => ThumbOp::AddSub,
        0b00_0000..=0b00_0101 => ThumbOp::ShiftImm,
        0b00_1000..=0b00_1111 => ThumbOp::AluImm,
        0b01_0000 => ThumbOp::AluReg,
        0b01_0001 => ThumbOp::HiRegBx,
        0b01_0010 | 0b01_0011 => ThumbOp::LdrPc,
        0b01_0100..=0b01_0111 => ThumbOp::TransferReg,
        0b01_1000..=0b01_1111 => ThumbOp::TransferImm,
        0b10_0000..=0b10_0011 => ThumbOp::TransferHalf,
        0b10_0100..=0b10_0111 => ThumbOp::TransferSp,
        0b10_1000..=0b10_1011 => ThumbOp::LoadAddress,
        0b10_1100..=0b10_1111 => ThumbOp::Misc,
        0b11_0000..=0b11_0011 => ThumbOp::BlockTransfer,
        0b11_0100..=0b11_0111 => ThumbOp::CondBranchSwi,
        0b11_1000 | 0b11_1001 => ThumbOp::Branch,
        // The 11101 slot is a later architecture's BLX; reserved here.
        0b11_1010 | 0b11_1011 => ThumbOp::Undefined,
        0b11_1100 | 0b11_1101 => ThumbOp::BlHigh,
        0b11_1110 | 0b11_1111 => ThumbOp::BlLow,
        _ => unreachable!("index is six bits"),
    }
}

impl Arm7Tdmi {
    pub(crate) fn exec_thumb<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        match self.thumb_table[thumb_index(word)] {
            ThumbOp::ShiftImm => self.thumb_shift_imm(word),
            ThumbOp::AddSub => self.thumb_add_sub(word),
            ThumbOp::AluImm => self.thumb_alu_imm(word),
            ThumbOp::AluReg => self.thumb_alu_reg(word),
            ThumbOp::HiRegBx => self.thumb_hi_reg_bx(word),
            ThumbOp::LdrPc => self.thumb_ldr_pc(bus, word),
            ThumbOp::TransferReg => self.thumb_transfer_reg(bus, word),
            ThumbOp::TransferImm => self.thumb_transfer_imm(bus, word),
            ThumbOp::TransferHalf => self.thumb_transfer_half(bus, word),
            ThumbOp::TransferSp => self.thumb_transfer_sp(bus, word),
            ThumbOp::LoadAddress => self.thumb_load_address(word),
            ThumbOp::Misc => self.thumb_misc(bus, word),
            ThumbOp::BlockTransfer => self.thumb_block_transfer(bus, word),
            ThumbOp::CondBranchSwi => self.thumb_cond_branch_swi(bus, word),
            ThumbOp::Branch => self.thumb_branch(word),
            ThumbOp::BlHigh => self.thumb_bl_high(word),
            ThumbOp::BlLow => self.thumb_bl_low(word),
            ThumbOp::Undefined => self.enter_exception(bus, Exception::Undefined),
        }
    }

    fn thumb_shift_imm(&mut self, word: u32) {
        let kind = (word >> 11) & 3;
        let amount = (word >> 6) & 0x1F;
        let rs = ((word >> 3) & 7) as usize;
        let rd = (word & 7) as usize;
        // Count 0 carries the same LSR#32/ASR#32 meanings as the 32-bit
        // encodings; LSL#0 is the canonical MOV.
        let s = shifter::shift_imm(kind, amount, self.regs.read(rs), self.regs.cpsr.c());
        self.regs.write(rd, s.value);
        self.regs.cpsr.set_nz(s.value);
        self.regs.cpsr.set_c(s.carry);
    }

    fn thumb_add_sub(&mut self, word: u32) {
        let imm_form = word & (1 << 10) != 0;
        let sub = word & (1 << 9) != 0;
        let field = (word >> 6) & 7;
        let op2 = if imm_form {
            field
        } else {
            self.regs.read(field as usize)
        };
        let op1 = self.regs.read(((word >> 3) & 7) as usize);
        let rd = (word & 7) as usize;
        let op = if sub { AluOp::Sub } else { AluOp::Add };
        let r = alu::apply(op, op1, op2, self.regs.cpsr, false);
        self.regs.write(rd, r.value);
        self.set_nzcv(r);
    }

    fn thumb_alu_imm(&mut self, word: u32) {
        let rd = ((word >> 8) & 7) as usize;
        let imm = word & 0xFF;
        let op = match (word >> 11) & 3 {
            0 => AluOp::Mov,
            1 => AluOp::Cmp,
            2 => AluOp::Add,
            _ => AluOp::Sub,
        };
        // MOV's "shifter carry" is the current C, leaving it untouched.
        let r = alu::apply(op, self.regs.read(rd), imm, self.regs.cpsr, self.regs.cpsr.c());
        if op.writes_rd() {
            self.regs.write(rd, r.value);
        }
        self.set_nzcv(r);
    }

    fn thumb_alu_reg(&mut self, word: u32) {
        let op = (word >> 6) & 0xF;
        let rs = ((word >> 3) & 7) as usize;
        let rd = (word & 7) as usize;
        match op {
            // Register-count shifts: same datapath cost as the 32-bit
            // forms, one extra internal cycle.
            0x2 | 0x3 | 0x4 | 0x7 => {
                self.timer.internal(1);
                let kind = match op {
                    0x2 => LSL,
                    0x3 => LSR,
                    0x4 => ASR,
                    _ => ROR,
                };
                let count = self.regs.read(rs) & 0xFF;
                let s = shifter::shift_reg(kind, count, self.regs.read(rd), self.regs.cpsr.c());
                self.regs.write(rd, s.value);
                self.regs.cpsr.set_nz(s.value);
                self.regs.cpsr.set_c(s.carry);
            }
            0xD => {
                let rd_val = self.regs.read(rd);
                let result = rd_val.wrapping_mul(self.regs.read(rs));
                // The multiplier array scans the destination's old value.
                self.timer.internal(multiply::array_cycles(rd_val, true));
                self.regs.write(rd, result);
                self.regs.cpsr.set_nz(result);
            }
            // NEG rd, rs: reverse-subtract from zero.
            0x9 => {
                let r = alu::apply(AluOp::Rsb, self.regs.read(rs), 0, self.regs.cpsr, false);
                self.regs.write(rd, r.value);
                self.set_nzcv(r);
            }
            _ => {
                let alu_op = match op {
                    0x0 => AluOp::And,
                    0x1 => AluOp::Eor,
                    0x5 => AluOp::Adc,
                    0x6 => AluOp::Sbc,
                    0x8 => AluOp::Tst,
                    0xA => AluOp::Cmp,
                    0xB => AluOp::Cmn,
                    0xC => AluOp::Orr,
                    0xE => AluOp::Bic,
                    _ => AluOp::Mvn,
                };
                let carry = self.regs.cpsr.c();
                let r = alu::apply(alu_op, self.regs.read(rd), self.regs.read(rs), self.regs.cpsr, carry);
                if alu_op.writes_rd() {
                    self.regs.write(rd, r.value);
                }
                self.set_nzcv(r);
            }
        }
    }

    fn thumb_hi_reg_bx(&mut self, word: u32) {
        let rd = ((word & 7) | ((word >> 4) & 8)) as usize;
        let rs = ((word >> 3) & 0xF) as usize;
        match (word >> 8) & 3 {
            // ADD and MOV on the full register file, flags untouched.
            0 => {
                let v = self.regs.read(rd).wrapping_add(self.regs.read(rs));
                self.write_reg(rd, v);
            }
            1 => {
                let r = alu::apply(
                    AluOp::Cmp,
                    self.regs.read(rd),
                    self.regs.read(rs),
                    self.regs.cpsr,
                    false,
                );
                self.set_nzcv(r);
            }
            2 => {
                let v = self.regs.read(rs);
                self.write_reg(rd, v);
            }
            _ => {
                let target = self.regs.read(rs);
                self.regs.cpsr.set_thumb(target & 1 != 0);
                self.branch_to(target);
            }
        }
    }

    fn thumb_ldr_pc<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let rd = ((word >> 8) & 7) as usize;
        let offset = (word & 0xFF) * 4;
        // The base is the fetch address forced to word alignment.
        let addr = (self.regs.read(PC) & !3).wrapping_add(offset);
        self.timer.data(addr, Width::Word, true);
        let value = bus.read_word(addr, 0);
        self.timer.internal(1);
        self.regs.write(rd, value);
    }

    fn thumb_transfer_reg<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let ro = ((word >> 6) & 7) as usize;
        let rb = ((word >> 3) & 7) as usize;
        let rd = (word & 7) as usize;
        let addr = self.regs.read(rb).wrapping_add(self.regs.read(ro));
        match (word >> 9) & 7 {
            0 => {
                self.timer.data(addr & !3, Width::Word, true);
                bus.write_word(addr & !3, self.regs.read(rd), 0);
            }
            1 => {
                self.timer.data(addr & !1, Width::Half, true);
                bus.write_half(addr & !1, self.regs.read(rd) as u16, 0);
            }
            2 => {
                self.timer.data(addr, Width::Byte, true);
                bus.write_byte(addr, self.regs.read(rd) as u8, 0);
            }
            3 => {
                self.timer.data(addr, Width::Byte, true);
                let v = bus.read_byte(addr, 0) as i8 as i32 as u32;
                self.timer.internal(1);
                self.regs.write(rd, v);
            }
            4 => {
                self.timer.data(addr & !3, Width::Word, true);
                let v = bus.read_word(addr & !3, 0).rotate_right(8 * (addr & 3));
                self.timer.internal(1);
                self.regs.write(rd, v);
            }
            5 => {
                self.timer.data(addr & !1, Width::Half, true);
                let v = u32::from(bus.read_half(addr & !1, 0)).rotate_right(8 * (addr & 1));
                self.timer.internal(1);
                self.regs.write(rd, v);
            }
            6 => {
                self.timer.data(addr, Width::Byte, true);
                let v = u32::from(bus.read_byte(addr, 0));
                self.timer.internal(1);
                self.regs.write(rd, v);
            }
            _ => {
                // Misaligned signed halfword degrades to a signed byte.
                let v = if addr & 1 != 0 {
                    self.timer.data(addr, Width::Byte, true);
                    bus.read_byte(addr, 0) as i8 as i32 as u32
                } else {
                    self.timer.data(addr, Width::Half, true);
                    bus.read_half(addr, 0) as i16 as i32 as u32
                };
                self.timer.internal(1);
                self.regs.write(rd, v);
            }
        }
    }

    fn thumb_transfer_imm<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let imm = (word >> 6) & 0x1F;
        let rb = ((word >> 3) & 7) as usize;
        let rd = (word & 7) as usize;
        let base = self.regs.read(rb);
        match (word >> 11) & 3 {
            0 => {
                let addr = base.wrapping_add(imm * 4);
                self.timer.data(addr & !3, Width::Word, true);
                bus.write_word(addr & !3, self.regs.read(rd), 0);
            }
            1 => {
                let addr = base.wrapping_add(imm * 4);
                self.timer.data(addr & !3, Width::Word, true);
                let v = bus.read_word(addr & !3, 0).rotate_right(8 * (addr & 3));
                self.timer.internal(1);
                self.regs.write(rd, v);
            }
            2 => {
                let addr = base.wrapping_add(imm);
                self.timer.data(addr, Width::Byte, true);
                bus.write_byte(addr, self.regs.read(rd) as u8, 0);
            }
            _ => {
                let addr = base.wrapping_add(imm);
                self.timer.data(addr, Width::Byte, true);
                let v = u32::from(bus.read_byte(addr, 0));
                self.timer.internal(1);
                self.regs.write(rd, v);
            }
        }
    }

    fn thumb_transfer_half<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let imm = ((word >> 6) & 0x1F) * 2;
        let rb = ((word >> 3) & 7) as usize;
        let rd = (word & 7) as usize;
        let addr = self.regs.read(rb).wrapping_add(imm);
        if word & (1 << 11) != 0 {
            self.timer.data(addr & !1, Width::Half, true);
            let v = u32::from(bus.read_half(addr & !1, 0)).rotate_right(8 * (addr & 1));
            self.timer.internal(1);
            self.regs.write(rd, v);
        } else {
            self.timer.data(addr & !1, Width::Half, true);
            bus.write_half(addr & !1, self.regs.read(rd) as u16, 0);
        }
    }

    fn thumb_transfer_sp<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let rd = ((word >> 8) & 7) as usize;
        let addr = self.regs.read(SP).wrapping_add((word & 0xFF) * 4);
        if word & (1 << 11) != 0 {
            self.timer.data(addr & !3, Width::Word, true);
            let v = bus.read_word(addr & !3, 0).rotate_right(8 * (addr & 3));
            self.timer.internal(1);
            self.regs.write(rd, v);
        } else {
            self.timer.data(addr & !3, Width::Word, true);
            bus.write_word(addr & !3, self.regs.read(rd), 0);
        }
    }

    fn thumb_load_address(&mut self, word: u32) {
        let rd = ((word >> 8) & 7) as usize;
        let offset = (word & 0xFF) * 4;
        let base = if word & (1 << 11) != 0 {
            self.regs.read(SP)
        } else {
            self.regs.read(PC) & !3
        };
        self.regs.write(rd, base.wrapping_add(offset));
    }

    fn thumb_misc<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        match (word >> 8) & 0xF {
            // SP adjustment: 7-bit word offset, bit 7 selects subtract.
            0x0 => {
                let offset = (word & 0x7F) * 4;
                let sp = self.regs.read(SP);
                let sp = if word & 0x80 != 0 {
                    sp.wrapping_sub(offset)
                } else {
                    sp.wrapping_add(offset)
                };
                self.regs.write(SP, sp);
            }
            0x4 | 0x5 => self.thumb_push(bus, word),
            0xC | 0xD => self.thumb_pop(bus, word),
            _ => self.enter_exception(bus, Exception::Undefined),
        }
    }

    /// PUSH {rlist[, lr]}: a full-descending STMDB on SP.
    fn thumb_push<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let with_lr = word & 0x100 != 0;
        let count = (word & 0xFF).count_ones() + u32::from(with_lr);
        let base = self.regs.read(SP).wrapping_sub(4 * count);
        self.regs.write(SP, base);
        let mut lane = 0;
        for r in 0..8 {
            if word & (1 << r) == 0 {
                continue;
            }
            let addr = base.wrapping_add(4 * lane);
            self.timer.data(addr, Width::Word, lane == 0);
            bus.write_word(addr, self.regs.read(r), lane);
            lane += 1;
        }
        if with_lr {
            let addr = base.wrapping_add(4 * lane);
            self.timer.data(addr, Width::Word, lane == 0);
            bus.write_word(addr, self.regs.read(LR), lane);
        }
    }

    /// POP {rlist[, pc]}: a full-descending LDMIA on SP.
    fn thumb_pop<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let with_pc = word & 0x100 != 0;
        let count = (word & 0xFF).count_ones() + u32::from(with_pc);
        let base = self.regs.read(SP);
        self.regs.write(SP, base.wrapping_add(4 * count));
        let mut lane = 0;
        for r in 0..8 {
            if word & (1 << r) == 0 {
                continue;
            }
            let addr = base.wrapping_add(4 * lane);
            self.timer.data(addr, Width::Word, lane == 0);
            let v = bus.read_word(addr, lane);
            self.regs.write(r, v);
            lane += 1;
        }
        if with_pc {
            let addr = base.wrapping_add(4 * lane);
            self.timer.data(addr, Width::Word, lane == 0);
            let v = bus.read_word(addr, lane);
            // Bit 0 is ignored on this architecture; no state change.
            self.write_reg(PC, v);
        }
        self.timer.internal(1);
    }

    fn thumb_block_transfer<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let load = word & (1 << 11) != 0;
        let rb = ((word >> 8) & 7) as usize;
        let rlist = word & 0xFF;
        let base = self.regs.read(rb);

        if rlist == 0 {
            // Empty list: the hardware transfers r15 and steps the base by
            // the full sixteen-slot span.
            self.timer.data(base, Width::Word, true);
            if load {
                let v = bus.read_word(base, 0);
                self.timer.internal(1);
                self.regs.write(rb, base.wrapping_add(0x40));
                self.write_reg(PC, v & !1);
            } else {
                bus.write_word(base, self.regs.read(PC).wrapping_add(2), 0);
                self.regs.write(rb, base.wrapping_add(0x40));
            }
            return;
        }

        let count = rlist.count_ones();
        let final_base = base.wrapping_add(4 * count);
        if load {
            // Writeback first; a loaded base register overwrites it.
            self.regs.write(rb, final_base);
            let mut lane = 0;
            for r in 0..8 {
                if rlist & (1 << r) == 0 {
                    continue;
                }
                let addr = base.wrapping_add(4 * lane);
                self.timer.data(addr, Width::Word, lane == 0);
                let v = bus.read_word(addr, lane);
                self.regs.write(r, v);
                lane += 1;
            }
            self.timer.internal(1);
        } else {
            let mut lane = 0;
            for r in 0..8 {
                if rlist & (1 << r) == 0 {
                    continue;
                }
                let addr = base.wrapping_add(4 * lane);
                self.timer.data(addr, Width::Word, lane == 0);
                bus.write_word(addr, self.regs.read(r), lane);
                // Writeback after the first store: a stored base register
                // transfers its original value only when first in the list.
                if lane == 0 {
                    self.regs.write(rb, final_base);
                }
                lane += 1;
            }
        }
    }

    fn thumb_cond_branch_swi<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        let cond = (word >> 8) & 0xF;
        match cond {
            0xF => self.enter_exception(bus, Exception::SoftwareInterrupt),
            // The always-condition slot is reserved in this format.
            0xE => self.enter_exception(bus, Exception::Undefined),
            _ => {
                if self.condition_passed(cond) {
                    let offset = (((word & 0xFF) as u8 as i8 as i32) << 1) as u32;
                    let target = self.regs.read(PC).wrapping_add(offset);
                    self.branch_to(target);
                }
            }
        }
    }

    fn thumb_branch(&mut self, word: u32) {
        // Sign-extend the 11-bit halfword offset.
        let offset = (((word << 21) as i32) >> 20) as u32;
        let target = self.regs.read(PC).wrapping_add(offset);
        self.branch_to(target);
    }

    fn thumb_bl_high(&mut self, word: u32) {
        let offset = (((word << 21) as i32) >> 9) as u32;
        let lr = self.regs.read(PC).wrapping_add(offset);
        self.regs.write(LR, lr);
    }

    fn thumb_bl_low(&mut self, word: u32) {
        let target = self.regs.read(LR).wrapping_add((word & 0x7FF) << 1);
        // Return address: the following halfword, with bit 0 marking Thumb.
        let ret = self.regs.read(PC).wrapping_sub(2) | 1;
        self.regs.write(LR, ret);
        self.branch_to(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_word(word: u32) -> ThumbOp {
        decode(thumb_index(word) as u32)
    }

    #[test]
    fn format_selection() {
        assert_eq!(decode_word(0x0000), ThumbOp::ShiftImm); // LSL r0, r0, #0
        assert_eq!(decode_word(0x1800), ThumbOp::AddSub); // ADD r0, r0, r0
        assert_eq!(decode_word(0x2000), ThumbOp::AluImm); // MOV r0, #0
        assert_eq!(decode_word(0x4000), ThumbOp::AluReg); // AND r0, r0
        assert_eq!(decode_word(0x4700), ThumbOp::HiRegBx); // BX r0
        assert_eq!(decode_word(0x4800), ThumbOp::LdrPc); // LDR r0, [pc]
        assert_eq!(decode_word(0x5000), ThumbOp::TransferReg);
        assert_eq!(decode_word(0x6000), ThumbOp::TransferImm);
        assert_eq!(decode_word(0x8000), ThumbOp::TransferHalf);
        assert_eq!(decode_word(0x9000), ThumbOp::TransferSp);
        assert_eq!(decode_word(0xA000), ThumbOp::LoadAddress);
        assert_eq!(decode_word(0xB000), ThumbOp::Misc);
        assert_eq!(decode_word(0xC000), ThumbOp::BlockTransfer);
        assert_eq!(decode_word(0xD000), ThumbOp::CondBranchSwi);
        assert_eq!(decode_word(0xE000), ThumbOp::Branch);
        assert_eq!(decode_word(0xE800), ThumbOp::Undefined); // BLX prefix space
        assert_eq!(decode_word(0xF000), ThumbOp::BlHigh);
        assert_eq!(decode_word(0xF800), ThumbOp::BlLow);
    }

    #[test]
    fn table_is_total() {
        let table = build_thumb_table();
        assert_eq!(table.len(), 64);
    }
}
