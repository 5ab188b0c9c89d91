//! Execute handlers for the load/store families: single word/byte,
//! halfword and signed, block transfer, and swap.
//!
//! Alignment is handled here, not behind the bus: word and halfword
//! accesses go out aligned, and misaligned loads rotate the returned data
//! so the addressed byte lands in the low lane (the behavior software on
//! this platform actively relies on). A misaligned signed halfword load
//! degrades to a signed byte load of the addressed byte.

use crate::bus::Arm7Bus;
use crate::cpu::Arm7Tdmi;
use crate::decode::HalfKind;
use crate::registers::PC;
use crate::shifter;
use crate::timing::Width;

impl Arm7Tdmi {
    #[allow(clippy::fn_params_excessive_bools)]
    pub(crate) fn exec_single_transfer<B: Arm7Bus>(
        &mut self,
        bus: &mut B,
        word: u32,
        load: bool,
        byte: bool,
        pre: bool,
        up: bool,
        writeback: bool,
        reg_offset: bool,
    ) {
        let offset = if reg_offset {
            // Scaled register offset: the shifter's carry-out is discarded.
            let rm = self.regs.read((word & 0xF) as usize);
            shifter::shift_imm((word >> 5) & 3, (word >> 7) & 0x1F, rm, self.regs.cpsr.c()).value
        } else {
            word & 0xFFF
        };
        let rn = ((word >> 16) & 0xF) as usize;
        let rd = ((word >> 12) & 0xF) as usize;
        let base = self.regs.read(rn);
        let offset_base = if up {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if pre { offset_base } else { base };
        // Post-indexed forms always write the base back; W there selects
        // the user-view variant, which this core treats identically.
        let base_writeback = !pre || writeback;

        if load {
            let value = if byte {
                self.timer.data(addr, Width::Byte, true);
                u32::from(bus.read_byte(addr, 0))
            } else {
                self.timer.data(addr & !3, Width::Word, true);
                bus.read_word(addr & !3, 0).rotate_right(8 * (addr & 3))
            };
            self.timer.internal(1);
            // Base writeback first: a load into the base register wins.
            if base_writeback {
                self.write_reg(rn, offset_base);
            }
            self.write_reg(rd, value);
        } else {
            let mut value = self.regs.read(rd);
            // A stored PC sees one more word of lookahead.
            if rd == PC {
                value = value.wrapping_add(4);
            }
            if byte {
                self.timer.data(addr, Width::Byte, true);
                bus.write_byte(addr, value as u8, 0);
            } else {
                self.timer.data(addr & !3, Width::Word, true);
                bus.write_word(addr & !3, value, 0);
            }
            if base_writeback {
                self.write_reg(rn, offset_base);
            }
        }
    }

    #[allow(clippy::fn_params_excessive_bools)]
    pub(crate) fn exec_half_transfer<B: Arm7Bus>(
        &mut self,
        bus: &mut B,
        word: u32,
        load: bool,
        pre: bool,
        up: bool,
        writeback: bool,
        imm_offset: bool,
        kind: HalfKind,
    ) {
        let offset = if imm_offset {
            ((word >> 4) & 0xF0) | (word & 0xF)
        } else {
            self.regs.read((word & 0xF) as usize)
        };
        let rn = ((word >> 16) & 0xF) as usize;
        let rd = ((word >> 12) & 0xF) as usize;
        let base = self.regs.read(rn);
        let offset_base = if up {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if pre { offset_base } else { base };
        let base_writeback = !pre || writeback;

        if load {
            let value = match kind {
                HalfKind::Half => {
                    self.timer.data(addr & !1, Width::Half, true);
                    u32::from(bus.read_half(addr & !1, 0)).rotate_right(8 * (addr & 1))
                }
                HalfKind::SignedByte => {
                    self.timer.data(addr, Width::Byte, true);
                    bus.read_byte(addr, 0) as i8 as i32 as u32
                }
                HalfKind::SignedHalf => {
                    if addr & 1 != 0 {
                        self.timer.data(addr, Width::Byte, true);
                        bus.read_byte(addr, 0) as i8 as i32 as u32
                    } else {
                        self.timer.data(addr, Width::Half, true);
                        bus.read_half(addr, 0) as i16 as i32 as u32
                    }
                }
            };
            self.timer.internal(1);
            if base_writeback {
                self.write_reg(rn, offset_base);
            }
            self.write_reg(rd, value);
        } else {
            debug_assert!(kind == HalfKind::Half, "signed stores are reserved");
            let mut value = self.regs.read(rd);
            if rd == PC {
                value = value.wrapping_add(4);
            }
            self.timer.data(addr & !1, Width::Half, true);
            bus.write_half(addr & !1, value as u16, 0);
            if base_writeback {
                self.write_reg(rn, offset_base);
            }
        }
    }

    #[allow(clippy::fn_params_excessive_bools)]
    pub(crate) fn exec_block_transfer<B: Arm7Bus>(
        &mut self,
        bus: &mut B,
        word: u32,
        load: bool,
        pre: bool,
        up: bool,
        writeback: bool,
        user_bank: bool,
    ) {
        let rn = ((word >> 16) & 0xF) as usize;
        let base = self.regs.read(rn);
        let mut rlist = word & 0xFFFF;
        // Empty register list: the hardware transfers r15 alone and steps
        // the base by the full sixteen-slot span.
        let empty = rlist == 0;
        if empty {
            rlist = 1 << PC;
        }
        let span = if empty { 0x40 } else { 4 * rlist.count_ones() };
        let final_base = if up {
            base.wrapping_add(span)
        } else {
            base.wrapping_sub(span)
        };
        let mut addr = if up { base } else { final_base };
        if pre == up {
            addr = addr.wrapping_add(4);
        }

        // S bit: with r15 in a load list it requests the SPSR restore;
        // otherwise the transfer targets the User bank.
        let restore_spsr = load && user_bank && rlist & (1 << PC) != 0;
        let transfer_user = user_bank && !restore_spsr;

        if load {
            // Base writeback happens before the loads; a loaded base
            // register overwrites it.
            if writeback {
                self.regs.write(rn, final_base);
            }
            let mut lane = 0;
            for r in 0..16 {
                if rlist & (1 << r) == 0 {
                    continue;
                }
                self.timer.data(addr, Width::Word, lane == 0);
                let value = bus.read_word(addr, lane);
                if r == PC {
                    if restore_spsr {
                        let spsr = self.regs.spsr();
                        self.regs.switch_mode(spsr.mode());
                        self.regs.cpsr = spsr;
                    }
                    self.write_reg(PC, value);
                } else if transfer_user {
                    self.regs.write_user(r, value);
                } else {
                    self.regs.write(r, value);
                }
                addr = addr.wrapping_add(4);
                lane += 1;
            }
            self.timer.internal(1);
        } else {
            // Base writeback lands after the first store, so a stored base
            // register transfers its original value only when it is the
            // first register in the list.
            let mut lane = 0;
            for r in 0..16 {
                if rlist & (1 << r) == 0 {
                    continue;
                }
                let mut value = if transfer_user {
                    self.regs.read_user(r)
                } else {
                    self.regs.read(r)
                };
                if r == PC {
                    value = value.wrapping_add(4);
                }
                self.timer.data(addr, Width::Word, lane == 0);
                bus.write_word(addr, value, lane);
                if lane == 0 && writeback {
                    self.regs.write(rn, final_base);
                }
                addr = addr.wrapping_add(4);
                lane += 1;
            }
        }
    }

    /// SWP/SWPB: an atomic read-then-write of one location, locked on the
    /// bus (both halves billed non-sequential).
    pub(crate) fn exec_swap<B: Arm7Bus>(&mut self, bus: &mut B, word: u32, byte: bool) {
        let rn = ((word >> 16) & 0xF) as usize;
        let rd = ((word >> 12) & 0xF) as usize;
        let src = self.regs.read((word & 0xF) as usize);
        let addr = self.regs.read(rn);

        let loaded = if byte {
            self.timer.data(addr, Width::Byte, true);
            let v = u32::from(bus.read_byte(addr, 0));
            self.timer.data(addr, Width::Byte, true);
            bus.write_byte(addr, src as u8, 0);
            v
        } else {
            self.timer.data(addr & !3, Width::Word, true);
            let v = bus.read_word(addr & !3, 0).rotate_right(8 * (addr & 3));
            self.timer.data(addr & !3, Width::Word, true);
            bus.write_word(addr & !3, src, 0);
            v
        };
        self.timer.internal(1);
        self.write_reg(rd, loaded);
    }
}
