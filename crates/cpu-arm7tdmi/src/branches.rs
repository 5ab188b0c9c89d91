//! Branch and branch-exchange execute handlers.

use crate::cpu::Arm7Tdmi;
use crate::registers::{LR, PC};

impl Arm7Tdmi {
    /// B/BL: PC-relative branch with a 24-bit word offset. The base is the
    /// PC's fetch address, so the reach is offset plus two words of
    /// lookahead.
    pub(crate) fn exec_branch(&mut self, word: u32, link: bool) {
        // Sign-extend bits 23:0 and scale to a byte offset.
        let offset = ((word << 8) as i32 >> 6) as u32;
        let pc = self.regs.read(PC);
        if link {
            self.regs.write(LR, pc.wrapping_sub(4));
        }
        self.branch_to(pc.wrapping_add(offset));
    }

    /// BX: branch with optional state exchange. Bit 0 of the target
    /// selects the Thumb decoder.
    pub(crate) fn exec_branch_exchange(&mut self, word: u32) {
        let target = self.regs.read((word & 0xF) as usize);
        self.regs.cpsr.set_thumb(target & 1 != 0);
        self.branch_to(target);
    }
}
