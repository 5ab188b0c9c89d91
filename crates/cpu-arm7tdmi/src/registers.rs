//! Register file with per-mode banked shadows.
//!
//! The live file is a flat `[u32; 16]`. Each banking position owns an
//! explicit shadow struct; switching mode copies the outgoing mode's high
//! registers into its shadow and loads the incoming mode's shadow. FIQ
//! banks r8-r14, the other privileged modes bank r13-r14, and User/System
//! share one position. No aliasing between banks is possible because the
//! shadows are plain values, not views.

use crate::psr::{Mode, Psr};

/// Stack pointer register index.
pub const SP: usize = 13;
/// Link register index.
pub const LR: usize = 14;
/// Program counter register index. Reads include the pipeline lookahead.
pub const PC: usize = 15;

/// Number of banking positions: User/System, FIQ, IRQ, Supervisor, Abort,
/// Undefined.
const BANKS: usize = 6;

/// Shadow storage for one banking position.
///
/// `high` holds r8-r12; only the FIQ position uses distinct values there,
/// but keeping the slots in every bank makes the swap symmetric and
/// branch-free.
#[derive(Debug, Clone, Copy)]
struct Bank {
    high: [u32; 5],
    sp: u32,
    lr: u32,
    spsr: Psr,
}

impl Default for Bank {
    fn default() -> Self {
        Self {
            high: [0; 5],
            sp: 0,
            lr: 0,
            spsr: Psr::from_bits(0),
        }
    }
}

/// Bank index for a mode. User and System share position 0.
const fn bank_index(mode: Mode) -> usize {
    match mode {
        Mode::User | Mode::System => 0,
        Mode::Fiq => 1,
        Mode::Irq => 2,
        Mode::Supervisor => 3,
        Mode::Abort => 4,
        Mode::Undefined => 5,
    }
}

/// The ARM7TDMI register file: 16 live registers, the CPSR, and the
/// per-mode shadows.
#[derive(Debug, Clone)]
pub struct RegisterBank {
    /// Live general registers. `gprs[PC]` always holds the current fetch
    /// address (the architectural value minus nothing - the lookahead is
    /// baked in by the pipeline controller).
    pub gprs: [u32; 16],
    /// Current program status register.
    pub cpsr: Psr,
    banks: [Bank; BANKS],
}

impl RegisterBank {
    /// Create a register file in the architected reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gprs: [0; 16],
            cpsr: Psr::reset(),
            banks: [Bank::default(); BANKS],
        }
    }

    /// Read a live register.
    #[must_use]
    pub fn read(&self, r: usize) -> u32 {
        self.gprs[r]
    }

    /// Write a live register.
    ///
    /// Writing `PC` is a plain register write here; recognising it as a
    /// pipeline-flush trigger is the caller's job.
    pub fn write(&mut self, r: usize, value: u32) {
        self.gprs[r] = value;
    }

    /// Swap register banks for a mode transition.
    ///
    /// Copies the outgoing mode's banked registers into its shadow, then
    /// loads the incoming mode's shadow. The swap is atomic from the
    /// guest's point of view: there is no intermediate state in which a
    /// register belongs to neither bank. Does not touch the CPSR mode
    /// field; the caller sequences that.
    pub fn switch_mode(&mut self, new_mode: Mode) {
        let old_mode = self.cpsr.mode();
        let old = bank_index(old_mode);
        let new = bank_index(new_mode);
        if old == new {
            return;
        }

        // r8-r12 are only private to FIQ; everyone else shares the
        // User-position shadow for them.
        let old_high = if old_mode == Mode::Fiq { old } else { 0 };
        let new_high = if new_mode == Mode::Fiq { new } else { 0 };

        self.banks[old_high].high.copy_from_slice(&self.gprs[8..13]);
        self.banks[old].sp = self.gprs[SP];
        self.banks[old].lr = self.gprs[LR];

        self.gprs[8..13].copy_from_slice(&self.banks[new_high].high);
        self.gprs[SP] = self.banks[new].sp;
        self.gprs[LR] = self.banks[new].lr;
    }

    /// Read the saved status register of the current mode.
    ///
    /// In User and System there is no shadow; the read is a no-op that
    /// returns the live CPSR (architectural quirk, preserved).
    #[must_use]
    pub fn spsr(&self) -> Psr {
        let mode = self.cpsr.mode();
        if mode.has_spsr() {
            self.banks[bank_index(mode)].spsr
        } else {
            self.cpsr
        }
    }

    /// Write the saved status register of the current mode. No-op in User
    /// and System.
    pub fn set_spsr(&mut self, value: Psr) {
        let mode = self.cpsr.mode();
        if mode.has_spsr() {
            self.banks[bank_index(mode)].spsr = value;
        }
    }

    /// Write the saved status register of an explicit mode. Used by
    /// exception entry, which saves the old CPSR into the *target* mode's
    /// shadow. No-op for User and System.
    pub fn set_spsr_for(&mut self, mode: Mode, value: Psr) {
        if mode.has_spsr() {
            self.banks[bank_index(mode)].spsr = value;
        }
    }

    /// Read a register as the User bank sees it, regardless of the current
    /// mode. Used by LDM/STM with the S bit set.
    #[must_use]
    pub fn read_user(&self, r: usize) -> u32 {
        let mode = self.cpsr.mode();
        match r {
            8..=12 if mode == Mode::Fiq => self.banks[0].high[r - 8],
            SP if bank_index(mode) != 0 => self.banks[0].sp,
            LR if bank_index(mode) != 0 => self.banks[0].lr,
            _ => self.gprs[r],
        }
    }

    /// Write a register in the User bank, regardless of the current mode.
    /// Used by LDM with the S bit set.
    pub fn write_user(&mut self, r: usize, value: u32) {
        let mode = self.cpsr.mode();
        match r {
            8..=12 if mode == Mode::Fiq => self.banks[0].high[r - 8] = value,
            SP if bank_index(mode) != 0 => self.banks[0].sp = value,
            LR if bank_index(mode) != 0 => self.banks[0].lr = value,
            _ => self.gprs[r] = value,
        }
    }

    /// Set the stack pointer shadow of a specific mode without switching
    /// to it. Used by the cold-boot register defaults.
    pub fn set_banked_sp(&mut self, mode: Mode, value: u32) {
        if bank_index(mode) == bank_index(self.cpsr.mode()) {
            self.gprs[SP] = value;
        } else {
            self.banks[bank_index(mode)].sp = value;
        }
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_switch_swaps_sp_lr() {
        let mut regs = RegisterBank::new();
        regs.gprs[SP] = 0x100;
        regs.gprs[LR] = 0x200;

        regs.switch_mode(Mode::Irq);
        regs.cpsr.set_mode(Mode::Irq);
        regs.gprs[SP] = 0x300;

        regs.switch_mode(Mode::Supervisor);
        regs.cpsr.set_mode(Mode::Supervisor);
        assert_eq!(regs.gprs[SP], 0, "supervisor bank starts empty");

        regs.switch_mode(Mode::Irq);
        regs.cpsr.set_mode(Mode::Irq);
        assert_eq!(regs.gprs[SP], 0x300);

        regs.switch_mode(Mode::User);
        regs.cpsr.set_mode(Mode::User);
        assert_eq!(regs.gprs[SP], 0x100);
        assert_eq!(regs.gprs[LR], 0x200);
    }

    #[test]
    fn fiq_banks_high_registers() {
        let mut regs = RegisterBank::new();
        regs.gprs[8] = 11;
        regs.gprs[12] = 55;

        regs.switch_mode(Mode::Fiq);
        regs.cpsr.set_mode(Mode::Fiq);
        regs.gprs[8] = 88;
        regs.gprs[12] = 99;

        regs.switch_mode(Mode::System);
        regs.cpsr.set_mode(Mode::System);
        assert_eq!(regs.gprs[8], 11);
        assert_eq!(regs.gprs[12], 55);

        regs.switch_mode(Mode::Fiq);
        regs.cpsr.set_mode(Mode::Fiq);
        assert_eq!(regs.gprs[8], 88);
        assert_eq!(regs.gprs[12], 99);
    }

    #[test]
    fn user_and_system_share_a_bank() {
        let mut regs = RegisterBank::new();
        regs.cpsr.set_mode(Mode::System);
        regs.gprs[SP] = 0x42;

        regs.switch_mode(Mode::User);
        regs.cpsr.set_mode(Mode::User);
        assert_eq!(regs.gprs[SP], 0x42, "User/System share r13");
    }

    #[test]
    fn spsr_is_noop_in_unprivileged_modes() {
        let mut regs = RegisterBank::new();
        regs.cpsr.set_mode(Mode::User);
        let before = regs.cpsr;
        regs.set_spsr(Psr::from_bits(0xF000_00D3));
        assert_eq!(regs.spsr(), before, "User-mode SPSR read returns CPSR");

        regs.cpsr.set_mode(Mode::System);
        regs.set_spsr(Psr::from_bits(0xF000_00D3));
        assert_eq!(regs.spsr().bits(), regs.cpsr.bits());
    }

    #[test]
    fn spsr_round_trips_in_privileged_modes() {
        let mut regs = RegisterBank::new();
        regs.switch_mode(Mode::Irq);
        regs.cpsr.set_mode(Mode::Irq);
        let saved = Psr::from_bits(0x6000_001F);
        regs.set_spsr(saved);
        assert_eq!(regs.spsr(), saved);
    }

    #[test]
    fn user_bank_access_from_fiq() {
        let mut regs = RegisterBank::new();
        regs.gprs[10] = 0xAA;
        regs.gprs[SP] = 0x1000;

        regs.switch_mode(Mode::Fiq);
        regs.cpsr.set_mode(Mode::Fiq);
        regs.gprs[10] = 0xFF;

        assert_eq!(regs.read_user(10), 0xAA);
        assert_eq!(regs.read_user(SP), 0x1000);

        regs.write_user(10, 0xBB);
        regs.switch_mode(Mode::User);
        regs.cpsr.set_mode(Mode::User);
        assert_eq!(regs.gprs[10], 0xBB);
    }
}
