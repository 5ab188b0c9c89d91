//! Exception entry, the reset states, and the synthetic boot-ROM services.
//!
//! Entry always follows the same sequence: save the old CPSR into the
//! target mode's SPSR shadow, swap register banks, force ARM state, mask
//! IRQs (and FIQs for reset/FIQ), load the documented link value, and
//! branch to the vector.
//!
//! When no boot ROM image is mapped, the core stands in for the two
//! services the ROM would provide: the cold-boot register state, and the
//! IRQ dispatch stub that saves scratch registers and indirects through
//! the handler slot in high work RAM. The stub's return address is a fixed
//! ROM location; fetching from it with no ROM present triggers the
//! synthetic return sequence instead.

use crate::bus::Arm7Bus;
use crate::cpu::Arm7Tdmi;
use crate::psr::{Mode, Psr};
use crate::registers::{RegisterBank, LR, PC, SP};
use crate::timing::Width;

/// The exception classes this core can take. Aborts never occur: the bus
/// has no fault path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    Reset,
    Undefined,
    SoftwareInterrupt,
    Irq,
    Fiq,
}

impl Exception {
    /// Architected vector address.
    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::Undefined => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        }
    }

    const fn mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Supervisor,
            Self::Undefined => Mode::Undefined,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }
}

/// Cold-boot stack pointers the boot ROM would have installed.
const COLD_SP_SVC: u32 = 0x0300_7FE0;
const COLD_SP_IRQ: u32 = 0x0300_7FA0;
const COLD_SP_USR: u32 = 0x0300_7F00;
/// Cartridge entry point after the boot animation.
const COLD_ENTRY: u32 = 0x0800_0000;

/// Work-RAM slot holding the user IRQ handler address.
const IRQ_HANDLER_SLOT: u32 = 0x0300_7FFC;
/// ROM address the dispatch stub returns through.
pub(crate) const IRQ_STUB_RETURN: u32 = 0x0000_0130;

/// Registers the IRQ dispatch stub saves and restores, in stack order.
const IRQ_STUB_REGS: [usize; 6] = [0, 1, 2, 3, 12, LR];

impl Arm7Tdmi {
    /// Take an exception. The PC currently holds the fetch address; the
    /// link values are derived from it so that the architected return
    /// idioms land on the right instruction.
    pub(crate) fn enter_exception<B: Arm7Bus>(&mut self, bus: &mut B, exception: Exception) {
        let old_cpsr = self.regs.cpsr;
        let pc = self.regs.read(PC);
        let lr = match exception {
            Exception::Reset => 0,
            // Return idiom MOVS pc, lr: next instruction.
            Exception::Undefined | Exception::SoftwareInterrupt => {
                if old_cpsr.thumb() {
                    pc.wrapping_sub(2)
                } else {
                    pc.wrapping_sub(4)
                }
            }
            // Return idiom SUBS pc, lr, #4: re-execute the preempted one.
            Exception::Irq | Exception::Fiq => {
                if old_cpsr.thumb() {
                    pc
                } else {
                    pc.wrapping_sub(4)
                }
            }
        };

        let mode = exception.mode();
        self.regs.switch_mode(mode);
        self.regs.set_spsr_for(mode, old_cpsr);
        self.regs.cpsr.set_mode(mode);
        self.regs.cpsr.set_thumb(false);
        self.regs.cpsr.set_irq_disable(true);
        if matches!(exception, Exception::Reset | Exception::Fiq) {
            self.regs.cpsr.set_fiq_disable(true);
        }
        self.regs.write(LR, lr);
        self.trace.mode_switch(old_cpsr.bits(), self.regs.cpsr.bits());
        self.trace.exception(exception.vector(), mode.bits());

        if !self.boot_rom && exception == Exception::Irq {
            self.synthetic_irq_dispatch(bus);
        } else {
            self.regs.gprs[PC] = exception.vector();
        }
        self.reset_pipeline();
    }

    /// Re-prime the whole core. With a boot ROM the fetch stream starts at
    /// the reset vector; without one, the post-boot register state the ROM
    /// would have left behind is synthesized and execution starts at the
    /// cartridge entry point.
    pub fn reset(&mut self) {
        self.regs = RegisterBank::new();
        self.pending_irq = 0;
        self.fiq_line = false;
        if self.boot_rom {
            self.regs.gprs[PC] = Exception::Reset.vector();
        } else {
            // RegisterBank::new starts in Supervisor, so the first banked
            // write lands in the live file.
            self.regs.set_banked_sp(Mode::Supervisor, COLD_SP_SVC);
            self.regs.set_banked_sp(Mode::Irq, COLD_SP_IRQ);
            self.regs.switch_mode(Mode::System);
            self.regs.cpsr = Psr::from_bits(Mode::System.bits());
            self.regs.gprs[SP] = COLD_SP_USR;
            self.regs.gprs[PC] = COLD_ENTRY;
        }
        self.reset_pipeline();
    }

    /// The boot ROM's IRQ stub: push the scratch registers and the
    /// exception link onto the IRQ stack, point lr at the stub's return
    /// address, and indirect through the handler slot. Runs in IRQ mode,
    /// immediately after the generic entry sequence.
    fn synthetic_irq_dispatch<B: Arm7Bus>(&mut self, bus: &mut B) {
        let base = self.regs.read(SP).wrapping_sub(24);
        self.regs.write(SP, base);
        for (lane, &r) in IRQ_STUB_REGS.iter().enumerate() {
            let addr = base.wrapping_add(4 * lane as u32);
            self.timer.data(addr, Width::Word, lane == 0);
            bus.write_word(addr, self.regs.read(r), lane as u32);
        }
        self.regs.write(LR, IRQ_STUB_RETURN);
        self.timer.data(IRQ_HANDLER_SLOT, Width::Word, true);
        let handler = bus.read_word(IRQ_HANDLER_SLOT, 0);
        self.regs.gprs[PC] = handler & !3;
    }

    /// The stub's return path, triggered by a jump to [`IRQ_STUB_RETURN`]
    /// with no ROM mapped: pop the saved registers, restore CPSR from the
    /// IRQ SPSR, and resume the preempted instruction.
    pub(crate) fn synthetic_irq_return<B: Arm7Bus>(&mut self, bus: &mut B) {
        let base = self.regs.read(SP);
        for (lane, &r) in IRQ_STUB_REGS.iter().enumerate() {
            let addr = base.wrapping_add(4 * lane as u32);
            self.timer.data(addr, Width::Word, lane == 0);
            let value = bus.read_word(addr, lane as u32);
            self.regs.write(r, value);
        }
        self.regs.write(SP, base.wrapping_add(24));

        let spsr = self.regs.spsr();
        let target = self.regs.read(LR).wrapping_sub(4);
        self.regs.switch_mode(spsr.mode());
        self.regs.cpsr = spsr;
        self.branch_to(target);
    }
}
