//! The pipeline controller: fetch, condition evaluation, dispatch, and
//! the interrupt poll.
//!
//! The three-stage pipeline is modeled as the last three fetched words
//! plus a refill countdown. Each step fetches one word at the PC, rotates
//! the window, and either executes the oldest word or, while the countdown
//! runs, burns a bubble. Because r15 always holds the *fetch* address, an
//! executing instruction reads it as its own address plus two fetch
//! widths, which is the architected lookahead. Any handler that writes
//! r15 or swaps instruction sets restarts the countdown at two; the two
//! bubble steps that follow are the architected branch cost.

use emu_core::{NullTrace, Observable, Ticks, TraceSink, Value};

use crate::alu::AluResult;
use crate::bus::Arm7Bus;
use crate::config::Config;
use crate::decode::{self, ArmOp};
use crate::exceptions::{Exception, IRQ_STUB_RETURN};
use crate::psr::Mode;
use crate::registers::{RegisterBank, PC};
use crate::thumb::{self, ThumbOp};
use crate::timing::{BusTimer, Width};

/// Refill countdown after a pipeline flush: two bubble fetches.
const REFILL_STEPS: u8 = 2;

/// An ARM7TDMI core: register file, decode tables, pipeline state, and
/// the bus timing adapter.
pub struct Arm7Tdmi {
    pub(crate) regs: RegisterBank,
    arm_table: Box<[ArmOp; 4096]>,
    pub(crate) thumb_table: [ThumbOp; 64],
    /// The last three fetched words, newest first.
    pipeline: [u32; 3],
    refill: u8,
    pub(crate) timer: BusTimer,
    pub(crate) pending_irq: u16,
    pub(crate) fiq_line: bool,
    pub(crate) boot_rom: bool,
    pub(crate) trace: Box<dyn TraceSink>,
}

impl Arm7Tdmi {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let mut cpu = Self {
            regs: RegisterBank::new(),
            arm_table: decode::build_arm_table(),
            thumb_table: thumb::build_thumb_table(),
            pipeline: [0; 3],
            refill: REFILL_STEPS,
            timer: BusTimer::new(config.wait_states.clone(), config.prefetch),
            pending_irq: 0,
            fiq_line: false,
            boot_rom: config.boot_rom_present,
            trace: Box::new(NullTrace),
        };
        cpu.reset();
        cpu
    }

    /// Install a trace sink. The default discards everything.
    pub fn set_trace(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = sink;
    }

    /// Run one pipeline step: at most one instruction executes, and after
    /// a flush the two refill steps are bubbles. Returns the bus cycles
    /// the step consumed.
    pub fn step<B: Arm7Bus>(&mut self, bus: &mut B) -> Ticks {
        let start = self.timer.cycles();

        // A jump to the dispatch stub's return address with no boot ROM
        // mapped means the user IRQ handler returned.
        if !self.boot_rom && self.regs.gprs[PC] == IRQ_STUB_RETURN {
            self.synthetic_irq_return(bus);
        }

        // Interrupts preempt only a settled pipeline, once per step.
        if self.refill == 0 {
            if self.fiq_line && !self.regs.cpsr.fiq_disabled() {
                self.enter_exception(bus, Exception::Fiq);
            } else if self.pending_irq != 0 && !self.regs.cpsr.irq_disabled() {
                self.enter_exception(bus, Exception::Irq);
            }
        }

        let thumb = self.regs.cpsr.thumb();
        let width = if thumb { 2 } else { 4 };
        let pc = self.regs.gprs[PC];
        let fetched = if thumb {
            self.timer.fetch(pc & !1, Width::Half);
            u32::from(bus.read_half(pc & !1, 0))
        } else {
            self.timer.fetch(pc & !3, Width::Word);
            bus.read_word(pc & !3, 0)
        };
        self.pipeline[2] = self.pipeline[1];
        self.pipeline[1] = self.pipeline[0];
        self.pipeline[0] = fetched;

        if self.refill > 0 {
            self.refill -= 1;
            self.regs.gprs[PC] = pc.wrapping_add(width);
            return Ticks::new(self.timer.cycles().since(start));
        }

        let opcode = self.pipeline[2];
        self.trace
            .instruction(pc.wrapping_sub(2 * width), opcode, thumb);
        if thumb {
            self.exec_thumb(bus, opcode);
        } else if self.condition_passed(opcode >> 28) {
            self.exec_arm(bus, opcode);
        }

        // A handler that flushed owns the PC; otherwise advance past the
        // fetched word.
        if self.refill == 0 {
            self.regs.gprs[PC] = pc.wrapping_add(width);
        }
        Ticks::new(self.timer.cycles().since(start))
    }

    fn exec_arm<B: Arm7Bus>(&mut self, bus: &mut B, word: u32) {
        match self.arm_table[decode::arm_index(word)] {
            ArmOp::DataProc { op, set_flags, operand } => {
                self.exec_data_proc(word, op, set_flags, operand);
            }
            ArmOp::Mrs { spsr } => self.exec_mrs(word, spsr),
            ArmOp::MsrReg { spsr } => self.exec_msr(word, spsr, false),
            ArmOp::MsrImm { spsr } => self.exec_msr(word, spsr, true),
            ArmOp::Multiply { accumulate, set_flags } => {
                self.exec_multiply(word, accumulate, set_flags);
            }
            ArmOp::MultiplyLong { signed, accumulate, set_flags } => {
                self.exec_multiply_long(word, signed, accumulate, set_flags);
            }
            ArmOp::Swap { byte } => self.exec_swap(bus, word, byte),
            ArmOp::BranchExchange => self.exec_branch_exchange(word),
            ArmOp::Branch { link } => self.exec_branch(word, link),
            ArmOp::SingleTransfer { load, byte, pre, up, writeback, reg_offset } => {
                self.exec_single_transfer(bus, word, load, byte, pre, up, writeback, reg_offset);
            }
            ArmOp::HalfTransfer { load, pre, up, writeback, imm_offset, kind } => {
                self.exec_half_transfer(bus, word, load, pre, up, writeback, imm_offset, kind);
            }
            ArmOp::BlockTransfer { load, pre, up, writeback, user_bank } => {
                self.exec_block_transfer(bus, word, load, pre, up, writeback, user_bank);
            }
            ArmOp::SoftwareInterrupt => self.enter_exception(bus, Exception::SoftwareInterrupt),
            ArmOp::Undefined => self.enter_exception(bus, Exception::Undefined),
        }
    }

    /// Evaluate an ARM condition field. 0xF is the reserved never-execute
    /// encoding on this architecture.
    pub(crate) fn condition_passed(&self, cond: u32) -> bool {
        let p = self.regs.cpsr;
        match cond & 0xF {
            0x0 => p.z(),
            0x1 => !p.z(),
            0x2 => p.c(),
            0x3 => !p.c(),
            0x4 => p.n(),
            0x5 => !p.n(),
            0x6 => p.v(),
            0x7 => !p.v(),
            0x8 => p.c() && !p.z(),
            0x9 => !p.c() || p.z(),
            0xA => p.n() == p.v(),
            0xB => p.n() != p.v(),
            0xC => !p.z() && p.n() == p.v(),
            0xD => p.z() || p.n() != p.v(),
            0xE => true,
            _ => false,
        }
    }

    /// Register write that recognises the PC as a branch.
    pub(crate) fn write_reg(&mut self, r: usize, value: u32) {
        if r == PC {
            self.branch_to(value);
        } else {
            self.regs.write(r, value);
        }
    }

    /// Redirect the fetch stream: align the target to the active
    /// instruction width and flush the pipeline.
    pub(crate) fn branch_to(&mut self, target: u32) {
        let mask = if self.regs.cpsr.thumb() { !1 } else { !3 };
        self.regs.gprs[PC] = target & mask;
        self.reset_pipeline();
    }

    /// Flush: two bubble fetches follow, the first non-sequential.
    pub(crate) fn reset_pipeline(&mut self) {
        self.refill = REFILL_STEPS;
        self.timer.non_sequential();
    }

    pub(crate) fn set_nzcv(&mut self, r: AluResult) {
        self.regs.cpsr.set_nz(r.value);
        self.regs.cpsr.set_c(r.carry);
        self.regs.cpsr.set_v(r.overflow);
    }

    /// Current fetch address (the architectural r15 with lookahead).
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.regs.gprs[PC]
    }

    /// Total bus cycles consumed.
    #[must_use]
    pub fn cycles(&self) -> Ticks {
        self.timer.cycles()
    }

    #[must_use]
    pub fn registers(&self) -> &RegisterBank {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut RegisterBank {
        &mut self.regs
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.regs.cpsr.mode()
    }

    /// Timing adapter access for boards: peripheral cycle charging and
    /// wait-state reconfiguration.
    pub fn timer_mut(&mut self) -> &mut BusTimer {
        &mut self.timer
    }

    /// Latch interrupt request bits. The core takes an IRQ while any bit
    /// is pending and the I flag is clear.
    pub fn request_irq(&mut self, mask: u16) {
        self.pending_irq |= mask;
    }

    /// Acknowledge (clear) pending interrupt request bits.
    pub fn clear_irq(&mut self, mask: u16) {
        self.pending_irq &= !mask;
    }

    #[must_use]
    pub fn pending_interrupt(&self) -> u16 {
        self.pending_irq
    }

    /// Drive the fast-interrupt line level.
    pub fn set_fiq_line(&mut self, asserted: bool) {
        self.fiq_line = asserted;
    }
}

const QUERY_PATHS: &[&str] = &[
    "pc", "cpsr", "spsr", "mode", "thumb", "cycles", "flags.n", "flags.z", "flags.c", "flags.v",
    "irq.pending", "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11",
    "r12", "r13", "r14", "r15",
];

impl Observable for Arm7Tdmi {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(idx) = path.strip_prefix('r').and_then(|s| s.parse::<usize>().ok()) {
            if idx < 16 {
                return Some(Value::U32(self.regs.read(idx)));
            }
            return None;
        }
        match path {
            "pc" => Some(Value::U32(self.regs.gprs[PC])),
            "cpsr" => Some(Value::U32(self.regs.cpsr.bits())),
            "spsr" => Some(Value::U32(self.regs.spsr().bits())),
            "mode" => Some(Value::U32(self.regs.cpsr.mode().bits())),
            "thumb" => Some(Value::Bool(self.regs.cpsr.thumb())),
            "cycles" => Some(Value::U64(self.timer.cycles().get())),
            "flags.n" => Some(Value::Bool(self.regs.cpsr.n())),
            "flags.z" => Some(Value::Bool(self.regs.cpsr.z())),
            "flags.c" => Some(Value::Bool(self.regs.cpsr.c())),
            "flags.v" => Some(Value::Bool(self.regs.cpsr.v())),
            "irq.pending" => Some(Value::U16(self.pending_irq)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
