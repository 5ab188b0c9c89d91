//! Bus timing: wait-state tables, sequential/non-sequential billing, and
//! the instruction prefetch buffer.
//!
//! Every bus access the core performs is billed here before (or as) the
//! data moves. The tables hold *extra* wait cycles per memory region; an
//! access always costs at least one cycle. 32-bit costs are stored
//! separately because a 32-bit transfer over a 16-bit bus is two physical
//! accesses (first at the non-sequential price, second at the sequential
//! price, plus one cycle for the extra bus turn).
//!
//! Peripherals share the same cycle counter through [`BusTimer::add_cycles`];
//! single-threaded execution is what keeps the counter single-writer, and
//! any threaded embedding must confine all mutation to one thread.

use emu_core::Ticks;

/// Memory regions are selected by address bits 27:24.
const REGIONS: usize = 16;

/// First gamepak region (wait-state 0).
const GAMEPAK_FIRST: usize = 0x8;
/// Last gamepak region (wait-state 2, upper half).
const GAMEPAK_LAST: usize = 0xD;

/// Prefetch buffer depth in halfwords.
const PREFETCH_DEPTH: u32 = 8;

/// Transfer width of a bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Width {
    Byte,
    Half,
    Word,
}

/// Per-region wait-state configuration.
///
/// Each region has a first-access (non-sequential) and a sequential cost,
/// for 16-bit-and-narrower transfers and for 32-bit transfers. Defaults
/// match the handheld's power-on values.
#[derive(Debug, Clone)]
pub struct WaitStates {
    nonseq16: [u32; REGIONS],
    seq16: [u32; REGIONS],
    nonseq32: [u32; REGIONS],
    seq32: [u32; REGIONS],
}

impl WaitStates {
    /// Power-on defaults: zero-wait internal memory, 2-wait external work
    /// RAM on a 16-bit bus, 4/2 wait-state-0 cartridge timing.
    #[must_use]
    pub fn power_on() -> Self {
        let mut w = Self {
            nonseq16: [0; REGIONS],
            seq16: [0; REGIONS],
            nonseq32: [0; REGIONS],
            seq32: [0; REGIONS],
        };
        // External work RAM: 16-bit bus, 2 waits per half.
        w.set_region(0x2, 2, 2, true);
        // Palette and VRAM: 16-bit bus, no waits.
        w.set_region(0x5, 0, 0, true);
        w.set_region(0x6, 0, 0, true);
        // Cartridge wait-state 0/1/2, both mirror halves each.
        w.set_region(0x8, 4, 2, true);
        w.set_region(0x9, 4, 2, true);
        w.set_region(0xA, 4, 4, true);
        w.set_region(0xB, 4, 4, true);
        w.set_region(0xC, 4, 8, true);
        w.set_region(0xD, 4, 8, true);
        // Cartridge SRAM: 8-bit bus.
        w.set_region(0xE, 4, 4, true);
        w
    }

    /// Reconfigure one region (address bits 27:24).
    ///
    /// `narrow_bus` marks regions with a 16-bit data path, where a 32-bit
    /// access is billed as one non-sequential plus one sequential halfword
    /// access plus one turn cycle.
    pub fn set_region(&mut self, region: usize, nonseq: u32, seq: u32, narrow_bus: bool) {
        self.nonseq16[region] = nonseq;
        self.seq16[region] = seq;
        if narrow_bus {
            self.nonseq32[region] = nonseq + seq + 1;
            self.seq32[region] = seq + seq + 1;
        } else {
            self.nonseq32[region] = nonseq;
            self.seq32[region] = seq;
        }
    }

    fn waits(&self, region: usize, width: Width, seq: bool) -> u32 {
        match (width, seq) {
            (Width::Word, false) => self.nonseq32[region],
            (Width::Word, true) => self.seq32[region],
            (_, false) => self.nonseq16[region],
            (_, true) => self.seq16[region],
        }
    }
}

impl Default for WaitStates {
    fn default() -> Self {
        Self::power_on()
    }
}

/// Instruction prefetch buffer state.
///
/// When enabled, the cartridge controller reads ahead of the fetch stream
/// during cycles the CPU spends off the bus, and serves buffered halfwords
/// back at one cycle each.
#[derive(Debug, Clone, Default)]
struct Prefetch {
    enabled: bool,
    /// A cartridge fetch stream is being followed.
    active: bool,
    /// Address the next buffered (or to-be-buffered) halfword serves.
    next_serve: u32,
    /// Buffered halfwords, at most [`PREFETCH_DEPTH`].
    count: u32,
    /// Idle cycles accumulated toward the next buffered halfword.
    credit: u32,
}

impl Prefetch {
    fn flush(&mut self) {
        self.active = false;
        self.count = 0;
        self.credit = 0;
    }
}

/// The bus timing adapter: owns the shared cycle counter, classifies
/// accesses sequential/non-sequential, and bills per-region wait states.
#[derive(Debug, Clone)]
pub struct BusTimer {
    waits: WaitStates,
    cycles: Ticks,
    /// Set after any address-bus jump (branch, mode switch, data access);
    /// forces the next fetch to the non-sequential price.
    fetch_nonseq: bool,
    prefetch: Prefetch,
}

impl BusTimer {
    #[must_use]
    pub fn new(waits: WaitStates, prefetch_enabled: bool) -> Self {
        Self {
            waits,
            cycles: Ticks::ZERO,
            fetch_nonseq: true,
            prefetch: Prefetch {
                enabled: prefetch_enabled,
                ..Prefetch::default()
            },
        }
    }

    /// Total bus cycles consumed so far.
    #[must_use]
    pub fn cycles(&self) -> Ticks {
        self.cycles
    }

    /// Peripheral hook: add cycles elapsed outside the CPU (DMA, halt).
    pub fn add_cycles(&mut self, n: u64) {
        self.cycles += n;
    }

    /// Non-sequential broadcast: the address bus is about to jump. The next
    /// fetch is billed at the first-access price and the prefetch stream is
    /// abandoned.
    pub fn non_sequential(&mut self) {
        self.fetch_nonseq = true;
        self.prefetch.flush();
    }

    /// Wait-state configuration access for board-driven reconfiguration.
    pub fn wait_states_mut(&mut self) -> &mut WaitStates {
        &mut self.waits
    }

    /// Bill internal (off-bus) processing cycles. The prefetch buffer fills
    /// opportunistically during these.
    pub(crate) fn internal(&mut self, n: u32) {
        self.cycles += u64::from(n);
        if !self.prefetch.enabled || !self.prefetch.active {
            return;
        }
        self.prefetch.credit += n;
        loop {
            if self.prefetch.count >= PREFETCH_DEPTH {
                self.prefetch.credit = 0;
                return;
            }
            let fill_addr = self.prefetch.next_serve + 2 * self.prefetch.count;
            let cost = 1 + self.waits.seq16[region(fill_addr)];
            if self.prefetch.credit < cost {
                return;
            }
            self.prefetch.credit -= cost;
            self.prefetch.count += 1;
        }
    }

    /// Bill an instruction fetch.
    pub(crate) fn fetch(&mut self, addr: u32, width: Width) {
        let r = region(addr);
        if self.prefetch.enabled && (GAMEPAK_FIRST..=GAMEPAK_LAST).contains(&r) {
            match width {
                Width::Half => self.fetch_prefetched(addr),
                Width::Word => {
                    self.fetch_prefetched(addr);
                    self.fetch_prefetched(addr + 2);
                }
                Width::Byte => debug_assert!(false, "byte-wide instruction fetch"),
            }
            return;
        }
        self.prefetch.flush();
        let seq = !self.fetch_nonseq;
        self.fetch_nonseq = false;
        self.cycles += u64::from(1 + self.waits.waits(r, width, seq));
    }

    /// One halfword of cartridge instruction fetch through the prefetch
    /// buffer.
    fn fetch_prefetched(&mut self, addr: u32) {
        let p = &mut self.prefetch;
        if p.active && p.count > 0 && addr == p.next_serve {
            // Buffered: served at one cycle.
            p.count -= 1;
            p.next_serve = addr + 2;
            self.cycles += 1;
            return;
        }
        let r = region(addr);
        if p.active && p.count == 0 && addr == p.next_serve && !self.fetch_nonseq {
            // Stream continues but the buffer is empty: plain sequential.
            p.next_serve = addr + 2;
            self.cycles += u64::from(1 + self.waits.seq16[r]);
            return;
        }
        // New stream.
        p.active = true;
        p.count = 0;
        p.credit = 0;
        p.next_serve = addr + 2;
        self.fetch_nonseq = false;
        self.cycles += u64::from(1 + self.waits.nonseq16[r]);
    }

    /// Bill a data access. `first` is true for the first access of an
    /// instruction (or burst); later burst accesses are sequential. Any
    /// data access bumps the following fetch to the non-sequential price.
    pub(crate) fn data(&mut self, addr: u32, width: Width, first: bool) {
        let r = region(addr);
        self.cycles += u64::from(1 + self.waits.waits(r, width, !first));
        self.fetch_nonseq = true;
        if (GAMEPAK_FIRST..=GAMEPAK_LAST).contains(&r) {
            self.prefetch.flush();
        }
    }
}

impl Default for BusTimer {
    fn default() -> Self {
        Self::new(WaitStates::power_on(), false)
    }
}

const fn region(addr: u32) -> usize {
    ((addr >> 24) & 0xF) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_ram_fetch_is_one_cycle() {
        let mut t = BusTimer::default();
        t.fetch(0x0300_0000, Width::Word);
        assert_eq!(t.cycles().get(), 1);
        t.fetch(0x0300_0004, Width::Word);
        assert_eq!(t.cycles().get(), 2);
    }

    #[test]
    fn gamepak_fetch_seq_vs_nonseq() {
        let mut t = BusTimer::default();
        // First access after reset is non-sequential: 1 + 4 waits.
        t.fetch(0x0800_0000, Width::Half);
        assert_eq!(t.cycles().get(), 5);
        // Next halfword is sequential: 1 + 2 waits.
        t.fetch(0x0800_0002, Width::Half);
        assert_eq!(t.cycles().get(), 8);
    }

    #[test]
    fn gamepak_word_fetch_is_nonseq_plus_seq() {
        let mut t = BusTimer::default();
        // 32-bit over a 16-bit bus: 1 + (4 + 2 + 1) waits.
        t.fetch(0x0800_0000, Width::Word);
        assert_eq!(t.cycles().get(), 8);
        t.fetch(0x0800_0004, Width::Word);
        assert_eq!(t.cycles().get(), 8 + 6);
    }

    #[test]
    fn broadcast_forces_nonsequential() {
        let mut t = BusTimer::default();
        t.fetch(0x0800_0000, Width::Half);
        t.non_sequential();
        t.fetch(0x0800_0002, Width::Half);
        // Billed as a first access despite the linear address.
        assert_eq!(t.cycles().get(), 5 + 5);
    }

    #[test]
    fn data_access_bumps_next_fetch() {
        let mut t = BusTimer::default();
        t.fetch(0x0300_0000, Width::Word);
        t.data(0x0300_1000, Width::Word, true);
        let before = t.cycles().get();
        t.fetch(0x0300_0004, Width::Word);
        // IWRAM has no waits, so the bump is invisible here; use EWRAM.
        assert_eq!(t.cycles().get(), before + 1);

        let mut t = BusTimer::default();
        t.fetch(0x0200_0000, Width::Half); // 1 + 2
        t.fetch(0x0200_0002, Width::Half); // 1 + 2 (seq)
        t.data(0x0300_0000, Width::Word, true); // 1
        t.fetch(0x0200_0004, Width::Half); // nonseq again: 1 + 2
        assert_eq!(t.cycles().get(), 3 + 3 + 1 + 3);
    }

    #[test]
    fn prefetch_hit_costs_one_cycle() {
        let mut t = BusTimer::new(WaitStates::power_on(), true);
        // Start a stream.
        t.fetch(0x0800_0000, Width::Half); // nonseq: 5
        // Burn enough internal cycles to buffer the next halfword (1+2).
        t.internal(3);
        t.fetch(0x0800_0002, Width::Half); // buffered: 1
        assert_eq!(t.cycles().get(), 5 + 3 + 1);
    }

    #[test]
    fn prefetch_flushes_on_broadcast() {
        let mut t = BusTimer::new(WaitStates::power_on(), true);
        t.fetch(0x0800_0000, Width::Half);
        t.internal(3);
        t.non_sequential();
        t.fetch(0x0800_0002, Width::Half);
        // Restarted stream: non-sequential price again.
        assert_eq!(t.cycles().get(), 5 + 3 + 5);
    }

    #[test]
    fn prefetch_buffer_caps_at_depth() {
        let mut t = BusTimer::new(WaitStates::power_on(), true);
        t.fetch(0x0800_0000, Width::Half);
        // Far more credit than 8 halfwords need.
        t.internal(100);
        let before = t.cycles().get();
        for i in 0..PREFETCH_DEPTH {
            t.fetch(0x0800_0002 + 2 * i, Width::Half);
        }
        assert_eq!(t.cycles().get(), before + u64::from(PREFETCH_DEPTH));
        // Ninth fetch misses the drained buffer but continues the stream.
        t.fetch(0x0800_0002 + 2 * PREFETCH_DEPTH, Width::Half);
        assert_eq!(
            t.cycles().get(),
            before + u64::from(PREFETCH_DEPTH) + 3
        );
    }
}
