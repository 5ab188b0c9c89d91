//! Memory bus trait consumed by the CPU core.
//!
//! The core talks to the rest of the machine through this trait alone.
//! Address decoding, mirroring, open-bus behavior and peripheral registers
//! all live behind it. Wait-state accounting does *not*: the core's timing
//! adapter bills cycles from its own per-region tables, so implementations
//! return plain values with no timing information.
//!
//! Every access carries a sub-access index (`lane`). A 32-bit transfer over
//! a 16-bit bus is two physical accesses; the lane tells such a bus which
//! half is on the wires so it can apply side effects to the correct byte
//! lane. Single full-width accesses pass lane 0. Block transfers pass the
//! word index within the burst.

/// Bus interface for ARM7TDMI-family cores.
pub trait Arm7Bus {
    /// Read a byte.
    fn read_byte(&mut self, addr: u32, lane: u32) -> u8;

    /// Read a halfword. The address is halfword-aligned by the core.
    fn read_half(&mut self, addr: u32, lane: u32) -> u16;

    /// Read a word. The address is word-aligned by the core.
    fn read_word(&mut self, addr: u32, lane: u32) -> u32;

    /// Write a byte.
    fn write_byte(&mut self, addr: u32, value: u8, lane: u32);

    /// Write a halfword. The address is halfword-aligned by the core.
    fn write_half(&mut self, addr: u32, value: u16, lane: u32);

    /// Write a word. The address is word-aligned by the core.
    fn write_word(&mut self, addr: u32, value: u32, lane: u32);
}
