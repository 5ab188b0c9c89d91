//! Injectable trace sink for execution tracing.
//!
//! Cores call into a `TraceSink` instead of any process-wide logger. The
//! default sink discards everything, so tracing costs one virtual call per
//! event when disabled and nothing is global or mutable across the process.

/// Receiver for core execution events.
///
/// All methods have empty default bodies; a sink overrides only what it
/// cares about.
pub trait TraceSink {
    /// An instruction was dispatched.
    ///
    /// `addr` is the address of the instruction itself (not the fetch
    /// address), `opcode` the raw instruction word, `thumb` whether the
    /// 16-bit encoding was active.
    fn instruction(&mut self, addr: u32, opcode: u32, thumb: bool) {
        let _ = (addr, opcode, thumb);
    }

    /// An exception was entered. `vector` is the architected vector
    /// address, `mode_bits` the 5-bit mode field after entry.
    fn exception(&mut self, vector: u32, mode_bits: u32) {
        let _ = (vector, mode_bits);
    }

    /// The processor mode changed outside exception entry (e.g. via a
    /// status-register write).
    fn mode_switch(&mut self, old_bits: u32, new_bits: u32) {
        let _ = (old_bits, new_bits);
    }
}

/// The default sink: discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_trace_accepts_everything() {
        let mut sink = NullTrace;
        sink.instruction(0x0800_0000, 0xE1A0_0000, false);
        sink.exception(0x18, 0x12);
        sink.mode_switch(0x1F, 0x10);
    }
}
