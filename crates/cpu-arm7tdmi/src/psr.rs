//! Program status register (CPSR/SPSR) and processor modes.

/// Negative flag (bit 31) - set if the result is negative.
pub const N: u32 = 1 << 31;

/// Zero flag (bit 30) - set if the result is zero.
pub const Z: u32 = 1 << 30;

/// Carry flag (bit 29) - carry out of additions, "no borrow" for
/// subtractions, last bit shifted out for shifts.
pub const C: u32 = 1 << 29;

/// Overflow flag (bit 28) - signed overflow of additions/subtractions.
pub const V: u32 = 1 << 28;

/// IRQ disable (bit 7) - set blocks normal interrupts.
pub const I: u32 = 1 << 7;

/// FIQ disable (bit 6) - set blocks fast interrupts.
pub const F: u32 = 1 << 6;

/// Thumb state (bit 5) - selects the 16-bit instruction decoder.
pub const T: u32 = 1 << 5;

/// Mode field mask (bits 4:0).
pub const MODE_MASK: u32 = 0x1F;

/// Processor modes with their architected 5-bit encodings.
///
/// User and System are the two non-privileged banking positions: they share
/// one register bank and have no saved status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Mode {
    User = 0x10,
    Fiq = 0x11,
    Irq = 0x12,
    Supervisor = 0x13,
    Abort = 0x17,
    Undefined = 0x1B,
    System = 0x1F,
}

impl Mode {
    /// Decode a 5-bit mode field. Returns `None` for reserved encodings.
    #[must_use]
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & MODE_MASK {
            0x10 => Some(Self::User),
            0x11 => Some(Self::Fiq),
            0x12 => Some(Self::Irq),
            0x13 => Some(Self::Supervisor),
            0x17 => Some(Self::Abort),
            0x1B => Some(Self::Undefined),
            0x1F => Some(Self::System),
            _ => None,
        }
    }

    /// Returns the 5-bit encoding of this mode.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// True for the modes that own a saved status register shadow.
    /// User and System do not; saving/restoring status is a no-op there.
    #[must_use]
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }
}

/// A program status register: condition flags, interrupt disables, the
/// Thumb state bit, and the mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Psr(u32);

impl Psr {
    /// A fresh status register: Supervisor mode, ARM state, both interrupt
    /// classes disabled. This is the architected reset value.
    #[must_use]
    pub const fn reset() -> Self {
        Self(Mode::Supervisor as u32 | I | F)
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn n(self) -> bool {
        self.0 & N != 0
    }

    #[must_use]
    pub const fn z(self) -> bool {
        self.0 & Z != 0
    }

    #[must_use]
    pub const fn c(self) -> bool {
        self.0 & C != 0
    }

    #[must_use]
    pub const fn v(self) -> bool {
        self.0 & V != 0
    }

    pub fn set_n(&mut self, set: bool) {
        self.set(N, set);
    }

    pub fn set_z(&mut self, set: bool) {
        self.set(Z, set);
    }

    pub fn set_c(&mut self, set: bool) {
        self.set(C, set);
    }

    pub fn set_v(&mut self, set: bool) {
        self.set(V, set);
    }

    /// Set N and Z from a 32-bit result.
    pub fn set_nz(&mut self, result: u32) {
        self.set_n(result & 0x8000_0000 != 0);
        self.set_z(result == 0);
    }

    #[must_use]
    pub const fn irq_disabled(self) -> bool {
        self.0 & I != 0
    }

    #[must_use]
    pub const fn fiq_disabled(self) -> bool {
        self.0 & F != 0
    }

    pub fn set_irq_disable(&mut self, set: bool) {
        self.set(I, set);
    }

    pub fn set_fiq_disable(&mut self, set: bool) {
        self.set(F, set);
    }

    /// True when the 16-bit (Thumb) decoder is active.
    #[must_use]
    pub const fn thumb(self) -> bool {
        self.0 & T != 0
    }

    pub fn set_thumb(&mut self, set: bool) {
        self.set(T, set);
    }

    /// The current processor mode. Reserved mode-field encodings fall back
    /// to the value's raw bits being unrepresentable; callers that can see
    /// guest-written values should use [`Mode::from_bits`] and keep the old
    /// mode on `None`.
    #[must_use]
    pub fn mode(self) -> Mode {
        Mode::from_bits(self.0).unwrap_or(Mode::System)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !MODE_MASK) | mode.bits();
    }

    fn set(&mut self, bit: u32, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

impl Default for Psr {
    fn default() -> Self {
        Self::reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_value() {
        let psr = Psr::reset();
        assert_eq!(psr.mode(), Mode::Supervisor);
        assert!(psr.irq_disabled());
        assert!(psr.fiq_disabled());
        assert!(!psr.thumb());
        assert!(!psr.n() && !psr.z() && !psr.c() && !psr.v());
    }

    #[test]
    fn nz_from_result() {
        let mut psr = Psr::reset();
        psr.set_nz(0);
        assert!(psr.z() && !psr.n());
        psr.set_nz(0x8000_0000);
        assert!(psr.n() && !psr.z());
    }

    #[test]
    fn reserved_mode_bits_decode_to_none() {
        assert_eq!(Mode::from_bits(0x00), None);
        assert_eq!(Mode::from_bits(0x16), None);
        assert_eq!(Mode::from_bits(0x13), Some(Mode::Supervisor));
    }

    #[test]
    fn spsr_ownership() {
        assert!(!Mode::User.has_spsr());
        assert!(!Mode::System.has_spsr());
        assert!(Mode::Fiq.has_spsr());
        assert!(Mode::Irq.has_spsr());
        assert!(Mode::Supervisor.has_spsr());
    }
}
