//! The fundamental unit of time in the emulator.

/// A count of bus cycles.
///
/// All timing — instruction fetches, data accesses, wait states, internal
/// processing — is expressed as a count of cycles of the system bus clock.
/// Both the CPU core and peripherals accumulate into the same counter, so
/// every subsystem agrees on how much time an operation consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Cycles elapsed since an earlier count. Saturates at zero if the
    /// counts are passed in the wrong order.
    #[must_use]
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::Add<u64> for Ticks {
    type Output = Self;

    fn add(self, rhs: u64) -> Self {
        Self(self.0 + rhs)
    }
}

impl core::ops::AddAssign<u64> for Ticks {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_saturates() {
        let a = Ticks::new(10);
        let b = Ticks::new(25);
        assert_eq!(b.since(a), 15);
        assert_eq!(a.since(b), 0);
    }

    #[test]
    fn add_raw_cycles() {
        let mut t = Ticks::ZERO;
        t += 3;
        assert_eq!((t + 4).get(), 7);
    }
}
