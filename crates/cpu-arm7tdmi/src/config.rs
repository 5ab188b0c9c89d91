//! Core configuration and boot ROM validation.

use std::error::Error;
use std::fmt;

use crate::timing::WaitStates;

/// Required boot ROM image size in bytes.
pub const BOOT_ROM_SIZE: usize = 16 * 1024;

/// Construction-time configuration faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Boot ROM image is not exactly [`BOOT_ROM_SIZE`] bytes.
    BootRomSize(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BootRomSize(len) => {
                write!(f, "boot ROM must be {BOOT_ROM_SIZE} bytes, got {len}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Core construction parameters.
///
/// The boot ROM bytes themselves live behind the bus with the rest of
/// memory; the core only needs to know whether an image is present, because
/// that decides between vectoring into it and synthesizing the boot/IRQ
/// sequences it would have provided.
#[derive(Debug, Clone)]
pub struct Config {
    pub boot_rom_present: bool,
    /// Enable the cartridge instruction prefetch buffer.
    pub prefetch: bool,
    pub wait_states: WaitStates,
}

impl Config {
    /// Run without a boot ROM: reset synthesizes the post-boot register
    /// state and IRQ entry emulates the dispatch stub.
    #[must_use]
    pub fn no_boot_rom() -> Self {
        Self {
            boot_rom_present: false,
            prefetch: true,
            wait_states: WaitStates::power_on(),
        }
    }

    /// Run with a boot ROM image, validating its size. The caller maps the
    /// image at address 0 behind the bus.
    pub fn with_boot_rom(rom: &[u8]) -> Result<Self, ConfigError> {
        if rom.len() != BOOT_ROM_SIZE {
            return Err(ConfigError::BootRomSize(rom.len()));
        }
        Ok(Self {
            boot_rom_present: true,
            prefetch: true,
            wait_states: WaitStates::power_on(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::no_boot_rom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_rom_size_is_checked() {
        assert!(Config::with_boot_rom(&vec![0; BOOT_ROM_SIZE]).is_ok());
        let err = Config::with_boot_rom(&[0; 100]).unwrap_err();
        assert_eq!(err, ConfigError::BootRomSize(100));
        assert!(err.to_string().contains("16384"));
    }
}
