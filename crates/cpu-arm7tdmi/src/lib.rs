//! ARM7TDMI (ARMv4T) CPU core with a three-stage pipeline model and
//! cycle-accurate bus timing.
//!
//! The core interprets both instruction sets through table-driven decode:
//! a 4096-entry table over the classifying bits of an ARM word, and a
//! 64-entry table over the top bits of a Thumb halfword. Memory is reached
//! through the [`Arm7Bus`] trait; every access is billed against
//! per-region wait-state tables by the core's own timing adapter, so bus
//! implementations stay timing-free.

mod alu;
mod branches;
mod bus;
mod config;
mod cpu;
mod dataproc;
mod decode;
mod exceptions;
mod multiply;
mod psr;
mod registers;
mod shifter;
mod thumb;
mod timing;
mod transfer;

pub use bus::Arm7Bus;
pub use config::{Config, ConfigError, BOOT_ROM_SIZE};
pub use cpu::Arm7Tdmi;
pub use exceptions::Exception;
pub use psr::{Mode, Psr};
pub use registers::{RegisterBank, LR, PC, SP};
pub use timing::{BusTimer, WaitStates};
