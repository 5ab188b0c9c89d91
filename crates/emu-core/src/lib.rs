//! Core traits and types for cycle-accurate emulation.
//!
//! CPU cores count every bus cycle they consume; peripherals and the
//! driving loop settle their own timing against that shared count.

mod observable;
mod ticks;
mod trace;

pub use observable::{Observable, Value};
pub use ticks::Ticks;
pub use trace::{NullTrace, TraceSink};
