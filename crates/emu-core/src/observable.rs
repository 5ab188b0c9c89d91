//! Observability trait for inspecting component state.
//!
//! Components expose their internal state through string query paths so
//! debuggers and trace tooling don't need to know concrete types. Queries
//! never affect emulation state.

use std::fmt;

/// A dynamically-typed value returned from a state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v:#06X}"),
            Value::U32(v) => write!(f, "{v:#010X}"),
            Value::U64(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

/// A component whose state can be inspected.
///
/// Paths are short dotted names, e.g. `pc`, `flags.z`, `cycles`. Unknown
/// paths return `None` rather than panicking so tooling can probe freely.
pub trait Observable {
    /// Query a property by path. Returns `None` if the path is not
    /// recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// List all query paths this component answers.
    fn query_paths(&self) -> &'static [&'static str];
}
