//! Argument and result values crossing the foreign boundary

use std::ffi::{c_void, CString};

use crate::Result;

/// A caller-supplied argument, tagged with its marshalling rule.
///
/// The tag decides exactly how the value crosses the boundary: strings
/// go as null-terminated byte pointers, integers and doubles by value
/// in the native calling convention, and opaque values pass through
/// unchanged (the escape hatch for pre-marshalled foreign pointers).
/// There is no implicit widening between tags.
#[derive(Debug)]
pub enum ArgValue {
    /// Passed as `const char *`.
    Str(CString),
    /// Passed as a C `int32_t`.
    Int(i32),
    /// Passed as a C `double`.
    Double(f64),
    /// Passed through unchanged.
    Opaque(*mut c_void),
}

impl ArgValue {
    /// Marshal a Rust string into a C string argument.
    ///
    /// Fails if the string contains an interior NUL byte; there is no
    /// silent truncation.
    pub fn string(s: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(ArgValue::Str(CString::new(s)?))
    }

    /// The marshalling tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ArgValue::Str(_) => ValueKind::Str,
            ArgValue::Int(_) => ValueKind::Int,
            ArgValue::Double(_) => ValueKind::Double,
            ArgValue::Opaque(_) => ValueKind::Opaque,
        }
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Double(v)
    }
}

impl From<*mut c_void> for ArgValue {
    fn from(v: *mut c_void) -> Self {
        ArgValue::Opaque(v)
    }
}

/// Marshalling tags, also used to select array element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Double,
    Str,
    Opaque,
}

/// An owned copy of a fixed-length foreign array.
///
/// Elements are copied out of foreign-owned memory; the foreign
/// allocation itself is never freed.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    Int(Vec<i32>),
    Double(Vec<f64>),
    Str(Vec<String>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::Int(v) => v.len(),
            ArrayValues::Double(v) => v.len(),
            ArrayValues::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
