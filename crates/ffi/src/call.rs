//! Lazy foreign function calls
//!
//! A [`LazyCall`] is an unexecuted invocation: a resolved code pointer
//! plus an ordered argument list. Constructing one performs no foreign
//! call; the call happens when the caller selects a result type, and it
//! happens again on every further selection — there is no result cache,
//! and nothing here guarantees idempotence if the native function is
//! not idempotent.

use std::ffi::{c_char, CStr};
use std::marker::PhantomData;

use libffi::middle::{Arg, Cif, CodePtr, Type};

use crate::value::{ArgValue, ArrayValues, ValueKind};
use crate::{FfiError, Result};

/// Marshalled argument storage with stable addresses for the duration
/// of one invocation.
enum Slot {
    Int(i32),
    Double(f64),
    Ptr(*const c_char),
    Raw(*mut std::ffi::c_void),
}

/// A bound-but-not-yet-invoked foreign call.
///
/// Borrows the library handle it was created from, so the mapped
/// artifact cannot go away while the call is usable.
///
/// The result selectors are `unsafe`: the wrapper trusts the caller to
/// know the foreign function's true signature. A wrong argument list,
/// return kind, or array length is undefined behavior at the foreign
/// boundary. Memory returned for strings and arrays is borrowed from
/// the foreign side, copied out, and never freed.
#[derive(Debug)]
pub struct LazyCall<'lib> {
    code: CodePtr,
    args: Vec<ArgValue>,
    _handle: PhantomData<&'lib ()>,
}

impl<'lib> LazyCall<'lib> {
    pub(crate) fn new(code: CodePtr, args: Vec<ArgValue>) -> Self {
        Self {
            code,
            args,
            _handle: PhantomData,
        }
    }

    /// Number of bound arguments.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    fn marshal(&self) -> (Vec<Type>, Vec<Slot>) {
        let mut types = Vec::with_capacity(self.args.len());
        let mut slots = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            match arg {
                ArgValue::Str(cs) => {
                    types.push(Type::pointer());
                    slots.push(Slot::Ptr(cs.as_ptr()));
                }
                ArgValue::Int(v) => {
                    types.push(Type::i32());
                    slots.push(Slot::Int(*v));
                }
                ArgValue::Double(v) => {
                    types.push(Type::f64());
                    slots.push(Slot::Double(*v));
                }
                ArgValue::Opaque(p) => {
                    types.push(Type::pointer());
                    slots.push(Slot::Raw(*p));
                }
            }
        }
        (types, slots)
    }

    unsafe fn invoke<R>(&self, result: Type) -> R {
        let (types, slots) = self.marshal();
        let args: Vec<Arg> = slots
            .iter()
            .map(|slot| match slot {
                Slot::Int(v) => Arg::new(v),
                Slot::Double(v) => Arg::new(v),
                Slot::Ptr(v) => Arg::new(v),
                Slot::Raw(v) => Arg::new(v),
            })
            .collect();
        let cif = Cif::new(types, result);
        cif.call::<R>(self.code, &args)
    }

    /// Invoke and decode the return as a possibly-null C string.
    ///
    /// A null return yields the empty string; otherwise bytes up to the
    /// terminating NUL are decoded as UTF-8 (lossily).
    ///
    /// # Safety
    ///
    /// The foreign function must match the bound argument list and
    /// return a `const char *` that is either null or NUL-terminated.
    pub unsafe fn as_string(&self) -> String {
        let ptr: *const c_char = self.invoke(Type::pointer());
        if ptr.is_null() {
            String::new()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }

    /// Invoke and take the return as a 32-bit integer.
    ///
    /// # Safety
    ///
    /// The foreign function must match the bound argument list and
    /// return a C `int32_t`.
    pub unsafe fn as_int32(&self) -> i32 {
        // libffi widens integral returns to a register-sized slot.
        let raw: isize = self.invoke(Type::i32());
        raw as i32
    }

    /// Invoke and take the return as a 64-bit double.
    ///
    /// # Safety
    ///
    /// The foreign function must match the bound argument list and
    /// return a C `double`.
    pub unsafe fn as_float64(&self) -> f64 {
        self.invoke(Type::f64())
    }

    /// Invoke and copy `len` elements out of the returned array.
    ///
    /// The caller supplies the length; there is no way to discover it
    /// from the foreign side, so it must be known out of band. A null
    /// element in a string array, or a null array pointer, collapses to
    /// empty values the same way [`Self::as_string`] collapses null.
    ///
    /// Element kinds other than `Int`, `Double`, and `Str` fail with
    /// [`FfiError::UnsupportedType`] before any foreign call is made.
    ///
    /// # Safety
    ///
    /// The foreign function must match the bound argument list and
    /// return a pointer to at least `len` contiguous elements of the
    /// requested kind (or null).
    pub unsafe fn as_array(&self, len: usize, kind: ValueKind) -> Result<ArrayValues> {
        match kind {
            ValueKind::Int => {
                let ptr: *const i32 = self.invoke(Type::pointer());
                Ok(ArrayValues::Int(copy_elements(ptr, len)))
            }
            ValueKind::Double => {
                let ptr: *const f64 = self.invoke(Type::pointer());
                Ok(ArrayValues::Double(copy_elements(ptr, len)))
            }
            ValueKind::Str => {
                let ptr: *const *const c_char = self.invoke(Type::pointer());
                let strings = copy_elements(ptr, len)
                    .into_iter()
                    .map(|s: *const c_char| {
                        if s.is_null() {
                            String::new()
                        } else {
                            CStr::from_ptr(s).to_string_lossy().into_owned()
                        }
                    })
                    .collect();
                Ok(ArrayValues::Str(strings))
            }
            ValueKind::Opaque => Err(FfiError::UnsupportedType { kind }),
        }
    }
}

unsafe fn copy_elements<T: Copy>(ptr: *const T, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr, len).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_is_pure_data() {
        // A dangling code pointer is harmless as long as nothing invokes.
        let call = LazyCall::new(
            CodePtr::from_ptr(std::ptr::null()),
            vec![ArgValue::Int(1), ArgValue::Double(2.0)],
        );
        assert_eq!(call.arg_count(), 2);
        // `Result<LazyCall>` must stay debuggable for `unwrap_err`.
        assert!(format!("{call:?}").contains("LazyCall"));
    }

    #[test]
    fn opaque_array_kind_is_rejected_before_invocation() {
        // If this reached the foreign call, the null code pointer would
        // crash the process; returning the error proves the check runs
        // first.
        let call = LazyCall::new(CodePtr::from_ptr(std::ptr::null()), vec![]);
        let err = unsafe { call.as_array(4, ValueKind::Opaque) }.unwrap_err();
        assert!(matches!(
            err,
            FfiError::UnsupportedType {
                kind: ValueKind::Opaque
            }
        ));
    }

    #[test]
    fn marshalling_tags_map_to_ffi_types() {
        let call = LazyCall::new(
            CodePtr::from_ptr(std::ptr::null()),
            vec![
                ArgValue::string("s").unwrap(),
                ArgValue::Int(3),
                ArgValue::Double(1.5),
                ArgValue::Opaque(std::ptr::null_mut()),
            ],
        );
        let (types, slots) = call.marshal();
        assert_eq!(types.len(), 4);
        assert_eq!(slots.len(), 4);
        assert!(matches!(slots[0], Slot::Ptr(_)));
        assert!(matches!(slots[1], Slot::Int(3)));
        assert!(matches!(slots[2], Slot::Double(f) if f == 1.5));
        assert!(matches!(slots[3], Slot::Raw(_)));
    }
}
