//! Library handles
//!
//! Both handle shapes own their mapped artifact: every [`LazyCall`]
//! borrows the handle that produced it, so the mapping provably
//! outlives every call made through it. Dropping a handle unmaps the
//! artifact; callers wanting process-lifetime mappings simply keep the
//! handle around.

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};
use std::path::Path;

use libffi::middle::CodePtr;
use libloading::{Library, Symbol};
use tracing::debug;

use crate::call::LazyCall;
use crate::value::ArgValue;
use crate::{FfiError, Result};

/// Symbol name of the export table a structured module must provide.
pub const EXPORT_TABLE_SYMBOL: &str = "hotload_exports";

/// One entry of the C-side `hotload_exports` table.
#[repr(C)]
struct RawExport {
    name: *const c_char,
    func: *mut c_void,
}

/// Common contract of both handle shapes: bind a named foreign
/// function and positional arguments into a [`LazyCall`].
///
/// Binding fails with [`FfiError::SymbolNotFound`] when the name does
/// not resolve; the handle itself stays valid for further calls.
pub trait NativeModule {
    fn call(&self, name: &str, args: Vec<ArgValue>) -> Result<LazyCall<'_>>;
}

/// A flat-symbol handle over a C artifact.
///
/// Symbol existence is checked lazily, per call: loading succeeds even
/// if some symbols never resolve.
#[derive(Debug)]
pub struct FlatLibrary {
    lib: Library,
}

impl FlatLibrary {
    /// Map a built artifact into the process.
    pub fn open(path: &Path) -> Result<Self> {
        // Safety: loading runs the artifact's initializers; artifacts
        // come from the caller's own sources via the build cache.
        let lib = unsafe { Library::new(path) }?;
        debug!(path = %path.display(), "mapped flat library");
        Ok(Self { lib })
    }

    /// Resolve a symbol to its code pointer.
    pub fn lookup(&self, name: &str) -> Result<CodePtr> {
        let symbol: Symbol<'_, unsafe extern "C" fn()> = unsafe {
            self.lib
                .get(name.as_bytes())
                .map_err(|_| FfiError::SymbolNotFound { name: name.into() })?
        };
        Ok(CodePtr::from_fun(*symbol))
    }
}

impl NativeModule for FlatLibrary {
    fn call(&self, name: &str, args: Vec<ArgValue>) -> Result<LazyCall<'_>> {
        Ok(LazyCall::new(self.lookup(name)?, args))
    }
}

/// A structured handle whose exported names are pre-bound at load time
/// from the module's declared `hotload_exports` table.
#[derive(Debug)]
pub struct StructuredLibrary {
    // Keeps the mapping alive for the code pointers in `exports`.
    _lib: Library,
    exports: HashMap<String, CodePtr>,
}

impl StructuredLibrary {
    /// Map a structured artifact and eagerly read its export table.
    pub fn open(path: &Path) -> Result<Self> {
        // Safety: as for FlatLibrary::open; additionally the export
        // table walk relies on the module using the bundled binding
        // header, which NUL-terminates the table.
        unsafe {
            let lib = Library::new(path)?;
            let table: Symbol<'_, *const RawExport> = lib
                .get(EXPORT_TABLE_SYMBOL.as_bytes())
                .map_err(|e| FfiError::ExportTable {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;

            let mut exports = HashMap::new();
            let mut cursor = *table;
            while !(*cursor).name.is_null() {
                let name = CStr::from_ptr((*cursor).name).to_string_lossy().into_owned();
                exports.insert(name, CodePtr::from_ptr((*cursor).func));
                cursor = cursor.add(1);
            }
            debug!(
                path = %path.display(),
                exports = exports.len(),
                "mapped structured library"
            );
            Ok(Self { _lib: lib, exports })
        }
    }

    /// Names declared by the module, in no particular order.
    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }
}

impl NativeModule for StructuredLibrary {
    fn call(&self, name: &str, args: Vec<ArgValue>) -> Result<LazyCall<'_>> {
        let code = self
            .exports
            .get(name)
            .copied()
            .ok_or_else(|| FfiError::SymbolNotFound { name: name.into() })?;
        Ok(LazyCall::new(code, args))
    }
}
