//! hotload-ffi: Dynamic loading and lazy foreign calls
//!
//! Maps build-cache artifacts into the process and exposes their
//! exported functions as lazily-invoked calls: binding a symbol and its
//! arguments is pure data construction, and the foreign function only
//! runs once the caller picks a result type.
//!
//! Two handle shapes implement one [`NativeModule`] contract:
//! - [`FlatLibrary`] resolves symbols on demand, so loading succeeds
//!   even if some names never resolve.
//! - [`StructuredLibrary`] eagerly reads the module's declared
//!   `hotload_exports` table at load time.
//!
//! This is deliberately not a general-purpose safe FFI layer: result
//! selectors are `unsafe` because the caller vouches for the foreign
//! signature, and string/array memory returned by the foreign side is
//! borrowed, copied out, and never freed.

mod call;
mod error;
mod library;
mod loader;
mod value;

pub use call::LazyCall;
pub use error::FfiError;
pub use library::{FlatLibrary, NativeModule, StructuredLibrary, EXPORT_TABLE_SYMBOL};
pub use loader::{install_binding_header, Loader, BINDING_HEADER};
pub use value::{ArgValue, ArrayValues, ValueKind};

/// Result type for FFI operations
pub type Result<T> = std::result::Result<T, FfiError>;
