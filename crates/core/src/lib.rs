//! hotload-core: Build cache for natively compiled sources
//!
//! This crate decides whether a previously built shared library is
//! still valid for the current source bytes, invokes the external
//! toolchain when it is not, and installs the result atomically next
//! to a JSON build record.

mod cache;
mod error;
mod hash;
mod record;
mod toolchain;

pub use cache::{BuildCache, Freshness};
pub use error::CoreError;
pub use hash::{digest_bytes, source_digest};
pub use record::BuildRecord;
pub use toolchain::{CompileRequest, Language, SystemToolchain, Toolchain};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
