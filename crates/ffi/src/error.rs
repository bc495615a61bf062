//! Error types for hotload-ffi

use std::path::PathBuf;
use thiserror::Error;

use crate::value::ValueKind;

/// Errors that can occur while loading artifacts or invoking symbols
#[derive(Debug, Error)]
pub enum FfiError {
    /// Build-cache failure while ensuring the artifact exists.
    #[error(transparent)]
    Core(#[from] hotload_core::CoreError),

    /// The platform dynamic loader rejected the artifact.
    #[error("Failed to load library: {0}")]
    Load(#[from] libloading::Error),

    /// A structured artifact is missing its export table.
    #[error("Artifact '{path}' does not export a `hotload_exports` table: {message}")]
    ExportTable { path: PathBuf, message: String },

    /// The requested foreign function does not exist. Fatal for this
    /// call only; the handle stays usable.
    #[error("Symbol not found: {name}")]
    SymbolNotFound { name: String },

    /// The caller asked for an array of an element kind the marshaller
    /// does not support. Raised before any foreign call is made.
    #[error("Unsupported array element kind: {kind:?}")]
    UnsupportedType { kind: ValueKind },

    /// A string argument contains an interior NUL byte and cannot be
    /// passed as a C string.
    #[error("Argument string contains an interior NUL byte")]
    NulInArgument(#[from] std::ffi::NulError),
}
