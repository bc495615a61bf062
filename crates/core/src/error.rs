//! Error types for hotload-core

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while deciding, building, or installing
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Toolchain exited with {status}:\n{stderr}")]
    Build { status: ExitStatus, stderr: String },

    #[error("Include query `{command}` failed: {message}")]
    IncludeQuery { command: String, message: String },

    #[error("Failed to write build record for '{path}': {message}")]
    Record { path: PathBuf, message: String },
}
