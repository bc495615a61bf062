//! Platform detection for hotload
//!
//! This crate provides the small amount of platform knowledge the build
//! cache needs:
//! - OS identification (recorded in build metadata)
//! - the shared-library suffix for built artifacts
//! - default cache directory resolution

mod error;
mod os;
mod paths;

pub use error::PlatformError;
pub use os::Os;
pub use paths::{default_cache_dir, CACHE_DIR_NAME};
