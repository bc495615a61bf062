//! Cache directory resolution

use crate::error::PlatformError;
use std::path::PathBuf;

/// Directory name used for the user-level build cache.
pub const CACHE_DIR_NAME: &str = "hotload";

/// Resolve the default user-level build cache directory.
///
/// Uses the platform cache directory (`~/.cache/hotload` on Linux,
/// `~/Library/Caches/hotload` on macOS), falling back to a dot
/// directory under `$HOME` when no cache directory is defined.
pub fn default_cache_dir() -> Result<PathBuf, PlatformError> {
    if let Some(cache) = dirs::cache_dir() {
        return Ok(cache.join(CACHE_DIR_NAME));
    }
    dirs::home_dir()
        .map(|home| home.join(format!(".{CACHE_DIR_NAME}")))
        .ok_or(PlatformError::NoHomeDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_dir_ends_with_project_name() {
        let dir = default_cache_dir().unwrap();
        let name = dir.file_name().unwrap().to_string_lossy();
        assert!(name.contains(CACHE_DIR_NAME));
    }
}
