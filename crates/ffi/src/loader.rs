//! Load entry points
//!
//! `Loader` is the front door: give it a source stem and it runs the
//! whole pipeline — freshness check, rebuild if needed, atomic install,
//! map the artifact — and hands back a callable handle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use hotload_core::{BuildCache, Language};

use crate::library::{FlatLibrary, StructuredLibrary};
use crate::Result;

/// The binding header a structured module compiles against.
pub const BINDING_HEADER: &str = include_str!("../include/hotload.h");

/// Header file name inside an include directory.
const BINDING_HEADER_NAME: &str = "hotload.h";

/// Write the bundled binding header into `dir`, returning the header
/// path. This is what the `hotload includes` helper command does before
/// printing the `-I` flag.
pub fn install_binding_header(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(BINDING_HEADER_NAME);
    // Unconditional write keeps the installed header current across
    // hotload upgrades.
    fs::write(&path, BINDING_HEADER)?;
    Ok(path)
}

/// Cache-backed loader for native source files.
pub struct Loader {
    cache: BuildCache,
    cxx: Language,
}

impl Loader {
    /// Loader over a cache directory, using the system toolchain and
    /// the default include discovery helper.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_cache(BuildCache::new(cache_dir)?))
    }

    /// Loader over an existing build cache.
    pub fn with_cache(cache: BuildCache) -> Self {
        Self {
            cache,
            cxx: Language::cxx(),
        }
    }

    /// Replace the include discovery command of the C++ profile.
    /// Tests use this to substitute the external helper.
    pub fn with_include_query(mut self, query: Vec<String>) -> Self {
        self.cxx = Language::Cxx {
            include_query: query,
        };
        self
    }

    /// The build cache backing this loader.
    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    /// Ensure `<stem>.c` is built and map it as a flat-symbol handle.
    pub fn load_flat(&self, source_stem: &Path) -> Result<FlatLibrary> {
        let artifact = self.cache.ensure_built(source_stem, &Language::C)?;
        info!(artifact = %artifact.display(), "loading flat module");
        FlatLibrary::open(&artifact)
    }

    /// Ensure `<stem>.cpp` is built with the native-binding profile and
    /// map it as a structured handle with pre-bound exports.
    pub fn load_structured(&self, source_stem: &Path) -> Result<StructuredLibrary> {
        let artifact = self.cache.ensure_built(source_stem, &self.cxx)?;
        info!(artifact = %artifact.display(), "loading structured module");
        StructuredLibrary::open(&artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotload_core::CoreError;
    use crate::FfiError;
    use tempfile::TempDir;

    #[test]
    fn install_binding_header_writes_the_header() {
        let dir = TempDir::new().unwrap();
        let path = install_binding_header(dir.path()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("hotload_export"));
        assert!(content.contains("HOTLOAD_MODULE"));
        // The table definition must carry C linkage out to the user's
        // file scope, or the exports stay internal to the module.
        assert!(content.contains("HOTLOAD_EXTERN HOTLOAD_API"));
        assert!(content.contains("extern \"C\""));
    }

    #[test]
    fn missing_source_surfaces_source_not_found() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::new(dir.path().join("cache")).unwrap();
        let err = loader.load_flat(&dir.path().join("ghost")).unwrap_err();
        assert!(matches!(err, FfiError::Core(CoreError::SourceNotFound(_))));
    }
}
