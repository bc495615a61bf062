//! Build cache orchestration
//!
//! `BuildCache` ties the hasher, the record store, and the toolchain
//! together: decide whether the cached artifact is still valid, rebuild
//! when it is not, install atomically, and only then write the record.
//!
//! The cache directory is owned by an explicit context object rather
//! than process-global state, so multiple independent caches can exist
//! in one process (tests rely on this).
//!
//! There is no locking around decide → build → install → record.
//! Two processes racing on one target may both rebuild; the rename
//! install guarantees the survivor is a complete artifact from one of
//! them, never a torn file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use chrono::Utc;
use hotload_platform::Os;

use crate::hash::source_digest;
use crate::record::BuildRecord;
use crate::toolchain::{CompileRequest, Language, SystemToolchain, Toolchain};
use crate::{CoreError, Result};

/// Cache-validity verdict for an artifact relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The recorded digest matches the current source bytes; reuse.
    Fresh,
    /// Anything else: no record, no artifact, unreadable source, or a
    /// digest mismatch. Ambiguity always lands here.
    Stale,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Fresh => write!(f, "fresh"),
            Freshness::Stale => write!(f, "stale"),
        }
    }
}

/// A build-cache context rooted at one directory.
pub struct BuildCache {
    cache_dir: PathBuf,
    toolchain: Box<dyn Toolchain>,
}

impl BuildCache {
    /// Open (creating if needed) a cache directory, using the system
    /// toolchain.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_toolchain(cache_dir, Box::new(SystemToolchain))
    }

    /// Open a cache with a substituted toolchain. This is the seam the
    /// freshness tests use to count or sabotage invocations.
    pub fn with_toolchain(
        cache_dir: impl Into<PathBuf>,
        toolchain: Box<dyn Toolchain>,
    ) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            toolchain,
        })
    }

    /// Root directory of this cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolve a caller-supplied source stem to the actual source file
    /// for a language profile (`bench/cs` → `bench/cs.c`).
    pub fn resolve_source(&self, stem: &Path, language: &Language) -> Result<PathBuf> {
        let src = stem.with_extension(language.source_extension());
        if !src.is_file() {
            return Err(CoreError::SourceNotFound(src));
        }
        Ok(src)
    }

    /// Output stem inside the cache for a source file, without the
    /// platform suffix (`bench/cs.c` → `<cache>/cs_c`).
    pub fn output_stem(&self, source: &Path, language: &Language) -> PathBuf {
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.cache_dir
            .join(format!("{name}{}", language.stem_suffix()))
    }

    /// Final artifact path for an output stem, with the platform's
    /// shared-library suffix.
    ///
    /// The suffix is appended, not substituted: a dotted stem like
    /// `lib.v2_c` must keep its language marker rather than lose
    /// everything after the last dot.
    pub fn artifact_path(&self, output_stem: &Path) -> PathBuf {
        let mut name = output_stem.as_os_str().to_os_string();
        name.push(".");
        name.push(Os::current().dylib_extension());
        PathBuf::from(name)
    }

    /// Decide whether the cached artifact for `source` can be reused.
    ///
    /// Computed from scratch on every call; the only persisted state is
    /// the build record itself. Every failure mode along the way
    /// (missing record, missing artifact, unreadable source, digest
    /// mismatch) collapses into [`Freshness::Stale`].
    pub fn check(&self, source: &Path, language: &Language) -> Freshness {
        let artifact = self.artifact_path(&self.output_stem(source, language));

        let Some(record) = BuildRecord::load(&BuildRecord::path_for(&artifact)) else {
            return Freshness::Stale;
        };
        if !artifact.is_file() {
            return Freshness::Stale;
        }
        let Ok(digest) = source_digest(source) else {
            return Freshness::Stale;
        };
        if digest != record.src_hash {
            return Freshness::Stale;
        }
        Freshness::Fresh
    }

    /// Ensure a current artifact exists for `source_stem`, rebuilding
    /// if needed, and return its path.
    ///
    /// Install ordering: the compiler writes a temporary file in the
    /// cache directory, the temp file is renamed over the final
    /// artifact path, and the build record is written last. A crash at
    /// any point leaves the previous artifact as the last known-good
    /// state; the cache degrades to stale, never to corrupt.
    pub fn ensure_built(&self, source_stem: &Path, language: &Language) -> Result<PathBuf> {
        let source = self.resolve_source(source_stem, language)?;
        let output_stem = self.output_stem(&source, language);
        let artifact = self.artifact_path(&output_stem);

        if self.check(&source, language) == Freshness::Fresh {
            debug!(artifact = %artifact.display(), "artifact is fresh, skipping build");
            return Ok(artifact);
        }

        let src_hash = source_digest(&source)?;

        let temp = tempfile::Builder::new()
            .prefix(".hotload-build-")
            .tempfile_in(&self.cache_dir)?;

        self.toolchain.compile(&CompileRequest {
            language,
            source: &source,
            output: temp.path(),
        })?;

        // Same-directory rename: atomic on every platform we build for.
        temp.persist(&artifact).map_err(|e| CoreError::Io(e.error))?;

        let record = BuildRecord {
            os: Os::current().as_str().to_string(),
            build_date: Utc::now(),
            src: source.clone(),
            out: output_stem,
            src_hash,
        };
        record.write(&BuildRecord::path_for(&artifact))?;

        info!(
            source = %source.display(),
            artifact = %artifact.display(),
            "built and installed artifact"
        );
        Ok(artifact)
    }
}
