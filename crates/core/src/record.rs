//! Build record sidecar files
//!
//! Every installed artifact gets a `<artifact>.buildinfo` JSON sidecar
//! recording where it came from and the digest of the source bytes it
//! was built from. The record is evidence of freshness, nothing more:
//! a record that cannot be read or parsed is treated as absent, never
//! as a hard error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{CoreError, Result};

/// Suffix appended to the artifact file name for its metadata sidecar.
pub const RECORD_SUFFIX: &str = ".buildinfo";

/// Persisted metadata for one built artifact.
///
/// Readers ignore unknown fields, so the format can grow without
/// invalidating old caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Platform the artifact was built for.
    pub os: String,
    /// Time of the last successful build.
    pub build_date: DateTime<Utc>,
    /// Input source file.
    pub src: PathBuf,
    /// Output path stem, without the platform suffix.
    pub out: PathBuf,
    /// Hex SHA-256 digest of the source bytes at build time.
    pub src_hash: String,
}

impl BuildRecord {
    /// Sidecar path for a given artifact path.
    pub fn path_for(artifact: &Path) -> PathBuf {
        let mut name = artifact.as_os_str().to_os_string();
        name.push(RECORD_SUFFIX);
        PathBuf::from(name)
    }

    /// Load a record, collapsing every failure into `None`.
    ///
    /// Missing file, unreadable file, malformed JSON, and missing
    /// required fields all mean the same thing to the cache: there is
    /// no valid record, so the artifact must be rebuilt.
    pub fn load(path: &Path) -> Option<Self> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(path = %path.display(), %err, "discarding unreadable build record");
                None
            }
        }
    }

    /// Write the record as pretty JSON.
    ///
    /// Unlike reads, write failures are real errors: they happen during
    /// artifact install, where losing the record would leave a fresh
    /// artifact that always looks stale.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| CoreError::Record {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, json)?;
        Ok(())
    }
}
