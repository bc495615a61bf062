//! Operating system identification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

impl Os {
    /// Detect the current operating system at compile time
    #[cfg(target_os = "linux")]
    pub const fn current() -> Self {
        Os::Linux
    }

    #[cfg(target_os = "macos")]
    pub const fn current() -> Self {
        Os::Darwin
    }

    #[cfg(target_os = "windows")]
    pub const fn current() -> Self {
        Os::Windows
    }

    /// Returns the OS name as recorded in build metadata
    pub const fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
        }
    }

    /// File extension used for shared-library artifacts on this OS,
    /// without the leading dot.
    pub const fn dylib_extension(&self) -> &'static str {
        match self {
            Os::Linux => "so",
            Os::Darwin => "dylib",
            Os::Windows => "dll",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_os_matches_target() {
        let os = Os::current();
        #[cfg(target_os = "linux")]
        assert_eq!(os, Os::Linux);
        #[cfg(target_os = "macos")]
        assert_eq!(os, Os::Darwin);
        #[cfg(target_os = "windows")]
        assert_eq!(os, Os::Windows);
    }

    #[test]
    fn dylib_extension_has_no_dot() {
        assert!(!Os::current().dylib_extension().starts_with('.'));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Os::Linux).unwrap();
        assert_eq!(json, "\"linux\"");
    }
}
