//! External toolchain invocation
//!
//! Builds are fail-fast: a non-zero compiler exit surfaces the captured
//! diagnostics verbatim and nothing is retried. The compiler is always
//! pointed at a temporary output path; installing the result is the
//! cache's job, not the toolchain's.

use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::{CoreError, Result};

/// Build profile for a source language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    /// ISO C, built with `cc -std=c11`.
    C,
    /// C++ with the native-binding layer, built with `c++ -std=c++17`.
    ///
    /// `include_query` is an external command (program + args) asked
    /// for the binding layer's include flags before every build. Its
    /// stdout is split on whitespace and appended to the compiler
    /// arguments. An empty query list skips the step.
    Cxx { include_query: Vec<String> },
}

impl Language {
    /// The C++ profile with the default include discovery helper.
    pub fn cxx() -> Self {
        Language::Cxx {
            include_query: vec!["hotload".into(), "includes".into()],
        }
    }

    /// Source file extension for this profile.
    pub fn source_extension(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx { .. } => "cpp",
        }
    }

    /// Suffix appended to the output stem, keeping the C and C++
    /// artifacts of one source family apart in the cache.
    pub fn stem_suffix(&self) -> &'static str {
        match self {
            Language::C => "_c",
            Language::Cxx { .. } => "_cpp",
        }
    }

    fn compiler(&self) -> String {
        match self {
            Language::C => env::var("CC").unwrap_or_else(|_| "cc".into()),
            Language::Cxx { .. } => env::var("CXX").unwrap_or_else(|_| "c++".into()),
        }
    }

    fn std_flag(&self) -> &'static str {
        match self {
            Language::C => "-std=c11",
            Language::Cxx { .. } => "-std=c++17",
        }
    }
}

/// One compilation job: a source file and the temporary output the
/// compiler must write.
#[derive(Debug)]
pub struct CompileRequest<'a> {
    pub language: &'a Language,
    pub source: &'a Path,
    pub output: &'a Path,
}

/// Seam between the cache and the external compiler.
///
/// The cache only ever talks to this trait, so tests can substitute an
/// invocation-counting or deliberately failing toolchain.
pub trait Toolchain {
    /// Produce a shared library at `req.output`. Must not touch any
    /// other path.
    fn compile(&self, req: &CompileRequest<'_>) -> Result<()>;
}

/// The real toolchain: shells out to `cc`/`c++` (overridable through
/// `$CC`/`$CXX`) with a fixed flag set per language profile.
#[derive(Debug, Default)]
pub struct SystemToolchain;

impl SystemToolchain {
    fn binding_include_flags(query: &[String]) -> Result<Vec<String>> {
        let Some((program, args)) = query.split_first() else {
            return Ok(Vec::new());
        };
        let command = query.join(" ");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| CoreError::IncludeQuery {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CoreError::IncludeQuery {
                command,
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .map(str::to_owned)
            .collect())
    }
}

impl Toolchain for SystemToolchain {
    fn compile(&self, req: &CompileRequest<'_>) -> Result<()> {
        let compiler = req.language.compiler();

        let mut args: Vec<OsString> = vec![
            "-O3".into(),
            "-shared".into(),
            "-fPIC".into(),
            req.language.std_flag().into(),
        ];

        if let Language::Cxx { include_query } = req.language {
            for flag in Self::binding_include_flags(include_query)? {
                args.push(flag.into());
            }
        }

        args.push(req.source.into());
        args.push("-o".into());
        args.push(req.output.into());

        info!(
            compiler = %compiler,
            source = %req.source.display(),
            "invoking toolchain"
        );
        debug!(?args, "toolchain arguments");

        let output = Command::new(&compiler).args(&args).output()?;
        if !output.status.success() {
            return Err(CoreError::Build {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }
}
