use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use hotload_core::{BuildCache, Language};
use hotload_ffi::{install_binding_header, ArgValue, Loader, NativeModule};
use hotload_platform::default_cache_dir;

/// hotload - build-cache-backed loader for native code
#[derive(Parser)]
#[command(name = "hotload")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Build cache directory (default: the user cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the cached artifact for a source is fresh or stale
    Status {
        /// Source stem or file (the language extension is appended)
        source: PathBuf,

        /// Language profile to check
        #[arg(short, long, value_enum, default_value = "c")]
        lang: Lang,
    },

    /// Build (if needed) and print the artifact path
    Build {
        /// Source stem or file (the language extension is appended)
        source: PathBuf,

        /// Language profile to build with
        #[arg(short, long, value_enum, default_value = "c")]
        lang: Lang,
    },

    /// Build, load, and call an exported function
    Call {
        /// Source stem or file (the language extension is appended)
        source: PathBuf,

        /// Name of the exported function
        symbol: String,

        /// Positional arguments (integers, doubles, or strings)
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Language profile to build with
        #[arg(short, long, value_enum, default_value = "c")]
        lang: Lang,

        /// Result type to coerce the return value into
        #[arg(short, long, value_enum, default_value = "int")]
        ret: Ret,
    },

    /// Print compiler include flags for the binding header
    Includes,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
enum Lang {
    C,
    Cpp,
}

#[derive(ValueEnum, Clone, Copy)]
enum Ret {
    Str,
    Int,
    Float,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .init();
    let cache_dir = match &cli.cache_dir {
        Some(dir) => dir.clone(),
        None => default_cache_dir()?,
    };

    match cli.command {
        Commands::Status { source, lang } => cmd_status(&cache_dir, &source, lang),
        Commands::Build { source, lang } => cmd_build(&cache_dir, &source, lang),
        Commands::Call {
            source,
            symbol,
            args,
            lang,
            ret,
        } => cmd_call(&cache_dir, &source, &symbol, &args, lang, ret),
        Commands::Includes => cmd_includes(&cache_dir),
    }
}

fn language_of(lang: Lang) -> Language {
    match lang {
        Lang::C => Language::C,
        Lang::Cpp => Language::cxx(),
    }
}

fn cmd_status(cache_dir: &Path, source: &Path, lang: Lang) -> Result<()> {
    let language = language_of(lang);
    let cache = BuildCache::new(cache_dir)?;
    let resolved = cache.resolve_source(source, &language)?;
    println!("{}", cache.check(&resolved, &language));
    Ok(())
}

fn cmd_build(cache_dir: &Path, source: &Path, lang: Lang) -> Result<()> {
    let language = language_of(lang);
    let cache = BuildCache::new(cache_dir)?;
    let artifact = cache
        .ensure_built(source, &language)
        .with_context(|| format!("building {}", source.display()))?;
    println!("{}", artifact.display());
    Ok(())
}

fn cmd_call(
    cache_dir: &Path,
    source: &Path,
    symbol: &str,
    raw_args: &[String],
    lang: Lang,
    ret: Ret,
) -> Result<()> {
    let loader = Loader::new(cache_dir)?;

    let args = raw_args
        .iter()
        .map(|raw| parse_arg(raw))
        .collect::<Result<Vec<_>>>()?;

    // Two handle shapes, one call contract.
    let flat;
    let structured;
    let module: &dyn NativeModule = match lang {
        Lang::C => {
            flat = loader.load_flat(source)?;
            &flat
        }
        Lang::Cpp => {
            structured = loader.load_structured(source)?;
            &structured
        }
    };

    let call = module.call(symbol, args)?;

    // The caller vouches for the foreign signature; a mismatch between
    // the declared result type and the real one is undefined behavior,
    // exactly as it would be in the native caller.
    match ret {
        Ret::Str => println!("{}", unsafe { call.as_string() }),
        Ret::Int => println!("{}", unsafe { call.as_int32() }),
        Ret::Float => println!("{}", unsafe { call.as_float64() }),
    }
    Ok(())
}

/// Map a command-line token to a typed argument: integer if it parses
/// as one, then double, otherwise a C string.
fn parse_arg(raw: &str) -> Result<ArgValue> {
    if let Ok(i) = raw.parse::<i32>() {
        return Ok(ArgValue::Int(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(ArgValue::Double(f));
    }
    ArgValue::string(raw).map_err(Into::into)
}

fn cmd_includes(cache_dir: &Path) -> Result<()> {
    let include_dir = cache_dir.join("include");
    install_binding_header(&include_dir)
        .with_context(|| format!("installing binding header in {}", include_dir.display()))?;
    println!("-I{}", include_dir.display());
    Ok(())
}
