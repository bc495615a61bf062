//! End-to-end tests: compile real sources through the build cache,
//! load the artifacts, and call into them.
//!
//! These tests exercise the actual system toolchain and are skipped
//! (with a note on stderr) when no compiler is installed.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use hotload_core::{BuildRecord, Language};
use hotload_ffi::{
    install_binding_header, ArgValue, ArrayValues, FfiError, Loader, NativeModule, ValueKind,
};
use tempfile::TempDir;

const C_FIXTURE: &str = r#"
#include <string.h>

int add(int a, int b) { return a + b; }

double mean2(double a, double b) { return (a + b) / 2.0; }

const char *greet(void) { return "hello from native"; }

const char *nothing(void) { return 0; }

int *triple(void) {
    static int values[3] = {11, 22, 33};
    return values;
}

double *halves(void) {
    static double values[2] = {0.5, 1.5};
    return values;
}

const char **names(void) {
    static const char *values[3] = {"alpha", "beta", 0};
    return values;
}

int count_bytes(const char *s) { return (int)strlen(s); }
"#;

const CPP_FIXTURE: &str = r#"
#include "hotload.h"

extern "C" int shout(int x) { return x * 2; }

extern "C" const char *version() { return "structured-1"; }

HOTLOAD_MODULE(
    {"shout", (void *)shout},
    {"version", (void *)version}
)
"#;

fn toolchain_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

struct CFixture {
    dir: TempDir,
    loader: Loader,
    stem: PathBuf,
}

/// Compile the C fixture into a fresh cache, or `None` when the host
/// has no C compiler.
fn c_fixture() -> Option<CFixture> {
    if !toolchain_available("cc") {
        eprintln!("skipping: no `cc` on this host");
        return None;
    }
    let dir = TempDir::new().unwrap();
    let stem = dir.path().join("fixture");
    fs::write(dir.path().join("fixture.c"), C_FIXTURE).unwrap();
    let loader = Loader::new(dir.path().join("cache")).unwrap();
    Some(CFixture { dir, loader, stem })
}

#[test]
fn integer_and_double_marshalling() {
    let Some(fx) = c_fixture() else { return };
    let lib = fx.loader.load_flat(&fx.stem).unwrap();

    let sum = lib
        .call("add", vec![ArgValue::Int(2), ArgValue::Int(3)])
        .unwrap();
    assert_eq!(unsafe { sum.as_int32() }, 5);

    let mean = lib
        .call("mean2", vec![ArgValue::Double(1.0), ArgValue::Double(2.0)])
        .unwrap();
    assert_eq!(unsafe { mean.as_float64() }, 1.5);
}

#[test]
fn string_argument_and_returns() {
    let Some(fx) = c_fixture() else { return };
    let lib = fx.loader.load_flat(&fx.stem).unwrap();

    let len = lib
        .call("count_bytes", vec![ArgValue::string("hello").unwrap()])
        .unwrap();
    assert_eq!(unsafe { len.as_int32() }, 5);

    let greeting = lib.call("greet", vec![]).unwrap();
    assert_eq!(unsafe { greeting.as_string() }, "hello from native");

    let empty = lib.call("nothing", vec![]).unwrap();
    assert_eq!(unsafe { empty.as_string() }, "");
}

#[test]
fn fixed_length_array_returns() {
    let Some(fx) = c_fixture() else { return };
    let lib = fx.loader.load_flat(&fx.stem).unwrap();

    let ints = lib.call("triple", vec![]).unwrap();
    assert_eq!(
        unsafe { ints.as_array(3, ValueKind::Int) }.unwrap(),
        ArrayValues::Int(vec![11, 22, 33])
    );

    let doubles = lib.call("halves", vec![]).unwrap();
    assert_eq!(
        unsafe { doubles.as_array(2, ValueKind::Double) }.unwrap(),
        ArrayValues::Double(vec![0.5, 1.5])
    );

    // A null element collapses to "" just like a null string return.
    let strings = lib.call("names", vec![]).unwrap();
    assert_eq!(
        unsafe { strings.as_array(3, ValueKind::Str) }.unwrap(),
        ArrayValues::Str(vec!["alpha".into(), "beta".into(), String::new()])
    );
}

#[test]
fn repeated_selection_reinvokes() {
    let Some(fx) = c_fixture() else { return };
    let lib = fx.loader.load_flat(&fx.stem).unwrap();

    let call = lib
        .call("add", vec![ArgValue::Int(20), ArgValue::Int(22)])
        .unwrap();
    assert_eq!(unsafe { call.as_int32() }, 42);
    assert_eq!(unsafe { call.as_int32() }, 42);
}

#[test]
fn unknown_symbol_does_not_poison_the_handle() {
    let Some(fx) = c_fixture() else { return };
    let lib = fx.loader.load_flat(&fx.stem).unwrap();

    let err = lib.call("does_not_exist", vec![]).unwrap_err();
    assert!(matches!(err, FfiError::SymbolNotFound { name } if name == "does_not_exist"));

    let sum = lib
        .call("add", vec![ArgValue::Int(1), ArgValue::Int(1)])
        .unwrap();
    assert_eq!(unsafe { sum.as_int32() }, 2);
}

#[test]
fn second_load_reuses_the_fresh_artifact() {
    let Some(fx) = c_fixture() else { return };
    fx.loader.load_flat(&fx.stem).unwrap();

    let cache = fx.loader.cache();
    let source = fx.dir.path().join("fixture.c");
    let artifact = cache.artifact_path(&cache.output_stem(&source, &Language::C));
    let record_path = BuildRecord::path_for(&artifact);
    let record_before = fs::read(&record_path).unwrap();

    fx.loader.load_flat(&fx.stem).unwrap();
    assert_eq!(
        fs::read(&record_path).unwrap(),
        record_before,
        "a fresh artifact must not be rebuilt"
    );
}

#[test]
fn structured_module_prebinds_exports() {
    if !toolchain_available("c++") {
        eprintln!("skipping: no `c++` on this host");
        return;
    }
    let dir = TempDir::new().unwrap();
    let include_dir = dir.path().join("include");
    install_binding_header(&include_dir).unwrap();
    fs::write(dir.path().join("fixture.cpp"), CPP_FIXTURE).unwrap();

    // Substitute the external include discovery helper.
    let loader = Loader::new(dir.path().join("cache"))
        .unwrap()
        .with_include_query(vec![
            "echo".to_string(),
            format!("-I{}", include_dir.display()),
        ]);

    let lib = loader.load_structured(&dir.path().join("fixture")).unwrap();

    let mut names: Vec<_> = lib.export_names().collect();
    names.sort_unstable();
    assert_eq!(names, ["shout", "version"]);

    let doubled = lib.call("shout", vec![ArgValue::Int(21)]).unwrap();
    assert_eq!(unsafe { doubled.as_int32() }, 42);

    let version = lib.call("version", vec![]).unwrap();
    assert_eq!(unsafe { version.as_string() }, "structured-1");

    let err = lib.call("absent", vec![]).unwrap_err();
    assert!(matches!(err, FfiError::SymbolNotFound { .. }));

    // Both handle shapes satisfy the same contract.
    let module: &dyn NativeModule = &lib;
    let again = module.call("shout", vec![ArgValue::Int(5)]).unwrap();
    assert_eq!(unsafe { again.as_int32() }, 10);
}

#[test]
fn editing_the_source_triggers_a_rebuild_with_new_behavior() {
    let Some(fx) = c_fixture() else { return };
    {
        let lib = fx.loader.load_flat(&fx.stem).unwrap();
        let sum = lib
            .call("add", vec![ArgValue::Int(2), ArgValue::Int(3)])
            .unwrap();
        assert_eq!(unsafe { sum.as_int32() }, 5);
    }

    // Change the semantics of `add`, keeping everything else.
    let source = fx.dir.path().join("fixture.c");
    let edited = C_FIXTURE.replace("return a + b;", "return a + b + 100;");
    fs::write(&source, edited).unwrap();

    let lib = fx.loader.load_flat(&fx.stem).unwrap();
    let sum = lib
        .call("add", vec![ArgValue::Int(2), ArgValue::Int(3)])
        .unwrap();
    assert_eq!(unsafe { sum.as_int32() }, 105);
}

#[test]
fn artifact_uses_platform_suffix() {
    let Some(fx) = c_fixture() else { return };
    let cache = fx.loader.cache();
    let source = fx.dir.path().join("fixture.c");
    let artifact = cache.artifact_path(&cache.output_stem(&source, &Language::C));
    let expected = hotload_platform::Os::current().dylib_extension();
    assert_eq!(
        artifact.extension().and_then(|e| e.to_str()),
        Some(expected)
    );
}
