//! End-to-end coverage over the `.sero` programs under `stdlib/examples/`:
//! load, compile, and (where the program actually halts) run the result
//! through the embedded interpreter, checking its output bytes.

use std::path::{Path, PathBuf};

use serotonin_core::{compile, interp, Budgets};
use serotonin_syntax::Loader;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn compile_fixture(name: &str) -> String {
    let root = workspace_root();
    let entry = root.join("stdlib/examples").join(name);
    let stdlib = root.join("stdlib");
    let mut loader = Loader::new(entry.parent().unwrap(), &[stdlib]);
    let rules = loader.load_entry(&entry).unwrap();
    let entry_terms = vec![serotonin_core::Term::Call(serotonin_core::Name::new("main"))];
    compile(rules, entry_terms, Budgets::default()).unwrap()
}

#[test]
fn byte4_prints_the_sum_of_two_and_two() {
    let bf = compile_fixture("byte4.sero");
    let out = interp::run_from_empty_tape(&bf, 100_000).unwrap();
    assert_eq!(out, vec![4]);
}

#[test]
fn byte21_folds_nested_arithmetic_at_compile_time() {
    let bf = compile_fixture("byte21.sero");
    let out = interp::run_from_empty_tape(&bf, 100_000).unwrap();
    assert_eq!(out, vec![21]);
}

#[test]
fn hello_prints_hi_byte_by_byte() {
    let bf = compile_fixture("hello.sero");
    let out = interp::run_from_empty_tape(&bf, 100_000).unwrap();
    assert_eq!(out, vec![b'H', b'i']);
}

#[test]
fn dup_specialisation_leaves_no_runtime_loop() {
    let bf = compile_fixture("dup_no_loop.sero");
    let out = interp::run_from_empty_tape(&bf, 100_000).unwrap();
    assert_eq!(out, vec![20]);
    assert!(!bf.contains('['), "dup + arithmetic folded at compile time, no runtime loop expected: {bf}");
}

#[test]
fn rot_permutes_three_pushed_bytes() {
    let bf = compile_fixture("rot.sero");
    let out = interp::run_from_empty_tape(&bf, 100_000).unwrap();
    assert_eq!(out, vec![1, 3, 2]);
}

#[test]
fn byte_then_newline_uses_the_io_module() {
    let bf = compile_fixture("byte_then_newline.sero");
    let out = interp::run_from_empty_tape(&bf, 100_000).unwrap();
    assert_eq!(out, vec![b'A', b'\n']);
}

#[test]
fn forever_y_compiles_to_a_runtime_loop_without_hanging_compilation() {
    // An always-true condition must not be staged-executed at compile time
    // (it would never terminate); compilation itself must finish promptly,
    // leaving the looping behaviour to the generated BF.
    let bf = compile_fixture("forever_y.sero");
    assert!(bf.ends_with("[.]"), "expected a trailing native while-loop, got: {bf}");
    assert_eq!(bf.matches('[').count(), 1);
    assert_eq!(bf.matches(']').count(), 1);
}
