//! End-to-end compile scenarios (spec 8), mirroring the teacher's
//! top-level `tests/` integration placement
//! (`crates/runtime/tests/test_closures.rs`): a plain `#[test]` file
//! exercising the public crate API rather than internals.

use uyac::{check_source, compile_source, CompilerConfig};

fn cfg() -> CompilerConfig {
    CompilerConfig::default()
}

#[test]
fn empty_program_emits_prelude_only() {
    let c = compile_source("", "empty.uya", &cfg()).expect("empty program should compile");
    assert!(c.contains("stdint.h"));
    assert!(!c.contains("uya_main"));
}

#[test]
fn unproved_overflow_is_rejected_with_operator_position() {
    let (_checked, diags) = check_source("fn add(a: i32, b: i32) i32 { return a + b; }", "add.uya");
    assert!(diags.has_errors());
    let msg = diags.format();
    assert!(msg.contains('+'));
    assert!(msg.contains("overflow"));
}

#[test]
fn array_index_with_proven_range_succeeds() {
    let src = "fn sum(a: [i32: 4]) i32 {\n\
                 var s: i32 = 0;\n\
                 var i: i32 = 0;\n\
                 while i < 4 { s = s +% a[i]; i = i +% 1; }\n\
                 return s;\n\
               }";
    let (checked, diags) = check_source(src, "sum.uya");
    assert!(checked.is_some(), "{}", diags.format());
}

#[test]
fn divide_by_zero_requires_proof_but_guarded_form_passes() {
    let unguarded = "fn d(x: i32, y: i32) i32 { return x / y; }";
    let (checked, diags) = check_source(unguarded, "d.uya");
    assert!(checked.is_none());
    assert!(diags.format().contains("nonzero"));

    let guarded = "fn d(x: i32, y: i32) i32 { if y != 0 { return x / y; } else { return 0; } }";
    let (checked, diags) = check_source(guarded, "d_guarded.uya");
    assert!(checked.is_some(), "{}", diags.format());
}

#[test]
fn const_reassignment_is_rejected() {
    let (checked, diags) = check_source("fn f() i32 { const x: i32 = 1; x = 2; return x; }", "f.uya");
    assert!(checked.is_none());
    assert!(diags.format().contains("const variable 'x'"));
}

#[test]
fn tuple_emission_produces_exactly_one_struct_definition() {
    let src = "fn g() i32 { const t: (i32, bool) = (1, true); return t._0; }";
    let c = compile_source(src, "g.uya", &cfg()).expect("tuple program should compile");
    let struct_defs = c.matches("struct tuple_i32_bool").count();
    assert_eq!(struct_defs, 1, "expected exactly one tuple_i32_bool struct definition in emitted C:\n{c}");
}

#[test]
fn string_interpolation_produces_snprintf_call_with_format() {
    let src = "fn show(n: i32) void {\n\
                 const s: [i8: 32] = \"n=${n:d}\";\n\
               }";
    let c = compile_source(src, "show.uya", &cfg()).expect("interpolation program should compile");
    assert!(c.contains("snprintf"));
    assert!(c.contains("%d"));
}

#[test]
fn two_pass_checking_allows_forward_reference() {
    let src = "fn f() i32 { return g(); } fn g() i32 { return 0; }";
    let (checked, diags) = check_source(src, "forward.uya");
    assert!(checked.is_some(), "{}", diags.format());
}

#[test]
fn emitter_is_stable_across_runs() {
    let src = "fn main() i32 { return 0; }";
    let a = compile_source(src, "stable.uya", &cfg()).unwrap();
    let b = compile_source(src, "stable.uya", &cfg()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn main_is_renamed_to_uya_main() {
    let c = compile_source("fn main() i32 { return 0; }", "m.uya", &cfg()).unwrap();
    assert!(c.contains("uya_main"));
    assert!(!c.contains(" main("));
}
