//! Compile-fail tests for the derive error paths.
//!
//! Each case under `tests/compile_fail/` pins the expected diagnostic in its
//! `.stderr` file.

#[test]
fn macro_compile_fail_tests() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/*.rs");
}
