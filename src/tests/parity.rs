//! The interpreter and the JIT-compiled module must agree statement by statement.

use crate::{
    compiler::Compiler,
    language::{ast::Program, parser::parse_source},
    runtime::{interpret, Context},
};
use inkwell::context::Context as LlvmContext;
use std::io;

fn interpreted(program: &Program) -> Vec<f64> {
    let mut ctx = Context::with_output(io::sink()).with_step_limit(100_000);
    program
        .statements
        .iter()
        .map(|statement| interpret(statement, &mut ctx).expect("interpret"))
        .collect()
}

fn compiled(program: &Program) -> Vec<f64> {
    let llvm = LlvmContext::create();
    let mut compiler = Compiler::new(&llvm, "parity");
    for statement in &program.statements {
        compiler.lower(statement).expect("lower");
    }
    compiler.verify().expect("module verifies");
    compiler.run().expect("jit")
}

fn same(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn assert_parity(source: &str) {
    let program = parse_source(source).expect("parse");
    let interpreted = interpreted(&program);
    let compiled = compiled(&program);
    assert_eq!(interpreted.len(), compiled.len(), "{source}");
    for (index, (a, b)) in interpreted.iter().zip(&compiled).enumerate() {
        assert!(
            same(*a, *b),
            "statement {index} of `{source}`: interpreter {a}, jit {b}"
        );
    }
}

#[test]
fn arithmetic() {
    assert_parity("1 + 2 * 3; (1 + 2) * 3; 10 / 4; 10 % 4; -7 % 3; 7.5 % -2; -(-3);");
}

#[test]
fn comparisons() {
    assert_parity("1 > 2; 2 > 1; 1 < 2; 2 <= 2; 3 >= 4; 1 == 1; 1 != 1; 1 == 2 == 0;");
}

#[test]
fn division_by_zero_and_nan() {
    assert_parity(
        "1 / 0; -1 / 0; 0 / 0; 5 % 0; \
         n = 0 / 0; n == n; n != n; n < 1; n >= 1; \
         t = 0; if (n) t = 1; t;",
    );
}

#[test]
fn session_variables() {
    assert_parity("x = 2; y = x * 3; x = y - x; x + y; { x = x + 1; z = 9; } x;");
}

#[test]
fn deferred_bindings() {
    assert_parity("a = 1; b := a * 10; a = 4; b; c = b; a = 0; b + c; b := 7; b;");
}

#[test]
fn conditionals_and_loops() {
    assert_parity(
        "i = 0; sum = 0; while (i < 10) { if (i % 3 == 0) sum = sum + i; else sum = sum - 1; i = i + 1; } sum; i;",
    );
}

#[test]
fn nested_loops() {
    assert_parity(
        "i = 0; hits = 0; while (i < 4) { j = 0; while (j < i) { hits = hits + 1; j = j + 1; } i = i + 1; } hits;",
    );
}

#[test]
fn functions_and_recursion() {
    assert_parity(
        "fn fib(n) { r = n; if (n > 1) r = fib(n - 1) + fib(n - 2); r; } fib(10); \
         fn max(a, b) { if (a > b) a; else b; } max(3, 9) + max(9, 3); \
         fn noop() { } noop(); \
         fn twice(v) { v = v * 2; v; } k = 5; twice(k); k;",
    );
}

#[test]
fn redefinition_and_warnings() {
    assert_parity("fn f(a) { a + 1; } f(1); fn f(a) { a + 2; } f(1); f(1, 2); g(3);");
}

#[test]
fn calls_inside_deferred_bindings() {
    assert_parity("fn sq(v) { v * v; } side = 3; area := sq(side); side = 4; area;");
}

#[test]
fn conditions_with_side_effects_run_once() {
    assert_parity(
        "n = 0; k = 0; while ((k = k + 1) < 4) n = n + 1; k; n; \
         if ((k = k + 1) > 5) n = 100; else n = n + 1; k; n;",
    );
}

#[test]
fn locals_assigned_on_one_branch_read_zero_otherwise() {
    assert_parity("fn f(c) { if (c) t = 5; t; } f(1); f(0); fn g(c) { { if (c) u = 2; u; } } g(0); g(3);");
}

#[test]
fn deferred_bindings_local_to_a_branch_block() {
    assert_parity("c = 1; if (c) { y := c + 1; c = 5; y; } c; i = 0; while (i < 2) { d := i * 3; i = i + 1; d; } i;");
}
