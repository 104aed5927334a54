// spindle-vm - End-to-end execution tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use spindle_parser::Parser;
use spindle_vm::compiler::Compiler;
use spindle_vm::program::Program;
use spindle_vm::vm::{RuntimeError, Vm, VmError};
use spindle_vm::Value;

fn run(src: &str) -> Result<Value, VmError> {
    let stmts = Parser::parse_str(src).expect("parse error");
    let words = Compiler::compile(&stmts).expect("compile error");
    let program = Program::from_words(words).expect("load error");
    let function = program.top_level_function();
    let mut vm = Vm::new();
    vm.call(&function, &[])
}

fn run_ok(src: &str) -> Value {
    run(src).expect("runtime error")
}

fn run_repr(src: &str) -> String {
    run_ok(src).repr()
}

// ============================================================================
// Spec scenarios
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(run_repr("return 1 + 2 * 3;"), "7");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(run_repr("var s = \"foo\" .. \"bar\"; return s;"), "\"foobar\"");
}

#[test]
fn test_function_call() {
    assert_eq!(run_repr("var f = fn(x) { return x * x; }; return f(5);"), "25");
}

#[test]
fn test_write_to_free_variable_is_a_global_reference() {
    // Closures capture by value; a free variable that is assigned inside
    // the closure resolves as a global instead, and reading it before
    // any global definition exists is a runtime error.
    let err = run(
        "var c = 0; \
         var inc = fn() { c = c + 1; return c; }; \
         inc(); inc(); return inc();",
    )
    .expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::GlobalNotFound(ref n) if n == "c"));
    assert!(!err.trace.is_empty());
}

#[test]
fn test_hashmap_int_keys() {
    assert_eq!(
        run_repr("var a = {}; a[0] = 10; a[1] = 20; return a[0] + a[1];"),
        "30"
    );
}

#[test]
fn test_integer_division_by_zero() {
    let err = run("return 1 / 0;").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::DivisionByZero));
    assert_eq!(err.error.to_string(), "integer division by zero");
    assert!(!err.trace.is_empty());
}

// ============================================================================
// Values and arithmetic
// ============================================================================

#[test]
fn test_literals() {
    assert_eq!(run_repr("return nil;"), "nil");
    assert_eq!(run_repr("return true;"), "true");
    assert_eq!(run_repr("return 42;"), "42");
    assert_eq!(run_repr("return 2.5;"), "2.5");
    assert_eq!(run_repr("return 2.0;"), "2.0");
    assert_eq!(run_repr("return \"hi\";"), "\"hi\"");
}

#[test]
fn test_numeric_promotion() {
    // int OP int stays integral; any float operand promotes.
    assert!(matches!(run_ok("return 7 / 2;"), Value::Int(3)));
    assert!(matches!(run_ok("return 7.0 / 2;"), Value::Float(_)));
    assert!(matches!(run_ok("return 7 / 2.0;"), Value::Float(_)));
    assert_eq!(run_repr("return 1 + 0.5;"), "1.5");
}

#[test]
fn test_modulo() {
    assert_eq!(run_repr("return 7 % 3;"), "1");
    let err = run("return 7 % 0;").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::ModuloByZero));
}

#[test]
fn test_float_division_by_zero_is_infinite() {
    assert!(matches!(run_ok("return 1.0 / 0;"), Value::Float(x) if x.is_infinite()));
}

#[test]
fn test_unary_operators() {
    assert_eq!(run_repr("return -5;"), "-5");
    assert_eq!(run_repr("return -(2.5);"), "-2.5");
    assert_eq!(run_repr("return !true;"), "false");
    assert_eq!(run_repr("return ~0;"), "-1");
    assert_eq!(run_repr("return +3;"), "3");
}

#[test]
fn test_bitwise_and_shifts() {
    assert_eq!(run_repr("return 6 & 3;"), "2");
    assert_eq!(run_repr("return 6 | 3;"), "7");
    assert_eq!(run_repr("return 6 ^ 3;"), "5");
    assert_eq!(run_repr("return 1 << 4;"), "16");
    assert_eq!(run_repr("return 16 >> 2;"), "4");

    let err = run("return 1 << 64;").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::BadShift(64)));
}

#[test]
fn test_comparisons() {
    assert_eq!(run_repr("return 1 < 2;"), "true");
    assert_eq!(run_repr("return 2 <= 1;"), "false");
    assert_eq!(run_repr("return 1.5 > 1;"), "true");
    assert_eq!(run_repr("return \"abc\" < \"abd\";"), "true");
    assert_eq!(run_repr("return 1 == 1.0;"), "true");
    assert_eq!(run_repr("return \"a\" == \"a\";"), "true");
    assert_eq!(run_repr("return 1 != 2;"), "true");
    assert_eq!(run_repr("return nil == nil;"), "true");
    assert_eq!(run_repr("return 1 == \"1\";"), "false");
}

#[test]
fn test_incomparable_values() {
    let err = run("return 1 < \"a\";").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::NotComparable { .. }));
}

#[test]
fn test_sizeof_typeof() {
    assert_eq!(run_repr("return sizeof \"foo\";"), "3");
    assert_eq!(run_repr("return sizeof [1, 2, 3];"), "3");
    assert_eq!(run_repr("var m = { a: 1 }; return sizeof m;"), "1");
    assert_eq!(run_repr("return typeof 1;"), "\"number\"");
    assert_eq!(run_repr("return typeof 1.5;"), "\"number\"");
    assert_eq!(run_repr("return typeof nil;"), "\"nil\"");
    assert_eq!(run_repr("return typeof \"s\";"), "\"string\"");
    assert_eq!(run_repr("return typeof [];"), "\"array\"");
    assert_eq!(run_repr("var m = {}; return typeof m;"), "\"hashmap\"");
    assert_eq!(run_repr("return typeof fn() { };"), "\"function\"");
}

#[test]
fn test_concat_chain_is_order_preserving() {
    assert_eq!(run_repr("return \"a\" .. \"b\" .. \"c\" .. \"d\";"), "\"abcd\"");
}

#[test]
fn test_concat_type_error() {
    let err = run("return \"a\" .. 1;").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::TypeError { .. }));
}

// ============================================================================
// Variables, scopes and control flow
// ============================================================================

#[test]
fn test_variables_and_assignment() {
    assert_eq!(run_repr("var x = 1; x = x + 2; return x;"), "3");
    assert_eq!(run_repr("var x = 1; x += 2; return x;"), "3");
    assert_eq!(run_repr("var s = \"a\"; s ..= \"b\"; return s;"), "\"ab\"");
    assert_eq!(run_repr("var x; return x;"), "nil");
    assert_eq!(run_repr("var a = 1, b = 2; return a + b;"), "3");
}

#[test]
fn test_assignment_is_an_expression() {
    assert_eq!(run_repr("var a; var b; a = b = 5; return a + b;"), "10");
}

#[test]
fn test_block_scoping_and_shadowing() {
    assert_eq!(
        run_repr("var x = 1; { var x = 2; x = x + 1; } return x;"),
        "1"
    );
    // A register freed by a closed scope must not leak its old value.
    assert_eq!(run_repr("{ var y = 2; } var z; return z;"), "nil");
}

#[test]
fn test_if_else() {
    assert_eq!(run_repr("if (true) { return 1; } return 2;"), "1");
    assert_eq!(run_repr("if (false) { return 1; } return 2;"), "2");
    assert_eq!(
        run_repr("if (false) { return 1; } else { return 3; }"),
        "3"
    );
}

#[test]
fn test_condition_must_be_boolean() {
    let err = run("if (1) { return 1; } return 2;").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::TypeError { expected: "bool", .. }));
}

#[test]
fn test_while_loop() {
    assert_eq!(
        run_repr("var i = 0; var sum = 0; while (i < 10) { sum = sum + i; i = i + 1; } return sum;"),
        "45"
    );
}

#[test]
fn test_do_while_runs_at_least_once() {
    assert_eq!(
        run_repr("var i = 10; do { i = i + 1; } while (false); return i;"),
        "11"
    );
}

#[test]
fn test_for_loop() {
    assert_eq!(
        run_repr("var sum = 0; for (var i = 0; i < 5; i = i + 1) { sum = sum + i; } return sum;"),
        "10"
    );
}

#[test]
fn test_break_and_continue() {
    assert_eq!(
        run_repr(
            "var sum = 0; \
             for (var i = 0; i < 10; i = i + 1) { \
                 if (i == 5) { break; } \
                 if (i % 2 == 1) { continue; } \
                 sum = sum + i; \
             } \
             return sum;"
        ),
        "6" // 0 + 2 + 4
    );
}

#[test]
fn test_ternary_and_short_circuit() {
    assert_eq!(run_repr("return true ? 1 : 2;"), "1");
    assert_eq!(run_repr("return false ? 1 : 2;"), "2");
    assert_eq!(run_repr("return true && false;"), "false");
    assert_eq!(run_repr("return false || true;"), "true");
    // The right operand must not be evaluated when short-circuiting.
    assert_eq!(run_repr("var m = {}; return false && m[[]] == 1;"), "false");
}

#[test]
fn test_increment_decrement() {
    assert_eq!(run_repr("var x = 1; ++x; return x;"), "2");
    assert_eq!(run_repr("var x = 1; return x++;"), "1");
    assert_eq!(run_repr("var x = 1; x++; return x;"), "2");
    assert_eq!(run_repr("var x = 1; return --x;"), "0");
    assert_eq!(run_repr("var a = [5]; a[0]++; return a[0];"), "6");
}

// ============================================================================
// Functions and closures
// ============================================================================

#[test]
fn test_function_with_multiple_args() {
    assert_eq!(
        run_repr("var sub = fn(a, b) { return a - b; }; return sub(10, 4);"),
        "6"
    );
}

#[test]
fn test_missing_arguments_are_nil() {
    assert_eq!(
        run_repr("var f = fn(a, b) { return b == nil; }; return f(1);"),
        "true"
    );
}

#[test]
fn test_surplus_arguments_via_argc_and_ntharg() {
    assert_eq!(run_repr("var f = fn() { return argc; }; return f(1, 2, 3);"), "3");
    assert_eq!(run_repr("var f = fn(a) { return #2; }; return f(10, 20, 30);"), "30");
}

#[test]
fn test_ntharg_out_of_bounds() {
    let err = run("var f = fn() { return #0; }; return f();").expect_err("expected error");
    assert!(matches!(err.error, RuntimeError::ArgOutOfBounds { .. }));
}

#[test]
fn test_recursion_through_global() {
    assert_eq!(
        run_repr(
            "const fact = fn(n) { return n < 2 ? 1 : n * fact(n - 1); }; \
             return fact(6);"
        ),
        "720"
    );
}

#[test]
fn test_closure_captures_by_value() {
    assert_eq!(
        run_repr("var x = 1; var g = fn() { return x; }; x = 2; return g();"),
        "1"
    );
}

#[test]
fn test_closure_outer_capture() {
    // The inner function reaches x through the outer closure's upvalues.
    assert_eq!(
        run_repr(
            "var x = 7; \
             var outer = fn() { \
                 var inner = fn() { return x; }; \
                 return inner(); \
             }; \
             return outer();"
        ),
        "7"
    );
}

#[test]
fn test_higher_order_functions() {
    assert_eq!(
        run_repr(
            "var twice = fn(f, x) { return f(f(x)); }; \
             var inc = fn(n) { return n + 1; }; \
             return twice(inc, 5);"
        ),
        "7"
    );
}

#[test]
fn test_calling_a_non_function() {
    let err = run("var x = 1; return x();").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::NotCallable("number")));
}

#[test]
fn test_stack_trace_names() {
    let err = run(
        "var boom = fn bang() { return 1 / 0; }; \
         var mid = fn middle() { return boom(); }; \
         return mid();",
    )
    .expect_err("expected runtime error");
    assert_eq!(err.trace, vec!["bang", "middle", "<main>"]);
}

#[test]
fn test_anonymous_function_trace_name() {
    let err = run("var f = fn() { return 1 / 0; }; return f();").expect_err("expected error");
    assert_eq!(err.trace, vec!["<lambda>", "<main>"]);
}

#[test]
fn test_runaway_recursion_overflows() {
    let err = run("const f = fn(n) { return f(n + 1); }; return f(0);")
        .expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::StackOverflow));
}

// ============================================================================
// Arrays and hashmaps
// ============================================================================

#[test]
fn test_array_literals_and_indexing() {
    assert_eq!(run_repr("var a = [1, 2, 3]; return a[1];"), "2");
    assert_eq!(run_repr("var a = [1, 2, 3]; return a[10];"), "nil");
    assert_eq!(run_repr("var a = []; a[2] = 9; return sizeof a;"), "3");
    assert_eq!(run_repr("var a = []; a[2] = 9; return a[0];"), "nil");
}

#[test]
fn test_negative_array_index() {
    let err = run("var a = [1]; return a[0 - 1];").expect_err("expected error");
    assert!(matches!(err.error, RuntimeError::NegativeIndex(-1)));
}

#[test]
fn test_hashmap_literals_and_member_access() {
    assert_eq!(run_repr("var m = { a: 1, b: 2 }; return m.a + m[\"b\"];"), "3");
    assert_eq!(run_repr("var m = {}; m.name = \"spindle\"; return m.name;"), "\"spindle\"");
    assert_eq!(run_repr("var m = { 1: \"one\" }; return m[1];"), "\"one\"");
}

#[test]
fn test_hashmap_missing_key_is_nil() {
    assert_eq!(run_repr("var m = {}; return m[\"missing\"];"), "nil");
}

#[test]
fn test_hashmap_nil_store_deletes() {
    assert_eq!(
        run_repr("var m = { a: 1, b: 2 }; m.a = nil; return sizeof m;"),
        "1"
    );
}

#[test]
fn test_hashmap_mixed_key_types() {
    assert_eq!(
        run_repr(
            "var m = {}; \
             m[1] = \"int\"; m[\"1\"] = \"str\"; m[true] = \"bool\"; \
             return m[1] .. m[\"1\"] .. m[true];"
        ),
        "\"intstrbool\""
    );
}

#[test]
fn test_unhashable_key() {
    let err = run("var m = {}; m[[]] = 1; return m;").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::UnhashableKey("array")));
}

#[test]
fn test_indexing_a_non_container() {
    let err = run("var x = 3; return x[0];").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::TypeError { .. }));
}

#[test]
fn test_aliasing_is_by_reference() {
    assert_eq!(
        run_repr("var a = [1]; var b = a; b[0] = 99; return a[0];"),
        "99"
    );
}

// ============================================================================
// Globals
// ============================================================================

#[test]
fn test_const_defines_a_global() {
    assert_eq!(run_repr("const K = 41; return K + 1;"), "42");
}

#[test]
fn test_global_assignment_at_top_level() {
    // Assignment to an undeclared name defines a global.
    assert_eq!(run_repr("g = 5; return g + 1;"), "6");
}

#[test]
fn test_unresolved_global() {
    let err = run("return no_such_thing;").expect_err("expected runtime error");
    assert!(matches!(err.error, RuntimeError::GlobalNotFound(ref n) if n == "no_such_thing"));
    assert_eq!(
        err.error.to_string(),
        "global symbol not found: no_such_thing"
    );
}

#[test]
fn test_native_function_call() {
    let stmts = Parser::parse_str("return add_one(41);").expect("parse error");
    let words = Compiler::compile(&stmts).expect("compile error");
    let program = Program::from_words(words).expect("load error");
    let function = program.top_level_function();

    let mut vm = Vm::new();
    vm.register_native("add_one", |args| match args.first() {
        Some(Value::Int(n)) => Ok(Value::Int(n + 1)),
        _ => Err(RuntimeError::type_error("integer", "other")),
    });
    let result = vm.call(&function, &[]).expect("runtime error");
    assert_eq!(result.repr(), "42");
}

#[test]
fn test_top_level_script_arguments() {
    let stmts = Parser::parse_str("return #0 .. \"!\";").expect("parse error");
    let words = Compiler::compile(&stmts).expect("compile error");
    let program = Program::from_words(words).expect("load error");
    let function = program.top_level_function();

    let mut vm = Vm::new();
    let result = vm
        .call(&function, &[Value::string("hello")])
        .expect("runtime error");
    assert_eq!(result.repr(), "\"hello!\"");
}
