// spindle-vm - Serialization round-trip tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Serialize-then-execute must be observably identical to
//! compile-then-execute, and resolving symbol stubs at runtime must
//! never change the serialized image.

use spindle_parser::Parser;
use spindle_vm::compiler::Compiler;
use spindle_vm::program::Program;
use spindle_vm::vm::Vm;
use spindle_vm::Value;

fn compile_words(src: &str) -> Vec<u32> {
    let stmts = Parser::parse_str(src).expect("parse error");
    Compiler::compile(&stmts).expect("compile error")
}

fn exec_program(program: &std::rc::Rc<Program>, args: &[Value]) -> Value {
    let function = program.top_level_function();
    let mut vm = Vm::new();
    vm.call(&function, args).expect("runtime error")
}

fn assert_roundtrip(src: &str) {
    let words = compile_words(src);
    let direct = Program::from_words(words.clone()).expect("load error");
    let direct_result = exec_program(&direct, &[]);

    let bytes = direct.to_bytes();
    let reloaded = Program::from_bytes(&bytes).expect("reload error");
    assert_eq!(reloaded.words(), &words[..], "image changed across serialization");
    let reloaded_result = exec_program(&reloaded, &[]);

    assert_eq!(
        direct_result.repr(),
        reloaded_result.repr(),
        "observable result changed across serialization for: {}",
        src
    );
}

#[test]
fn test_roundtrip_arithmetic() {
    assert_roundtrip("return 1 + 2 * 3;");
    assert_roundtrip("return 7.5 / 2;");
    assert_roundtrip("return 1 << 20;");
}

#[test]
fn test_roundtrip_strings() {
    assert_roundtrip("var s = \"foo\" .. \"bar\"; return s;");
    assert_roundtrip("return sizeof \"hello\";");
}

#[test]
fn test_roundtrip_functions_and_closures() {
    assert_roundtrip("var f = fn(x) { return x * x; }; return f(9);");
    assert_roundtrip("var x = 3; var g = fn() { return x + 1; }; return g();");
    assert_roundtrip(
        "const fib = fn(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }; return fib(10);",
    );
}

#[test]
fn test_roundtrip_containers() {
    assert_roundtrip("var a = [1, 2, 3]; a[3] = 4; return a[0] + a[3];");
    assert_roundtrip("var m = { a: 1, b: 2 }; return m.a + m.b;");
}

#[test]
fn test_roundtrip_control_flow() {
    assert_roundtrip(
        "var sum = 0; for (var i = 0; i < 10; i = i + 1) { if (i % 2 == 0) { sum = sum + i; } } \
         return sum;",
    );
    assert_roundtrip("var i = 0; do { i = i + 1; } while (i < 5); return i;");
}

#[test]
fn test_byte_image_is_word_aligned() {
    let words = compile_words("return \"abc\";");
    let program = Program::from_words(words).expect("load error");
    let bytes = program.to_bytes();
    assert_eq!(bytes.len() % 4, 0);
    assert_eq!(bytes.len(), program.words().len() * 4);
}

#[test]
fn test_resolution_does_not_dirty_the_image() {
    // Executing a program resolves its global stubs in place, but the
    // word image itself must stay byte-identical.
    let words = compile_words("g = 1; return g + g;");
    let program = Program::from_words(words.clone()).expect("load error");
    let before = program.to_bytes();
    exec_program(&program, &[]);
    let after = program.to_bytes();
    assert_eq!(before, after);
    assert_eq!(program.words(), &words[..]);
}

#[test]
fn test_stub_resolution_is_sticky() {
    use spindle_vm::program::LocalSymbol;

    let words = compile_words("k = 5; return k + k;");
    let program = Program::from_words(words).expect("load error");

    let stub_index = (0..program.symbol_count())
        .find(|&i| matches!(program.symbol(i), Some(LocalSymbol::Stub(_))))
        .expect("expected a stub for 'k'");

    exec_program(&program, &[]);

    // After the first execution the stub has been rewritten in place;
    // it never reverts.
    assert!(matches!(
        program.symbol(stub_index),
        Some(LocalSymbol::Resolved(Value::Int(5)))
    ));
}

#[test]
fn test_truncated_image_is_rejected() {
    let words = compile_words("return 1;");
    let program = Program::from_words(words).expect("load error");
    let mut bytes = program.to_bytes();
    bytes.truncate(bytes.len() - 4);
    assert!(Program::from_bytes(&bytes).is_err());

    assert!(Program::from_bytes(&[0, 1, 2]).is_err());
    assert!(Program::from_bytes(&[]).is_err());
}

#[test]
fn test_arguments_survive_reload() {
    let words = compile_words("return #0 .. \" \" .. #1;");
    let program = Program::from_words(words).expect("load error");
    let bytes = program.to_bytes();
    let reloaded = Program::from_bytes(&bytes).expect("reload error");
    let result = exec_program(&reloaded, &[Value::string("hello"), Value::string("world")]);
    assert_eq!(result.repr(), "\"hello world\"");
}
