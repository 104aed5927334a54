// spindle-parser - Parser tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use spindle_parser::ast::{BinOp, ExprKind, LogOp, StmtKind, UnOp};
use spindle_parser::{Parser, Stmt};

fn parse(src: &str) -> Vec<Stmt> {
    Parser::parse_str(src).expect("parse error")
}

fn parse_err(src: &str) -> String {
    Parser::parse_str(src)
        .expect_err("expected parse error")
        .message
}

/// Extract the expression of a single expression statement.
fn expr_of(src: &str) -> ExprKind {
    let stmts = parse(src);
    assert_eq!(stmts.len(), 1);
    match &stmts[0].kind {
        StmtKind::Expr(e) => e.kind.clone(),
        other => panic!("expected expression statement, got {:?}", other),
    }
}

#[test]
fn test_literals() {
    assert!(matches!(expr_of("42;"), ExprKind::Int(42)));
    assert!(matches!(expr_of("2.5;"), ExprKind::Float(_)));
    assert!(matches!(expr_of("nil;"), ExprKind::Nil));
    assert!(matches!(expr_of("true;"), ExprKind::Bool(true)));
    assert!(matches!(expr_of("\"hi\";"), ExprKind::Str(_)));
    assert!(matches!(expr_of("argc;"), ExprKind::Argc));
    assert!(matches!(expr_of("#1;"), ExprKind::ArgRef(1)));
}

#[test]
fn test_precedence_mul_over_add() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    match expr_of("1 + 2 * 3;") {
        ExprKind::Binary { op: BinOp::Add, rhs, .. } => {
            assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_concat_below_additive() {
    // "n = " .. 1 + 2 parses as "n = " .. (1 + 2)
    match expr_of("\"n = \" .. 1 + 2;") {
        ExprKind::Binary { op: BinOp::Concat, rhs, .. } => {
            assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Add, .. }));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_concat_right_associative() {
    // a .. b .. c parses as a .. (b .. c)
    match expr_of("\"a\" .. \"b\" .. \"c\";") {
        ExprKind::Binary { op: BinOp::Concat, lhs, rhs } => {
            assert!(matches!(lhs.kind, ExprKind::Str(_)));
            assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Concat, .. }));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_comparison_over_logical() {
    // a < b && c < d parses as (a < b) && (c < d)
    match expr_of("a < b && c < d;") {
        ExprKind::Logical { op: LogOp::And, lhs, rhs } => {
            assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Lt, .. }));
            assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Lt, .. }));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_assignment_right_associative() {
    // a = b = 1 parses as a = (b = 1)
    match expr_of("a = b = 1;") {
        ExprKind::Assign { op: None, value, .. } => {
            assert!(matches!(value.kind, ExprKind::Assign { .. }));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_compound_assignment() {
    assert!(matches!(
        expr_of("a += 1;"),
        ExprKind::Assign { op: Some(BinOp::Add), .. }
    ));
    assert!(matches!(
        expr_of("a ..= \"x\";"),
        ExprKind::Assign { op: Some(BinOp::Concat), .. }
    ));
}

#[test]
fn test_invalid_assignment_target() {
    assert!(parse_err("1 = 2;").contains("invalid assignment target"));
    assert!(parse_err("f() = 2;").contains("invalid assignment target"));
}

#[test]
fn test_ternary() {
    match expr_of("a ? 1 : 2;") {
        ExprKind::Ternary { .. } => {}
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_postfix_chain() {
    // a.b[0](1) parses inside-out: call of index of member
    match expr_of("a.b[0](1);") {
        ExprKind::Call { callee, args } => {
            assert_eq!(args.len(), 1);
            match &callee.kind {
                ExprKind::Index { object, .. } => {
                    assert!(matches!(object.kind, ExprKind::Member { .. }));
                }
                other => panic!("unexpected callee: {:?}", other),
            }
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_prefix_and_postfix_incdec() {
    assert!(matches!(
        expr_of("++a;"),
        ExprKind::Unary { op: UnOp::PreInc, .. }
    ));
    assert!(matches!(
        expr_of("a--;"),
        ExprKind::Unary { op: UnOp::PostDec, .. }
    ));
    assert!(parse_err("++1;").contains("must be assignable"));
}

#[test]
fn test_fn_literal() {
    match expr_of("fn (a, b) { return a; };") {
        ExprKind::FnLit { name, params, .. } => {
            assert!(name.is_none());
            assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("unexpected shape: {:?}", other),
    }
    match expr_of("fn square(x) { return x * x; };") {
        ExprKind::FnLit { name, .. } => assert_eq!(name.as_deref(), Some("square")),
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_array_and_map_literals() {
    match expr_of("[1, 2, 3];") {
        ExprKind::ArrayLit(items) => assert_eq!(items.len(), 3),
        other => panic!("unexpected shape: {:?}", other),
    }
    match expr_of("x = { a: 1, \"b\": 2, 3: 4 };") {
        ExprKind::Assign { value, .. } => match &value.kind {
            ExprKind::MapLit(pairs) => {
                assert_eq!(pairs.len(), 3);
                // Bare identifier keys are string shorthand.
                assert!(matches!(pairs[0].0.kind, ExprKind::Str(_)));
            }
            other => panic!("unexpected value: {:?}", other),
        },
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_statements() {
    let stmts = parse("var a = 1, b; const K = 2; ; { a; }");
    assert!(matches!(stmts[0].kind, StmtKind::VarDecl(_)));
    assert!(matches!(stmts[1].kind, StmtKind::ConstDecl(_)));
    assert!(matches!(stmts[2].kind, StmtKind::Empty));
    assert!(matches!(stmts[3].kind, StmtKind::Block(_)));
}

#[test]
fn test_control_flow() {
    let stmts = parse(
        "if (a) { } else { } \
         while (a) { } \
         do { } while (a); \
         for (var i = 0; i < 10; i = i + 1) { break; continue; }",
    );
    assert!(matches!(stmts[0].kind, StmtKind::If { els: Some(_), .. }));
    assert!(matches!(stmts[1].kind, StmtKind::While { .. }));
    assert!(matches!(stmts[2].kind, StmtKind::DoWhile { .. }));
    match &stmts[3].kind {
        StmtKind::For { init, cond, step, .. } => {
            assert!(init.is_some());
            assert!(cond.is_some());
            assert!(step.is_some());
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_for_empty_header() {
    match &parse("for (;;) { break; }")[0].kind {
        StmtKind::For { init, cond, step, .. } => {
            assert!(init.is_none());
            assert!(cond.is_none());
            assert!(step.is_none());
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn test_syntax_errors_carry_location() {
    let err = Parser::parse_str("var = 3;").expect_err("expected error");
    assert_eq!(err.line, 1);
    assert!(err.column > 1);

    assert!(parse_err("if a { }").contains("expected '('"));
    assert!(parse_err("return 1").contains("expected ';'"));
    assert!(parse_err("{ 1;").contains("unexpected end of input"));
}

#[test]
fn test_parse_expression_entry() {
    let expr = Parser::new("1 + 2").unwrap().parse_expression().unwrap();
    assert!(matches!(expr.kind, ExprKind::Binary { op: BinOp::Add, .. }));

    // Trailing garbage is rejected.
    assert!(Parser::new("1 + 2 3").unwrap().parse_expression().is_err());
}
