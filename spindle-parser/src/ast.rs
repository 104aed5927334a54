// spindle-parser - AST types for Spindle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Typed abstract syntax tree for Spindle.
//!
//! Every node carries the source position where it starts so the compiler
//! can report semantic errors with a location.

use std::fmt::Write;

use crate::lexer::SourcePos;

/// Binary operators that map directly onto VM opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
}

impl BinOp {
    /// Operator spelling, as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Concat => "..",
        }
    }
}

/// Short-circuiting logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOp {
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Minus,
    LogNot,
    BitNot,
    Sizeof,
    Typeof,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    /// `argc` - number of arguments the enclosing call received.
    Argc,
    /// `#N` - the Nth argument of the enclosing call.
    ArgRef(i64),
    /// `[e1, e2, ...]`
    ArrayLit(Vec<Expr>),
    /// `{ k1: v1, k2: v2, ... }`
    MapLit(Vec<(Expr, Expr)>),
    /// `fn name? (params) { body }`
    FnLit {
        name: Option<String>,
        params: Vec<String>,
        body: Box<Stmt>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `cond ? then : else`
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    /// Plain or compound assignment. `op` is `None` for `=`,
    /// `Some(BinOp)` for `+=` and friends.
    Assign {
        target: Box<Expr>,
        op: Option<BinOp>,
        value: Box<Expr>,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// `object.name` - sugar for indexing with a string key.
    Member {
        object: Box<Expr>,
        name: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `var a = e, b, c = f;`
    VarDecl(Vec<(String, Option<Expr>)>),
    /// `const a = e, b = f;` - defines globals.
    ConstDecl(Vec<(String, Expr)>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Empty,
    Expr(Expr),
}

// ============================================================================
// AST dumping (for the --dump-ast driver mode)
// ============================================================================

/// Render a whole program as an indented S-expression-like tree.
pub fn dump_program(stmts: &[Stmt]) -> String {
    let mut out = String::new();
    out.push_str("(program\n");
    for stmt in stmts {
        dump_stmt(stmt, 1, &mut out);
    }
    out.push_str(")\n");
    out
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn dump_stmt(stmt: &Stmt, level: usize, out: &mut String) {
    indent(level, out);
    match &stmt.kind {
        StmtKind::Block(stmts) => {
            out.push_str("(block-statement\n");
            for s in stmts {
                dump_stmt(s, level + 1, out);
            }
            indent(level, out);
            out.push_str(")\n");
        }
        StmtKind::VarDecl(decls) => {
            out.push_str("(vardecl");
            for (name, init) in decls {
                let _ = write!(out, " name = \"{}\"", name);
                if let Some(e) = init {
                    out.push('\n');
                    dump_expr(e, level + 1, out);
                    indent(level, out);
                }
            }
            out.push_str(")\n");
        }
        StmtKind::ConstDecl(decls) => {
            out.push_str("(global-constant");
            for (name, init) in decls {
                let _ = write!(out, " name = \"{}\"", name);
                out.push('\n');
                dump_expr(init, level + 1, out);
                indent(level, out);
            }
            out.push_str(")\n");
        }
        StmtKind::If { cond, then, els } => {
            out.push_str("(if\n");
            dump_expr(cond, level + 1, out);
            dump_stmt(then, level + 1, out);
            if let Some(e) = els {
                dump_stmt(e, level + 1, out);
            }
            indent(level, out);
            out.push_str(")\n");
        }
        StmtKind::While { cond, body } => {
            out.push_str("(while\n");
            dump_expr(cond, level + 1, out);
            dump_stmt(body, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        StmtKind::DoWhile { body, cond } => {
            out.push_str("(do-while\n");
            dump_stmt(body, level + 1, out);
            dump_expr(cond, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            out.push_str("(for\n");
            if let Some(s) = init {
                dump_stmt(s, level + 1, out);
            }
            if let Some(e) = cond {
                dump_expr(e, level + 1, out);
            }
            if let Some(e) = step {
                dump_expr(e, level + 1, out);
            }
            dump_stmt(body, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        StmtKind::Break => out.push_str("(break)\n"),
        StmtKind::Continue => out.push_str("(continue)\n"),
        StmtKind::Return(expr) => match expr {
            Some(e) => {
                out.push_str("(return\n");
                dump_expr(e, level + 1, out);
                indent(level, out);
                out.push_str(")\n");
            }
            None => out.push_str("(return)\n"),
        },
        StmtKind::Empty => out.push_str("(empty-statement)\n"),
        StmtKind::Expr(e) => {
            out.push_str("(expression-statement\n");
            dump_expr(e, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
    }
}

fn dump_expr(expr: &Expr, level: usize, out: &mut String) {
    indent(level, out);
    match &expr.kind {
        ExprKind::Nil => out.push_str("(literal value = nil)\n"),
        ExprKind::Bool(b) => {
            let _ = writeln!(out, "(literal value = {})", b);
        }
        ExprKind::Int(n) => {
            let _ = writeln!(out, "(literal value = {})", n);
        }
        ExprKind::Float(n) => {
            let _ = writeln!(out, "(literal value = {})", n);
        }
        ExprKind::Str(s) => {
            let _ = writeln!(out, "(literal value = {:?})", s);
        }
        ExprKind::Ident(name) => {
            let _ = writeln!(out, "(identifier name = \"{}\")", name);
        }
        ExprKind::Argc => out.push_str("(argc)\n"),
        ExprKind::ArgRef(n) => {
            let _ = writeln!(out, "(nth-arg value = {})", n);
        }
        ExprKind::ArrayLit(items) => {
            out.push_str("(array-literal\n");
            for item in items {
                dump_expr(item, level + 1, out);
            }
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::MapLit(pairs) => {
            out.push_str("(hashmap-literal\n");
            for (k, v) in pairs {
                indent(level + 1, out);
                out.push_str("(key-value-pair\n");
                dump_expr(k, level + 2, out);
                dump_expr(v, level + 2, out);
                indent(level + 1, out);
                out.push_str(")\n");
            }
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::FnLit { name, params, body } => {
            out.push_str("(function-expr");
            if let Some(n) = name {
                let _ = write!(out, " name = \"{}\"", n);
            }
            for p in params {
                let _ = write!(out, " arg = \"{}\"", p);
            }
            out.push('\n');
            dump_stmt(body, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Unary { op, operand } => {
            let name = match op {
                UnOp::Plus => "unary-plus",
                UnOp::Minus => "unary-minus",
                UnOp::LogNot => "logical-not",
                UnOp::BitNot => "bitwise-not",
                UnOp::Sizeof => "sizeof",
                UnOp::Typeof => "typeof",
                UnOp::PreInc => "preincrement",
                UnOp::PreDec => "predecrement",
                UnOp::PostInc => "postincrement",
                UnOp::PostDec => "postdecrement",
            };
            let _ = writeln!(out, "({}", name);
            dump_expr(operand, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let name = match op {
                BinOp::Add => "add",
                BinOp::Sub => "subtract",
                BinOp::Mul => "multiply",
                BinOp::Div => "divide",
                BinOp::Mod => "modulo",
                BinOp::BitAnd => "bitwise-and",
                BinOp::BitOr => "bitwise-or",
                BinOp::BitXor => "bitwise-xor",
                BinOp::Shl => "left-shift",
                BinOp::Shr => "right-shift",
                BinOp::Eq => "equals",
                BinOp::Ne => "not-equal",
                BinOp::Lt => "less-than",
                BinOp::Le => "less-than-or-equal",
                BinOp::Gt => "greater-than",
                BinOp::Ge => "greater-than-or-equal",
                BinOp::Concat => "concatenate",
            };
            let _ = writeln!(out, "({}", name);
            dump_expr(lhs, level + 1, out);
            dump_expr(rhs, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Logical { op, lhs, rhs } => {
            let name = match op {
                LogOp::And => "logical-and",
                LogOp::Or => "logical-or",
            };
            let _ = writeln!(out, "({}", name);
            dump_expr(lhs, level + 1, out);
            dump_expr(rhs, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Ternary { cond, then, els } => {
            out.push_str("(conditional-ternary\n");
            dump_expr(cond, level + 1, out);
            dump_expr(then, level + 1, out);
            dump_expr(els, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Assign { target, op, value } => {
            let name = match op {
                None => "assign",
                Some(BinOp::Add) => "assign-add",
                Some(BinOp::Sub) => "assign-subtract",
                Some(BinOp::Mul) => "assign-multiply",
                Some(BinOp::Div) => "assign-divide",
                Some(BinOp::Mod) => "assign-modulo",
                Some(BinOp::BitAnd) => "assign-and",
                Some(BinOp::BitOr) => "assign-or",
                Some(BinOp::BitXor) => "assign-xor",
                Some(BinOp::Shl) => "assign-left-shift",
                Some(BinOp::Shr) => "assign-right-shift",
                Some(BinOp::Concat) => "assign-concat",
                Some(_) => "assign",
            };
            let _ = writeln!(out, "({}", name);
            dump_expr(target, level + 1, out);
            dump_expr(value, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Index { object, index } => {
            out.push_str("(array-subscript\n");
            dump_expr(object, level + 1, out);
            dump_expr(index, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Member { object, name } => {
            let _ = writeln!(out, "(memberof name = \"{}\"", name);
            dump_expr(object, level + 1, out);
            indent(level, out);
            out.push_str(")\n");
        }
        ExprKind::Call { callee, args } => {
            out.push_str("(function-call\n");
            dump_expr(callee, level + 1, out);
            for arg in args {
                dump_expr(arg, level + 1, out);
            }
            indent(level, out);
            out.push_str(")\n");
        }
    }
}
