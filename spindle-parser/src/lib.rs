// spindle-parser - Lexer and parser for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # spindle-parser
//!
//! Lexer and parser for the Spindle programming language.
//! Produces a typed AST from source code strings.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{BinOp, Expr, ExprKind, LogOp, Stmt, StmtKind, UnOp, dump_program};
pub use lexer::{Lexeme, Lexer, LexerError, SourcePos, Token, strip_shebang};
pub use parser::{ParseError, Parser};
