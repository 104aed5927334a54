// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the Spindle AST to a program image.
//!
//! Compilation is a single pass over the AST. Each function body gets a
//! local register pool; expression results take a fresh register which
//! is freed on the way back up the tree, and the function header records
//! the high-water mark. Nested function bodies are emitted inline behind
//! a `FUNCTION` opcode and referenced through the local symbol table.

pub mod codegen;
pub mod symtab;

use std::fmt;

use spindle_parser::SourcePos;

pub use codegen::Compiler;

/// Error during compilation (a semantic error).
#[derive(Debug, Clone)]
pub enum CompileError {
    /// More than 256 registers simultaneously live in one function.
    TooManyRegisters { pos: SourcePos },
    /// The local symbol table overflowed its 16-bit index space.
    TooManySymbols { pos: SourcePos },
    /// More than 255 arguments in one call.
    TooManyArguments { pos: SourcePos },
    /// More than 255 parameters in one function.
    TooManyParameters { pos: SourcePos },
    /// More than 255 captured upvalues in one closure.
    TooManyUpvalues { pos: SourcePos },
    /// `break` outside a loop.
    BreakOutsideLoop { pos: SourcePos },
    /// `continue` outside a loop.
    ContinueOutsideLoop { pos: SourcePos },
    /// The same constant declared twice in one compilation unit.
    DuplicateConst { name: String, pos: SourcePos },
    /// The same variable declared twice in one scope.
    Redeclaration { name: String, pos: SourcePos },
}

impl CompileError {
    pub fn pos(&self) -> SourcePos {
        match self {
            CompileError::TooManyRegisters { pos }
            | CompileError::TooManySymbols { pos }
            | CompileError::TooManyArguments { pos }
            | CompileError::TooManyParameters { pos }
            | CompileError::TooManyUpvalues { pos }
            | CompileError::BreakOutsideLoop { pos }
            | CompileError::ContinueOutsideLoop { pos }
            | CompileError::DuplicateConst { pos, .. }
            | CompileError::Redeclaration { pos, .. } => *pos,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = self.pos();
        write!(f, "semantic error near {}: ", pos)?;
        match self {
            CompileError::TooManyRegisters { .. } => {
                write!(f, "too many registers (more than 256 live values)")
            }
            CompileError::TooManySymbols { .. } => write!(f, "too many local symbols"),
            CompileError::TooManyArguments { .. } => {
                write!(f, "too many arguments in function call")
            }
            CompileError::TooManyParameters { .. } => write!(f, "too many function parameters"),
            CompileError::TooManyUpvalues { .. } => write!(f, "too many captured variables"),
            CompileError::BreakOutsideLoop { .. } => write!(f, "'break' outside a loop"),
            CompileError::ContinueOutsideLoop { .. } => write!(f, "'continue' outside a loop"),
            CompileError::DuplicateConst { name, .. } => {
                write!(f, "constant '{}' is already declared", name)
            }
            CompileError::Redeclaration { name, .. } => {
                write!(f, "variable '{}' is already declared in this scope", name)
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
