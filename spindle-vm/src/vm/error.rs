// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime error types for VM execution.

use std::fmt;

/// Runtime error raised during VM execution or by a native function.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    /// Integer division by zero.
    DivisionByZero,
    /// Integer modulo by zero.
    ModuloByZero,
    /// Wrong operand type.
    TypeError {
        expected: &'static str,
        got: &'static str,
    },
    /// The two operands cannot be ordered relative to each other.
    NotComparable {
        lhs: &'static str,
        rhs: &'static str,
    },
    /// Attempted to call something that isn't callable.
    NotCallable(&'static str),
    /// A global symbol stub could not be resolved.
    GlobalNotFound(String),
    /// A value that cannot be hashed was used as a hashmap key.
    UnhashableKey(&'static str),
    /// Negative array index.
    NegativeIndex(i64),
    /// `#N` referenced an argument the call did not receive.
    ArgOutOfBounds { index: i64, argc: usize },
    /// Shift amount outside 0..64.
    BadShift(i64),
    /// Call stack depth limit exceeded.
    StackOverflow,
    /// Malformed instruction stream.
    BadBytecode(String),
    /// Error reported by a native function.
    Native(String),
}

impl RuntimeError {
    /// Create a wrong-operand-type error.
    pub fn type_error(expected: &'static str, got: &'static str) -> Self {
        RuntimeError::TypeError { expected, got }
    }

    /// Create an error carrying a message from a native function.
    pub fn native(message: impl Into<String>) -> Self {
        RuntimeError::Native(message.into())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::DivisionByZero => write!(f, "integer division by zero"),
            RuntimeError::ModuloByZero => write!(f, "integer modulo by zero"),
            RuntimeError::TypeError { expected, got } => {
                write!(f, "type error: expected {}, got {}", expected, got)
            }
            RuntimeError::NotComparable { lhs, rhs } => {
                write!(f, "values of type {} and {} are not comparable", lhs, rhs)
            }
            RuntimeError::NotCallable(typ) => {
                write!(f, "value of type {} is not callable", typ)
            }
            RuntimeError::GlobalNotFound(name) => {
                write!(f, "global symbol not found: {}", name)
            }
            RuntimeError::UnhashableKey(typ) => {
                write!(f, "value of type {} cannot be a hashmap key", typ)
            }
            RuntimeError::NegativeIndex(idx) => {
                write!(f, "array index must be non-negative (got {})", idx)
            }
            RuntimeError::ArgOutOfBounds { index, argc } => {
                write!(
                    f,
                    "argument #{} requested but only {} arguments were passed",
                    index, argc
                )
            }
            RuntimeError::BadShift(n) => {
                write!(f, "shift amount must be in 0..64 (got {})", n)
            }
            RuntimeError::StackOverflow => write!(f, "call stack overflow"),
            RuntimeError::BadBytecode(msg) => write!(f, "malformed bytecode: {}", msg),
            RuntimeError::Native(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// A runtime error together with the call stack captured where it was
/// raised, innermost frame first.
#[derive(Debug, Clone)]
pub struct VmError {
    pub error: RuntimeError,
    pub trace: Vec<String>,
}

impl VmError {
    pub fn new(error: RuntimeError, trace: Vec<String>) -> Self {
        VmError { error, trace }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for VmError {}
