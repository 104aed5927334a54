// spindle-embed - Embedding API for Spindle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # spindle-embed
//!
//! A high-level embedding API for the Spindle programming language.
//!
//! The [`Context`] owns a virtual machine and a global symbol table and
//! exposes the load/compile/execute entry points, error reporting and
//! the runtime stack trace.
//!
//! ## Quick start
//!
//! ```rust
//! use spindle_embed::Context;
//!
//! let mut ctx = Context::new();
//! let result = ctx.exec_source("return 1 + 2 * 3;").unwrap();
//! assert_eq!(result.to_string(), "7");
//! ```
//!
//! ## Registering native functions
//!
//! ```rust
//! use spindle_embed::{Context, RuntimeError, Value};
//!
//! let mut ctx = Context::new();
//! ctx.register_native("double", |args: &[Value]| match args.first() {
//!     Some(Value::Int(n)) => Ok(Value::Int(n * 2)),
//!     _ => Err(RuntimeError::type_error("integer", "other")),
//! });
//! let result = ctx.exec_source("return double(21);").unwrap();
//! assert_eq!(result.to_string(), "42");
//! ```

mod context;
mod convert;
mod stdlib;

pub use context::{Context, Error, ErrorKind, Result};
pub use convert::{FromValue, IntoValue};

// Re-export core types for convenience
pub use spindle_parser::{ParseError, Parser};
pub use spindle_vm::{Function, RuntimeError, Value, VmError};
