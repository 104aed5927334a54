// spindle-embed - Context implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Context struct - main entry point for embedding Spindle.

use std::path::Path;
use std::rc::Rc;

use spindle_parser::ast::{Stmt, StmtKind};
use spindle_parser::{ParseError, Parser};
use spindle_vm::compiler::{CompileError, Compiler};
use spindle_vm::program::Program;
use spindle_vm::vm::{RuntimeError, Vm, VmError};
use spindle_vm::{Function, Value};

use crate::stdlib;

/// Error kinds surfaced by a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Generic,
    Syntax,
    Semantic,
    Runtime,
}

/// Any error produced by loading, compiling or executing code.
#[derive(Debug, Clone)]
pub enum Error {
    /// Lexer or parser error.
    Syntax(ParseError),
    /// Compiler error.
    Semantic(CompileError),
    /// VM error with its captured call stack.
    Runtime(VmError),
    /// Anything else: I/O failures, malformed bytecode images.
    Generic(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Semantic(_) => ErrorKind::Semantic,
            Error::Runtime(_) => ErrorKind::Runtime,
            Error::Generic(_) => ErrorKind::Generic,
        }
    }

    /// The captured call stack, innermost frame first. Empty for
    /// non-runtime errors.
    pub fn stack_trace(&self) -> &[String] {
        match self {
            Error::Runtime(e) => &e.trace,
            _ => &[],
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "{}", e),
            Error::Semantic(e) => write!(f, "{}", e),
            Error::Runtime(e) => write!(f, "runtime error: {}", e),
            Error::Generic(msg) => write!(f, "generic error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Syntax(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Error::Semantic(e)
    }
}

impl From<VmError> for Error {
    fn from(e: VmError) -> Self {
        Error::Runtime(e)
    }
}

/// Result type for Context operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The Spindle scripting context.
///
/// A `Context` owns a VM, its global symbol table and the list of
/// loaded programs. Every fallible operation also records its error so
/// the host can read it back later with [`Context::last_error`].
///
/// # Thread safety
///
/// **`Context` is NOT thread-safe.** Values use `Rc` internally; a
/// context is owned by one thread for its lifetime. Create one context
/// per thread for concurrent evaluation.
pub struct Context {
    vm: Vm,
    programs: Vec<Rc<Function>>,
    last_error: Option<Error>,
}

impl Context {
    /// Create a new context with the standard library registered.
    pub fn new() -> Self {
        let mut ctx = Context::new_bare();
        stdlib::register(&mut ctx.vm);
        ctx
    }

    /// Create a new context without the standard library.
    ///
    /// Useful for sandboxed environments or when you want to provide
    /// your own functions.
    pub fn new_bare() -> Self {
        Context {
            vm: Vm::new(),
            programs: Vec::new(),
            last_error: None,
        }
    }

    /// Set the VM's call-depth limit. Returns the previous value.
    ///
    /// Default is 10,000. Setting this lower can help catch runaway
    /// recursion earlier.
    pub fn set_max_depth(&mut self, depth: usize) -> usize {
        self.vm.set_max_depth(depth)
    }

    // ========================================================================
    // Loading and compiling
    // ========================================================================

    /// Compile a source string into its top-level function.
    ///
    /// The returned function owns the compiled program; call it with
    /// [`Context::call`] to run it. A leading shebang line is ignored.
    pub fn load_source(&mut self, source: &str) -> Result<Rc<Function>> {
        self.record(|ctx| {
            let stmts = Parser::new(source)?.parse_program()?;
            ctx.load_stmts(&stmts)
        })
    }

    /// Load a compiled program image (the `.spo` format).
    pub fn load_binary(&mut self, bytes: &[u8]) -> Result<Rc<Function>> {
        self.record(|ctx| {
            let program =
                Program::from_bytes(bytes).map_err(|e| Error::Generic(e.to_string()))?;
            let function = program.top_level_function();
            ctx.programs.push(Rc::clone(&function));
            Ok(function)
        })
    }

    /// Compile a single expression by wrapping it into a synthesized
    /// `return <expr>;` program.
    pub fn compile_expr(&mut self, source: &str) -> Result<Rc<Function>> {
        self.record(|ctx| {
            let expr = Parser::new(source)?.parse_expression()?;
            let pos = expr.pos;
            let stmt = Stmt {
                kind: StmtKind::Return(Some(expr)),
                pos,
            };
            ctx.load_stmts(std::slice::from_ref(&stmt))
        })
    }

    fn load_stmts(&mut self, stmts: &[Stmt]) -> Result<Rc<Function>> {
        let words = Compiler::compile(stmts)?;
        let program = Program::from_words(words).map_err(|e| Error::Generic(e.to_string()))?;
        let function = program.top_level_function();
        self.programs.push(Rc::clone(&function));
        Ok(function)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Compile and run a source string with no arguments.
    pub fn exec_source(&mut self, source: &str) -> Result<Value> {
        let function = self.load_source(source)?;
        self.call(&function, &[])
    }

    /// Load and run a compiled program image with the given arguments.
    pub fn exec_binary(&mut self, bytes: &[u8], args: &[Value]) -> Result<Value> {
        let function = self.load_binary(bytes)?;
        self.call(&function, args)
    }

    /// Run a source or object file, dispatching on its extension
    /// (`.spn` is source, `.spo` is bytecode). The arguments are passed
    /// to the script's top-level function.
    pub fn exec_file(&mut self, path: impl AsRef<Path>, args: &[Value]) -> Result<Value> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("spn") => {
                let source = std::fs::read_to_string(path).map_err(|e| {
                    let err = Error::Generic(format!("cannot read file '{}': {}", path.display(), e));
                    self.last_error = Some(err.clone());
                    err
                })?;
                let function = self.load_source(&source)?;
                self.call(&function, args)
            }
            Some("spo") => {
                let bytes = std::fs::read(path).map_err(|e| {
                    let err = Error::Generic(format!("cannot read file '{}': {}", path.display(), e));
                    self.last_error = Some(err.clone());
                    err
                })?;
                self.exec_binary(&bytes, args)
            }
            _ => {
                let err = Error::Generic("invalid file extension".to_string());
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// The top-level functions of every program loaded so far.
    #[must_use]
    pub fn programs(&self) -> &[Rc<Function>] {
        &self.programs
    }

    /// Call a function with the given arguments.
    pub fn call(&mut self, function: &Rc<Function>, args: &[Value]) -> Result<Value> {
        match self.vm.call(function, args) {
            Ok(value) => Ok(value),
            Err(e) => {
                let err = Error::Runtime(e);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Register a native function under a global name.
    pub fn register_native(
        &mut self,
        name: &str,
        func: impl Fn(&[Value]) -> std::result::Result<Value, RuntimeError> + 'static,
    ) {
        self.vm.register_native(name, func);
    }

    /// Look up a global by name.
    #[must_use]
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.vm.get_global(name)
    }

    /// Define or overwrite a global.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.vm.set_global(name, value);
    }

    // ========================================================================
    // Error state
    // ========================================================================

    /// The most recent error, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The kind of the most recent error.
    #[must_use]
    pub fn last_error_kind(&self) -> Option<ErrorKind> {
        self.last_error.as_ref().map(Error::kind)
    }

    /// The call stack of the most recent runtime error, innermost frame
    /// first. Empty if the last error was not a runtime error.
    #[must_use]
    pub fn stack_trace(&self) -> &[String] {
        self.last_error
            .as_ref()
            .map(Error::stack_trace)
            .unwrap_or(&[])
    }

    /// Clear the recorded error state.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Run an operation, mirroring any error into `last_error`.
    fn record<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        match op(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
