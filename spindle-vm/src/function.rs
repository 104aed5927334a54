// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Function objects: script functions, closures and native functions.

use std::fmt;
use std::rc::Rc;

use crate::opcode::{FUNCHDR_IDX_ARGC, FUNCHDR_IDX_BODYLEN, FUNCHDR_IDX_NREGS, FUNCHDR_LEN};
use crate::program::Program;
use crate::value::Value;
use crate::vm::RuntimeError;

/// A host callable registered as a native function.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>;

/// A callable Spindle value.
pub enum Function {
    Script(ScriptFn),
    Native(NativeDef),
}

/// A bytecode function: a region of a program's instruction stream.
pub struct ScriptFn {
    /// Name from the function definition symbol, if any.
    pub name: Option<Rc<str>>,
    /// Word offset of the function header within the program.
    pub offset: usize,
    /// Body length in words.
    pub bodylen: usize,
    /// Number of declared formal parameters.
    pub argc: usize,
    /// Number of registers the body needs.
    pub nregs: usize,
    /// True for the outermost compilation unit, which owns the bytecode
    /// buffer and symbol table.
    pub top_level: bool,
    /// The owning program.
    pub program: Rc<Program>,
    /// Captured upvalues; empty unless this is a closure.
    pub upvalues: Vec<Value>,
}

/// A native function: a host callable plus a symbolic name.
pub struct NativeDef {
    pub name: Rc<str>,
    pub func: NativeFn,
}

impl Function {
    /// The top-level function of a program.
    pub fn top_level(program: Rc<Program>) -> Function {
        let words = program.words();
        Function::Script(ScriptFn {
            name: None,
            offset: 0,
            bodylen: words[FUNCHDR_IDX_BODYLEN] as usize,
            argc: words[FUNCHDR_IDX_ARGC] as usize,
            nregs: words[FUNCHDR_IDX_NREGS] as usize,
            top_level: true,
            program,
            upvalues: Vec::new(),
        })
    }

    /// A function defined at `offset` inside `program` (the offset of
    /// its header, as recorded by its symbol table entry).
    pub fn script(name: Option<Rc<str>>, offset: usize, program: Rc<Program>) -> Function {
        let words = program.words();
        Function::Script(ScriptFn {
            name,
            offset,
            bodylen: words[offset + FUNCHDR_IDX_BODYLEN] as usize,
            argc: words[offset + FUNCHDR_IDX_ARGC] as usize,
            nregs: words[offset + FUNCHDR_IDX_NREGS] as usize,
            top_level: false,
            program,
            upvalues: Vec::new(),
        })
    }

    /// A closure over an existing script function with the given
    /// captured upvalues.
    pub fn closure(base: &ScriptFn, upvalues: Vec<Value>) -> Function {
        Function::Script(ScriptFn {
            name: base.name.clone(),
            offset: base.offset,
            bodylen: base.bodylen,
            argc: base.argc,
            nregs: base.nregs,
            top_level: false,
            program: Rc::clone(&base.program),
            upvalues,
        })
    }

    /// A native function.
    pub fn native(
        name: impl Into<Rc<str>>,
        func: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Function {
        Function::Native(NativeDef {
            name: name.into(),
            func: Rc::new(func),
        })
    }

    /// The function's symbolic name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Function::Script(s) => s.name.as_deref(),
            Function::Native(n) => Some(&n.name),
        }
    }

    /// The name shown in stack traces: `<main>` for top-level programs,
    /// `<lambda>` for anonymous functions.
    pub fn trace_name(&self) -> String {
        match self {
            Function::Script(s) => {
                if s.top_level {
                    "<main>".to_string()
                } else {
                    match &s.name {
                        Some(name) => name.to_string(),
                        None => "<lambda>".to_string(),
                    }
                }
            }
            Function::Native(n) => format!("{} (native)", n.name),
        }
    }

    /// Word offset of the first body instruction.
    pub fn body_start(&self) -> usize {
        match self {
            Function::Script(s) => s.offset + FUNCHDR_LEN,
            Function::Native(_) => 0,
        }
    }

    pub fn as_script(&self) -> Option<&ScriptFn> {
        match self {
            Function::Script(s) => Some(s),
            Function::Native(_) => None,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Script(s) => f
                .debug_struct("ScriptFn")
                .field("name", &s.name)
                .field("offset", &s.offset)
                .field("argc", &s.argc)
                .field("nregs", &s.nregs)
                .field("top_level", &s.top_level)
                .field("upvalues", &s.upvalues.len())
                .finish(),
            Function::Native(n) => f.debug_struct("NativeFn").field("name", &n.name).finish(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Script(_) => write!(f, "#<fn {}>", self.trace_name()),
            Function::Native(n) => write!(f, "#<native fn {}>", n.name),
        }
    }
}
