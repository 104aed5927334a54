// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Register-based virtual machine for executing Spindle bytecode.
//!
//! The VM keeps a contiguous register file and a stack of call frames,
//! each frame owning a window of registers. Instructions address
//! registers relative to the current frame's base. Globals live in a
//! name-to-value table owned by the VM and are resolved lazily through
//! `LDSYM` symbol stubs.

pub mod error;
pub mod frame;

use std::collections::HashMap;
use std::rc::Rc;

use crate::function::Function;
use crate::hashmap::MapKey;
use crate::opcode::{
    self, ConstKind, FUNCHDR_IDX_BODYLEN, FUNCHDR_LEN, Opcode, UpvalKind, WORD_OCTETS, Word,
};
use crate::program::LocalSymbol;
use crate::value::Value;

pub use error::{RuntimeError, VmError};
pub use frame::Frame;

/// Result type for single-instruction execution.
type OpResult<T> = std::result::Result<T, RuntimeError>;

/// Default call-depth limit.
const DEFAULT_MAX_DEPTH: usize = 10_000;

/// The Spindle virtual machine.
pub struct Vm {
    /// The register file. Grows as frames are pushed, shrinks as they
    /// are popped.
    registers: Vec<Value>,

    /// Call frame stack.
    frames: Vec<Frame>,

    /// Global symbol table (name to value).
    globals: HashMap<String, Value>,

    /// Call-depth limit.
    max_depth: usize,
}

impl Vm {
    /// Create a new VM with an empty global table.
    pub fn new() -> Self {
        Vm {
            registers: Vec::new(),
            frames: Vec::new(),
            globals: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the call-depth limit. Returns the previous value.
    pub fn set_max_depth(&mut self, depth: usize) -> usize {
        std::mem::replace(&mut self.max_depth, depth)
    }

    /// Look up a global by name.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    /// Define or overwrite a global.
    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// Register a native function under a global name.
    pub fn register_native(
        &mut self,
        name: &str,
        func: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) {
        let f = Function::native(name, func);
        self.globals
            .insert(name.to_string(), Value::Function(Rc::new(f)));
    }

    /// Call a function with the given arguments.
    ///
    /// On error, the call stack is captured into the returned [`VmError`]
    /// and the VM is unwound back to its pre-call state.
    pub fn call(&mut self, function: &Rc<Function>, args: &[Value]) -> Result<Value, VmError> {
        match function.as_ref() {
            Function::Native(native) => (native.func)(args)
                .map_err(|e| VmError::new(e, vec![format!("{} (native)", native.name)])),
            Function::Script(_) => {
                let entry_depth = self.frames.len();
                if let Err(e) = self.push_frame(Rc::clone(function), args.to_vec(), 0) {
                    return Err(VmError::new(e, vec![function.trace_name()]));
                }
                match self.run(entry_depth) {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        let trace = self.capture_trace(entry_depth);
                        self.unwind(entry_depth);
                        Err(VmError::new(e, trace))
                    }
                }
            }
        }
    }

    /// Stack trace of the live frames above `entry_depth`, innermost
    /// frame first.
    fn capture_trace(&self, entry_depth: usize) -> Vec<String> {
        self.frames[entry_depth..]
            .iter()
            .rev()
            .map(|f| f.function.trace_name())
            .collect()
    }

    fn unwind(&mut self, entry_depth: usize) {
        if let Some(frame) = self.frames.get(entry_depth) {
            let base = frame.base;
            self.registers.truncate(base);
        }
        self.frames.truncate(entry_depth);
    }

    /// Push a call frame for a script function.
    fn push_frame(
        &mut self,
        function: Rc<Function>,
        args: Vec<Value>,
        ret_to: usize,
    ) -> OpResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(RuntimeError::StackOverflow);
        }

        let (program, nregs, argc, pc) = {
            let script = function
                .as_script()
                .expect("push_frame requires a script function");
            (
                Rc::clone(&script.program),
                script.nregs,
                script.argc,
                function.body_start(),
            )
        };

        let base = self.registers.len();
        self.registers.resize(base + nregs, Value::Nil);

        // Formals land in the low registers; missing arguments stay nil,
        // surplus arguments remain reachable through argc / #N.
        let ncopy = args.len().min(argc).min(nregs);
        for (i, arg) in args.iter().take(ncopy).enumerate() {
            self.registers[base + i] = arg.clone();
        }

        self.frames
            .push(Frame::new(function, program, base, nregs, pc, ret_to, args));
        Ok(())
    }

    // ========================================================================
    // Dispatch loop
    // ========================================================================

    fn run(&mut self, entry_depth: usize) -> OpResult<Value> {
        loop {
            let word = self.fetch()?;
            let op = Opcode::from_u8(opcode::opcode(word))
                .ok_or_else(|| bad(format!("unrecognized opcode {}", opcode::opcode(word))))?;
            let a = opcode::opa(word);
            let b = opcode::opb(word);
            let c = opcode::opc(word);

            match op {
                Opcode::Call => self.op_call(a, b, c)?,

                Opcode::Ret => {
                    let value = self.reg(a)?;
                    let finished = self.frames.pop().expect("RET with no active frame");
                    self.registers.truncate(finished.base);
                    if self.frames.len() == entry_depth {
                        return Ok(value);
                    }
                    self.registers[finished.ret_to] = value;
                }

                Opcode::Jmp => {
                    let offset = self.fetch()? as i32;
                    self.jump(offset)?;
                }
                Opcode::Jze => {
                    let offset = self.fetch()? as i32;
                    if !self.cond(a)? {
                        self.jump(offset)?;
                    }
                }
                Opcode::Jnz => {
                    let offset = self.fetch()? as i32;
                    if self.cond(a)? {
                        self.jump(offset)?;
                    }
                }

                Opcode::Eq => {
                    let result = self.reg(b)? == self.reg(c)?;
                    self.set_reg(a, Value::Bool(result))?;
                }
                Opcode::Ne => {
                    let result = self.reg(b)? != self.reg(c)?;
                    self.set_reg(a, Value::Bool(result))?;
                }
                Opcode::Lt => self.op_ord(a, b, c, |ord| ord.is_lt())?,
                Opcode::Le => self.op_ord(a, b, c, |ord| ord.is_le())?,
                Opcode::Gt => self.op_ord(a, b, c, |ord| ord.is_gt())?,
                Opcode::Ge => self.op_ord(a, b, c, |ord| ord.is_ge())?,

                Opcode::Add => self.op_arith(a, b, c, i64::wrapping_add, |x, y| x + y)?,
                Opcode::Sub => self.op_arith(a, b, c, i64::wrapping_sub, |x, y| x - y)?,
                Opcode::Mul => self.op_arith(a, b, c, i64::wrapping_mul, |x, y| x * y)?,
                Opcode::Div => {
                    let (lhs, rhs) = (self.reg(b)?, self.reg(c)?);
                    let result = match (&lhs, &rhs) {
                        (Value::Int(_), Value::Int(0)) => {
                            return Err(RuntimeError::DivisionByZero);
                        }
                        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_div(*y)),
                        _ => {
                            let (x, y) = both_floats(&lhs, &rhs)?;
                            Value::Float(x / y)
                        }
                    };
                    self.set_reg(a, result)?;
                }
                Opcode::Mod => {
                    let (lhs, rhs) = (self.reg(b)?, self.reg(c)?);
                    let result = match (&lhs, &rhs) {
                        (Value::Int(_), Value::Int(0)) => {
                            return Err(RuntimeError::ModuloByZero);
                        }
                        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_rem(*y)),
                        _ => {
                            let (x, y) = both_floats(&lhs, &rhs)?;
                            Value::Float(x % y)
                        }
                    };
                    self.set_reg(a, result)?;
                }
                Opcode::Neg => {
                    let result = match self.reg(b)? {
                        Value::Int(n) => Value::Int(n.wrapping_neg()),
                        Value::Float(x) => Value::Float(-x),
                        other => {
                            return Err(RuntimeError::type_error("number", other.type_name()));
                        }
                    };
                    self.set_reg(a, result)?;
                }
                Opcode::Inc | Opcode::Dec => {
                    let delta = if op == Opcode::Inc { 1 } else { -1 };
                    let result = match self.reg(a)? {
                        Value::Int(n) => Value::Int(n.wrapping_add(delta)),
                        Value::Float(x) => Value::Float(x + delta as f64),
                        other => {
                            return Err(RuntimeError::type_error("number", other.type_name()));
                        }
                    };
                    self.set_reg(a, result)?;
                }

                Opcode::And => self.op_bitwise(a, b, c, |x, y| Ok(x & y))?,
                Opcode::Or => self.op_bitwise(a, b, c, |x, y| Ok(x | y))?,
                Opcode::Xor => self.op_bitwise(a, b, c, |x, y| Ok(x ^ y))?,
                Opcode::Shl => self.op_bitwise(a, b, c, |x, y| {
                    check_shift(y)?;
                    Ok(x.wrapping_shl(y as u32))
                })?,
                Opcode::Shr => self.op_bitwise(a, b, c, |x, y| {
                    check_shift(y)?;
                    Ok(x.wrapping_shr(y as u32))
                })?,
                Opcode::BitNot => {
                    let result = match self.reg(b)? {
                        Value::Int(n) => Value::Int(!n),
                        other => {
                            return Err(RuntimeError::type_error("integer", other.type_name()));
                        }
                    };
                    self.set_reg(a, result)?;
                }
                Opcode::LogNot => {
                    let result = match self.reg(b)? {
                        Value::Bool(x) => Value::Bool(!x),
                        other => {
                            return Err(RuntimeError::type_error("bool", other.type_name()));
                        }
                    };
                    self.set_reg(a, result)?;
                }

                Opcode::Sizeof => {
                    let len = match self.reg(b)? {
                        Value::String(s) => s.len(),
                        Value::Array(arr) => arr.len(),
                        Value::HashMap(map) => map.len(),
                        other => {
                            return Err(RuntimeError::type_error(
                                "string, array or hashmap",
                                other.type_name(),
                            ));
                        }
                    };
                    self.set_reg(a, Value::Int(len as i64))?;
                }
                Opcode::Typeof => {
                    let name = self.reg(b)?.type_name();
                    self.set_reg(a, Value::string(name))?;
                }
                Opcode::Concat => {
                    let (lhs, rhs) = (self.reg(b)?, self.reg(c)?);
                    let result = match (&lhs, &rhs) {
                        (Value::String(x), Value::String(y)) => {
                            let mut s = String::with_capacity(x.len() + y.len());
                            s.push_str(x.as_str());
                            s.push_str(y.as_str());
                            Value::string(s)
                        }
                        (Value::String(_), other) | (other, _) => {
                            return Err(RuntimeError::type_error("string", other.type_name()));
                        }
                    };
                    self.set_reg(a, result)?;
                }

                Opcode::LdConst => {
                    let kind = ConstKind::from_u8(b)
                        .ok_or_else(|| bad(format!("incorrect constant kind {}", b)))?;
                    let value = match kind {
                        ConstKind::Nil => Value::Nil,
                        ConstKind::True => Value::Bool(true),
                        ConstKind::False => Value::Bool(false),
                        ConstKind::Int => {
                            let lo = self.fetch()?;
                            let hi = self.fetch()?;
                            Value::Int(opcode::unpack_i64(lo, hi))
                        }
                        ConstKind::Float => {
                            let lo = self.fetch()?;
                            let hi = self.fetch()?;
                            Value::Float(opcode::unpack_f64(lo, hi))
                        }
                    };
                    self.set_reg(a, value)?;
                }

                Opcode::LdSym => {
                    let index = opcode::opmid(word) as usize;
                    let value = self.load_symbol(index)?;
                    self.set_reg(a, value)?;
                }

                Opcode::Mov => {
                    let value = self.reg(b)?;
                    self.set_reg(a, value)?;
                }

                Opcode::LdArgc => {
                    let argc = self.frame().args.len() as i64;
                    self.set_reg(a, Value::Int(argc))?;
                }

                Opcode::NewArr => {
                    let value = match b {
                        0 => Value::array(),
                        1 => Value::hashmap(),
                        other => return Err(bad(format!("incorrect container kind {}", other))),
                    };
                    self.set_reg(a, value)?;
                }

                Opcode::ArrGet => {
                    let (container, key) = (self.reg(b)?, self.reg(c)?);
                    let value = container_get(&container, &key)?;
                    self.set_reg(a, value)?;
                }
                Opcode::ArrSet => {
                    let container = self.reg(a)?;
                    let key = self.reg(b)?;
                    let value = self.reg(c)?;
                    container_set(&container, &key, value)?;
                }

                Opcode::NthArg => {
                    let index = match self.reg(b)? {
                        Value::Int(n) => n,
                        other => {
                            return Err(RuntimeError::type_error("integer", other.type_name()));
                        }
                    };
                    let args = &self.frame().args;
                    if index < 0 || index as usize >= args.len() {
                        return Err(RuntimeError::ArgOutOfBounds {
                            index,
                            argc: args.len(),
                        });
                    }
                    let value = args[index as usize].clone();
                    self.set_reg(a, value)?;
                }

                Opcode::Function => {
                    // Skip over the inline function body; the function
                    // value itself is materialized via its symtab entry.
                    let frame = self.frame();
                    let bodylen = frame
                        .program
                        .words()
                        .get(frame.pc + FUNCHDR_IDX_BODYLEN)
                        .copied()
                        .ok_or_else(|| bad("truncated function header".to_string()))?
                        as usize;
                    self.frame_mut().pc += FUNCHDR_LEN + bodylen;
                }

                Opcode::GlbVal => {
                    let namelen = opcode::opmid(word) as usize;
                    let (name, nwords) = {
                        let frame = self.frame();
                        let words = frame.program.words();
                        let rest = words.get(frame.pc..).unwrap_or(&[]);
                        opcode::unpack_cstr(rest, namelen)
                            .ok_or_else(|| bad("global name length mismatch".to_string()))?
                    };
                    self.frame_mut().pc += nwords;
                    let value = self.reg(a)?;
                    self.globals.insert(name, value);
                }

                Opcode::Closure => self.op_closure(a, b as usize)?,

                Opcode::LdUpval => {
                    let value = {
                        let frame = self.frame();
                        let script = frame
                            .function
                            .as_script()
                            .ok_or_else(|| bad("LDUPVAL outside script function".to_string()))?;
                        script
                            .upvalues
                            .get(b as usize)
                            .cloned()
                            .ok_or_else(|| bad(format!("upvalue index {} out of range", b)))?
                    };
                    self.set_reg(a, value)?;
                }
            }
        }
    }

    // ========================================================================
    // Instruction helpers
    // ========================================================================

    fn frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    fn fetch(&mut self) -> OpResult<Word> {
        let frame = self.frames.last_mut().expect("no active frame");
        let word = frame
            .program
            .words()
            .get(frame.pc)
            .copied()
            .ok_or_else(|| bad("instruction pointer out of bounds".to_string()))?;
        frame.pc += 1;
        Ok(word)
    }

    fn jump(&mut self, offset: i32) -> OpResult<()> {
        let frame = self.frames.last_mut().expect("no active frame");
        let target = frame.pc as i64 + offset as i64;
        if target < 0 || target as usize > frame.program.words().len() {
            return Err(bad(format!("jump target {} out of bounds", target)));
        }
        frame.pc = target as usize;
        Ok(())
    }

    fn reg(&self, r: u8) -> OpResult<Value> {
        let frame = self.frame();
        if (r as usize) < frame.nregs {
            Ok(self.registers[frame.base + r as usize].clone())
        } else {
            Err(bad(format!("register r{} out of range", r)))
        }
    }

    fn set_reg(&mut self, r: u8, value: Value) -> OpResult<()> {
        let frame = self.frames.last().expect("no active frame");
        if (r as usize) < frame.nregs {
            let slot = frame.base + r as usize;
            self.registers[slot] = value;
            Ok(())
        } else {
            Err(bad(format!("register r{} out of range", r)))
        }
    }

    /// Read a register as a branch condition. Conditions are strictly
    /// boolean; any other type is a type error.
    fn cond(&self, r: u8) -> OpResult<bool> {
        match self.reg(r)? {
            Value::Bool(x) => Ok(x),
            other => Err(RuntimeError::type_error("bool", other.type_name())),
        }
    }

    fn op_arith(
        &mut self,
        a: u8,
        b: u8,
        c: u8,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> OpResult<()> {
        let (lhs, rhs) = (self.reg(b)?, self.reg(c)?);
        let result = match (&lhs, &rhs) {
            (Value::Int(x), Value::Int(y)) => Value::Int(int_op(*x, *y)),
            _ => {
                let (x, y) = both_floats(&lhs, &rhs)?;
                Value::Float(float_op(x, y))
            }
        };
        self.set_reg(a, result)
    }

    fn op_bitwise(
        &mut self,
        a: u8,
        b: u8,
        c: u8,
        int_op: impl Fn(i64, i64) -> OpResult<i64>,
    ) -> OpResult<()> {
        let (lhs, rhs) = (self.reg(b)?, self.reg(c)?);
        match (&lhs, &rhs) {
            (Value::Int(x), Value::Int(y)) => {
                let result = int_op(*x, *y)?;
                self.set_reg(a, Value::Int(result))
            }
            (Value::Int(_), other) | (other, _) => {
                Err(RuntimeError::type_error("integer", other.type_name()))
            }
        }
    }

    fn op_ord(
        &mut self,
        a: u8,
        b: u8,
        c: u8,
        test: fn(std::cmp::Ordering) -> bool,
    ) -> OpResult<()> {
        let (lhs, rhs) = (self.reg(b)?, self.reg(c)?);
        match lhs.compare(&rhs) {
            Some(ord) => self.set_reg(a, Value::Bool(test(ord))),
            None => Err(RuntimeError::NotComparable {
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            }),
        }
    }

    fn op_call(&mut self, dst: u8, freg: u8, argc: u8) -> OpResult<()> {
        let argc = argc as usize;
        let callee = self.reg(freg)?;

        // Argument register indices are packed four per word after the
        // call instruction.
        let nwords = opcode::words_for_octets(argc);
        let mut args = Vec::with_capacity(argc);
        for i in 0..nwords {
            let word = self.fetch()?;
            for j in 0..WORD_OCTETS {
                let k = i * WORD_OCTETS + j;
                if k < argc {
                    let r = ((word >> (8 * j)) & 0xff) as u8;
                    args.push(self.reg(r)?);
                }
            }
        }

        let func = match callee {
            Value::Function(f) => f,
            other => return Err(RuntimeError::NotCallable(other.type_name())),
        };

        match func.as_ref() {
            Function::Native(native) => {
                let result = (native.func)(&args)?;
                self.set_reg(dst, result)
            }
            Function::Script(_) => {
                let frame = self.frame();
                if (dst as usize) >= frame.nregs {
                    return Err(bad(format!("register r{} out of range", dst)));
                }
                let ret_to = frame.base + dst as usize;
                self.push_frame(Rc::clone(&func), args, ret_to)
            }
        }
    }

    fn op_closure(&mut self, r: u8, count: usize) -> OpResult<()> {
        let base_val = self.reg(r)?;
        let func = match &base_val {
            Value::Function(f) => f,
            other => return Err(RuntimeError::type_error("function", other.type_name())),
        };
        let script = func
            .as_script()
            .ok_or_else(|| bad("CLOSURE over a native function".to_string()))?;

        let mut upvalues = Vec::with_capacity(count);
        for _ in 0..count {
            let desc = self.fetch()?;
            let kind = UpvalKind::from_u8(opcode::opcode(desc))
                .ok_or_else(|| bad(format!("unknown upvalue type {}", opcode::opcode(desc))))?;
            let index = opcode::opa(desc);
            match kind {
                UpvalKind::Local => {
                    // Captured by value from the enclosing frame.
                    upvalues.push(self.reg(index)?);
                }
                UpvalKind::Outer => {
                    let frame = self.frame();
                    let current = frame
                        .function
                        .as_script()
                        .ok_or_else(|| bad("outer capture outside script function".to_string()))?;
                    let value = current
                        .upvalues
                        .get(index as usize)
                        .cloned()
                        .ok_or_else(|| bad(format!("outer upvalue {} out of range", index)))?;
                    upvalues.push(value);
                }
            }
        }

        let closure = Function::closure(script, upvalues);
        self.set_reg(r, Value::Function(Rc::new(closure)))
    }

    /// Load a local symbol, resolving global stubs in place on first use.
    fn load_symbol(&mut self, index: usize) -> OpResult<Value> {
        let program = Rc::clone(&self.frame().program);
        match program.symbol(index) {
            None => Err(bad(format!("symbol index {} out of range", index))),
            Some(LocalSymbol::StrConst(s)) => Ok(Value::String(s)),
            Some(LocalSymbol::Resolved(v)) => Ok(v),
            Some(LocalSymbol::Stub(name)) => match self.globals.get(name.as_ref()) {
                Some(value) => {
                    let value = value.clone();
                    program.resolve_symbol(index, value.clone());
                    Ok(value)
                }
                None => Err(RuntimeError::GlobalNotFound(name.to_string())),
            },
            Some(LocalSymbol::FuncDef { name, offset }) => {
                let function = Function::script(name, offset, Rc::clone(&program));
                Ok(Value::Function(Rc::new(function)))
            }
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Free helpers
// ============================================================================

fn bad(message: String) -> RuntimeError {
    RuntimeError::BadBytecode(message)
}

/// Promote two numeric operands to floats, or fail with a type error on
/// the first non-numeric operand.
fn both_floats(lhs: &Value, rhs: &Value) -> OpResult<(f64, f64)> {
    let x = match lhs {
        Value::Int(n) => *n as f64,
        Value::Float(f) => *f,
        other => return Err(RuntimeError::type_error("number", other.type_name())),
    };
    let y = match rhs {
        Value::Int(n) => *n as f64,
        Value::Float(f) => *f,
        other => return Err(RuntimeError::type_error("number", other.type_name())),
    };
    Ok((x, y))
}

fn check_shift(amount: i64) -> OpResult<()> {
    if (0..64).contains(&amount) {
        Ok(())
    } else {
        Err(RuntimeError::BadShift(amount))
    }
}

/// `container[key]` for arrays (integer keys) and hashmaps (hashable keys).
fn container_get(container: &Value, key: &Value) -> OpResult<Value> {
    match container {
        Value::Array(arr) => match key {
            Value::Int(n) => {
                if *n < 0 {
                    Err(RuntimeError::NegativeIndex(*n))
                } else {
                    Ok(arr.get(*n as usize))
                }
            }
            other => Err(RuntimeError::type_error("integer", other.type_name())),
        },
        Value::HashMap(map) => {
            let key = MapKey::new(key.clone())
                .ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
            Ok(map.get(&key))
        }
        other => Err(RuntimeError::type_error(
            "array or hashmap",
            other.type_name(),
        )),
    }
}

/// `container[key] = value`. Array writes grow; hashmap writes insert,
/// and storing nil removes the entry.
fn container_set(container: &Value, key: &Value, value: Value) -> OpResult<()> {
    match container {
        Value::Array(arr) => match key {
            Value::Int(n) => {
                if *n < 0 {
                    Err(RuntimeError::NegativeIndex(*n))
                } else {
                    arr.set(*n as usize, value);
                    Ok(())
                }
            }
            other => Err(RuntimeError::type_error("integer", other.type_name())),
        },
        Value::HashMap(map) => {
            let key = MapKey::new(key.clone())
                .ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
            map.set(key, value);
            Ok(())
        }
        other => Err(RuntimeError::type_error(
            "array or hashmap",
            other.type_name(),
        )),
    }
}
