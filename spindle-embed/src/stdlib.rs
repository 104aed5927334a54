// spindle-embed - Standard library native functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The compact standard library registered by [`crate::Context::new`].
//!
//! Every entry is an ordinary native function: a host callable under a
//! global name. Argument validation reports errors through the native
//! error channel, which the VM surfaces as runtime errors.

use std::cell::Cell;
use std::rc::Rc;

use spindle_vm::hashmap::MapKey;
use spindle_vm::vm::{RuntimeError, Vm};
use spindle_vm::Value;

/// Register the standard library into a VM's global table.
pub fn register(vm: &mut Vm) {
    vm.register_native("print", native_print);
    vm.register_native("println", native_println);
    vm.register_native("tostring", native_tostring);
    vm.register_native("tonumber", native_tonumber);
    vm.register_native("abs", native_abs);
    vm.register_native("floor", |args| float_fn("floor", args, f64::floor));
    vm.register_native("ceil", |args| float_fn("ceil", args, f64::ceil));
    vm.register_native("sqrt", |args| float_fn("sqrt", args, f64::sqrt));
    vm.register_native("pow", native_pow);
    vm.register_native("random", native_random);
    vm.register_native("push", native_push);
    vm.register_native("pop", native_pop);
    vm.register_native("contains", native_contains);
    vm.register_native("keys", native_keys);
    vm.register_native("substr", native_substr);
}

// ============================================================================
// Helpers
// ============================================================================

fn arity(name: &str, expected: usize, got: usize) -> RuntimeError {
    RuntimeError::native(format!(
        "wrong number of arguments to '{}': expected {}, got {}",
        name, expected, got
    ))
}

fn require(name: &str, args: &[Value], expected: usize) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(arity(name, expected, args.len()))
    }
}

fn to_f64(val: &Value) -> Result<f64, RuntimeError> {
    match val {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(x) => Ok(*x),
        other => Err(RuntimeError::type_error("number", other.type_name())),
    }
}

fn float_fn(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, RuntimeError> {
    require(name, args, 1)?;
    Ok(Value::Float(f(to_f64(&args[0])?)))
}

// ============================================================================
// I/O and conversions
// ============================================================================

fn native_print(args: &[Value]) -> Result<Value, RuntimeError> {
    for arg in args {
        print!("{}", arg);
    }
    Ok(Value::Nil)
}

fn native_println(args: &[Value]) -> Result<Value, RuntimeError> {
    for arg in args {
        print!("{}", arg);
    }
    println!();
    Ok(Value::Nil)
}

fn native_tostring(args: &[Value]) -> Result<Value, RuntimeError> {
    require("tostring", args, 1)?;
    Ok(Value::string(args[0].to_string()))
}

fn native_tonumber(args: &[Value]) -> Result<Value, RuntimeError> {
    require("tonumber", args, 1)?;
    match &args[0] {
        Value::Int(_) | Value::Float(_) => Ok(args[0].clone()),
        Value::String(s) => {
            let text = s.as_str().trim();
            if let Ok(n) = text.parse::<i64>() {
                Ok(Value::Int(n))
            } else if let Ok(x) = text.parse::<f64>() {
                Ok(Value::Float(x))
            } else {
                Ok(Value::Nil)
            }
        }
        other => Err(RuntimeError::type_error(
            "number or string",
            other.type_name(),
        )),
    }
}

// ============================================================================
// Math
// ============================================================================

fn native_abs(args: &[Value]) -> Result<Value, RuntimeError> {
    require("abs", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(RuntimeError::type_error("number", other.type_name())),
    }
}

fn native_pow(args: &[Value]) -> Result<Value, RuntimeError> {
    require("pow", args, 2)?;
    let base = to_f64(&args[0])?;
    let exp = to_f64(&args[1])?;
    Ok(Value::Float(base.powf(exp)))
}

// LCG constants (same as used in glibc).
const LCG_MULTIPLIER: u64 = 6364136223846793005;
const LCG_INCREMENT: u64 = 1442695040888963407;

thread_local! {
    /// Persistent RNG state, seeded lazily from system time.
    static RNG_STATE: Cell<u64> = const { Cell::new(0) };
}

fn next_random_f64() -> f64 {
    RNG_STATE.with(|state| {
        let mut s = state.get();
        if s == 0 {
            use std::time::{SystemTime, UNIX_EPOCH};
            s = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x5eed)
                | 1;
        }
        s = s.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
        state.set(s);
        (s >> 11) as f64 / (1u64 << 53) as f64
    })
}

/// `random()` - a float in [0, 1). `random(n)` - a float in [0, n).
fn native_random(args: &[Value]) -> Result<Value, RuntimeError> {
    let r = next_random_f64();
    match args.len() {
        0 => Ok(Value::Float(r)),
        1 => Ok(Value::Float(r * to_f64(&args[0])?)),
        got => Err(arity("random", 1, got)),
    }
}

// ============================================================================
// Arrays and hashmaps
// ============================================================================

fn native_push(args: &[Value]) -> Result<Value, RuntimeError> {
    require("push", args, 2)?;
    match &args[0] {
        Value::Array(arr) => {
            arr.push(args[1].clone());
            Ok(Value::Nil)
        }
        other => Err(RuntimeError::type_error("array", other.type_name())),
    }
}

fn native_pop(args: &[Value]) -> Result<Value, RuntimeError> {
    require("pop", args, 1)?;
    match &args[0] {
        Value::Array(arr) => Ok(arr.pop().unwrap_or(Value::Nil)),
        other => Err(RuntimeError::type_error("array", other.type_name())),
    }
}

fn native_contains(args: &[Value]) -> Result<Value, RuntimeError> {
    require("contains", args, 2)?;
    match &args[0] {
        Value::Array(arr) => {
            let found = arr.values().iter().any(|v| *v == args[1]);
            Ok(Value::Bool(found))
        }
        Value::HashMap(map) => {
            let key = MapKey::new(args[1].clone())
                .ok_or(RuntimeError::UnhashableKey(args[1].type_name()))?;
            Ok(Value::Bool(map.contains(&key)))
        }
        other => Err(RuntimeError::type_error(
            "array or hashmap",
            other.type_name(),
        )),
    }
}

fn native_keys(args: &[Value]) -> Result<Value, RuntimeError> {
    require("keys", args, 1)?;
    match &args[0] {
        Value::HashMap(map) => {
            let array = spindle_vm::Array::from_values(map.keys());
            Ok(Value::Array(Rc::new(array)))
        }
        other => Err(RuntimeError::type_error("hashmap", other.type_name())),
    }
}

// ============================================================================
// Strings
// ============================================================================

/// `substr(s, start, len)` - byte-indexed substring.
fn native_substr(args: &[Value]) -> Result<Value, RuntimeError> {
    require("substr", args, 3)?;
    let s = match &args[0] {
        Value::String(s) => s,
        other => return Err(RuntimeError::type_error("string", other.type_name())),
    };
    let (start, len) = match (&args[1], &args[2]) {
        (Value::Int(a), Value::Int(b)) if *a >= 0 && *b >= 0 => (*a as usize, *b as usize),
        _ => {
            return Err(RuntimeError::native(
                "substr: start and length must be non-negative integers",
            ));
        }
    };
    let text = s.as_str();
    let end = (start + len).min(text.len());
    let start = start.min(text.len());
    match text.get(start..end) {
        Some(sub) => Ok(Value::string(sub)),
        None => Err(RuntimeError::native(
            "substr: range does not fall on character boundaries",
        )),
    }
}
