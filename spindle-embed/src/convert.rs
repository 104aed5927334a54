// spindle-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Type conversion between Rust and Spindle values.
//!
//! This module provides the [`IntoValue`] and [`FromValue`] traits for
//! converting between Rust types and [`Value`].
//!
//! # Built-in conversions
//!
//! | Rust type | Spindle type |
//! |-----------|--------------|
//! | `()` | `nil` |
//! | `bool` | `bool` |
//! | `i32`, `i64`, `usize` | `int` |
//! | `f32`, `f64` | `float` |
//! | `String`, `&str` | `string` |
//! | `Vec<T>` | `array` |
//! | `Option<T>` | `T` or `nil` |

use std::rc::Rc;

use spindle_vm::array::Array;
use spindle_vm::vm::RuntimeError;
use spindle_vm::Value;

/// Convert a Rust type into a `Value`.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Convert a `Value` into a Rust type.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self, RuntimeError>;
}

// ============================================================================
// IntoValue implementations
// ============================================================================

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Nil
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        let array = Array::from_values(self.into_iter().map(IntoValue::into_value));
        Value::Array(Rc::new(array))
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Nil,
        }
    }
}

// ============================================================================
// FromValue implementations
// ============================================================================

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self, RuntimeError> {
        Ok(val.clone())
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self, RuntimeError> {
        match val {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::type_error("bool", other.type_name())),
        }
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self, RuntimeError> {
        match val {
            Value::Int(n) => Ok(*n),
            other => Err(RuntimeError::type_error("integer", other.type_name())),
        }
    }
}

impl FromValue for f64 {
    fn from_value(val: &Value) -> Result<Self, RuntimeError> {
        match val {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(x) => Ok(*x),
            other => Err(RuntimeError::type_error("number", other.type_name())),
        }
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self, RuntimeError> {
        match val {
            Value::String(s) => Ok(s.as_str().to_string()),
            other => Err(RuntimeError::type_error("string", other.type_name())),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(val: &Value) -> Result<Self, RuntimeError> {
        match val {
            Value::Array(arr) => arr.values().iter().map(T::from_value).collect(),
            other => Err(RuntimeError::type_error("array", other.type_name())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(val: &Value) -> Result<Self, RuntimeError> {
        match val {
            Value::Nil => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
