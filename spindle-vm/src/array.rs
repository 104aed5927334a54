// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Dense, integer-indexed arrays.
//!
//! Arrays are ordered sequences of values behind interior mutability.
//! Out-of-range reads yield `nil`; writes past the end grow the array,
//! filling the gap with `nil`.

use std::cell::RefCell;
use std::fmt;

use im::Vector;

use crate::value::Value;

/// A mutable, reference-counted array of values.
#[derive(Debug)]
pub struct Array {
    items: RefCell<Vector<Value>>,
}

impl Array {
    /// Create a new empty array.
    pub fn new() -> Self {
        Array {
            items: RefCell::new(Vector::new()),
        }
    }

    /// Create an array from existing values.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Array {
            items: RefCell::new(values.into_iter().collect()),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Read element `index`; out-of-range reads yield `nil`.
    pub fn get(&self, index: usize) -> Value {
        self.items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Write element `index`, growing the array with `nil` as needed.
    pub fn set(&self, index: usize, value: Value) {
        let mut items = self.items.borrow_mut();
        while items.len() <= index {
            items.push_back(Value::Nil);
        }
        items.set(index, value);
    }

    /// Append a value.
    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push_back(value);
    }

    /// Remove and return the last value, or `None` if empty.
    pub fn pop(&self) -> Option<Value> {
        self.items.borrow_mut().pop_back()
    }

    /// Snapshot of the contents (cheap: `im::Vector` is persistent).
    pub fn values(&self) -> Vector<Value> {
        self.items.borrow().clone()
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.items.borrow().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item.repr())?;
        }
        write!(f, "]")
    }
}
