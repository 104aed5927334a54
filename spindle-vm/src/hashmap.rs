// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Hashmaps keyed by hashable Spindle values.
//!
//! Any hashable value (nil, bool, number, string, function, userinfo)
//! can be a key; arrays and hashmaps cannot. Lookup stays amortized O(1)
//! through arbitrary insert/delete sequences - deletion goes through the
//! backing table's own removal, so no tombstone pile-up can degrade
//! probing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::value::Value;

/// A map key: a hashable value with its hash precomputed.
#[derive(Debug, Clone)]
pub struct MapKey {
    value: Value,
    hash: u64,
}

impl MapKey {
    /// Wrap a value as a key. Returns `None` for unhashable values
    /// (arrays and hashmaps).
    pub fn new(value: Value) -> Option<MapKey> {
        let hash = value.try_hash()?;
        Some(MapKey { value, hash })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.value == other.value
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// A mutable, reference-counted hashmap of Spindle values.
#[derive(Debug)]
pub struct ValueMap {
    entries: RefCell<HashMap<MapKey, Value>>,
}

impl ValueMap {
    /// Create a new empty hashmap.
    pub fn new() -> Self {
        ValueMap {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Look up a key; missing keys yield `nil`.
    pub fn get(&self, key: &MapKey) -> Value {
        self.entries
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Insert a value. Inserting `nil` removes the entry.
    pub fn set(&self, key: MapKey, value: Value) {
        let mut entries = self.entries.borrow_mut();
        if matches!(value, Value::Nil) {
            entries.remove(&key);
        } else {
            entries.insert(key, value);
        }
    }

    /// Remove an entry, returning its previous value if present.
    pub fn remove(&self, key: &MapKey) -> Option<Value> {
        self.entries.borrow_mut().remove(key)
    }

    /// True if the key is present.
    pub fn contains(&self, key: &MapKey) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Snapshot of the keys.
    pub fn keys(&self) -> Vec<Value> {
        self.entries
            .borrow()
            .keys()
            .map(|k| k.value().clone())
            .collect()
    }
}

impl Default for ValueMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.borrow().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key.value().repr(), value.repr())?;
        }
        write!(f, "}}")
    }
}
