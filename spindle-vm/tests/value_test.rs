// spindle-vm - Value layer tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::cmp::Ordering;
use std::rc::Rc;

use spindle_vm::hashmap::MapKey;
use spindle_vm::{Array, Str, UserData, Value, ValueMap};

#[test]
fn test_type_names() {
    assert_eq!(Value::Nil.type_name(), "nil");
    assert_eq!(Value::Bool(true).type_name(), "bool");
    assert_eq!(Value::Int(1).type_name(), "number");
    assert_eq!(Value::Float(1.5).type_name(), "number");
    assert_eq!(Value::string("x").type_name(), "string");
    assert_eq!(Value::array().type_name(), "array");
    assert_eq!(Value::hashmap().type_name(), "hashmap");
}

#[test]
fn test_is_object() {
    assert!(!Value::Nil.is_object());
    assert!(!Value::Int(1).is_object());
    assert!(Value::string("x").is_object());
    assert!(Value::array().is_object());
    assert!(Value::hashmap().is_object());
}

#[test]
fn test_clone_retains_and_drop_releases() {
    // retain(v); release(v) leaves the reference count unchanged.
    let v = Value::array();
    let rc = match &v {
        Value::Array(rc) => Rc::clone(rc),
        _ => unreachable!(),
    };
    assert_eq!(Rc::strong_count(&rc), 2);

    let copy = v.clone(); // retain
    assert_eq!(Rc::strong_count(&rc), 3);
    drop(copy); // release
    assert_eq!(Rc::strong_count(&rc), 2);

    drop(v);
    assert_eq!(Rc::strong_count(&rc), 1);
}

#[test]
fn test_numeric_equality_is_cross_type() {
    assert_eq!(Value::Int(1), Value::Float(1.0));
    assert_eq!(Value::Float(2.0), Value::Int(2));
    assert_ne!(Value::Int(1), Value::Float(1.5));
}

#[test]
fn test_string_equality_is_by_content() {
    assert_eq!(Value::string("abc"), Value::string("abc"));
    assert_ne!(Value::string("abc"), Value::string("abd"));
}

#[test]
fn test_container_equality_is_by_identity() {
    let a = Value::array();
    let b = a.clone();
    assert_eq!(a, b);
    assert_ne!(Value::array(), Value::array());
    assert_ne!(Value::hashmap(), Value::hashmap());
}

#[test]
fn test_compare() {
    assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
    assert_eq!(
        Value::Int(2).compare(&Value::Float(1.5)),
        Some(Ordering::Greater)
    );
    assert_eq!(
        Value::string("a").compare(&Value::string("b")),
        Some(Ordering::Less)
    );
    // Mixed and unordered types are not comparable.
    assert_eq!(Value::Int(1).compare(&Value::string("a")), None);
    assert_eq!(Value::array().compare(&Value::array()), None);
    assert_eq!(Value::Nil.compare(&Value::Nil), None);
}

#[test]
fn test_hashability() {
    assert!(Value::Nil.try_hash().is_some());
    assert!(Value::Bool(true).try_hash().is_some());
    assert!(Value::Int(3).try_hash().is_some());
    assert!(Value::string("s").try_hash().is_some());
    assert!(Value::array().try_hash().is_none());
    assert!(Value::hashmap().try_hash().is_none());
}

#[test]
fn test_equal_numbers_hash_alike() {
    assert_eq!(Value::Int(5).try_hash(), Value::Float(5.0).try_hash());
}

#[test]
fn test_string_hash_is_cached_and_content_based() {
    let s1 = Str::new("hello world");
    let s2 = Str::new("hello world");
    assert_eq!(s1.hash(), s2.hash());
    // Second call hits the cache and stays stable.
    assert_eq!(s1.hash(), s1.hash());
}

#[test]
fn test_display_and_repr() {
    assert_eq!(Value::Nil.to_string(), "nil");
    assert_eq!(Value::Int(42).to_string(), "42");
    assert_eq!(Value::Float(2.0).to_string(), "2.0");
    assert_eq!(Value::Float(2.5).to_string(), "2.5");
    assert_eq!(Value::string("hi").to_string(), "hi");
    assert_eq!(Value::string("hi").repr(), "\"hi\"");
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_array_operations() {
    let arr = Array::new();
    assert_eq!(arr.len(), 0);
    assert_eq!(arr.get(0), Value::Nil);

    arr.push(Value::Int(1));
    arr.push(Value::Int(2));
    assert_eq!(arr.len(), 2);
    assert_eq!(arr.get(1), Value::Int(2));

    arr.set(4, Value::Int(5));
    assert_eq!(arr.len(), 5);
    assert_eq!(arr.get(3), Value::Nil);
    assert_eq!(arr.get(4), Value::Int(5));

    assert_eq!(arr.pop(), Some(Value::Int(5)));
    assert_eq!(arr.len(), 4);
}

#[test]
fn test_array_retains_contained_values() {
    let item = Value::string("kept");
    let rc = match &item {
        Value::String(rc) => Rc::clone(rc),
        _ => unreachable!(),
    };

    let arr = Array::new();
    arr.push(item.clone());
    assert_eq!(Rc::strong_count(&rc), 3);

    drop(item);
    assert_eq!(Rc::strong_count(&rc), 2);

    arr.pop();
    assert_eq!(Rc::strong_count(&rc), 1);
}

// ============================================================================
// Hashmaps
// ============================================================================

#[test]
fn test_map_basic_operations() {
    let map = ValueMap::new();
    let key = MapKey::new(Value::string("k")).unwrap();

    assert_eq!(map.get(&key), Value::Nil);
    map.set(key.clone(), Value::Int(1));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&key), Value::Int(1));

    map.set(key.clone(), Value::Int(2));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&key), Value::Int(2));

    map.remove(&key);
    assert_eq!(map.len(), 0);
    assert_eq!(map.get(&key), Value::Nil);
}

#[test]
fn test_map_nil_store_removes() {
    let map = ValueMap::new();
    let key = MapKey::new(Value::Int(1)).unwrap();
    map.set(key.clone(), Value::Int(10));
    assert_eq!(map.len(), 1);
    map.set(key.clone(), Value::Nil);
    assert_eq!(map.len(), 0);
    assert!(!map.contains(&key));
}

#[test]
fn test_map_keys_do_not_collide_across_types() {
    let map = ValueMap::new();
    map.set(MapKey::new(Value::Int(1)).unwrap(), Value::string("int"));
    map.set(MapKey::new(Value::string("1")).unwrap(), Value::string("str"));
    map.set(MapKey::new(Value::Bool(true)).unwrap(), Value::string("bool"));
    assert_eq!(map.len(), 3);
    assert_eq!(
        map.get(&MapKey::new(Value::Int(1)).unwrap()),
        Value::string("int")
    );
}

#[test]
fn test_map_int_and_float_keys_unify() {
    // 1 and 1.0 are equal values, so they are the same key.
    let map = ValueMap::new();
    map.set(MapKey::new(Value::Int(1)).unwrap(), Value::string("a"));
    map.set(MapKey::new(Value::Float(1.0)).unwrap(), Value::string("b"));
    assert_eq!(map.len(), 1);
    assert_eq!(
        map.get(&MapKey::new(Value::Int(1)).unwrap()),
        Value::string("b")
    );
}

#[test]
fn test_unhashable_keys_are_rejected() {
    assert!(MapKey::new(Value::array()).is_none());
    assert!(MapKey::new(Value::hashmap()).is_none());
}

// ============================================================================
// Userinfo
// ============================================================================

#[derive(Debug)]
struct Handle {
    id: u32,
}

impl UserData for Handle {
    fn type_name(&self) -> &'static str {
        "Handle"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn eq(&self, other: &dyn UserData) -> bool {
        other
            .as_any()
            .downcast_ref::<Handle>()
            .is_some_and(|h| h.id == self.id)
    }

    fn compare(&self, other: &dyn UserData) -> Option<Ordering> {
        other
            .as_any()
            .downcast_ref::<Handle>()
            .map(|h| self.id.cmp(&h.id))
    }

    // Content equality demands content hashing.
    fn user_hash(&self) -> Option<u64> {
        Some(self.id as u64)
    }
}

#[test]
fn test_strong_userinfo_equality_and_ordering() {
    let a = Value::strong(Handle { id: 1 });
    let b = Value::strong(Handle { id: 1 });
    let c = Value::strong(Handle { id: 2 });

    assert_eq!(a.type_name(), "userinfo");
    assert!(a.is_object());
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.compare(&c), Some(Ordering::Less));
    assert!(a.try_hash().is_some());
}

#[test]
fn test_weak_userinfo_does_not_retain() {
    let strong = Value::strong(Handle { id: 9 });
    let weak = match &strong {
        Value::Strong(rc) => Value::weak(rc),
        _ => unreachable!(),
    };

    assert!(!weak.is_object());
    assert_eq!(weak.type_name(), "userinfo");

    // Dropping the strong value invalidates the weak one.
    drop(strong);
    match &weak {
        Value::Weak(w) => assert!(w.upgrade().is_none()),
        _ => unreachable!(),
    }
}

#[test]
fn test_weak_userinfo_as_map_key() {
    let strong = Value::strong(Handle { id: 3 });
    let weak = match &strong {
        Value::Strong(rc) => Value::weak(rc),
        _ => unreachable!(),
    };

    let map = ValueMap::new();
    map.set(MapKey::new(weak.clone()).unwrap(), Value::Int(1));
    assert_eq!(map.get(&MapKey::new(weak).unwrap()), Value::Int(1));
}

#[test]
fn test_heavy_insert_delete_keeps_lookups_exact() {
    // A deletion-heavy workload must leave lookups exact (and, by
    // construction of the backing table, amortized O(1); no tombstone
    // pile-up can linger).
    let map = ValueMap::new();
    for i in 0..1000i64 {
        map.set(MapKey::new(Value::Int(i)).unwrap(), Value::Int(i * 2));
    }
    for i in 0..1000i64 {
        if i % 2 == 0 {
            map.remove(&MapKey::new(Value::Int(i)).unwrap());
        }
    }
    for round in 0..5 {
        for i in 0..1000i64 {
            let key = MapKey::new(Value::Int(i)).unwrap();
            if i % 2 == 0 {
                map.set(key.clone(), Value::Int(round));
                map.remove(&key);
            }
        }
    }
    assert_eq!(map.len(), 500);
    for i in 0..1000i64 {
        let key = MapKey::new(Value::Int(i)).unwrap();
        if i % 2 == 0 {
            assert_eq!(map.get(&key), Value::Nil);
        } else {
            assert_eq!(map.get(&key), Value::Int(i * 2));
        }
    }
}
