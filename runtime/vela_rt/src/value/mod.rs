//! Runtime values for compiled Vela programs.
//!
//! Scalars are stored inline; everything heap-allocated goes through the
//! [`Heap`] wrapper via `Value`'s factory methods, so allocation has a
//! single seam. Instances carry a class tag; host-native values (strings,
//! lists, maps, functions) stay untagged and are bridged by the dispatch
//! layer's native table.

mod collections;
mod function;
mod heap;
mod instance;

use rustc_hash::FxHashMap;
use vela_types::TypeId;

pub use collections::{ListValue, MapValue};
pub use function::{CallArgs, FunctionValue, MethodBody};
pub use heap::Heap;
pub use instance::InstanceValue;

use crate::generators::{FutureValue, IterableValue, StreamValue};

/// Runtime value.
#[derive(Clone)]
pub enum Value {
    /// The null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value (64-bit signed).
    Int(i64),
    /// Floating-point value (64-bit IEEE 754).
    Float(f64),
    /// String value.
    Str(Heap<String>),
    /// Host-native list.
    List(Heap<ListValue>),
    /// Host-native string-keyed map.
    Map(Heap<MapValue>),
    /// Tagged class instance.
    Instance(Heap<InstanceValue>),
    /// First-class function or bound method tear-off.
    Function(Heap<FunctionValue>),
    /// Reified type object (the `runtimeType` accessor's result).
    Type(TypeId),
    /// Restartable lazy sequence (a `sync*` function's result).
    Iterable(Heap<IterableValue>),
    /// Single-shot asynchronous result (an `async` function's result).
    Future(FutureValue),
    /// Cancellable push stream (an `async*` function's result).
    Stream(Heap<StreamValue>),
}

impl Value {
    // Factory methods: the only way to build heap variants.

    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(Heap::new(s.into()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Heap::new(ListValue::new(items)))
    }

    pub(crate) fn frozen_list(items: Vec<Value>) -> Value {
        Value::List(Heap::new(ListValue::frozen(items)))
    }

    pub fn map(entries: FxHashMap<String, Value>) -> Value {
        Value::Map(Heap::new(MapValue::new(entries)))
    }

    pub(crate) fn frozen_map(entries: FxHashMap<String, Value>) -> Value {
        Value::Map(Heap::new(MapValue::frozen(entries)))
    }

    pub fn instance(instance: InstanceValue) -> Value {
        Value::Instance(Heap::new(instance))
    }

    pub fn function(function: FunctionValue) -> Value {
        Value::Function(Heap::new(function))
    }

    pub(crate) fn iterable(iterable: IterableValue) -> Value {
        Value::Iterable(Heap::new(iterable))
    }

    pub(crate) fn stream(stream: StreamValue) -> Value {
        Value::Stream(Heap::new(stream))
    }

    /// Reference identity: the observable contract of constant
    /// canonicalization. Scalars compare structurally; heap values by
    /// allocation.
    pub fn identical(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
            (Value::Type(x), Value::Type(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => Heap::ptr_eq(x, y),
            (Value::List(x), Value::List(y)) => Heap::ptr_eq(x, y),
            (Value::Map(x), Value::Map(y)) => Heap::ptr_eq(x, y),
            (Value::Instance(x), Value::Instance(y)) => Heap::ptr_eq(x, y),
            (Value::Function(x), Value::Function(y)) => Heap::ptr_eq(x, y),
            (Value::Iterable(x), Value::Iterable(y)) => Heap::ptr_eq(x, y),
            (Value::Future(x), Value::Future(y)) => FutureValue::ptr_eq(x, y),
            (Value::Stream(x), Value::Stream(y)) => Heap::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Allocation address for heap variants; identity key for the
    /// constant canonicalizer.
    pub(crate) fn heap_ptr(&self) -> Option<usize> {
        match self {
            Value::Str(h) => Some(h.ptr_id()),
            Value::List(h) => Some(h.ptr_id()),
            Value::Map(h) => Some(h.ptr_id()),
            Value::Instance(h) => Some(h.ptr_id()),
            Value::Function(h) => Some(h.ptr_id()),
            Value::Iterable(h) => Some(h.ptr_id()),
            Value::Stream(h) => Some(h.ptr_id()),
            _ => None,
        }
    }

    /// Coarse host-level kind name for diagnostics (class-aware names come
    /// from `Runtime::type_name`).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "double",
            Value::Str(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Instance(_) => "instance",
            Value::Function(_) => "Function",
            Value::Type(_) => "Type",
            Value::Iterable(_) => "Iterable",
            Value::Future(_) => "Future",
            Value::Stream(_) => "Stream",
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for scalars, strings, and collections;
    /// identity for instances, functions, and generator values.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::List(x), Value::List(y)) => x == y,
            (Value::Map(x), Value::Map(y)) => x == y,
            _ => Value::identical(self, other),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(l) => write!(f, "{l:?}"),
            Value::Map(m) => write!(f, "{m:?}"),
            Value::Instance(i) => write!(f, "{i:?}"),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Type(t) => write!(f, "{t:?}"),
            Value::Iterable(_) => write!(f, "<iterable>"),
            Value::Future(_) => write!(f, "<future>"),
            Value::Stream(_) => write!(f, "<stream>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_is_reference_identity_for_heap_values() {
        let a = Value::string("x");
        let b = Value::string("x");
        assert_eq!(a, b);
        assert!(!Value::identical(&a, &b));
        assert!(Value::identical(&a, &a.clone()));
    }

    #[test]
    fn scalar_identity_is_structural() {
        assert!(Value::identical(&Value::Int(3), &Value::Int(3)));
        assert!(!Value::identical(&Value::Int(3), &Value::Int(4)));
        assert!(Value::identical(&Value::Null, &Value::Null));
        assert!(!Value::identical(&Value::Null, &Value::Bool(false)));
    }

    #[test]
    fn list_equality_is_structural() {
        let a = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(a, b);
        assert!(!Value::identical(&a, &b));
    }
}
