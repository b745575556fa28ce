//! Compile-time constant canonicalization.
//!
//! Structurally equal constants share one allocation, so `identical`
//! holds across compilation units. Canonical values are frozen; their
//! fields and elements must themselves be scalars or previously
//! canonicalized values, which keeps the structural key finite and makes
//! the pool closed under reachability.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use vela_intern::Name;

use crate::class::{ClassFlags, ClassId};
use crate::errors::{self, RtError, RtResult};
use crate::runtime::Runtime;
use crate::value::{InstanceValue, Value};

/// Structural identity of one scalar or canonical field.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum FieldKey {
    Null,
    Bool(bool),
    Int(i64),
    /// Float identity is bit-for-bit (`0.0` and `-0.0` are distinct
    /// constants; NaN payloads matter).
    Float(u64),
    Str(String),
    Type(vela_types::TypeId),
    /// A previously canonicalized heap value, keyed by its allocation.
    Canon(usize),
}

/// Structural identity of a whole constant.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum CanonKey {
    Instance {
        class: ClassId,
        fields: Box<[(Name, FieldKey)]>,
    },
    List(Box<[FieldKey]>),
    Map(Box<[(String, FieldKey)]>),
}

struct PoolState {
    table: FxHashMap<CanonKey, Value>,
    /// Allocation addresses of every canonical value, for membership
    /// checks and for keying nested constants.
    canonical: FxHashSet<usize>,
}

/// Interning pool for compile-time constants.
///
/// # Guarantees
/// - Structurally equal inputs return the identical allocation.
/// - At most one canonical value exists per structure, even under
///   concurrent first canonicalization (read fast path, write-lock
///   double check).
/// - Canonical values are frozen and never evicted.
pub struct ConstantPool {
    state: RwLock<PoolState>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PoolState {
                table: FxHashMap::default(),
                canonical: FxHashSet::default(),
            }),
        }
    }

    /// Is this value a scalar or a member of the pool?
    ///
    /// Scalars are canonical by construction (their identity is
    /// structural); heap values must have come out of this pool.
    pub fn is_canonical(&self, value: &Value) -> bool {
        match value.heap_ptr() {
            None => true,
            Some(ptr) => self.state.read().canonical.contains(&ptr),
        }
    }

    fn field_key(&self, value: &Value) -> Result<FieldKey, RtError> {
        Ok(match value {
            Value::Null => FieldKey::Null,
            Value::Bool(b) => FieldKey::Bool(*b),
            Value::Int(i) => FieldKey::Int(*i),
            Value::Float(x) => FieldKey::Float(x.to_bits()),
            Value::Str(s) => FieldKey::Str(s.to_string()),
            Value::Type(t) => FieldKey::Type(*t),
            _ => {
                let ptr = value
                    .heap_ptr()
                    .ok_or_else(|| errors::structural("value cannot appear in a constant"))?;
                if !self.state.read().canonical.contains(&ptr) {
                    return Err(errors::structural(
                        "constant fields must be constants themselves",
                    ));
                }
                FieldKey::Canon(ptr)
            }
        })
    }

    fn intern(&self, key: CanonKey, build: impl FnOnce() -> Value) -> Value {
        if let Some(existing) = self.state.read().table.get(&key) {
            return existing.clone();
        }

        let mut state = self.state.write();
        if let Some(existing) = state.table.get(&key) {
            return existing.clone();
        }

        let value = build();
        tracing::debug!(?key, "canonicalizing constant");
        if let Some(ptr) = value.heap_ptr() {
            state.canonical.insert(ptr);
        }
        state.table.insert(key, value.clone());
        value
    }

    /// Canonicalize a `const C(...)` instance from its initialized
    /// fields. The class must be marked const-constructible.
    pub fn canonicalize_instance(
        &self,
        rt: &Runtime,
        class: ClassId,
        fields: &[(Name, Value)],
    ) -> RtResult {
        let record = rt.classes().get(class);
        if !record.flags.contains(ClassFlags::CONST_CONSTRUCTIBLE) {
            let name = rt.interner().lookup(record.name);
            return Err(errors::structural(format!(
                "class `{name}` is not const-constructible"
            )));
        }

        let mut keyed: Vec<(Name, FieldKey)> = fields
            .iter()
            .map(|(name, value)| Ok((*name, self.field_key(value)?)))
            .collect::<Result<_, RtError>>()?;
        keyed.sort_by_key(|&(name, _)| name);
        let key = CanonKey::Instance {
            class,
            fields: keyed.into_boxed_slice(),
        };

        Ok(self.intern(key, || {
            let map = fields.iter().cloned().collect();
            Value::instance(InstanceValue::with_fields(class, map, true))
        }))
    }

    /// Canonicalize a `const [...]` list literal.
    pub fn canonicalize_list(&self, items: &[Value]) -> RtResult {
        let keys: Box<[FieldKey]> = items
            .iter()
            .map(|v| self.field_key(v))
            .collect::<Result<_, RtError>>()?;
        Ok(self.intern(CanonKey::List(keys), || Value::frozen_list(items.to_vec())))
    }

    /// Canonicalize a `const {...}` map literal.
    pub fn canonicalize_map(&self, entries: &[(String, Value)]) -> RtResult {
        let mut keyed: Vec<(String, FieldKey)> = entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), self.field_key(v)?)))
            .collect::<Result<_, RtError>>()?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        let key = CanonKey::Map(keyed.into_boxed_slice());

        Ok(self.intern(key, || {
            Value::frozen_map(entries.iter().cloned().collect())
        }))
    }

    /// Number of pooled constants.
    pub fn len(&self) -> usize {
        self.state.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantPool")
            .field("len", &self.len())
            .finish()
    }
}
