//! Tagged class instances.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use vela_intern::Name;

use crate::class::ClassId;
use crate::errors::{self, RtError};
use crate::value::Value;

/// A host object tagged with a [`ClassId`].
///
/// Field storage is a name-keyed map behind a `RwLock`; compiled getters
/// and setters read and write through it. Canonical constant instances are
/// frozen at construction and reject field writes.
pub struct InstanceValue {
    class: ClassId,
    fields: RwLock<FxHashMap<Name, Value>>,
    frozen: bool,
}

impl InstanceValue {
    /// Fresh mutable instance with no fields set (constructor bodies
    /// populate them).
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            fields: RwLock::new(FxHashMap::default()),
            frozen: false,
        }
    }

    /// Instance with pre-populated fields; `frozen` is set by the constant
    /// canonicalizer.
    pub(crate) fn with_fields(
        class: ClassId,
        fields: FxHashMap<Name, Value>,
        frozen: bool,
    ) -> Self {
        Self {
            class,
            fields: RwLock::new(fields),
            frozen,
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get_field(&self, name: Name) -> Option<Value> {
        self.fields.read().get(&name).cloned()
    }

    pub fn has_field(&self, name: Name) -> bool {
        self.fields.read().contains_key(&name)
    }

    /// Write a field; frozen (canonical constant) instances reject.
    pub fn set_field(&self, name: Name, value: Value) -> Result<(), RtError> {
        if self.frozen {
            return Err(errors::frozen_value("instance"));
        }
        self.fields.write().insert(name, value);
        Ok(())
    }

    /// Fields sorted by name (deterministic order for canonicalization).
    pub fn fields_snapshot(&self) -> Vec<(Name, Value)> {
        let mut fields: Vec<(Name, Value)> = self
            .fields
            .read()
            .iter()
            .map(|(&k, v)| (k, v.clone()))
            .collect();
        fields.sort_by_key(|&(name, _)| name);
        fields
    }
}

impl std::fmt::Debug for InstanceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceValue")
            .field("class", &self.class)
            .field("frozen", &self.frozen)
            .finish_non_exhaustive()
    }
}
