//! Host-native collection values.
//!
//! Lists and maps are untagged host values: the dispatch layer serves their
//! index operations through native fast paths rather than class members.
//! Constant collections are frozen at construction and reject writes.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{self, RtError};
use crate::value::Value;

/// Mutable (or frozen) list of values.
pub struct ListValue {
    items: RwLock<Vec<Value>>,
    frozen: bool,
}

impl ListValue {
    pub(crate) fn new(items: Vec<Value>) -> Self {
        Self {
            items: RwLock::new(items),
            frozen: false,
        }
    }

    /// Frozen variant used by the constant canonicalizer.
    pub(crate) fn frozen(items: Vec<Value>) -> Self {
        Self {
            items: RwLock::new(items),
            frozen: true,
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Bounds-checked element read.
    pub fn get(&self, index: i64) -> Result<Value, RtError> {
        let items = self.items.read();
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .ok_or_else(|| errors::index_out_of_bounds(index, items.len()))
    }

    /// Bounds-checked element write; frozen lists reject.
    pub fn set(&self, index: i64, value: Value) -> Result<(), RtError> {
        if self.frozen {
            return Err(errors::frozen_value("List"));
        }
        let mut items = self.items.write();
        let len = items.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(|| errors::index_out_of_bounds(index, len))?;
        *slot = value;
        Ok(())
    }

    /// Copy of the current elements.
    pub fn snapshot(&self) -> Vec<Value> {
        self.items.read().clone()
    }
}

impl PartialEq for ListValue {
    fn eq(&self, other: &Self) -> bool {
        *self.items.read() == *other.items.read()
    }
}

impl std::fmt::Debug for ListValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.read().iter()).finish()
    }
}

/// Mutable (or frozen) string-keyed map.
pub struct MapValue {
    entries: RwLock<FxHashMap<String, Value>>,
    frozen: bool,
}

impl MapValue {
    pub(crate) fn new(entries: FxHashMap<String, Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
            frozen: false,
        }
    }

    pub(crate) fn frozen(entries: FxHashMap<String, Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
            frozen: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Keyed read; a missing key is an error, not a silent null.
    pub fn get(&self, key: &str) -> Result<Value, RtError> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| errors::key_not_found(key))
    }

    /// Keyed write (insert or replace); frozen maps reject.
    pub fn set(&self, key: String, value: Value) -> Result<(), RtError> {
        if self.frozen {
            return Err(errors::frozen_value("Map"));
        }
        self.entries.write().insert(key, value);
        Ok(())
    }

    /// Entries sorted by key (deterministic order for canonicalization).
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let mut entries: Vec<(String, Value)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        *self.entries.read() == *other.entries.read()
    }
}

impl std::fmt::Debug for MapValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries.read().iter()).finish()
    }
}
