//! String interner backing [`Name`] handles.
//!
//! Interned strings are leaked into `'static` storage; names live for the
//! process lifetime and are never removed, so `lookup` can hand out
//! `&'static str` without holding a lock.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::Name;

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// Interner exceeded capacity (over 4 billion strings).
    Overflow { count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::Overflow { count } => {
                write!(f, "string interner exceeded u32::MAX entries: {count}")
            }
        }
    }
}

impl std::error::Error for InternError {}

struct InternState {
    /// Map from string content to index for deduplication.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name::raw`.
    strings: Vec<&'static str>,
}

/// String interner with O(1) lookup and equality via [`Name`].
///
/// # Thread Safety
/// A single `RwLock` guards the store; reads take the lock only on the
/// dedup fast path (returned strings are `'static`). Member-name volume is
/// small enough that sharding would buy nothing here.
///
/// # Pre-interned Names
/// The well-known dispatch member names are interned at construction with
/// indices matching the constants on [`Name`].
pub struct StringInterner {
    state: RwLock<InternState>,
}

impl StringInterner {
    /// Create a new interner with the well-known names pre-interned.
    pub fn new() -> Self {
        let interner = Self {
            state: RwLock::new(InternState {
                map: FxHashMap::default(),
                strings: Vec::with_capacity(64),
            }),
        };

        // Order must match the Name constants.
        let well_known = [
            "",
            "call",
            "noSuchMethod",
            "[]",
            "[]=",
            "toString",
            "runtimeType",
        ];
        debug_assert_eq!(well_known.len(), Name::PRE_INTERNED);
        for s in well_known {
            let _ = interner.intern(s);
        }

        interner
    }

    /// Try to intern a string, returning its [`Name`] or an error on overflow.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        // Fast path: already interned.
        {
            let guard = self.state.read();
            if let Some(&idx) = guard.map.get(s) {
                return Ok(Name::from_raw(idx));
            }
        }

        let mut guard = self.state.write();

        // Double-check after acquiring the write lock.
        if let Some(&idx) = guard.map.get(s) {
            return Ok(Name::from_raw(idx));
        }

        let idx = u32::try_from(guard.strings.len()).map_err(|_| InternError::Overflow {
            count: guard.strings.len(),
        })?;

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);

        Ok(Name::from_raw(idx))
    }

    /// Intern a string, returning its [`Name`].
    ///
    /// # Panics
    /// Panics on interner overflow (over 4 billion strings). Use
    /// [`StringInterner::try_intern`] for fallible interning.
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up the string for a [`Name`].
    ///
    /// # Panics
    /// Panics if the `Name` was not created by this interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.state.read();
        guard.strings[name.raw() as usize]
    }

    /// Number of interned strings (including the pre-interned names).
    pub fn len(&self) -> usize {
        self.state.read().strings.len()
    }

    /// Check whether only the pre-interned names are present.
    pub fn is_empty(&self) -> bool {
        self.len() <= Name::PRE_INTERNED
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared string interner handle.
///
/// This newtype enforces that all cross-component interner sharing goes
/// through one type; the runtime, type registry, and class registry each
/// hold a clone of the same handle.
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    /// Create a new shared interner.
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedInterner")
            .field("len", &self.0.len())
            .finish()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        let c = interner.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn lookup_round_trips() {
        let interner = StringInterner::new();
        let name = interner.intern("distance");
        assert_eq!(interner.lookup(name), "distance");
    }

    #[test]
    fn well_known_names_have_fixed_indices() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.intern("call"), Name::CALL);
        assert_eq!(interner.intern("noSuchMethod"), Name::NO_SUCH_METHOD);
        assert_eq!(interner.intern("[]"), Name::INDEX_GET);
        assert_eq!(interner.intern("[]="), Name::INDEX_SET);
        assert_eq!(interner.intern("toString"), Name::TO_STRING);
        assert_eq!(interner.intern("runtimeType"), Name::RUNTIME_TYPE);
        assert_eq!(interner.lookup(Name::NO_SUCH_METHOD), "noSuchMethod");
    }

    #[test]
    fn shared_interner_clones_share_storage() {
        let shared = SharedInterner::new();
        let clone = shared.clone();
        let a = shared.intern("shared");
        let b = clone.intern("shared");
        assert_eq!(a, b);
    }
}
