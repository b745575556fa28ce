//! Interned string identifier.

use std::fmt;

/// Interned string identifier.
///
/// A plain `u32` index into the owning [`StringInterner`](crate::StringInterner).
/// Equality and hashing are O(1); two `Name`s from the same interner are
/// equal iff their strings are equal.
///
/// # Pre-interned Names
/// The dispatch protocol's well-known member names are pre-interned at
/// fixed indices so runtime code can refer to them without an interner
/// lookup.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string (also the unnamed default constructor).
    pub const EMPTY: Name = Name(0);
    /// Pre-interned `call` (function-application member).
    pub const CALL: Name = Name(1);
    /// Pre-interned `noSuchMethod` (dispatch-fallback handler).
    pub const NO_SUCH_METHOD: Name = Name(2);
    /// Pre-interned `[]` (index-read operator member).
    pub const INDEX_GET: Name = Name(3);
    /// Pre-interned `[]=` (index-write operator member).
    pub const INDEX_SET: Name = Name(4);
    /// Pre-interned `toString`.
    pub const TO_STRING: Name = Name(5);
    /// Pre-interned `runtimeType` (reified-type accessor).
    pub const RUNTIME_TYPE: Name = Name(6);

    /// Number of pre-interned names.
    pub(crate) const PRE_INTERNED: usize = 7;

    /// Get the raw u32 index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from a raw u32 index.
    ///
    /// The index must have been produced by the interner this `Name` is
    /// used with; `lookup` panics on indices the interner never issued.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}
