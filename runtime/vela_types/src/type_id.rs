//! Interned type identifier.

use std::fmt;

/// Interned type identifier.
///
/// # Layout
/// 32-bit index split into shard (4 bits) + local index (28 bits):
/// - Bits 31-28: Shard index (0-15)
/// - Bits 27-0: Local index within shard
///
/// # Canonicalization
/// `TypeId` equality implies structural equality of the underlying
/// descriptors and vice versa; the [`TypeRegistry`](crate::TypeRegistry)
/// guarantees one id per distinct structure.
///
/// # Pre-interned Types
/// The three special descriptors are pre-interned in shard 0 with fixed
/// local indices: `DYNAMIC`, `VOID`, `BOTTOM`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// The `dynamic` type: supertype of everything.
    pub const DYNAMIC: TypeId = TypeId(0);
    /// The `void` type.
    pub const VOID: TypeId = TypeId(1);
    /// The bottom type: subtype of everything.
    pub const BOTTOM: TypeId = TypeId(2);

    /// First local index for dynamically interned descriptors in shard 0.
    pub(crate) const FIRST_DYNAMIC: usize = 3;

    /// Maximum local index per shard (2^28 - 1).
    pub const MAX_LOCAL: u32 = 0x0FFF_FFFF;

    /// Number of shards in the type registry.
    pub const NUM_SHARDS: usize = 16;

    /// Create a `TypeId` from shard and local index.
    #[inline]
    pub const fn from_shard_local(shard: u32, local: u32) -> Self {
        debug_assert!(shard < 16);
        debug_assert!(local <= Self::MAX_LOCAL);
        TypeId((shard << 28) | local)
    }

    /// Extract the shard index (bits 31-28).
    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> 28) as usize
    }

    /// Extract the local index within the shard (bits 27-0).
    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TypeId::DYNAMIC => write!(f, "TypeId(dynamic)"),
            TypeId::VOID => write!(f, "TypeId(void)"),
            TypeId::BOTTOM => write!(f, "TypeId(Never)"),
            _ => write!(f, "TypeId(shard={}, local={})", self.shard(), self.local()),
        }
    }
}
