//! Sharded canonicalizing type registry.
//!
//! Interning a structurally equal descriptor twice returns the identical
//! [`TypeId`]; entries are never removed (types are process-lifetime).

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use vela_intern::{Name, SharedInterner};

use crate::{TypeData, TypeError, TypeId};

/// Per-shard storage for interned descriptors.
struct TypeShard {
    /// Map from descriptor to local index for deduplication.
    map: FxHashMap<TypeData, u32>,
    /// Storage for descriptors, indexed by local index.
    types: Vec<TypeData>,
}

impl TypeShard {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            types: Vec::with_capacity(256),
        }
    }

    /// Create shard 0 with the pre-interned special descriptors.
    fn with_specials() -> Self {
        let mut shard = Self::new();

        // Fixed indices matching the TypeId constants.
        let specials = [
            TypeData::Dynamic, // 0 = TypeId::DYNAMIC
            TypeData::Void,    // 1 = TypeId::VOID
            TypeData::Bottom,  // 2 = TypeId::BOTTOM
        ];
        debug_assert_eq!(specials.len(), TypeId::FIRST_DYNAMIC);

        for (idx, data) in specials.into_iter().enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "special descriptor count is fixed and small"
            )]
            let idx_u32 = idx as u32;
            shard.map.insert(data.clone(), idx_u32);
            shard.types.push(data);
        }

        shard
    }
}

/// Sharded canonicalizing registry for type descriptors.
///
/// # Guarantees
/// - Idempotent: interning an equal structure twice returns the identical id.
/// - At-most-one entry per distinct structure, even under concurrent first
///   access (read fast path, then write-lock double check).
/// - Entries live for the process lifetime; no eviction.
///
/// # Thread Safety
/// Uses `RwLock` per shard for concurrent read/write access. Share across
/// components via [`SharedTypeRegistry`].
pub struct TypeRegistry {
    shards: [RwLock<TypeShard>; TypeId::NUM_SHARDS],
}

impl TypeRegistry {
    /// Create a new registry with the special descriptors pre-interned.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            if i == 0 {
                RwLock::new(TypeShard::with_specials())
            } else {
                RwLock::new(TypeShard::new())
            }
        });
        Self { shards }
    }

    /// Compute shard index for a descriptor based on its hash.
    #[inline]
    fn shard_for(data: &TypeData) -> usize {
        let mut hasher = rustc_hash::FxHasher::default();
        data.hash(&mut hasher);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "truncation is fine for hash-based shard selection"
        )]
        let hash_usize = hasher.finish() as usize;
        hash_usize % TypeId::NUM_SHARDS
    }

    /// Reject descriptors the registry cannot canonicalize.
    fn validate(data: &TypeData) -> Result<(), TypeError> {
        if let TypeData::Function { named, .. } = data {
            for pair in named.windows(2) {
                if pair[0].0 >= pair[1].0 {
                    let reason = if pair[0].0 == pair[1].0 {
                        "duplicate named parameter in function type"
                    } else {
                        "named parameters must be sorted by name"
                    };
                    return Err(TypeError::Malformed {
                        reason: reason.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Try to intern a descriptor, returning its [`TypeId`].
    ///
    /// If the descriptor is already interned, returns the existing id.
    /// Malformed descriptors are a code-generator bug and reported as
    /// [`TypeError::Malformed`].
    #[expect(
        clippy::cast_possible_truncation,
        reason = "shard_idx is bounded by NUM_SHARDS (16)"
    )]
    pub fn try_intern(&self, data: TypeData) -> Result<TypeId, TypeError> {
        // Fast path for the pre-interned specials.
        match &data {
            TypeData::Dynamic => return Ok(TypeId::DYNAMIC),
            TypeData::Void => return Ok(TypeId::VOID),
            TypeData::Bottom => return Ok(TypeId::BOTTOM),
            _ => {}
        }

        Self::validate(&data)?;

        let shard_idx = Self::shard_for(&data);
        let shard = &self.shards[shard_idx];

        // Fast path: already interned.
        {
            let guard = shard.read();
            if let Some(&local) = guard.map.get(&data) {
                return Ok(TypeId::from_shard_local(shard_idx as u32, local));
            }
        }

        let mut guard = shard.write();

        // Double-check after acquiring the write lock.
        if let Some(&local) = guard.map.get(&data) {
            return Ok(TypeId::from_shard_local(shard_idx as u32, local));
        }

        let local = u32::try_from(guard.types.len()).map_err(|_| TypeError::Malformed {
            reason: format!("type registry shard {shard_idx} exceeded capacity"),
        })?;

        tracing::debug!(shard = shard_idx, local, ?data, "interning new type");
        guard.types.push(data.clone());
        guard.map.insert(data, local);

        Ok(TypeId::from_shard_local(shard_idx as u32, local))
    }

    /// Intern a descriptor, returning its [`TypeId`].
    ///
    /// # Panics
    /// Panics on malformed descriptors (a code-generation bug, fatal per
    /// the runtime's error policy). Use [`TypeRegistry::try_intern`] to
    /// observe the error as a value.
    pub fn intern(&self, data: TypeData) -> TypeId {
        self.try_intern(data).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up the descriptor for a [`TypeId`].
    ///
    /// # Panics
    /// Panics if the id was not created by this registry.
    pub fn lookup(&self, id: TypeId) -> TypeData {
        let shard = &self.shards[id.shard()];
        let guard = shard.read();
        guard.types[id.local()].clone()
    }

    // Convenience builders.
    //
    // All builders go through `intern()`, which guarantees deduplication:
    // the same arguments always return the same `TypeId`.

    /// Intern a primitive type.
    pub fn primitive(&self, name: Name) -> TypeId {
        self.intern(TypeData::Primitive(name))
    }

    /// Intern an instantiated class/interface type.
    pub fn interface(&self, class: Name, args: impl Into<Box<[TypeId]>>) -> TypeId {
        self.intern(TypeData::Interface {
            class,
            args: args.into(),
        })
    }

    /// Intern a function type. The named-parameter table is sorted into
    /// canonical form here; duplicate names are fatal.
    pub fn function(
        &self,
        ret: TypeId,
        positional: impl Into<Box<[TypeId]>>,
        optional: impl Into<Box<[TypeId]>>,
        named: impl Into<Vec<(Name, TypeId)>>,
    ) -> TypeId {
        let mut named = named.into();
        named.sort_by_key(|&(name, _)| name);
        self.intern(TypeData::Function {
            ret,
            positional: positional.into(),
            optional: optional.into(),
            named: named.into_boxed_slice(),
        })
    }

    /// Render a type for diagnostics (`Box<int>`, `(int) -> bool`, ...).
    pub fn render(&self, id: TypeId, interner: &SharedInterner) -> String {
        match self.lookup(id) {
            TypeData::Dynamic => "dynamic".to_owned(),
            TypeData::Void => "void".to_owned(),
            TypeData::Bottom => "Never".to_owned(),
            TypeData::Primitive(name) => interner.lookup(name).to_owned(),
            TypeData::Interface { class, args } => {
                let mut out = interner.lookup(class).to_owned();
                if !args.is_empty() {
                    out.push('<');
                    for (i, &arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&self.render(arg, interner));
                    }
                    out.push('>');
                }
                out
            }
            TypeData::Function {
                ret,
                positional,
                optional,
                named,
            } => {
                let mut parts: Vec<String> = positional
                    .iter()
                    .map(|&p| self.render(p, interner))
                    .collect();
                if !optional.is_empty() {
                    let inner: Vec<String> = optional
                        .iter()
                        .map(|&p| self.render(p, interner))
                        .collect();
                    parts.push(format!("[{}]", inner.join(", ")));
                }
                if !named.is_empty() {
                    let inner: Vec<String> = named
                        .iter()
                        .map(|&(name, ty)| {
                            format!("{}: {}", interner.lookup(name), self.render(ty, interner))
                        })
                        .collect();
                    parts.push(format!("{{{}}}", inner.join(", ")));
                }
                format!("({}) -> {}", parts.join(", "), self.render(ret, interner))
            }
        }
    }

    /// Get the number of interned descriptors.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().types.len()).sum()
    }

    /// Check if the registry has only the pre-interned specials.
    pub fn is_empty(&self) -> bool {
        self.len() <= TypeId::FIRST_DYNAMIC
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared type registry handle.
///
/// The registry is consulted by subtype checks, the generic-instantiation
/// cache, dispatch cast checks, and diagnostics; this newtype is the one
/// sanctioned way to share it between them.
#[derive(Clone)]
pub struct SharedTypeRegistry(Arc<TypeRegistry>);

impl SharedTypeRegistry {
    /// Create a new shared registry.
    pub fn new() -> Self {
        SharedTypeRegistry(Arc::new(TypeRegistry::new()))
    }
}

impl Default for SharedTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTypeRegistry")
            .field("len", &self.0.len())
            .finish()
    }
}

impl std::ops::Deref for SharedTypeRegistry {
    type Target = TypeRegistry;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
