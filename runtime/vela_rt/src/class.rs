//! Concrete class records and the class registry.
//!
//! A [`ConcreteClass`] is immutable after registration: one record per
//! distinct generic instantiation (the instantiation cache guarantees
//! at-most-one) or per mixin application. The registry is append-only and
//! implements the [`ClassHierarchy`] seam the subtype engine walks.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use vela_intern::Name;
use vela_types::{ClassHierarchy, SharedTypeRegistry, TypeData, TypeId};

use crate::dispatch::Invocation;
use crate::errors::{RtError, RtResult};
use crate::runtime::Runtime;
use crate::value::{CallArgs, MethodBody, Value};

/// Identity of a registered [`ConcreteClass`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct ClassId(u32);

impl ClassId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Member flavor: methods, getters, and setters occupy disjoint
/// namespaces keyed by [`MemberKey`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MemberKind {
    Method,
    Getter,
    Setter,
}

/// Key for member lookups: a member name and its flavor.
///
/// Uses interned `Name` values for zero-allocation lookups.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberKey {
    pub name: Name,
    pub kind: MemberKind,
}

impl MemberKey {
    #[inline]
    pub const fn new(name: Name, kind: MemberKind) -> Self {
        Self { name, kind }
    }

    #[inline]
    pub const fn method(name: Name) -> Self {
        Self::new(name, MemberKind::Method)
    }

    #[inline]
    pub const fn getter(name: Name) -> Self {
        Self::new(name, MemberKind::Getter)
    }

    #[inline]
    pub const fn setter(name: Name) -> Self {
        Self::new(name, MemberKind::Setter)
    }
}

bitflags::bitflags! {
    /// Per-class facts recorded at registration.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
    pub struct ClassFlags: u8 {
        /// Built by the mixin composer (carries a `MixinRecord`).
        const MIXIN_COMPOSED = 1 << 0;
        /// Instances may be canonicalized as compile-time constants.
        const CONST_CONSTRUCTIBLE = 1 << 1;
    }
}

/// A resolvable member: signature plus compiled body.
#[derive(Clone)]
pub struct Member {
    pub name: Name,
    pub kind: MemberKind,
    /// Structural function type of the member.
    pub signature: TypeId,
    pub required: usize,
    pub optional: usize,
    /// Declared named parameter names, sorted.
    pub named: Box<[Name]>,
    pub body: MethodBody,
}

impl Member {
    pub fn new(
        kind: MemberKind,
        name: Name,
        signature: TypeId,
        required: usize,
        optional: usize,
        named: impl Into<Box<[Name]>>,
        body: MethodBody,
    ) -> Self {
        let mut named = named.into();
        named.sort_unstable();
        Self {
            name,
            kind,
            signature,
            required,
            optional,
            named,
            body,
        }
    }

    /// Zero-parameter method shorthand.
    pub fn method(name: Name, signature: TypeId, required: usize, body: MethodBody) -> Self {
        Self::new(MemberKind::Method, name, signature, required, 0, [], body)
    }

    /// Getter shorthand (no parameters by construction).
    pub fn getter(name: Name, signature: TypeId, body: MethodBody) -> Self {
        Self::new(MemberKind::Getter, name, signature, 0, 0, [], body)
    }

    /// Setter shorthand (exactly one positional parameter).
    pub fn setter(name: Name, signature: TypeId, body: MethodBody) -> Self {
        Self::new(MemberKind::Setter, name, signature, 1, 0, [], body)
    }

    /// Does an argument shape fit this member's declared signature?
    pub fn accepts(&self, positional: usize, named: &[(Name, Value)]) -> bool {
        positional >= self.required
            && positional <= self.required + self.optional
            && named
                .iter()
                .all(|&(n, _)| self.named.binary_search(&n).is_ok())
    }
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Constructor body: initializes the fields of a freshly allocated
/// instance (the receiver) and returns nothing.
pub type CtorBody =
    Arc<dyn Fn(&Runtime, &Value, CallArgs<'_>) -> Result<(), RtError> + Send + Sync>;

/// A declared or forwarding constructor.
#[derive(Clone)]
pub struct Constructor {
    /// Constructor name; `Name::EMPTY` for the unnamed default.
    pub name: Name,
    pub required: usize,
    pub optional: usize,
    pub named: Box<[Name]>,
    pub body: CtorBody,
}

impl Constructor {
    pub fn new(
        name: Name,
        required: usize,
        optional: usize,
        named: impl Into<Box<[Name]>>,
        body: CtorBody,
    ) -> Self {
        let mut named = named.into();
        named.sort_unstable();
        Self {
            name,
            required,
            optional,
            named,
            body,
        }
    }

    /// The unnamed zero-parameter shape mixins are restricted to.
    pub(crate) fn is_default_shape(&self) -> bool {
        self.name == Name::EMPTY && self.required == 0 && self.optional == 0 && self.named.is_empty()
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// User `noSuchMethod` override: receives the failed [`Invocation`].
pub type NsmHandler = Arc<dyn Fn(&Runtime, &Value, &Invocation) -> RtResult + Send + Sync>;

/// Provenance of a mixin-composed class.
#[derive(Clone, Debug)]
pub struct MixinRecord {
    pub base: ClassId,
    pub mixins: Box<[ClassId]>,
}

/// A fully instantiated (non-generic) class record.
///
/// Immutable after registration. Member lookup walks `members`, then the
/// `supertype` chain; `interfaces` feed the subtype engine.
pub struct ConcreteClass {
    pub id: ClassId,
    pub name: Name,
    /// This class's own interface type (`Interface(name, args)`).
    pub type_of: TypeId,
    pub supertype: Option<ClassId>,
    /// Implemented interface types, including composed mixins' types.
    pub interfaces: Box<[TypeId]>,
    pub members: FxHashMap<MemberKey, Member>,
    pub constructors: FxHashMap<Name, Constructor>,
    pub no_such_method: Option<NsmHandler>,
    pub mixin: Option<MixinRecord>,
    pub flags: ClassFlags,
}

impl std::fmt::Debug for ConcreteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcreteClass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("members", &self.members.len())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Builder input for class registration (template bodies and the mixin
/// composer produce these; the registry assigns the `ClassId`).
pub struct ClassSpec {
    pub name: Name,
    pub type_of: TypeId,
    pub supertype: Option<ClassId>,
    pub interfaces: Vec<TypeId>,
    pub members: Vec<Member>,
    pub constructors: Vec<Constructor>,
    pub no_such_method: Option<NsmHandler>,
    pub mixin: Option<MixinRecord>,
    pub flags: ClassFlags,
}

impl ClassSpec {
    pub fn new(name: Name, type_of: TypeId) -> Self {
        Self {
            name,
            type_of,
            supertype: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            constructors: Vec::new(),
            no_such_method: None,
            mixin: None,
            flags: ClassFlags::default(),
        }
    }

    pub fn extends(mut self, superclass: ClassId) -> Self {
        self.supertype = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn no_such_method(mut self, handler: NsmHandler) -> Self {
        self.no_such_method = Some(handler);
        self
    }

    pub fn flag(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }
}

struct ClassTable {
    classes: Vec<Arc<ConcreteClass>>,
    by_type: FxHashMap<TypeId, ClassId>,
    /// Supertype edges for untagged host types (`int <: num`, ...).
    native_supers: FxHashMap<TypeId, SmallVec<[TypeId; 4]>>,
    /// The class type every structural function type is a subtype of.
    function_super: Option<TypeId>,
}

/// Append-only registry of concrete classes.
///
/// # Thread Safety
/// A `RwLock` guards the table; handles are `Arc<ConcreteClass>`, so
/// resolution never holds the lock across user code.
pub struct ClassRegistry {
    types: SharedTypeRegistry,
    table: RwLock<ClassTable>,
}

impl ClassRegistry {
    pub fn new(types: SharedTypeRegistry) -> Self {
        Self {
            types,
            table: RwLock::new(ClassTable {
                classes: Vec::with_capacity(64),
                by_type: FxHashMap::default(),
                native_supers: FxHashMap::default(),
                function_super: None,
            }),
        }
    }

    /// Register a class, assigning its identity.
    ///
    /// The instantiation cache and the compiled class declarations are the
    /// only callers, so each distinct `type_of` is registered once.
    pub fn register(&self, spec: ClassSpec) -> ClassId {
        let mut table = self.table.write();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "class count is bounded far below u32::MAX"
        )]
        let id = ClassId(table.classes.len() as u32);

        let mut members = FxHashMap::default();
        for member in spec.members {
            members.insert(MemberKey::new(member.name, member.kind), member);
        }
        let mut constructors = FxHashMap::default();
        for ctor in spec.constructors {
            constructors.insert(ctor.name, ctor);
        }

        tracing::debug!(?id, name = ?spec.name, "registering class");
        table.by_type.insert(spec.type_of, id);
        table.classes.push(Arc::new(ConcreteClass {
            id,
            name: spec.name,
            type_of: spec.type_of,
            supertype: spec.supertype,
            interfaces: spec.interfaces.into_boxed_slice(),
            members,
            constructors,
            no_such_method: spec.no_such_method,
            mixin: spec.mixin,
            flags: spec.flags,
        }));
        id
    }

    /// Get the class record for an id.
    ///
    /// # Panics
    /// Panics if the id was not issued by this registry.
    pub fn get(&self, id: ClassId) -> Arc<ConcreteClass> {
        Arc::clone(&self.table.read().classes[id.index()])
    }

    /// Class registered for an instantiated interface type, if any.
    pub fn class_of_type(&self, ty: TypeId) -> Option<ClassId> {
        self.table.read().by_type.get(&ty).copied()
    }

    /// Declare supertype edges for an untagged host type.
    pub fn link_native(&self, ty: TypeId, supers: impl IntoIterator<Item = TypeId>) {
        self.table
            .write()
            .native_supers
            .insert(ty, supers.into_iter().collect());
    }

    /// Declare the class type all structural function types derive from.
    pub fn set_function_super(&self, ty: TypeId) {
        self.table.write().function_super = Some(ty);
    }

    /// Resolve a member along the supertype chain, nearest declaration
    /// first.
    pub fn resolve_member(&self, class: ClassId, key: MemberKey) -> Option<Member> {
        let mut current = Some(class);
        while let Some(id) = current {
            let record = self.get(id);
            if let Some(member) = record.members.get(&key) {
                return Some(member.clone());
            }
            current = record.supertype;
        }
        None
    }

    /// Resolve a constructor by name (constructors do not inherit).
    pub fn resolve_constructor(&self, class: ClassId, name: Name) -> Option<Constructor> {
        self.get(class).constructors.get(&name).cloned()
    }

    /// Nearest `noSuchMethod` override along the supertype chain.
    pub fn resolve_no_such_method(&self, class: ClassId) -> Option<NsmHandler> {
        let mut current = Some(class);
        while let Some(id) = current {
            let record = self.get(id);
            if let Some(handler) = &record.no_such_method {
                return Some(Arc::clone(handler));
            }
            current = record.supertype;
        }
        None
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.table.read().classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClassHierarchy for ClassRegistry {
    fn supers_of(&self, ty: TypeId) -> SmallVec<[TypeId; 4]> {
        let table = self.table.read();
        if let Some(&id) = table.by_type.get(&ty) {
            let record = &table.classes[id.index()];
            let mut out: SmallVec<[TypeId; 4]> = SmallVec::new();
            if let Some(sup) = record.supertype {
                out.push(table.classes[sup.index()].type_of);
            }
            out.extend(record.interfaces.iter().copied());
            return out;
        }
        if let Some(supers) = table.native_supers.get(&ty) {
            return supers.clone();
        }
        // Every structural function type sits under the Function class.
        if let Some(fn_super) = table.function_super {
            if matches!(self.types.lookup(ty), TypeData::Function { .. }) {
                return SmallVec::from_slice(&[fn_super]);
            }
        }
        SmallVec::new()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Shared class registry handle.
#[derive(Clone)]
pub struct SharedClassRegistry(Arc<ClassRegistry>);

impl SharedClassRegistry {
    pub fn new(types: SharedTypeRegistry) -> Self {
        SharedClassRegistry(Arc::new(ClassRegistry::new(types)))
    }
}

impl std::fmt::Debug for SharedClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedClassRegistry({:?})", &*self.0)
    }
}

impl std::ops::Deref for SharedClassRegistry {
    type Target = ClassRegistry;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
