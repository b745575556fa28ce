//! Structural type descriptors stored in the registry.

use vela_intern::Name;

use crate::TypeId;

/// Structural type descriptor stored in the [`TypeRegistry`](crate::TypeRegistry).
///
/// Children are `TypeId`s (already interned), not boxed descriptors, so
/// structural equality of a `TypeData` is a shallow field comparison and
/// registry lookup is O(1) after hashing.
///
/// # Canonical Form
/// `Function` named-parameter tables are sorted by `Name` and free of
/// duplicates; the registry rejects anything else as malformed. The
/// [`TypeRegistry::function`](crate::TypeRegistry::function) builder sorts
/// for you.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    /// The `dynamic` type (pre-interned).
    Dynamic,
    /// The `void` type (pre-interned).
    Void,
    /// The bottom type (pre-interned). Rendered as `Never`.
    Bottom,
    /// A non-generic built-in type (`int`, `bool`, `String`, ...).
    Primitive(Name),
    /// An instantiated class or interface type, e.g. `Box<int>`.
    ///
    /// `class` is the generic template's identity; `args` the concrete
    /// type-argument tuple (empty for non-generic classes).
    Interface { class: Name, args: Box<[TypeId]> },
    /// A structural function type.
    Function {
        /// Return type (covariant position).
        ret: TypeId,
        /// Required positional parameters (contravariant).
        positional: Box<[TypeId]>,
        /// Optional positional parameters, fill order left-to-right.
        optional: Box<[TypeId]>,
        /// Named parameters, sorted by `Name`, no duplicates.
        named: Box<[(Name, TypeId)]>,
    },
}
