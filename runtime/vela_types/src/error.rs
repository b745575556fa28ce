//! Type-layer errors.

/// Error raised by the type registry and cast checks.
///
/// `Malformed` indicates a code-generator bug: the compiler emitted a
/// descriptor the registry cannot canonicalize. It is fatal through
/// [`TypeRegistry::intern`](crate::TypeRegistry::intern); only
/// `try_intern` surfaces it as a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Malformed type descriptor (duplicate named parameters, unsorted
    /// named table, registry overflow).
    #[error("malformed type descriptor: {reason}")]
    Malformed { reason: String },

    /// Explicit cast failed: the value's type is not a subtype of the
    /// target. Both types are pre-rendered for the message.
    #[error("type cast failed: `{from}` is not a subtype of `{to}`")]
    Cast { from: String, to: String },
}
