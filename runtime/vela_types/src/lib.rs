//! Reified type descriptors for the Vela runtime.
//!
//! Compiled programs reify source types as [`TypeId`] handles into a shared
//! [`TypeRegistry`]. The registry canonicalizes: two structurally equal
//! descriptors intern to the same id, so type equality anywhere in the
//! runtime is a `u32` comparison and generic-instantiation cache keys reduce
//! to id tuples.
//!
//! Subtype decisions live in [`SubtypeChecker`], which walks class
//! hierarchies through the [`ClassHierarchy`] seam. This crate stays
//! value-free; the class registry in `vela_rt` implements the seam.

mod data;
mod error;
mod registry;
mod subtype;
mod type_id;

pub use data::TypeData;
pub use error::TypeError;
pub use registry::{SharedTypeRegistry, TypeRegistry};
pub use subtype::{ClassHierarchy, SubtypeChecker};
pub use type_id::TypeId;
