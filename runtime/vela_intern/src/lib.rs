//! String interning for the Vela runtime.
//!
//! Every identifier the runtime touches (class names, member names,
//! named-parameter names) is interned to a compact [`Name`] handle so that
//! registry keys compare and hash as a single `u32`.
//!
//! Well-known member names used by the dispatch protocol (`call`,
//! `noSuchMethod`, the index operators) are pre-interned at fixed indices
//! and exposed as constants on [`Name`].

mod interner;
mod name;

pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
