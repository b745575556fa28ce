//! Cross-module scenario tests.
//!
//! Per-module behavior is covered by inline test modules next to the
//! implementations; the scenarios here exercise whole flows a compiled
//! program would drive through the public `Runtime` surface.

mod composition_tests;
mod generics_tests;
