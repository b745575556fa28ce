//! Heap wrapper for enforced Arc usage.
//!
//! `Heap<T>` wraps `Arc<T>` and is the only way runtime code allocates
//! shared values. The constructor is `pub(crate)`: embedders go through
//! `Value`'s factory methods, keeping allocation behind one seam.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// A heap-allocated value wrapper.
///
/// # Thread Safety
/// Uses `Arc` internally for thread-safe reference counting.
///
/// # Zero-Cost Abstraction
/// `#[repr(transparent)]` gives this the same layout as `Arc<T>`.
#[repr(transparent)]
pub struct Heap<T: ?Sized>(Arc<T>);

impl<T> Heap<T> {
    /// Create a new heap-allocated value. Crate-internal: external code
    /// goes through `Value`'s factory methods.
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Heap(Arc::new(value))
    }

    /// Stable address of the allocation, used as an identity key by the
    /// constant canonicalizer.
    #[inline]
    pub(crate) fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl<T: ?Sized> Heap<T> {
    /// Reference identity: do two handles share one allocation?
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: ?Sized> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Arc::clone(&self.0))
    }
}

impl<T: ?Sized + PartialEq> PartialEq for Heap<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl<T: ?Sized + Eq> Eq for Heap<T> {}

impl<T: ?Sized + Hash> Hash for Heap<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.0).hash(state);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: ?Sized> AsRef<T> for Heap<T> {
    #[inline]
    fn as_ref(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_deref_and_clone_share_allocation() {
        let h1 = Heap::new(vec![1, 2, 3]);
        let h2 = h1.clone();
        assert_eq!(*h1, *h2);
        assert!(Heap::ptr_eq(&h1, &h2));
    }

    #[test]
    fn heap_eq_is_structural() {
        let h1 = Heap::new("hello".to_string());
        let h2 = Heap::new("hello".to_string());
        assert_eq!(h1, h2);
        assert!(!Heap::ptr_eq(&h1, &h2));
    }
}
