//! Generic class templates and the instantiation cache.
//!
//! A generic class declaration compiles to a [`ClassTemplate`]: a build
//! function parameterized over type arguments plus a cache of the concrete
//! classes it has produced. Instantiation is keyed by the full
//! type-argument tuple, so equal tuples share one [`ClassId`] and reified
//! type, and `C<int>` never aliases `C<double>`.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use vela_intern::Name;
use vela_types::TypeId;

use crate::class::{ClassId, ClassSpec};
use crate::errors::{self, RtError};
use crate::runtime::Runtime;

/// Builds the concrete [`ClassSpec`] for one type-argument tuple.
///
/// Runs at most once per distinct tuple; the cache write lock is held
/// while it runs, so the builder must not instantiate this same template
/// reentrantly.
pub type TemplateBody = Arc<dyn Fn(&Runtime, &[TypeId]) -> ClassSpec + Send + Sync>;

/// A generic class declaration awaiting type arguments.
pub struct ClassTemplate {
    name: Name,
    arity: usize,
    build: TemplateBody,
    cache: RwLock<FxHashMap<Box<[TypeId]>, ClassId>>,
}

impl ClassTemplate {
    pub fn new(name: Name, arity: usize, build: TemplateBody) -> Self {
        Self {
            name,
            arity,
            build,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Declared name of the generic class.
    pub fn name(&self) -> Name {
        self.name
    }

    /// Declared type-parameter count.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Instantiate for a type-argument tuple.
    ///
    /// The fast path is a read lock and a hash lookup. On a miss the write
    /// lock re-checks before building, so concurrent first instantiations
    /// of the same tuple register exactly one class.
    #[tracing::instrument(level = "debug", skip(self, rt), fields(name = ?self.name))]
    pub fn instantiate(&self, rt: &Runtime, args: &[TypeId]) -> Result<ClassId, RtError> {
        if args.len() != self.arity {
            return Err(self.arity_error(rt, args.len()));
        }

        if let Some(&id) = self.cache.read().get(args) {
            return Ok(id);
        }

        let mut cache = self.cache.write();
        if let Some(&id) = cache.get(args) {
            return Ok(id);
        }

        tracing::debug!("instantiating class template");
        let spec = (self.build)(rt, args);
        let id = rt.classes().register(spec);
        cache.insert(args.into(), id);
        Ok(id)
    }

    /// Number of distinct instantiations built so far.
    pub fn instantiation_count(&self) -> usize {
        self.cache.read().len()
    }

    #[cold]
    fn arity_error(&self, rt: &Runtime, got: usize) -> RtError {
        let name = rt.interner().lookup(self.name);
        errors::structural(format!(
            "class `{name}` expects {} type argument(s), got {got}",
            self.arity
        ))
    }
}

impl std::fmt::Debug for ClassTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassTemplate")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("instantiations", &self.instantiation_count())
            .finish_non_exhaustive()
    }
}
