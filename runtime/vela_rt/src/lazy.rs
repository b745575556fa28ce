//! Lazily initialized top-level and static bindings.
//!
//! Each binding is a slot with a four-state lifecycle: uninitialized,
//! initializing (the cycle sentinel), initialized, and frozen. The
//! initializer runs outside the slot lock, so independent slots make
//! progress concurrently and a reentrant read of the slot being
//! initialized is detected rather than deadlocking.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use vela_intern::Name;

use crate::errors::{self, RtError, RtResult};
use crate::runtime::Runtime;
use crate::value::Value;

/// Mutability of a lazy binding after initialization.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LazyKind {
    /// Reassignable after initialization.
    Mutable,
    /// Single-assignment: writes after initialization are rejected.
    Frozen,
}

/// Deferred initializer expression for a lazy binding.
pub type LazyInit = Arc<dyn Fn(&Runtime) -> RtResult + Send + Sync>;

enum SlotState {
    Uninitialized,
    Initializing,
    Initialized(Value),
    Frozen(Value),
}

struct LazySlot {
    kind: LazyKind,
    init: LazyInit,
    state: SlotState,
}

/// Registry of lazy bindings, keyed by qualified name.
pub struct LazyRegistry {
    slots: RwLock<FxHashMap<Name, Arc<Mutex<LazySlot>>>>,
}

impl LazyRegistry {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(FxHashMap::default()),
        }
    }

    /// Declare a binding. Re-registration resets the slot (hot reload of
    /// a compiled module replaces its initializers wholesale).
    pub fn register(&self, name: Name, kind: LazyKind, init: LazyInit) {
        self.slots.write().insert(
            name,
            Arc::new(Mutex::new(LazySlot {
                kind,
                init,
                state: SlotState::Uninitialized,
            })),
        );
    }

    /// Is the binding declared?
    pub fn contains(&self, name: Name) -> bool {
        self.slots.read().contains_key(&name)
    }

    fn slot(&self, rt: &Runtime, name: Name) -> Result<Arc<Mutex<LazySlot>>, RtError> {
        self.slots.read().get(&name).cloned().ok_or_else(|| {
            errors::structural(format!(
                "no lazy binding named `{}`",
                rt.interner().lookup(name)
            ))
        })
    }

    /// Read a binding, running its initializer on first access.
    ///
    /// Exactly one in-thread initialization runs per slot; a read that
    /// arrives while the slot is initializing on this or another thread
    /// reports a cycle. A failed initializer leaves the slot
    /// uninitialized, so a later read retries.
    pub fn read(&self, rt: &Runtime, name: Name) -> RtResult {
        let slot = self.slot(rt, name)?;

        let init = {
            let mut guard = slot.lock();
            match &guard.state {
                SlotState::Initialized(value) | SlotState::Frozen(value) => {
                    return Ok(value.clone())
                }
                SlotState::Initializing => {
                    return Err(errors::cyclic_initialization(rt.interner().lookup(name)))
                }
                SlotState::Uninitialized => {}
            }
            guard.state = SlotState::Initializing;
            Arc::clone(&guard.init)
        };

        // Run the initializer with the slot unlocked so other bindings
        // stay reachable from inside it.
        let outcome = init(rt);

        let mut guard = slot.lock();
        match outcome {
            Ok(value) => {
                guard.state = match guard.kind {
                    LazyKind::Mutable => SlotState::Initialized(value.clone()),
                    LazyKind::Frozen => SlotState::Frozen(value.clone()),
                };
                Ok(value)
            }
            Err(err) => {
                guard.state = SlotState::Uninitialized;
                Err(err.with_frame(format!(
                    "while initializing `{}`",
                    rt.interner().lookup(name)
                )))
            }
        }
    }

    /// Write a binding.
    ///
    /// Writing an uninitialized slot skips the initializer entirely. For
    /// a frozen binding the first write is the initialization; any write
    /// after that is rejected.
    pub fn write(&self, rt: &Runtime, name: Name, value: Value) -> Result<(), RtError> {
        let slot = self.slot(rt, name)?;
        let mut guard = slot.lock();
        match (&guard.state, guard.kind) {
            (SlotState::Frozen(_), _) | (SlotState::Initialized(_), LazyKind::Frozen) => {
                Err(errors::immutable_binding(rt.interner().lookup(name)))
            }
            (SlotState::Initializing, _) => {
                Err(errors::cyclic_initialization(rt.interner().lookup(name)))
            }
            (_, LazyKind::Frozen) => {
                guard.state = SlotState::Frozen(value);
                Ok(())
            }
            (_, LazyKind::Mutable) => {
                guard.state = SlotState::Initialized(value);
                Ok(())
            }
        }
    }
}

impl Default for LazyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LazyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyRegistry")
            .field("len", &self.slots.read().len())
            .finish()
    }
}

impl Runtime {
    /// Declare a lazy binding on this runtime.
    pub fn register_lazy(&self, name: Name, kind: LazyKind, init: LazyInit) {
        self.lazies.register(name, kind, init);
    }

    /// Read a lazy binding (`x` where `x` is a lazy global).
    pub fn read_lazy(&self, name: Name) -> RtResult {
        self.lazies.read(self, name)
    }

    /// Write a lazy binding (`x = v`).
    pub fn write_lazy(&self, name: Name, value: Value) -> Result<(), RtError> {
        self.lazies.write(self, name, value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::RtErrorKind;

    #[test]
    fn initializer_runs_once() {
        let rt = Runtime::new();
        let name = rt.interner().intern("answer");
        let runs = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&runs);
        rt.register_lazy(
            name,
            LazyKind::Mutable,
            Arc::new(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Int(42))
            }),
        );

        assert_eq!(rt.read_lazy(name).unwrap(), Value::Int(42));
        assert_eq!(rt.read_lazy(name).unwrap(), Value::Int(42));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_read_reports_a_cycle() {
        let rt = Runtime::new();
        let name = rt.interner().intern("selfish");
        rt.register_lazy(
            name,
            LazyKind::Mutable,
            Arc::new(move |rt| rt.read_lazy(rt.interner().intern("selfish"))),
        );

        let err = rt.read_lazy(name).unwrap_err();
        assert!(matches!(err.kind, RtErrorKind::CyclicInitialization { .. }));
        assert!(err.frames.iter().any(|f| f.contains("selfish")));
    }

    #[test]
    fn failed_initializer_retries_on_next_read() {
        let rt = Runtime::new();
        let name = rt.interner().intern("flaky");
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        rt.register_lazy(
            name,
            LazyKind::Mutable,
            Arc::new(move |_| {
                if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RtError::new("first attempt fails"))
                } else {
                    Ok(Value::Int(7))
                }
            }),
        );

        let err = rt.read_lazy(name).unwrap_err();
        assert!(err.frames.iter().any(|f| f.contains("flaky")));
        assert_eq!(rt.read_lazy(name).unwrap(), Value::Int(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn write_before_first_read_skips_the_initializer() {
        let rt = Runtime::new();
        let name = rt.interner().intern("preset");
        rt.register_lazy(
            name,
            LazyKind::Mutable,
            Arc::new(|_| Err(RtError::new("initializer must not run"))),
        );

        rt.write_lazy(name, Value::Int(9)).unwrap();
        assert_eq!(rt.read_lazy(name).unwrap(), Value::Int(9));
    }

    #[test]
    fn frozen_binding_rejects_second_write() {
        let rt = Runtime::new();
        let name = rt.interner().intern("constant");
        rt.register_lazy(name, LazyKind::Frozen, Arc::new(|_| Ok(Value::Int(1))));

        rt.write_lazy(name, Value::Int(2)).unwrap();
        assert_eq!(rt.read_lazy(name).unwrap(), Value::Int(2));

        let err = rt.write_lazy(name, Value::Int(3)).unwrap_err();
        assert!(matches!(err.kind, RtErrorKind::ImmutableBinding { .. }));
    }

    #[test]
    fn frozen_binding_initialized_by_read_rejects_writes() {
        let rt = Runtime::new();
        let name = rt.interner().intern("pi");
        rt.register_lazy(name, LazyKind::Frozen, Arc::new(|_| Ok(Value::Float(3.14))));

        assert_eq!(rt.read_lazy(name).unwrap(), Value::Float(3.14));
        let err = rt.write_lazy(name, Value::Float(3.15)).unwrap_err();
        assert!(matches!(err.kind, RtErrorKind::ImmutableBinding { .. }));
    }
}
