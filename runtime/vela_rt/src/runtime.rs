//! The runtime context compiled programs link against.
//!
//! `Runtime` owns the shared registries (interner, types, classes,
//! constants, lazy bindings) and the event loop. Dispatch, instantiation,
//! composition, and cast operations hang off it; compiled call sites get a
//! `&Runtime` threaded through.

use std::sync::Arc;

use vela_intern::{Name, SharedInterner};
use vela_types::{SharedTypeRegistry, SubtypeChecker, TypeId};

use crate::class::{ClassId, SharedClassRegistry};
use crate::constants::ConstantPool;
use crate::errors::{self, RtResult};
use crate::generators::EventLoop;
use crate::lazy::LazyRegistry;
use crate::value::{CallArgs, Value};

/// Pre-interned types for untagged host values.
///
/// These are the "interceptor" bridge: a value with no class tag resolves
/// its runtime type through this table instead of failing.
#[derive(Clone, Copy, Debug)]
pub struct NativeTypes {
    pub object: TypeId,
    pub null: TypeId,
    pub bool_: TypeId,
    pub int: TypeId,
    pub double: TypeId,
    pub num: TypeId,
    pub string: TypeId,
    pub list: TypeId,
    pub map: TypeId,
    pub function: TypeId,
    pub type_: TypeId,
    pub iterable: TypeId,
    pub future: TypeId,
    pub stream: TypeId,
}

/// Shared runtime context.
pub struct Runtime {
    pub(crate) interner: SharedInterner,
    pub(crate) types: SharedTypeRegistry,
    pub(crate) classes: SharedClassRegistry,
    pub(crate) constants: ConstantPool,
    pub(crate) lazies: LazyRegistry,
    pub(crate) event_loop: Arc<EventLoop>,
    pub(crate) natives: NativeTypes,
}

impl Runtime {
    /// Start building a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Fully wired runtime with default components.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn types(&self) -> &SharedTypeRegistry {
        &self.types
    }

    pub fn classes(&self) -> &SharedClassRegistry {
        &self.classes
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn lazies(&self) -> &LazyRegistry {
        &self.lazies
    }

    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    pub fn natives(&self) -> &NativeTypes {
        &self.natives
    }

    /// Decide `a <: b` against the live class hierarchy.
    pub fn is_subtype(&self, a: TypeId, b: TypeId) -> bool {
        SubtypeChecker::new(&self.types, &**self.classes()).is_subtype(a, b)
    }

    /// The reified runtime type of a value.
    ///
    /// Tagged instances answer with their class's interface type; untagged
    /// host values resolve through the native-type table.
    pub fn runtime_type(&self, value: &Value) -> TypeId {
        match value {
            Value::Null => self.natives.null,
            Value::Bool(_) => self.natives.bool_,
            Value::Int(_) => self.natives.int,
            Value::Float(_) => self.natives.double,
            Value::Str(_) => self.natives.string,
            Value::List(_) => self.natives.list,
            Value::Map(_) => self.natives.map,
            Value::Instance(instance) => self.classes.get(instance.class()).type_of,
            Value::Function(function) => function.signature,
            Value::Type(_) => self.natives.type_,
            Value::Iterable(_) => self.natives.iterable,
            Value::Future(_) => self.natives.future,
            Value::Stream(_) => self.natives.stream,
        }
    }

    /// `value is T`.
    pub fn is_instance(&self, value: &Value, ty: TypeId) -> bool {
        self.is_subtype(self.runtime_type(value), ty)
    }

    /// `value as T`: returns the value unchanged or a cast error naming
    /// both types.
    pub fn cast(&self, value: Value, ty: TypeId) -> RtResult {
        if self.is_instance(&value, ty) {
            Ok(value)
        } else {
            let from = self.types.render(self.runtime_type(&value), &self.interner);
            let to = self.types.render(ty, &self.interner);
            Err(errors::invalid_cast(&from, &to))
        }
    }

    /// Rendered runtime type for diagnostics.
    pub fn type_name(&self, value: &Value) -> String {
        self.types.render(self.runtime_type(value), &self.interner)
    }

    /// Run a constructor: allocate, initialize fields, return the
    /// instance. The compiled target of `new C(...)` expressions.
    pub fn construct(
        &self,
        class: ClassId,
        ctor: Name,
        positional: &[Value],
        named: &[(Name, Value)],
    ) -> RtResult {
        let Some(constructor) = self.classes.resolve_constructor(class, ctor) else {
            let class_name = self.interner.lookup(self.classes.get(class).name);
            let ctor_name = self.interner.lookup(ctor);
            return Err(errors::structural(format!(
                "class `{class_name}` has no constructor `{ctor_name}`"
            )));
        };
        if positional.len() < constructor.required
            || positional.len() > constructor.required + constructor.optional
            || !named
                .iter()
                .all(|&(n, _)| constructor.named.binary_search(&n).is_ok())
        {
            let class_name = self.interner.lookup(self.classes.get(class).name);
            return Err(errors::structural(format!(
                "wrong arguments for constructor of `{class_name}`"
            )));
        }

        let instance = Value::instance(crate::value::InstanceValue::new(class));
        (constructor.body)(self, &instance, CallArgs::new(positional, named))?;
        Ok(instance)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("types", &self.types)
            .field("classes", &self.classes)
            .finish_non_exhaustive()
    }
}

/// Builder wiring the runtime's shared components.
///
/// The interner and event loop can be injected (a host embedding several
/// isolates shares one loop); everything else is constructed here.
pub struct RuntimeBuilder {
    interner: SharedInterner,
    event_loop: Option<Arc<EventLoop>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            interner: SharedInterner::new(),
            event_loop: None,
        }
    }

    /// Share an existing interner.
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = interner;
        self
    }

    /// Share an existing event loop.
    pub fn event_loop(mut self, event_loop: Arc<EventLoop>) -> Self {
        self.event_loop = Some(event_loop);
        self
    }

    /// Construct the runtime: pre-intern the native types and wire their
    /// fixed hierarchy (`int <: num <: Object`, ...).
    pub fn build(self) -> Runtime {
        let interner = self.interner;
        let types = SharedTypeRegistry::new();
        let classes = SharedClassRegistry::new(types.clone());

        let primitive = |name: &str| types.primitive(interner.intern(name));
        let natives = NativeTypes {
            object: primitive("Object"),
            null: primitive("Null"),
            bool_: primitive("bool"),
            int: primitive("int"),
            double: primitive("double"),
            num: primitive("num"),
            string: primitive("String"),
            list: primitive("List"),
            map: primitive("Map"),
            function: primitive("Function"),
            type_: primitive("Type"),
            iterable: primitive("Iterable"),
            future: primitive("Future"),
            stream: primitive("Stream"),
        };

        classes.link_native(natives.int, [natives.num]);
        classes.link_native(natives.double, [natives.num]);
        classes.link_native(natives.num, [natives.object]);
        classes.link_native(natives.bool_, [natives.object]);
        classes.link_native(natives.string, [natives.object]);
        classes.link_native(natives.list, [natives.iterable]);
        classes.link_native(natives.iterable, [natives.object]);
        classes.link_native(natives.map, [natives.object]);
        classes.link_native(natives.function, [natives.object]);
        classes.link_native(natives.type_, [natives.object]);
        classes.link_native(natives.future, [natives.object]);
        classes.link_native(natives.stream, [natives.object]);
        classes.set_function_super(natives.function);

        Runtime {
            interner,
            types,
            classes,
            constants: ConstantPool::new(),
            lazies: LazyRegistry::new(),
            event_loop: self.event_loop.unwrap_or_else(|| Arc::new(EventLoop::new())),
            natives,
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
