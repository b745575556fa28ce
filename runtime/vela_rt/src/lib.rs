//! Core runtime for compiled Vela programs.
//!
//! A compiled program links against one [`Runtime`]: dynamic dispatch with
//! the `noSuchMethod` protocol, generic class instantiation, mixin
//! composition, lazily initialized globals, canonicalized constants, and
//! the `sync*`/`async`/`async*` generator adapters all hang off it.
//!
//! The runtime is value-agnostic about threads: every shared structure is
//! internally synchronized, and asynchrony is cooperative through the
//! embedder-driven [`EventLoop`].

mod class;
mod constants;
mod dispatch;
mod errors;
mod generators;
mod lazy;
mod mixin;
mod runtime;
mod template;
mod value;

#[cfg(test)]
mod tests;

pub use class::{
    ClassFlags, ClassId, ClassRegistry, ClassSpec, ConcreteClass, Constructor, CtorBody, Member,
    MemberKey, MemberKind, MixinRecord, NsmHandler, SharedClassRegistry,
};
pub use constants::ConstantPool;
pub use dispatch::{Invocation, InvocationKind};
pub use errors::{RtError, RtErrorKind, RtResult};
pub use generators::{
    EventLoop, FutureValue, GenFactory, GenIterator, Generator, IterableValue, Resume, Step,
    StreamHandlers, StreamSubscription, StreamValue,
};
pub use lazy::{LazyInit, LazyKind, LazyRegistry};
pub use runtime::{NativeTypes, Runtime, RuntimeBuilder};
pub use template::{ClassTemplate, TemplateBody};
pub use value::{
    CallArgs, FunctionValue, Heap, InstanceValue, ListValue, MapValue, MethodBody, Value,
};
