//! Callable function values and the member-body calling convention.

use std::sync::Arc;

use vela_intern::Name;
use vela_types::TypeId;

use crate::errors::RtResult;
use crate::runtime::Runtime;
use crate::value::Value;

/// Calling convention for compiled member bodies and closures.
///
/// The receiver is passed separately (`Value::Null` for unbound
/// functions); positional and named arguments arrive pre-validated by the
/// dispatch layer.
pub type MethodBody = Arc<dyn Fn(&Runtime, &Value, CallArgs<'_>) -> RtResult + Send + Sync>;

/// Borrowed argument pack handed to member bodies.
#[derive(Clone, Copy)]
pub struct CallArgs<'a> {
    pub positional: &'a [Value],
    pub named: &'a [(Name, Value)],
}

impl<'a> CallArgs<'a> {
    pub fn new(positional: &'a [Value], named: &'a [(Name, Value)]) -> Self {
        Self { positional, named }
    }

    pub fn empty() -> CallArgs<'static> {
        CallArgs {
            positional: &[],
            named: &[],
        }
    }

    /// Positional argument by index (optionals that were not passed are
    /// simply absent).
    pub fn positional(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Named argument by exact name.
    pub fn named_arg(&self, name: Name) -> Option<&Value> {
        self.named
            .iter()
            .find(|&&(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// A first-class function: a compiled closure or a bound method tear-off.
pub struct FunctionValue {
    /// Declared name (`Name::EMPTY` for anonymous closures).
    pub name: Name,
    /// Structural function type of this callable.
    pub signature: TypeId,
    /// Required positional parameter count.
    pub required: usize,
    /// Optional positional parameter count (fill order left-to-right).
    pub optional: usize,
    /// Declared named parameter names, sorted.
    pub named: Box<[Name]>,
    /// Bound receiver for method tear-offs.
    pub receiver: Option<Value>,
    body: MethodBody,
}

impl FunctionValue {
    pub fn new(
        name: Name,
        signature: TypeId,
        required: usize,
        optional: usize,
        named: impl Into<Box<[Name]>>,
        body: MethodBody,
    ) -> Self {
        let mut named = named.into();
        named.sort_unstable();
        Self {
            name,
            signature,
            required,
            optional,
            named,
            receiver: None,
            body,
        }
    }

    /// Bind a receiver, producing a method tear-off.
    pub fn bind(mut self, receiver: Value) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Does an argument shape fit this signature? Positional count must
    /// fall in `required..=required+optional`; every named argument must
    /// match a declared named parameter exactly.
    pub fn accepts(&self, positional: usize, named: &[(Name, Value)]) -> bool {
        positional >= self.required
            && positional <= self.required + self.optional
            && named
                .iter()
                .all(|&(n, _)| self.named.binary_search(&n).is_ok())
    }

    /// Invoke the body with the bound receiver (or `Null`).
    pub(crate) fn invoke(&self, rt: &Runtime, args: CallArgs<'_>) -> RtResult {
        let receiver = self.receiver.as_ref().unwrap_or(&Value::Null);
        (self.body)(rt, receiver, args)
    }
}

impl std::fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("bound", &self.receiver.is_some())
            .finish_non_exhaustive()
    }
}
