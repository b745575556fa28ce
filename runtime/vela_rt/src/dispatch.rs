//! Dynamic member access: the compiled targets of `obj.x`, `obj.x = v`,
//! `obj.m(...)`, `f(...)`, and `obj[i]`.
//!
//! Every entry point resolves against the receiver's class, falls back to
//! instance fields where the member tables miss, and routes unresolvable
//! accesses through the `noSuchMethod` protocol before giving up with a
//! dispatch error carrying the failed [`Invocation`].

use std::sync::Arc;

use vela_intern::Name;

use crate::class::{Member, MemberKey};
use crate::errors::{self, RtError, RtResult};
use crate::runtime::Runtime;
use crate::value::{CallArgs, FunctionValue, Value};

/// Flavor of a failed dynamic access.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InvocationKind {
    Method,
    Getter,
    Setter,
}

/// Reified record of a dynamic access, handed to `noSuchMethod`
/// overrides and carried by dispatch errors.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub member: Name,
    pub kind: InvocationKind,
    pub positional: Box<[Value]>,
    pub named: Box<[(Name, Value)]>,
}

impl Invocation {
    pub fn getter(member: Name) -> Self {
        Self {
            member,
            kind: InvocationKind::Getter,
            positional: Box::new([]),
            named: Box::new([]),
        }
    }

    pub fn setter(member: Name, value: Value) -> Self {
        Self {
            member,
            kind: InvocationKind::Setter,
            positional: Box::new([value]),
            named: Box::new([]),
        }
    }

    pub fn method(member: Name, positional: &[Value], named: &[(Name, Value)]) -> Self {
        Self {
            member,
            kind: InvocationKind::Method,
            positional: positional.into(),
            named: named.into(),
        }
    }
}

impl Runtime {
    /// Dynamic property read (`obj.x`).
    ///
    /// Resolution order: the universal `runtimeType` accessor, then a
    /// declared getter, then a method (producing a bound tear-off), then
    /// an instance field, then `noSuchMethod`.
    pub fn dload(&self, receiver: &Value, member: Name) -> RtResult {
        if member == Name::RUNTIME_TYPE {
            return Ok(Value::Type(self.runtime_type(receiver)));
        }

        if let Value::Instance(instance) = receiver {
            if let Some(getter) = self
                .classes()
                .resolve_member(instance.class(), MemberKey::getter(member))
            {
                return (getter.body)(self, receiver, CallArgs::empty());
            }
            if let Some(method) = self
                .classes()
                .resolve_member(instance.class(), MemberKey::method(member))
            {
                return Ok(self.tear_off(&method, receiver));
            }
            if let Some(value) = instance.get_field(member) {
                return Ok(value);
            }
        }

        if let Some(value) = self.native_member(receiver, member) {
            return Ok(value);
        }

        self.nsm_fallback(receiver, Invocation::getter(member))
    }

    /// Members served for untagged host values (`length`, `isEmpty`).
    fn native_member(&self, receiver: &Value, member: Name) -> Option<Value> {
        let length = |n: usize| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
        match (receiver, self.interner().lookup(member)) {
            (Value::Str(s), "length") => Some(length(s.chars().count())),
            (Value::Str(s), "isEmpty") => Some(Value::Bool(s.is_empty())),
            (Value::List(l), "length") => Some(length(l.len())),
            (Value::List(l), "isEmpty") => Some(Value::Bool(l.is_empty())),
            (Value::Map(m), "length") => Some(length(m.len())),
            (Value::Map(m), "isEmpty") => Some(Value::Bool(m.is_empty())),
            _ => None,
        }
    }

    /// Dynamic property write (`obj.x = v`).
    ///
    /// A declared setter wins; otherwise an existing field of the same
    /// name is updated. Unknown members go through `noSuchMethod`.
    pub fn dput(&self, receiver: &Value, member: Name, value: Value) -> Result<(), RtError> {
        if let Value::Instance(instance) = receiver {
            if let Some(setter) = self
                .classes()
                .resolve_member(instance.class(), MemberKey::setter(member))
            {
                let args = [value];
                (setter.body)(self, receiver, CallArgs::new(&args, &[]))?;
                return Ok(());
            }
            if instance.has_field(member) {
                return instance.set_field(member, value);
            }
        }

        self.nsm_fallback(receiver, Invocation::setter(member, value))
            .map(|_| ())
    }

    /// Dynamic method call (`obj.m(a, b: c)`).
    ///
    /// A declared method whose signature fits the argument shape is
    /// invoked directly. A method with a mismatched shape, or a
    /// getter/field holding a callable, or an unknown member all route
    /// through the slower paths below.
    pub fn dsend(
        &self,
        receiver: &Value,
        member: Name,
        positional: &[Value],
        named: &[(Name, Value)],
    ) -> RtResult {
        if let Value::Instance(instance) = receiver {
            if let Some(method) = self
                .classes()
                .resolve_member(instance.class(), MemberKey::method(member))
            {
                if method.accepts(positional.len(), named) {
                    return (method.body)(self, receiver, CallArgs::new(positional, named));
                }
                return self.nsm_fallback(receiver, Invocation::method(member, positional, named));
            }

            // A getter or field may hold a callable; load it and call.
            let has_getter = self
                .classes()
                .resolve_member(instance.class(), MemberKey::getter(member))
                .is_some();
            if has_getter || instance.has_field(member) {
                let callee = self.dload(receiver, member)?;
                return self.dcall(&callee, positional, named);
            }
        }

        if matches!(receiver, Value::Function(_)) && member == Name::CALL {
            return self.dcall(receiver, positional, named);
        }

        self.nsm_fallback(receiver, Invocation::method(member, positional, named))
    }

    /// Call a first-class value (`f(...)`).
    ///
    /// Functions are invoked directly; instances delegate to their `call`
    /// method; everything else is a dispatch error on `call`.
    pub fn dcall(&self, callee: &Value, positional: &[Value], named: &[(Name, Value)]) -> RtResult {
        match callee {
            Value::Function(function) => {
                if function.accepts(positional.len(), named) {
                    function.invoke(self, CallArgs::new(positional, named))
                } else {
                    self.nsm_fallback(
                        callee,
                        Invocation::method(Name::CALL, positional, named),
                    )
                }
            }
            Value::Instance(_) => self.dsend(callee, Name::CALL, positional, named),
            _ => self.nsm_fallback(callee, Invocation::method(Name::CALL, positional, named)),
        }
    }

    /// Indexed read (`obj[i]`).
    ///
    /// Native lists and maps take a fast path with host-level bounds and
    /// key checks; class instances dispatch their `[]` operator.
    pub fn dindex(&self, receiver: &Value, index: &Value) -> RtResult {
        match (receiver, index) {
            (Value::List(list), Value::Int(i)) => list.get(*i),
            (Value::Map(map), Value::Str(key)) => map.get(key),
            _ => self.dsend(receiver, Name::INDEX_GET, std::slice::from_ref(index), &[]),
        }
    }

    /// Indexed write (`obj[i] = v`). Returns the stored value.
    pub fn dsetindex(&self, receiver: &Value, index: &Value, value: Value) -> RtResult {
        match (receiver, index) {
            (Value::List(list), Value::Int(i)) => {
                list.set(*i, value.clone())?;
                Ok(value)
            }
            (Value::Map(map), Value::Str(key)) => {
                map.set(key.to_string(), value.clone())?;
                Ok(value)
            }
            _ => {
                let args = [index.clone(), value.clone()];
                self.dsend(receiver, Name::INDEX_SET, &args, &[])?;
                Ok(value)
            }
        }
    }

    /// Materialize a bound method tear-off.
    fn tear_off(&self, method: &Member, receiver: &Value) -> Value {
        Value::function(
            FunctionValue::new(
                method.name,
                method.signature,
                method.required,
                method.optional,
                method.named.clone(),
                Arc::clone(&method.body),
            )
            .bind(receiver.clone()),
        )
    }

    /// Route a failed access through the nearest `noSuchMethod` override,
    /// or produce the terminal dispatch error.
    fn nsm_fallback(&self, receiver: &Value, invocation: Invocation) -> RtResult {
        if let Value::Instance(instance) = receiver {
            if let Some(handler) = self.classes().resolve_no_such_method(instance.class()) {
                tracing::debug!(member = ?invocation.member, "dispatch falling back to noSuchMethod");
                return handler(self, receiver, &invocation);
            }
        }
        let member = self.interner().lookup(invocation.member).to_owned();
        Err(errors::no_such_method(
            &self.type_name(receiver),
            &member,
            invocation,
        ))
    }
}
