//! Generic instantiation through the runtime: one concrete class per
//! type-argument tuple, invariant reified types, and casts that agree
//! with them.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use vela_intern::Name;
use vela_types::TypeId;

use crate::{
    ClassSpec, ClassTemplate, Constructor, Member, MemberKey, RtErrorKind, Runtime, Value,
};

/// `Box<T>` with a `value` field, a typed `unwrap` getter, and a
/// type-checking `put` method.
fn box_template(rt: &Runtime) -> ClassTemplate {
    let class_name = rt.interner().intern("Box");
    let value_field = rt.interner().intern("value");
    let put = rt.interner().intern("put");

    ClassTemplate::new(
        class_name,
        1,
        Arc::new(move |rt, args| {
            let elem = args[0];
            let type_of = rt.types().interface(class_name, args.to_vec());
            let put_sig = rt.types().function(TypeId::VOID, [elem], [], vec![]);

            ClassSpec::new(class_name, type_of)
                .constructor(Constructor::new(
                    Name::EMPTY,
                    1,
                    0,
                    [],
                    Arc::new(move |_, receiver, call| {
                        if let (Value::Instance(instance), Some(v)) =
                            (receiver, call.positional(0))
                        {
                            instance.set_field(value_field, v.clone())?;
                        }
                        Ok(())
                    }),
                ))
                .member(Member::method(
                    put,
                    put_sig,
                    1,
                    Arc::new(move |rt, receiver, call| {
                        let value = call
                            .positional(0)
                            .cloned()
                            .unwrap_or(Value::Null);
                        let checked = rt.cast(value, elem)?;
                        if let Value::Instance(instance) = receiver {
                            instance.set_field(value_field, checked)?;
                        }
                        Ok(Value::Null)
                    }),
                ))
        }),
    )
}

#[test]
fn instantiations_are_cached_per_tuple() {
    let rt = Runtime::new();
    let template = box_template(&rt);
    let int = rt.natives().int;
    let double = rt.natives().double;

    let box_int = template.instantiate(&rt, &[int]).unwrap();
    let box_int_again = template.instantiate(&rt, &[int]).unwrap();
    let box_double = template.instantiate(&rt, &[double]).unwrap();

    assert_eq!(box_int, box_int_again);
    assert_ne!(box_int, box_double);
    assert_eq!(template.instantiation_count(), 2);
}

#[test]
fn reified_types_are_invariant() {
    let rt = Runtime::new();
    let template = box_template(&rt);
    let box_int = template.instantiate(&rt, &[rt.natives().int]).unwrap();
    let box_num = template.instantiate(&rt, &[rt.natives().num]).unwrap();

    let value = rt
        .construct(box_int, Name::EMPTY, &[Value::Int(1)], &[])
        .unwrap();
    let box_int_ty = rt.classes().get(box_int).type_of;
    let box_num_ty = rt.classes().get(box_num).type_of;

    assert!(rt.is_instance(&value, box_int_ty));
    // int <: num does not lift to Box<int> <: Box<num>.
    assert!(!rt.is_instance(&value, box_num_ty));
    assert_eq!(rt.type_name(&value), "Box<int>");
}

#[test]
fn typed_member_enforces_its_instantiated_signature() {
    let rt = Runtime::new();
    let template = box_template(&rt);
    let box_int = template.instantiate(&rt, &[rt.natives().int]).unwrap();
    let boxed = rt
        .construct(box_int, Name::EMPTY, &[Value::Int(1)], &[])
        .unwrap();

    let put = rt.interner().intern("put");
    rt.dsend(&boxed, put, &[Value::Int(2)], &[]).unwrap();
    let value_field = rt.interner().intern("value");
    assert_eq!(rt.dload(&boxed, value_field).unwrap(), Value::Int(2));

    let err = rt
        .dsend(&boxed, put, &[Value::string("nope")], &[])
        .unwrap_err();
    let RtErrorKind::InvalidCast { from, to } = &err.kind else {
        panic!("expected a cast error, got {err}");
    };
    assert_eq!(from, "String");
    assert_eq!(to, "int");
}

#[test]
fn runtime_type_accessor_reifies_the_instantiation() {
    let rt = Runtime::new();
    let template = box_template(&rt);
    let box_int = template.instantiate(&rt, &[rt.natives().int]).unwrap();
    let boxed = rt
        .construct(box_int, Name::EMPTY, &[Value::Int(1)], &[])
        .unwrap();

    let reified = rt.dload(&boxed, Name::RUNTIME_TYPE).unwrap();
    assert_eq!(reified, Value::Type(rt.classes().get(box_int).type_of));
}

#[test]
fn member_resolution_is_shared_across_instantiation_sites() {
    let rt = Runtime::new();
    let template = box_template(&rt);
    let int = rt.natives().int;

    let site_a = template.instantiate(&rt, &[int]).unwrap();
    let site_b = template.instantiate(&rt, &[int]).unwrap();
    let put = rt.interner().intern("put");

    let from_a = rt.classes().resolve_member(site_a, MemberKey::method(put));
    let from_b = rt.classes().resolve_member(site_b, MemberKey::method(put));
    assert!(from_a.is_some());
    assert_eq!(site_a, site_b);
    assert_eq!(from_a.unwrap().signature, from_b.unwrap().signature);
}
