//! Mixin composition driven through dynamic dispatch: override order,
//! inherited members, the `noSuchMethod` protocol on composed classes,
//! and subtype relations of composed types.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use vela_intern::Name;

use crate::{ClassId, ClassSpec, Constructor, Member, RtErrorKind, Runtime, Value};

fn default_ctor() -> Constructor {
    Constructor::new(Name::EMPTY, 0, 0, [], Arc::new(|_, _, _| Ok(())))
}

fn class_with_describe(rt: &Runtime, name: &str, answer: &str) -> ClassId {
    let class_name = rt.interner().intern(name);
    let type_of = rt.types().interface(class_name, []);
    let describe = rt.interner().intern("describe");
    let sig = rt.types().function(rt.natives().string, [], [], vec![]);
    let answer = answer.to_owned();
    rt.classes().register(
        ClassSpec::new(class_name, type_of)
            .member(Member::method(
                describe,
                sig,
                0,
                Arc::new(move |_, _, _| Ok(Value::string(answer.clone()))),
            ))
            .constructor(default_ctor()),
    )
}

#[test]
fn last_mixin_wins_and_base_fills_the_rest() {
    let rt = Runtime::new();
    let base = class_with_describe(&rt, "Base", "base");
    let m1 = class_with_describe(&rt, "Loud", "loud");
    let m2 = class_with_describe(&rt, "Quiet", "quiet");

    let composed = rt.compose(base, &[m1, m2]).unwrap();
    let obj = rt.construct(composed, Name::EMPTY, &[], &[]).unwrap();

    let describe = rt.interner().intern("describe");
    assert_eq!(
        rt.dsend(&obj, describe, &[], &[]).unwrap(),
        Value::string("quiet")
    );
}

#[test]
fn members_missing_from_mixins_resolve_through_the_base() {
    let rt = Runtime::new();
    let base = class_with_describe(&rt, "Base", "base");

    let marker_name = rt.interner().intern("Marker");
    let marker_ty = rt.types().interface(marker_name, []);
    let marker = rt
        .classes()
        .register(ClassSpec::new(marker_name, marker_ty).constructor(default_ctor()));

    let composed = rt.compose(base, &[marker]).unwrap();
    let obj = rt.construct(composed, Name::EMPTY, &[], &[]).unwrap();

    let describe = rt.interner().intern("describe");
    assert_eq!(
        rt.dsend(&obj, describe, &[], &[]).unwrap(),
        Value::string("base")
    );
}

#[test]
fn mixin_no_such_method_handles_composed_misses() {
    let rt = Runtime::new();
    let base = class_with_describe(&rt, "Base", "base");

    let catcher_name = rt.interner().intern("Catcher");
    let catcher_ty = rt.types().interface(catcher_name, []);
    let catcher = rt.classes().register(
        ClassSpec::new(catcher_name, catcher_ty)
            .constructor(default_ctor())
            .no_such_method(Arc::new(|_, _, _| Ok(Value::Int(42)))),
    );

    let composed = rt.compose(base, &[catcher]).unwrap();
    let obj = rt.construct(composed, Name::EMPTY, &[], &[]).unwrap();

    let missing = rt.interner().intern("definitelyMissing");
    assert_eq!(rt.dsend(&obj, missing, &[], &[]).unwrap(), Value::Int(42));

    // Declared members still dispatch normally.
    let describe = rt.interner().intern("describe");
    assert_eq!(
        rt.dsend(&obj, describe, &[], &[]).unwrap(),
        Value::string("base")
    );
}

#[test]
fn composed_instances_satisfy_base_and_mixin_types() {
    let rt = Runtime::new();
    let base = class_with_describe(&rt, "Base", "base");
    let m1 = class_with_describe(&rt, "Loud", "loud");

    let composed = rt.compose(base, &[m1]).unwrap();
    let obj = rt.construct(composed, Name::EMPTY, &[], &[]).unwrap();

    assert!(rt.is_instance(&obj, rt.classes().get(base).type_of));
    assert!(rt.is_instance(&obj, rt.classes().get(m1).type_of));
    assert!(rt.is_instance(&obj, rt.classes().get(composed).type_of));
    assert!(!rt.is_instance(&Value::Int(1), rt.classes().get(composed).type_of));
}

#[test]
fn chained_composition_keeps_linear_order() {
    let rt = Runtime::new();
    let base = class_with_describe(&rt, "Base", "base");
    let m1 = class_with_describe(&rt, "Loud", "loud");
    let m2 = class_with_describe(&rt, "Quiet", "quiet");

    // `class C extends (Base with Loud) with Quiet`.
    let first = rt.compose(base, &[m1]).unwrap();
    let second = rt.compose(first, &[m2]).unwrap();
    let obj = rt.construct(second, Name::EMPTY, &[], &[]).unwrap();

    let describe = rt.interner().intern("describe");
    assert_eq!(
        rt.dsend(&obj, describe, &[], &[]).unwrap(),
        Value::string("quiet")
    );
    assert_eq!(
        rt.interner().lookup(rt.classes().get(second).name),
        "Base&Loud&Quiet"
    );
    assert!(rt.is_instance(&obj, rt.classes().get(m1).type_of));
}

#[test]
fn unresolved_miss_on_a_composed_class_carries_the_invocation() {
    let rt = Runtime::new();
    let base = class_with_describe(&rt, "Base", "base");
    let m1 = class_with_describe(&rt, "Loud", "loud");

    let composed = rt.compose(base, &[m1]).unwrap();
    let obj = rt.construct(composed, Name::EMPTY, &[], &[]).unwrap();

    let missing = rt.interner().intern("missing");
    let err = rt
        .dsend(&obj, missing, &[Value::Int(1)], &[])
        .unwrap_err();
    assert!(matches!(err.kind, RtErrorKind::NoSuchMethod { .. }));
    assert!(err.message.contains("Base&Loud"));
    assert_eq!(err.invocation.unwrap().positional.len(), 1);
}
