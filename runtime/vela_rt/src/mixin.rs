//! Mixin application.
//!
//! `class C extends Base with M1, M2` compiles to a chain of composed
//! classes. The composer overlays mixin members onto a base class in
//! declaration order (later mixins shadow earlier ones), forwards the
//! base's constructors, and records provenance in a [`MixinRecord`].

use std::sync::Arc;

use vela_intern::Name;

use crate::class::{ClassFlags, ClassId, ClassSpec, Constructor, MixinRecord};
use crate::errors::{self, RtError};
use crate::runtime::Runtime;
use crate::value::CallArgs;

impl Runtime {
    /// Compose `base` with `mixins`, registering a fresh concrete class.
    ///
    /// Mixins may not declare constructors beyond the default shape; a
    /// violation surfaces as a composition error rather than a later
    /// dispatch failure. Each call registers a new class (composition
    /// sites are static, so the compiler already shares them).
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn compose(&self, base: ClassId, mixins: &[ClassId]) -> Result<ClassId, RtError> {
        let base_record = self.classes().get(base);

        let mut name = self.interner().lookup(base_record.name).to_owned();
        let mut members = Vec::new();
        let mut interfaces = Vec::new();
        let mut initializers = Vec::new();
        let mut no_such_method = None;

        for &mixin in mixins {
            let record = self.classes().get(mixin);
            for ctor in record.constructors.values() {
                if !ctor.is_default_shape() {
                    return Err(errors::mixin_constructor(self.interner().lookup(record.name)));
                }
            }

            name.push('&');
            name.push_str(self.interner().lookup(record.name));
            interfaces.push(record.type_of);
            interfaces.extend(record.interfaces.iter().copied());
            // Later mixins are pushed later and therefore win the
            // insertion into the member table at registration.
            members.extend(record.members.values().cloned());
            if let Some(ctor) = record.constructors.get(&Name::EMPTY) {
                initializers.push(Arc::clone(&ctor.body));
            }
            if let Some(handler) = &record.no_such_method {
                no_such_method = Some(Arc::clone(handler));
            }
        }

        let composed_name = self.interner().intern(&name);
        let type_of = self.types().interface(composed_name, []);

        let mut spec = ClassSpec::new(composed_name, type_of)
            .extends(base)
            .flag(ClassFlags::MIXIN_COMPOSED);
        spec.interfaces = interfaces;
        spec.members = members;
        spec.no_such_method = no_such_method;
        spec.mixin = Some(MixinRecord {
            base,
            mixins: mixins.into(),
        });

        // Forward every base constructor: run the base initialization,
        // then each mixin's default initializer in declaration order.
        for ctor in base_record.constructors.values() {
            let base_body = Arc::clone(&ctor.body);
            let mixin_bodies = initializers.clone();
            spec = spec.constructor(Constructor::new(
                ctor.name,
                ctor.required,
                ctor.optional,
                ctor.named.clone(),
                Arc::new(move |rt: &Runtime, receiver, args: CallArgs<'_>| {
                    base_body(rt, receiver, args)?;
                    for init in &mixin_bodies {
                        init(rt, receiver, CallArgs::empty())?;
                    }
                    Ok(())
                }),
            ));
        }

        Ok(self.classes().register(spec))
    }
}
