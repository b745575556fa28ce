//! Subtype decisions over interned type descriptors.
//!
//! Nominal class subtyping walks the [`ClassHierarchy`] seam; generic
//! instantiations are invariant in their arguments, so after
//! canonicalization an interface-to-interface check reduces to an exact
//! `TypeId` match somewhere along the supertype walk. Function types are
//! structural: contravariant parameters, covariant return.

use smallvec::SmallVec;
use vela_intern::Name;

use crate::{TypeData, TypeId, TypeRegistry};

/// Supertype lookup seam implemented by the class registry.
///
/// Given an instantiated class type (or a primitive, or a function type),
/// returns its direct supertypes: the `extends` target, every implemented
/// interface, and every composed mixin's interface type. Unknown ids
/// return an empty list.
pub trait ClassHierarchy {
    /// Direct supertypes of `ty`.
    fn supers_of(&self, ty: TypeId) -> SmallVec<[TypeId; 4]>;
}

/// Subtype checker over a registry and a class hierarchy.
///
/// Stateless per call; holds non-owning references so dispatch can build
/// one per check without allocation.
pub struct SubtypeChecker<'a, H: ClassHierarchy> {
    registry: &'a TypeRegistry,
    hierarchy: &'a H,
}

impl<'a, H: ClassHierarchy> SubtypeChecker<'a, H> {
    /// Create a checker borrowing the shared registry and hierarchy.
    pub fn new(registry: &'a TypeRegistry, hierarchy: &'a H) -> Self {
        Self {
            registry,
            hierarchy,
        }
    }

    /// Decide `a <: b`.
    ///
    /// `Bottom <: everything` and `everything <: Dynamic` (asymmetric:
    /// `Dynamic` is not a subtype of concrete types). `Void` is a
    /// supertype only of itself and `Bottom`.
    pub fn is_subtype(&self, a: TypeId, b: TypeId) -> bool {
        // Canonicalization: identity implies structural equality.
        if a == b || a == TypeId::BOTTOM || b == TypeId::DYNAMIC {
            return true;
        }
        if a == TypeId::DYNAMIC || b == TypeId::BOTTOM || a == TypeId::VOID || b == TypeId::VOID {
            return false;
        }

        match (self.registry.lookup(a), self.registry.lookup(b)) {
            (TypeData::Function { .. }, TypeData::Function { .. }) => self.function_subtype(a, b),
            // Nominal walk: exact target match along the supertype graph.
            // Invariant generics mean no argument-wise recursion here.
            (_, TypeData::Interface { .. } | TypeData::Primitive(_)) => {
                let mut seen: SmallVec<[TypeId; 8]> = SmallVec::new();
                self.walks_to(a, b, &mut seen)
            }
            _ => false,
        }
    }

    /// DFS over the supertype graph looking for `target`.
    ///
    /// Mixin-composed classes can reach the same super through several
    /// paths; `seen` keeps the walk linear.
    fn walks_to(&self, from: TypeId, target: TypeId, seen: &mut SmallVec<[TypeId; 8]>) -> bool {
        for s in self.hierarchy.supers_of(from) {
            if s == target {
                return true;
            }
            if seen.contains(&s) {
                continue;
            }
            seen.push(s);
            if self.walks_to(s, target, seen) {
                return true;
            }
        }
        false
    }

    /// Structural function subtyping: `f <: g`.
    ///
    /// - required positional counts match, parameter types contravariant;
    /// - a function with fewer optional positionals is a subtype of one
    ///   with more, provided the shared prefix matches (contravariantly);
    /// - `f`'s named parameters must be a superset of `g`'s, each
    ///   contravariant;
    /// - return type covariant.
    fn function_subtype(&self, f: TypeId, g: TypeId) -> bool {
        let (TypeData::Function {
            ret: f_ret,
            positional: f_pos,
            optional: f_opt,
            named: f_named,
        }, TypeData::Function {
            ret: g_ret,
            positional: g_pos,
            optional: g_opt,
            named: g_named,
        }) = (self.registry.lookup(f), self.registry.lookup(g))
        else {
            return false;
        };

        if f_pos.len() != g_pos.len() || f_opt.len() > g_opt.len() {
            return false;
        }
        if !f_pos
            .iter()
            .zip(g_pos.iter())
            .all(|(&fp, &gp)| self.is_subtype(gp, fp))
        {
            return false;
        }
        // Shared optional prefix, contravariant.
        if !f_opt
            .iter()
            .zip(g_opt.iter())
            .all(|(&fo, &go)| self.is_subtype(go, fo))
        {
            return false;
        }
        // Every named parameter of g must be declared by f with a type
        // that accepts at least g's.
        for &(g_name, g_ty) in g_named.iter() {
            match lookup_named(&f_named, g_name) {
                Some(f_ty) if self.is_subtype(g_ty, f_ty) => {}
                _ => return false,
            }
        }

        self.is_subtype(f_ret, g_ret)
    }
}

/// Binary-search a canonical (sorted) named-parameter table.
fn lookup_named(named: &[(Name, TypeId)], name: Name) -> Option<TypeId> {
    named
        .binary_search_by_key(&name, |&(n, _)| n)
        .ok()
        .map(|idx| named[idx].1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;
    use vela_intern::SharedInterner;

    /// Hierarchy stub: explicit edges only.
    #[derive(Default)]
    struct TestHierarchy {
        supers: FxHashMap<TypeId, Vec<TypeId>>,
    }

    impl TestHierarchy {
        fn link(&mut self, sub: TypeId, supers: impl Into<Vec<TypeId>>) {
            self.supers.insert(sub, supers.into());
        }
    }

    impl ClassHierarchy for TestHierarchy {
        fn supers_of(&self, ty: TypeId) -> SmallVec<[TypeId; 4]> {
            self.supers
                .get(&ty)
                .map(|v| v.iter().copied().collect())
                .unwrap_or_default()
        }
    }

    struct Fixture {
        interner: SharedInterner,
        registry: TypeRegistry,
        hierarchy: TestHierarchy,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                interner: SharedInterner::new(),
                registry: TypeRegistry::new(),
                hierarchy: TestHierarchy::default(),
            }
        }

        fn primitive(&self, name: &str) -> TypeId {
            self.registry.primitive(self.interner.intern(name))
        }

        fn interface(&self, name: &str, args: &[TypeId]) -> TypeId {
            self.registry.interface(self.interner.intern(name), args)
        }

        fn check(&self, a: TypeId, b: TypeId) -> bool {
            SubtypeChecker::new(&self.registry, &self.hierarchy).is_subtype(a, b)
        }
    }

    #[test]
    fn bottom_and_dynamic_are_asymmetric() {
        let fx = Fixture::new();
        let int = fx.primitive("int");

        assert!(fx.check(TypeId::BOTTOM, int));
        assert!(fx.check(int, TypeId::DYNAMIC));
        assert!(fx.check(TypeId::DYNAMIC, TypeId::DYNAMIC));
        assert!(!fx.check(TypeId::DYNAMIC, int));
        assert!(!fx.check(int, TypeId::BOTTOM));
    }

    #[test]
    fn void_is_not_a_general_top() {
        let fx = Fixture::new();
        let int = fx.primitive("int");

        assert!(fx.check(TypeId::VOID, TypeId::VOID));
        assert!(fx.check(TypeId::BOTTOM, TypeId::VOID));
        assert!(!fx.check(int, TypeId::VOID));
        assert!(!fx.check(TypeId::VOID, int));
    }

    #[test]
    fn nominal_subtyping_is_transitive() {
        let mut fx = Fixture::new();
        let int = fx.primitive("int");
        let num = fx.primitive("num");
        let object = fx.primitive("Object");
        fx.hierarchy.link(int, vec![num]);
        fx.hierarchy.link(num, vec![object]);

        assert!(fx.check(int, num));
        assert!(fx.check(int, object));
        assert!(!fx.check(num, int));
    }

    #[test]
    fn generic_instantiations_are_invariant() {
        let mut fx = Fixture::new();
        let int = fx.primitive("int");
        let num = fx.primitive("num");
        fx.hierarchy.link(int, vec![num]);

        let i_int = fx.interface("I", &[int]);
        let i_num = fx.interface("I", &[num]);

        assert!(fx.check(i_int, i_int));
        // int <: num, but I<int> is not a subtype of I<num> (no variance).
        assert!(!fx.check(i_int, i_num));
    }

    #[test]
    fn interface_walk_goes_through_declared_supers() {
        let mut fx = Fixture::new();
        let int = fx.primitive("int");
        let box_int = fx.interface("Box", &[int]);
        let container_int = fx.interface("Container", &[int]);
        fx.hierarchy.link(box_int, vec![container_int]);

        assert!(fx.check(box_int, container_int));
        assert!(!fx.check(container_int, box_int));
    }

    #[test]
    fn function_parameters_are_contravariant_return_covariant() {
        let mut fx = Fixture::new();
        let int = fx.primitive("int");
        let num = fx.primitive("num");
        fx.hierarchy.link(int, vec![num]);

        // (num) -> int  <:  (int) -> num
        let f = fx.registry.function(int, [num], [], vec![]);
        let g = fx.registry.function(num, [int], [], vec![]);
        assert!(fx.check(f, g));
        assert!(!fx.check(g, f));
    }

    #[test]
    fn fewer_optionals_is_the_subtype() {
        let fx = Fixture::new();
        let int = fx.primitive("int");

        let fewer = fx.registry.function(TypeId::VOID, [int], [int], vec![]);
        let more = fx
            .registry
            .function(TypeId::VOID, [int], [int, int], vec![]);
        assert!(fx.check(fewer, more));
        assert!(!fx.check(more, fewer));
    }

    #[test]
    fn named_parameters_require_a_superset() {
        let fx = Fixture::new();
        let int = fx.primitive("int");
        let x = fx.interner.intern("x");
        let y = fx.interner.intern("y");

        let superset = fx
            .registry
            .function(TypeId::VOID, [], [], vec![(x, int), (y, int)]);
        let subset = fx.registry.function(TypeId::VOID, [], [], vec![(x, int)]);

        // Declaring more named parameters accepts every call the other does.
        assert!(fx.check(superset, subset));
        assert!(!fx.check(subset, superset));
    }
}
