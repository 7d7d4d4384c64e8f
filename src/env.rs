//! Lexical environment and name resolution (§4.2).
//!
//! Grounded in the teacher's classloader delegation pattern
//! (`src/runtime/classload/loader.rs`'s `load_class` falling through to
//! `parent()`), generalized from a single class lookup to the full
//! three-table (variables/functions/classes) scope chain §4.2 specifies.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::class::{Class, FunctionDescriptor};
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::value::{TypeTag, Value};

/// A variable record (§4.2): declared type tag, locked bit, public bit,
/// and a value cell.
pub struct VariableRecord {
    pub type_tag: Option<TypeTag>,
    pub is_locked: bool,
    pub is_public: bool,
    value: RwLock<Value>,
}

impl VariableRecord {
    pub fn new(type_tag: Option<TypeTag>, is_locked: bool, is_public: bool, value: Value) -> Self {
        Self {
            type_tag,
            is_locked,
            is_public,
            value: RwLock::new(value),
        }
    }

    pub fn get(&self) -> Value {
        self.value.read().clone()
    }

    fn set_raw(&self, v: Value) {
        *self.value.write() = v;
    }
}

#[derive(Default)]
struct Scope {
    variables: HashMap<String, Arc<VariableRecord>>,
    functions: HashMap<String, Arc<FunctionDescriptor>>,
    classes: HashMap<String, Arc<Class>>,
}

/// A single scope in the chain, with a pointer to its parent (§4.2:
/// "`new_child(parent)` creates a scope whose lookups fall through to the
/// parent after a local miss").
pub struct Environment {
    scope: RwLock<Scope>,
    parent: Option<Arc<Environment>>,
}

impl Environment {
    pub fn root() -> Self {
        Self {
            scope: RwLock::new(Scope::default()),
            parent: None,
        }
    }

    pub fn new_child(parent: &Arc<Environment>) -> Arc<Environment> {
        Arc::new(Self {
            scope: RwLock::new(Scope::default()),
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn define_variable(
        &self,
        name: impl Into<String>,
        record: VariableRecord,
    ) -> EvalResult<()> {
        let name = name.into();
        let mut scope = self.scope.write();
        if scope.variables.contains_key(&name) {
            return Err(Fault::Script(RuntimeFault::Redeclaration(name)));
        }
        scope.variables.insert(name, Arc::new(record));
        Ok(())
    }

    pub fn define_function(
        &self,
        name: impl Into<String>,
        f: Arc<FunctionDescriptor>,
    ) -> EvalResult<()> {
        let name = name.into();
        let mut scope = self.scope.write();
        if scope.functions.contains_key(&name) {
            return Err(Fault::Script(RuntimeFault::Redeclaration(name)));
        }
        scope.functions.insert(name, f);
        Ok(())
    }

    pub fn define_class(&self, name: impl Into<String>, class: Arc<Class>) -> EvalResult<()> {
        let name = name.into();
        let mut scope = self.scope.write();
        if scope.classes.contains_key(&name) {
            return Err(Fault::Script(RuntimeFault::Redeclaration(name)));
        }
        scope.classes.insert(name, class);
        Ok(())
    }

    pub fn get_variable(&self, name: &str) -> Option<Arc<VariableRecord>> {
        if let Some(v) = self.scope.read().variables.get(name) {
            return Some(Arc::clone(v));
        }
        self.parent.as_ref().and_then(|p| p.get_variable(name))
    }

    pub fn get_function(&self, name: &str) -> Option<Arc<FunctionDescriptor>> {
        if let Some(f) = self.scope.read().functions.get(name) {
            return Some(Arc::clone(f));
        }
        self.parent.as_ref().and_then(|p| p.get_function(name))
    }

    /// Classes are resolved by either their short name (as declared in
    /// this environment's scope chain) or their fully-qualified name.
    pub fn get_class(&self, name: &str) -> Option<Arc<Class>> {
        if let Some(c) = self.scope.read().classes.get(name) {
            return Some(Arc::clone(c));
        }
        if let Some(c) = self
            .scope
            .read()
            .classes
            .values()
            .find(|c| c.qualified_name == name)
        {
            return Some(Arc::clone(c));
        }
        self.parent.as_ref().and_then(|p| p.get_class(name))
    }

    /// Assignment climbs the scope chain (§4.2). Fails with
    /// `UnknownVariable` if no binding exists, `AssignToLocked` if the
    /// binding's locked bit is set, or propagates a `CastError` from the
    /// implicit cast through the declared type tag.
    pub fn assign_variable(&self, name: &str, v: Value) -> EvalResult<()> {
        let record = self
            .find_variable_record(name)
            .ok_or_else(|| RuntimeFault::UnknownVariable(name.to_string()))?;

        if record.is_locked {
            return Err(Fault::Script(RuntimeFault::AssignToLocked(name.to_string())));
        }

        let cast = match &record.type_tag {
            Some(tag) => v.cast(tag)?,
            None => v,
        };

        record.set_raw(cast);
        Ok(())
    }

    fn find_variable_record(&self, name: &str) -> Option<Arc<VariableRecord>> {
        if let Some(v) = self.scope.read().variables.get(name) {
            return Some(Arc::clone(v));
        }
        self.parent.as_ref().and_then(|p| p.find_variable_record(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_scope_falls_through_to_parent() {
        let root = Arc::new(Environment::root());
        root.define_variable("x", VariableRecord::new(None, false, true, Value::Integer(1)))
            .unwrap();

        let child = Environment::new_child(&root);
        assert_eq!(
            child.get_variable("x").unwrap().get().as_integer().copied(),
            Some(1)
        );
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let root = Environment::root();
        root.define_variable("x", VariableRecord::new(None, false, true, Value::Nothing))
            .unwrap();
        let second = root.define_variable("x", VariableRecord::new(None, false, true, Value::Nothing));
        assert!(matches!(second, Err(Fault::Script(RuntimeFault::Redeclaration(_)))));
    }

    #[test]
    fn assignment_to_unknown_variable_fails() {
        let root = Environment::root();
        let result = root.assign_variable("missing", Value::Integer(1));
        assert!(matches!(result, Err(Fault::Script(RuntimeFault::UnknownVariable(_)))));
    }

    #[test]
    fn locked_variable_rejects_assignment() {
        let root = Environment::root();
        root.define_variable("x", VariableRecord::new(None, true, true, Value::Integer(1)))
            .unwrap();
        let result = root.assign_variable("x", Value::Integer(2));
        assert!(matches!(result, Err(Fault::Script(RuntimeFault::AssignToLocked(_)))));
    }

    #[test]
    fn assignment_through_declared_type_casts_implicitly() {
        let root = Environment::root();
        root.define_variable(
            "x",
            VariableRecord::new(Some(TypeTag::Double), false, true, Value::Double(0.0)),
        )
        .unwrap();
        root.assign_variable("x", Value::Integer(3)).unwrap();
        assert_eq!(root.get_variable("x").unwrap().get().as_double().copied(), Some(3.0));
    }
}
