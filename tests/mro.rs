//! Multiple-inheritance dispatch order, exercised end to end through the
//! constructor chain rather than by inspecting `Class::mro` directly (that
//! is already covered at the unit level in `src/class/mro.rs` and
//! `src/class/mod.rs`).

use std::collections::HashMap;
use std::sync::Arc;

use ol_runtime::ast::{Expr, Stmt};
use ol_runtime::class::{Class, ClassDefinition, FunctionDescriptor, MemberVariableDescriptor};
use ol_runtime::env::Environment;
use ol_runtime::eval::{construct, Evaluator};
use ol_runtime::value::Value;

/// Every class shares the same two-statement body: the root ancestor
/// creates the log Sequence, every class appends its own short name.
fn log_append_body(short_name: &str, is_root: bool) -> Vec<Stmt> {
    let mut body = Vec::new();
    if is_root {
        body.push(Stmt::ExprStmt(Expr::MemberSet(
            Box::new(Expr::SelfExpr),
            "log".to_string(),
            Box::new(Expr::New {
                class_name: "Sequence".to_string(),
                args: vec![],
            }),
        )));
    }
    body.push(Stmt::ExprStmt(Expr::Call {
        receiver: Some(Box::new(Expr::MemberGet(Box::new(Expr::SelfExpr), "log".to_string()))),
        name: "append".to_string(),
        args: vec![Expr::lit(Value::string(short_name))],
    }));
    body
}

fn register(
    registry: &mut HashMap<String, Arc<Class>>,
    short_name: &str,
    parents: &[&str],
    is_root: bool,
) -> Arc<Class> {
    let mut def = ClassDefinition::new("diamond", short_name);
    for p in parents {
        def = def.with_parent(registry[*p].qualified_name.clone());
    }
    if is_root {
        def = def.with_public_variable(MemberVariableDescriptor::value_cell(
            "log",
            None,
            Value::Nothing,
            false,
            true,
        ));
    }
    def = def.with_public_function(FunctionDescriptor::script(
        short_name,
        vec![],
        None,
        false,
        true,
        log_append_body(short_name, is_root),
    ));

    let registry_ref = &*registry;
    let class = Class::register(def, |n| registry_ref.values().find(|c| c.qualified_name == n).cloned())
        .unwrap_or_else(|e| panic!("registering {short_name} failed: {e}"));
    registry.insert(short_name.to_string(), Arc::clone(&class));
    class
}

#[test]
fn diamond_constructor_chain_runs_ancestor_first_by_mro_order() {
    let root = Arc::new(Environment::root());
    ol_runtime::builtins::install(&root).unwrap();
    let mut ev = Evaluator::new(root);

    let mut registry = HashMap::new();
    register(&mut registry, "A", &[], true);
    register(&mut registry, "B", &["A"], false);
    register(&mut registry, "C", &["A"], false);
    let d = register(&mut registry, "D", &["B", "C"], false);

    // Diamond D(B, C), B(A), C(A): C3 prefers the first-declared parent,
    // so the MRO is D, B, C, A and the constructor chain (most distant
    // ancestor first) runs A, C, B, D.
    let instance = construct::construct(&mut ev, d, &[]).unwrap();
    let log = instance.read_variable("log").unwrap();
    let Value::Object(log) = log else {
        panic!("expected log to be a Sequence instance");
    };

    assert_eq!(log.read_variable("size").unwrap().as_integer().copied(), Some(4));

    let get = ol_runtime::builtins::sequence::SEQUENCE_CLASS
        .public_functions
        .get("get")
        .unwrap();
    let order: Vec<String> = (0..4)
        .map(|i| {
            ol_runtime::eval::invoke::invoke(&mut ev, get, Some(&log), &[Value::Integer(i)])
                .unwrap()
                .to_canonical_string()
        })
        .collect();
    assert_eq!(order, vec!["A", "C", "B", "D"]);
}

#[test]
fn subclass_method_shadows_ancestor_in_lookup() {
    let mut registry = HashMap::new();
    let base = ClassDefinition::new("diamond", "Base").with_public_function(FunctionDescriptor::native(
        "whoami",
        vec![],
        true,
        |_, _, _| Ok(Value::string("base")),
    ));
    let base = Class::register(base, |_| None).unwrap();
    registry.insert("Base".to_string(), Arc::clone(&base));

    let derived = ClassDefinition::new("diamond", "Derived")
        .with_parent(base.qualified_name.clone())
        .with_public_function(FunctionDescriptor::native("whoami", vec![], true, |_, _, _| {
            Ok(Value::string("derived"))
        }));
    let derived = Class::register(derived, |n| registry.values().find(|c| c.qualified_name == n).cloned()).unwrap();

    let instance = ol_runtime::object::ObjectInstance::new(derived, Arc::new(Environment::root()));
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let v = ev.member_get(&instance, "whoami").unwrap();
    let result = ol_runtime::eval::bound_method::call_bound_method(&mut ev, &v, &[]).unwrap();
    assert_eq!(result.to_canonical_string(), "derived");
}

#[test]
fn private_member_is_inaccessible_outside_its_declaring_class() {
    let def = ClassDefinition::new("diamond", "Secretive").with_private_variable(
        MemberVariableDescriptor::value_cell("secret", None, Value::Integer(1), false, false),
    );
    let class = Class::register(def, |_| None).unwrap();
    let instance = ol_runtime::object::ObjectInstance::new(class, Arc::new(Environment::root()));

    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let result = ev.member_get(&instance, "secret");
    assert!(result.is_err());
}

#[test]
fn member_get_after_member_set_observes_the_write() {
    let def = ClassDefinition::new("diamond", "Box").with_public_variable(MemberVariableDescriptor::value_cell(
        "value",
        None,
        Value::Integer(0),
        false,
        true,
    ));
    let class = Class::register(def, |_| None).unwrap();
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let instance = ol_runtime::object::ObjectInstance::new(class, Arc::new(Environment::root()));
    ev.member_set(&instance, "value", Value::Integer(5)).unwrap();
    let read = ev.member_get(&instance, "value").unwrap();
    assert!(read.equals(&Value::Integer(5)).unwrap());
}
