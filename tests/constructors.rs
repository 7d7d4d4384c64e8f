//! The constructor dispatch chain (§4.5): only the most-derived
//! constructor receives the caller's arguments, every ancestor constructor
//! on the chain runs against an empty argument vector.

use std::sync::Arc;

use ol_runtime::ast::{Expr, Stmt};
use ol_runtime::class::{Class, ClassDefinition, FunctionDescriptor, MemberVariableDescriptor, Param};
use ol_runtime::env::Environment;
use ol_runtime::error::{Fault, RuntimeFault};
use ol_runtime::eval::{construct, Evaluator};
use ol_runtime::value::{TypeTag, Value};

fn set_self(name: &str, value_expr: Expr) -> Stmt {
    Stmt::ExprStmt(Expr::MemberSet(Box::new(Expr::SelfExpr), name.to_string(), Box::new(value_expr)))
}

#[test]
fn ancestor_runs_before_derived_and_only_derived_sees_real_args() {
    let animal = ClassDefinition::new("ctor", "Animal")
        .with_public_variable(MemberVariableDescriptor::value_cell("species", None, Value::Nothing, false, true))
        .with_public_function(FunctionDescriptor::script(
            "Animal",
            vec![],
            None,
            false,
            true,
            vec![set_self("species", Expr::lit(Value::string("unknown")))],
        ));
    let animal = Class::register(animal, |_| None).unwrap();

    let animal_qn = animal.qualified_name.clone();
    let dog = ClassDefinition::new("ctor", "Dog")
        .with_parent(animal_qn.clone())
        .with_public_variable(MemberVariableDescriptor::value_cell("name", None, Value::Nothing, false, true))
        .with_public_function(FunctionDescriptor::script(
            "Dog",
            vec![Param::new("name", Some(TypeTag::String))],
            None,
            false,
            true,
            vec![set_self("name", Expr::Ident("name".to_string()))],
        ));
    let dog = Class::register(dog, |n| (n == animal_qn).then(|| Arc::clone(&animal))).unwrap();

    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let instance = construct::construct(&mut ev, dog, &[Value::string("Rex")]).unwrap();

    assert_eq!(
        instance.read_variable("species").unwrap().to_canonical_string(),
        "unknown"
    );
    assert_eq!(instance.read_variable("name").unwrap().to_canonical_string(), "Rex");
}

#[test]
fn ancestor_constructor_with_required_params_fails_on_empty_args() {
    // §4.5's resolved open question: an ancestor constructor that declares
    // parameters is still invoked with an empty argument vector, so it
    // fails the ordinary arity check in `bind_params` rather than being
    // silently skipped or defaulted.
    let base = ClassDefinition::new("ctor", "Base")
        .with_public_variable(MemberVariableDescriptor::value_cell("id", None, Value::Nothing, false, true))
        .with_public_function(FunctionDescriptor::script(
            "Base",
            vec![Param::new("id", Some(TypeTag::Integer))],
            None,
            false,
            true,
            vec![set_self("id", Expr::Ident("id".to_string()))],
        ));
    let base = Class::register(base, |_| None).unwrap();

    let base_qn = base.qualified_name.clone();
    let derived = ClassDefinition::new("ctor", "Derived")
        .with_parent(base_qn.clone())
        .with_public_function(FunctionDescriptor::script("Derived", vec![], None, false, true, vec![]));
    let derived = Class::register(derived, |n| (n == base_qn).then(|| Arc::clone(&base))).unwrap();

    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let result = construct::construct(&mut ev, derived, &[]);
    assert!(matches!(result, Err(Fault::Script(RuntimeFault::TypeMismatch { .. }))));
}

#[test]
fn class_with_no_constructor_just_gets_its_defaults() {
    let def = ClassDefinition::new("ctor", "PlainData").with_public_variable(MemberVariableDescriptor::value_cell(
        "count",
        Some(TypeTag::Integer),
        Value::Integer(0),
        false,
        true,
    ));
    let class = Class::register(def, |_| None).unwrap();

    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let instance = construct::construct(&mut ev, class, &[]).unwrap();
    assert_eq!(instance.read_variable("count").unwrap().as_integer().copied(), Some(0));
}
