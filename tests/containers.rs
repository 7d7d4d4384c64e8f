//! End-to-end behavior of the Sequence and Mapping built-ins (§4.8),
//! invoked the way a `Call` expression would invoke them, rather than by
//! calling Rust helper functions directly.

use std::sync::Arc;

use ol_runtime::builtins::mapping::{new_mapping, MAPPING_CLASS};
use ol_runtime::builtins::sequence::{new_sequence, SEQUENCE_CLASS};
use ol_runtime::class::{Class, ClassDefinition};
use ol_runtime::env::Environment;
use ol_runtime::error::{Fault, RuntimeFault};
use ol_runtime::eval::invoke::invoke;
use ol_runtime::eval::Evaluator;
use ol_runtime::value::Value;

fn call(ev: &mut Evaluator, class: &Arc<Class>, receiver: &Arc<ol_runtime::object::ObjectInstance>, name: &str, args: &[Value]) -> Value {
    let f = class.public_functions.get(name).unwrap();
    invoke(ev, f, Some(receiver), args).unwrap()
}

#[test]
fn sequence_append_get_set_and_bounds_checking() {
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let seq = new_sequence(vec![Value::Integer(10), Value::Integer(20)]);

    call(&mut ev, &SEQUENCE_CLASS, &seq, "append", &[Value::Integer(30)]);
    assert_eq!(seq.read_variable("size").unwrap().as_integer().copied(), Some(3));
    assert_eq!(
        call(&mut ev, &SEQUENCE_CLASS, &seq, "get", &[Value::Integer(2)]).as_integer().copied(),
        Some(30)
    );

    call(&mut ev, &SEQUENCE_CLASS, &seq, "set", &[Value::Integer(0), Value::Integer(99)]);
    assert_eq!(
        call(&mut ev, &SEQUENCE_CLASS, &seq, "get", &[Value::Integer(0)]).as_integer().copied(),
        Some(99)
    );

    let get = SEQUENCE_CLASS.public_functions.get("get").unwrap();
    let out_of_bounds = invoke(&mut ev, get, Some(&seq), &[Value::Integer(10)]);
    assert!(matches!(out_of_bounds, Err(Fault::Script(RuntimeFault::IndexOutOfBounds { .. }))));
}

#[test]
fn sequence_slice_wraps_negative_indices_like_a_python_style_slice() {
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let seq = new_sequence((1..=5).map(Value::Integer).collect());

    let Value::Object(sliced) = call(&mut ev, &SEQUENCE_CLASS, &seq, "slice", &[Value::Integer(-3), Value::Integer(-1)]) else {
        panic!("expected a Sequence");
    };
    assert_eq!(sliced.read_variable("size").unwrap().as_integer().copied(), Some(2));
    assert_eq!(
        call(&mut ev, &SEQUENCE_CLASS, &sliced, "get", &[Value::Integer(0)]).as_integer().copied(),
        Some(3)
    );
}

#[test]
fn sequence_sort_orders_numerically_not_lexically() {
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let seq = new_sequence(vec![Value::Integer(10), Value::Integer(2), Value::Integer(1)]);
    call(&mut ev, &SEQUENCE_CLASS, &seq, "sort", &[]);

    let join = SEQUENCE_CLASS.public_functions.get("join").unwrap();
    let joined = invoke(&mut ev, join, Some(&seq), &[Value::string(",")]).unwrap();
    assert_eq!(joined.to_canonical_string(), "1,2,10");
}

#[test]
fn sequence_rejects_a_foreign_receiver() {
    let foreign_class = Class::register(ClassDefinition::new("m", "NotASequence"), |_| None).unwrap();
    let foreign = ol_runtime::object::ObjectInstance::new(foreign_class, Arc::new(Environment::root()));
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let size = SEQUENCE_CLASS.public_functions.get("get").unwrap();
    let result = invoke(&mut ev, size, Some(&foreign), &[Value::Integer(0)]);
    assert!(matches!(result, Err(Fault::Script(RuntimeFault::TypeMismatch { .. }))));
}

#[test]
fn mapping_put_get_remove_and_sorted_keys() {
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let map = new_mapping(Default::default());

    call(&mut ev, &MAPPING_CLASS, &map, "put", &[Value::string("zebra"), Value::Integer(1)]);
    call(&mut ev, &MAPPING_CLASS, &map, "put", &[Value::string("apple"), Value::Integer(2)]);
    assert_eq!(map.read_variable("size").unwrap().as_integer().copied(), Some(2));

    let Value::Object(keys) = call(&mut ev, &MAPPING_CLASS, &map, "keys", &[]) else {
        panic!("expected a Sequence of keys");
    };
    let get = SEQUENCE_CLASS.public_functions.get("get").unwrap();
    let first_key = invoke(&mut ev, get, Some(&keys), &[Value::Integer(0)]).unwrap();
    assert_eq!(first_key.to_canonical_string(), "apple");

    call(&mut ev, &MAPPING_CLASS, &map, "remove", &[Value::string("apple")]);
    assert_eq!(map.read_variable("size").unwrap().as_integer().copied(), Some(1));
}

#[test]
fn mapping_merge_from_copies_entries_without_mutating_the_source() {
    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let mut seed = std::collections::BTreeMap::new();
    seed.insert("a".to_string(), Value::Integer(1));
    let source = new_mapping(seed);
    let target = new_mapping(Default::default());

    call(&mut ev, &MAPPING_CLASS, &target, "merge_from", &[Value::Object(Arc::clone(&source))]);
    assert_eq!(target.read_variable("size").unwrap().as_integer().copied(), Some(1));
    assert_eq!(source.read_variable("size").unwrap().as_integer().copied(), Some(1));
}
