//! Bound methods (§4.6, GLOSSARY), represented as instances of a hidden
//! internal class rather than a seventh [`Value`] variant.
//!
//! Grounded in the teacher's habit of modelling auxiliary runtime concepts
//! as ordinary heap objects rather than widening the value enum (see how
//! `BuiltinThread` in `sources/runtime/src/object/builtins.rs` is just
//! another `Object` with a native payload). A plain `MemberGet` that
//! resolves to a method materializes one of these; a `Call` expression
//! with a receiver skips materialization and invokes the descriptor
//! directly (see `src/eval/expr.rs`).

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::class::{Class, ClassDefinition};
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::Value;

use super::{invoke, Evaluator};

lazy_static! {
    /// The hidden class every bound-method `Value::Object` belongs to.
    /// Never exposed to script name resolution; scripts only ever reach
    /// instances of it by calling a resolved method reference.
    static ref BOUND_METHOD_CLASS: Arc<Class> =
        Class::register(ClassDefinition::new("core", "BoundMethod"), |_| None)
            .expect("hidden BoundMethod class must register with no parents");
}

/// Wrap `f` bound to `receiver` as a `Value::Object` (§4.6: "return a
/// bound-method value (receiver + function descriptor)").
pub fn make_bound_method(
    evaluator: &Evaluator,
    f: Arc<crate::class::FunctionDescriptor>,
    receiver: Option<Arc<ObjectInstance>>,
) -> Value {
    let instance = ObjectInstance::new_with_native(
        Arc::clone(&BOUND_METHOD_CLASS),
        Arc::clone(&evaluator.root_env),
        NativeData::BoundMethod(f, receiver),
    );
    Value::Object(instance)
}

/// Invoke `value` as a bound method with `args`, failing with
/// `TypeMismatch` if it is not one (§4.6).
pub fn call_bound_method(
    evaluator: &mut Evaluator,
    value: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let Value::Object(obj) = value else {
        return Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: "a callable bound method".to_string(),
            got: value.type_tag().to_string(),
        }));
    };

    let guard = obj.native.read();
    match &*guard {
        NativeData::BoundMethod(f, receiver) => {
            let f = Arc::clone(f);
            let receiver = receiver.clone();
            drop(guard);
            invoke::invoke(evaluator, &f, receiver.as_ref(), args)
        }
        _ => Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: "a callable bound method".to_string(),
            got: obj.class.short_name.clone(),
        })),
    }
}
